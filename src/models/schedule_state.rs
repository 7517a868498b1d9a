//! Per-card scheduling memory and its durable form.
//!
//! `CardScheduleState` is what the scheduler reads and rewrites on every
//! review. `PersistedScheduleState` is the flat record a storage layer keeps;
//! its byte layout is fixed (see [`PersistedScheduleState::to_bytes`]).
use super::config::SchedulerConfig;
use serde::{Deserialize, Serialize};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Size of the little-endian wire record.
pub const PERSISTED_STATE_LEN: usize = 3 * 4 + 2 * 8 + 5 * 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScheduleMode {
    #[default]
    Mastery,
    Cram,
}

impl ScheduleMode {
    pub fn as_u32(self) -> u32 {
        match self {
            ScheduleMode::Mastery => 0,
            ScheduleMode::Cram => 1,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(ScheduleMode::Mastery),
            1 => Some(ScheduleMode::Cram),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardScheduleState {
    pub version: u32,
    pub mode: ScheduleMode,
    pub ease_factor: f64,
    pub interval_days: f64,
    /// Unscaled cram baseline; topic and exam modifiers only touch the scheduled interval.
    pub cram_interval_minutes: f64,
    pub cram_bleed_minutes: f64,
    pub topic_adjustment: f64,
    pub consecutive_correct: u32,
    /// Unix seconds; 0 means never reviewed.
    pub due_unix: i64,
    pub last_review_unix: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedScheduleState {
    pub version: u32,
    pub mode: u32,
    pub consecutive_correct: u32,
    pub due_unix: i64,
    pub last_review_unix: i64,
    pub ease_factor: f64,
    pub interval_days: f64,
    pub cram_interval_minutes: f64,
    pub cram_bleed_minutes: f64,
    pub topic_adjustment: f64,
}

/// Fresh state for a card that has never been scheduled.
pub fn init_state(config: &SchedulerConfig) -> CardScheduleState {
    CardScheduleState {
        version: CURRENT_SCHEMA_VERSION,
        mode: ScheduleMode::Mastery,
        ease_factor: config.ease_default,
        interval_days: config.starting_interval_days,
        cram_interval_minutes: config.cram_initial_minutes,
        cram_bleed_minutes: 0.0,
        topic_adjustment: 1.0,
        consecutive_correct: 0,
        due_unix: 0,
        last_review_unix: 0,
    }
}

pub fn pack(state: &CardScheduleState) -> PersistedScheduleState {
    PersistedScheduleState {
        version: state.version,
        mode: state.mode.as_u32(),
        consecutive_correct: state.consecutive_correct,
        due_unix: state.due_unix,
        last_review_unix: state.last_review_unix,
        ease_factor: state.ease_factor,
        interval_days: state.interval_days,
        cram_interval_minutes: state.cram_interval_minutes,
        cram_bleed_minutes: state.cram_bleed_minutes,
        topic_adjustment: state.topic_adjustment,
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

/// Rebuilds a live state from storage. Invalid fields fall back to the
/// config defaults instead of leaking into the scheduler.
pub fn unpack(persisted: &PersistedScheduleState, config: &SchedulerConfig) -> CardScheduleState {
    let cram_bleed_minutes = if persisted.cram_bleed_minutes.is_finite() {
        persisted.cram_bleed_minutes.max(0.0)
    } else {
        0.0
    };

    CardScheduleState {
        version: persisted.version,
        mode: ScheduleMode::from_u32(persisted.mode).unwrap_or_default(),
        ease_factor: positive_or(persisted.ease_factor, config.ease_default),
        interval_days: positive_or(persisted.interval_days, config.starting_interval_days),
        cram_interval_minutes: positive_or(
            persisted.cram_interval_minutes,
            config.cram_initial_minutes,
        ),
        cram_bleed_minutes,
        topic_adjustment: positive_or(persisted.topic_adjustment, 1.0),
        consecutive_correct: persisted.consecutive_correct,
        due_unix: persisted.due_unix.max(0),
        last_review_unix: persisted.last_review_unix.max(0),
    }
}

impl PersistedScheduleState {
    /// Encodes the record as
    /// `version:u32, mode:u32, consecutive_correct:u32, due_unix:i64,
    /// last_review_unix:i64, ease_factor:f64, interval_days:f64,
    /// cram_interval_minutes:f64, cram_bleed_minutes:f64, topic_adjustment:f64`,
    /// all little-endian.
    pub fn to_bytes(&self) -> [u8; PERSISTED_STATE_LEN] {
        let mut out = [0u8; PERSISTED_STATE_LEN];
        let mut at = 0;
        let mut put = |bytes: &[u8]| {
            out[at..at + bytes.len()].copy_from_slice(bytes);
            at += bytes.len();
        };

        put(&self.version.to_le_bytes());
        put(&self.mode.to_le_bytes());
        put(&self.consecutive_correct.to_le_bytes());
        put(&self.due_unix.to_le_bytes());
        put(&self.last_review_unix.to_le_bytes());
        put(&self.ease_factor.to_le_bytes());
        put(&self.interval_days.to_le_bytes());
        put(&self.cram_interval_minutes.to_le_bytes());
        put(&self.cram_bleed_minutes.to_le_bytes());
        put(&self.topic_adjustment.to_le_bytes());
        out
    }

    /// Decodes a record written by [`to_bytes`](Self::to_bytes).
    /// Returns `None` if the buffer is too short.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < PERSISTED_STATE_LEN {
            return None;
        }

        let mut at = 0;
        let version = u32::from_le_bytes(read_chunk(bytes, &mut at)?);
        let mode = u32::from_le_bytes(read_chunk(bytes, &mut at)?);
        let consecutive_correct = u32::from_le_bytes(read_chunk(bytes, &mut at)?);
        let due_unix = i64::from_le_bytes(read_chunk(bytes, &mut at)?);
        let last_review_unix = i64::from_le_bytes(read_chunk(bytes, &mut at)?);
        let ease_factor = f64::from_le_bytes(read_chunk(bytes, &mut at)?);
        let interval_days = f64::from_le_bytes(read_chunk(bytes, &mut at)?);
        let cram_interval_minutes = f64::from_le_bytes(read_chunk(bytes, &mut at)?);
        let cram_bleed_minutes = f64::from_le_bytes(read_chunk(bytes, &mut at)?);
        let topic_adjustment = f64::from_le_bytes(read_chunk(bytes, &mut at)?);

        Some(Self {
            version,
            mode,
            consecutive_correct,
            due_unix,
            last_review_unix,
            ease_factor,
            interval_days,
            cram_interval_minutes,
            cram_bleed_minutes,
            topic_adjustment,
        })
    }
}

fn read_chunk<const N: usize>(bytes: &[u8], at: &mut usize) -> Option<[u8; N]> {
    let chunk: [u8; N] = bytes.get(*at..*at + N)?.try_into().ok()?;
    *at += N;
    Some(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::default_config;

    fn reviewed_state() -> CardScheduleState {
        CardScheduleState {
            version: CURRENT_SCHEMA_VERSION,
            mode: ScheduleMode::Cram,
            ease_factor: 2.15,
            interval_days: 12.5,
            cram_interval_minutes: 40.0,
            cram_bleed_minutes: 17.5,
            topic_adjustment: 1.25,
            consecutive_correct: 3,
            due_unix: 1_700_003_600,
            last_review_unix: 1_700_000_000,
        }
    }

    #[test]
    fn test_init_state() {
        let config = default_config();
        let state = init_state(&config);
        assert_eq!(state.mode, ScheduleMode::Mastery);
        assert_eq!(state.ease_factor, 2.5);
        assert_eq!(state.interval_days, 1.0);
        assert_eq!(state.cram_interval_minutes, 5.0);
        assert_eq!(state.cram_bleed_minutes, 0.0);
        assert_eq!(state.topic_adjustment, 1.0);
        assert_eq!(state.consecutive_correct, 0);
        assert_eq!(state.due_unix, 0);
        assert_eq!(state.last_review_unix, 0);
    }

    #[test]
    fn test_pack_unpack_preserves_valid_state() {
        let config = default_config();
        let state = reviewed_state();
        assert_eq!(unpack(&pack(&state), &config), state);
    }

    #[test]
    fn test_unpack_zero_ease_uses_default() {
        let config = default_config();
        let mut persisted = pack(&reviewed_state());
        persisted.ease_factor = 0.0;
        assert_eq!(unpack(&persisted, &config).ease_factor, config.ease_default);
    }

    #[test]
    fn test_unpack_unknown_mode_is_mastery() {
        let config = default_config();
        let mut persisted = pack(&reviewed_state());
        persisted.mode = 7;
        assert_eq!(unpack(&persisted, &config).mode, ScheduleMode::Mastery);
    }

    #[test]
    fn test_unpack_negative_intervals_use_defaults() {
        let config = default_config();
        let mut persisted = pack(&reviewed_state());
        persisted.interval_days = -3.0;
        persisted.cram_interval_minutes = 0.0;

        let state = unpack(&persisted, &config);
        assert_eq!(state.interval_days, config.starting_interval_days);
        assert_eq!(state.cram_interval_minutes, config.cram_initial_minutes);
    }

    #[test]
    fn test_wire_layout_field_offsets() {
        let persisted = pack(&reviewed_state());
        let bytes = persisted.to_bytes();

        assert_eq!(bytes.len(), 68);
        assert_eq!(&bytes[0..4], &CURRENT_SCHEMA_VERSION.to_le_bytes());
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3u32.to_le_bytes());
        assert_eq!(&bytes[12..20], &1_700_003_600i64.to_le_bytes());
        assert_eq!(&bytes[28..36], &2.15f64.to_le_bytes());
        assert_eq!(&bytes[60..68], &1.25f64.to_le_bytes());

        assert_eq!(PersistedScheduleState::from_bytes(&bytes), Some(persisted));
    }

    #[test]
    fn test_from_bytes_rejects_short_buffer() {
        let bytes = pack(&reviewed_state()).to_bytes();
        assert!(PersistedScheduleState::from_bytes(&bytes[..40]).is_none());
    }
}
