//! Tunable scheduling constants.
//!
//! One `SchedulerConfig` is created per session manager and never changes
//! afterwards. Values loaded from disk may be partial or malformed, so the
//! scheduler always works on a [`SchedulerConfig::sanitized`] copy.
use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: f64 = 24.0 * 60.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub starting_interval_days: f64,
    pub min_interval_minutes: f64,
    pub max_interval_days: f64,

    pub ease_default: f64,
    pub ease_min: f64,
    pub ease_max: f64,
    pub ease_step_easy: f64,
    pub ease_step_hard: f64,
    pub ease_step_fail: f64,
    pub easy_bonus: f64,
    pub hard_factor: f64,
    pub lapse_reset_days: f64,

    pub cram_initial_minutes: f64,
    pub cram_growth_multiplier: f64,
    pub cram_hard_penalty: f64,
    pub cram_bleed_ratio: f64,

    pub exam_override_window_days: f64,
    pub exam_override_multiplier: f64,

    pub topic_modifier_floor: f64,
    pub topic_modifier_ceiling: f64,
}

/// Factory for the stock configuration.
pub fn default_config() -> SchedulerConfig {
    SchedulerConfig {
        starting_interval_days: 1.0,
        min_interval_minutes: 10.0,
        max_interval_days: 365.0,
        ease_default: 2.5,
        ease_min: 1.3,
        ease_max: 3.0,
        ease_step_easy: 0.15,
        ease_step_hard: 0.15,
        ease_step_fail: 0.35,
        easy_bonus: 1.5,
        hard_factor: 0.5,
        lapse_reset_days: 0.7,
        cram_initial_minutes: 5.0,
        cram_growth_multiplier: 2.0,
        cram_hard_penalty: 0.5,
        cram_bleed_ratio: 0.25,
        exam_override_window_days: 7.0,
        exam_override_multiplier: 0.35,
        topic_modifier_floor: 0.5,
        topic_modifier_ceiling: 2.0,
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        default_config()
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

fn ratio_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        value
    } else {
        fallback
    }
}

impl SchedulerConfig {
    /// Returns a copy where every non-positive, non-finite or inverted
    /// field is replaced by the stock value.
    pub fn sanitized(&self) -> SchedulerConfig {
        let d = default_config();

        let mut ease_min = positive_or(self.ease_min, d.ease_min);
        let mut ease_max = positive_or(self.ease_max, d.ease_max);
        if ease_min > ease_max {
            ease_min = d.ease_min;
            ease_max = d.ease_max;
        }

        let mut floor = positive_or(self.topic_modifier_floor, d.topic_modifier_floor);
        let mut ceiling = positive_or(self.topic_modifier_ceiling, d.topic_modifier_ceiling);
        if floor > ceiling {
            floor = d.topic_modifier_floor;
            ceiling = d.topic_modifier_ceiling;
        }

        let mut min_interval_minutes = positive_or(self.min_interval_minutes, d.min_interval_minutes);
        let mut max_interval_days = positive_or(self.max_interval_days, d.max_interval_days);
        if min_interval_minutes / MINUTES_PER_DAY > max_interval_days {
            min_interval_minutes = d.min_interval_minutes;
            max_interval_days = d.max_interval_days;
        }

        SchedulerConfig {
            starting_interval_days: positive_or(
                self.starting_interval_days,
                d.starting_interval_days,
            ),
            min_interval_minutes,
            max_interval_days,
            ease_default: positive_or(self.ease_default, d.ease_default).clamp(ease_min, ease_max),
            ease_min,
            ease_max,
            ease_step_easy: positive_or(self.ease_step_easy, d.ease_step_easy),
            ease_step_hard: positive_or(self.ease_step_hard, d.ease_step_hard),
            ease_step_fail: positive_or(self.ease_step_fail, d.ease_step_fail),
            easy_bonus: positive_or(self.easy_bonus, d.easy_bonus),
            hard_factor: positive_or(self.hard_factor, d.hard_factor),
            lapse_reset_days: positive_or(self.lapse_reset_days, d.lapse_reset_days),
            cram_initial_minutes: positive_or(self.cram_initial_minutes, d.cram_initial_minutes),
            cram_growth_multiplier: positive_or(
                self.cram_growth_multiplier,
                d.cram_growth_multiplier,
            ),
            cram_hard_penalty: positive_or(self.cram_hard_penalty, d.cram_hard_penalty),
            cram_bleed_ratio: ratio_or(self.cram_bleed_ratio, d.cram_bleed_ratio),
            exam_override_window_days: positive_or(
                self.exam_override_window_days,
                d.exam_override_window_days,
            ),
            exam_override_multiplier: positive_or(
                self.exam_override_multiplier,
                d.exam_override_multiplier,
            ),
            topic_modifier_floor: floor,
            topic_modifier_ceiling: ceiling,
        }
    }

    pub fn min_interval_days(&self) -> f64 {
        self.min_interval_minutes / MINUTES_PER_DAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = default_config();
        assert_eq!(config.starting_interval_days, 1.0);
        assert_eq!(config.min_interval_minutes, 10.0);
        assert_eq!(config.max_interval_days, 365.0);
        assert_eq!(config.ease_default, 2.5);
        assert_eq!(config.ease_min, 1.3);
        assert_eq!(config.ease_max, 3.0);
        assert_eq!(config.cram_initial_minutes, 5.0);
        assert_eq!(config.exam_override_multiplier, 0.35);
        assert_eq!(config.topic_modifier_ceiling, 2.0);
    }

    #[test]
    fn test_sanitized_keeps_valid_config() {
        let config = default_config();
        assert_eq!(config.sanitized(), config);
    }

    #[test]
    fn test_sanitized_replaces_bad_fields() {
        let config = SchedulerConfig {
            ease_min: -1.0,
            max_interval_days: f64::NAN,
            cram_bleed_ratio: 3.0,
            topic_modifier_floor: 4.0,
            topic_modifier_ceiling: 1.0,
            ..default_config()
        };

        let clean = config.sanitized();
        assert_eq!(clean.ease_min, 1.3);
        assert_eq!(clean.max_interval_days, 365.0);
        assert_eq!(clean.cram_bleed_ratio, 0.25);
        assert_eq!(clean.topic_modifier_floor, 0.5);
        assert_eq!(clean.topic_modifier_ceiling, 2.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{ "max_interval_days": 90.0 }"#).unwrap();
        assert_eq!(config.max_interval_days, 90.0);
        assert_eq!(config.ease_default, 2.5);
    }
}
