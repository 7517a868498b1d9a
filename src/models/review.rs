//! Inputs and outputs of a single scheduling decision.
use super::schedule_state::ScheduleMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Learner feedback on one review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rating {
    Fail,
    Hard,
    Good,
    Easy,
    /// Good answer given while cramming; always takes the cram path.
    Cram,
}

impl Rating {
    pub const ALL: [Rating; 5] = [
        Rating::Fail,
        Rating::Hard,
        Rating::Good,
        Rating::Easy,
        Rating::Cram,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Fail => "fail",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
            Rating::Cram => "cram",
        }
    }

    pub fn is_correct(self) -> bool {
        matches!(self, Rating::Good | Rating::Easy | Rating::Cram)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = String;

    /// Accepts the rating names, `again` as an alias for `fail`,
    /// or the digits 0-4 in `Rating::ALL` order.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" | "again" | "0" => Ok(Rating::Fail),
            "hard" | "1" => Ok(Rating::Hard),
            "good" | "2" => Ok(Rating::Good),
            "easy" | "3" => Ok(Rating::Easy),
            "cram" | "4" => Ok(Rating::Cram),
            other => Err(format!("unknown rating '{}'", other)),
        }
    }
}

/// Subject area a card belongs to and how strongly to bias it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicContext {
    pub id: String,
    pub weight: f64,
}

impl TopicContext {
    pub fn new(id: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            weight,
        }
    }

    /// Weight used for scheduling; non-positive weights count as 1.0.
    pub fn effective_weight(&self) -> f64 {
        if self.weight.is_finite() && self.weight > 0.0 {
            self.weight
        } else {
            1.0
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewContext {
    /// Unix seconds; the wall clock is used when unset.
    pub now: Option<i64>,
    pub exam_date: Option<i64>,
    pub cram_session: bool,
    pub topic: Option<TopicContext>,
}

impl ReviewContext {
    pub fn at(now: i64) -> Self {
        Self {
            now: Some(now),
            ..Default::default()
        }
    }

    pub fn topic_weight(&self) -> f64 {
        self.topic
            .as_ref()
            .map(TopicContext::effective_weight)
            .unwrap_or(1.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    pub reviewed_at: i64,
    pub due_unix: i64,
    pub interval_days: f64,
    pub interval_minutes: f64,
    pub topic_modifier: f64,
    pub ease_factor: f64,
    pub consecutive_correct: u32,
    pub used_cram: bool,
    pub exam_override: bool,
    pub mode: ScheduleMode,
}

impl ReviewResult {
    pub fn due_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.due_unix, 0)
    }
}
