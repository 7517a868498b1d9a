//! Review scheduler with mastery and cram paths.
//!
//! Every review goes down one of two paths:
//! - Mastery: ease-based growth of a day-scale interval (SM-2 style), with
//!   lapses resetting the interval and lowering ease
//! - Cram: a short minute-scale interval that doubles on success and resets
//!   on failure, used inside cram sessions or for explicit `Rating::Cram`
//!
//! Both paths scale the interval by a per-topic modifier and, when an exam
//! is close, by the exam-override multiplier. When a card leaves cram mode,
//! part of the cram interval "bleeds" into the next mastery interval so the
//! schedule does not jump.
//!
//! The scheduler is a pure function of its arguments: it takes the state by
//! value and hands back the next one, and the caller decides whether to keep
//! it.

use super::config::{MINUTES_PER_DAY, SchedulerConfig};
use super::review::{Rating, ReviewContext, ReviewResult};
use super::schedule_state::{CURRENT_SCHEMA_VERSION, CardScheduleState, ScheduleMode};
use chrono::Utc;
use log::debug;

const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;
const EXAM_MULTIPLIER_FLOOR: f64 = 0.05;
const EASY_CRAM_BOOST: f64 = 1.5;

/// What a calibration hook gets to look at.
pub struct CalibrationRequest<'a> {
    pub rating: Rating,
    pub state: &'a CardScheduleState,
    pub context: &'a ReviewContext,
    /// The value the scheduler is about to use.
    pub proposed: f64,
}

/// Returns `Some(value)` to replace the proposal, `None` to keep it.
pub type CalibrationFn = Box<dyn Fn(&CalibrationRequest<'_>) -> Option<f64>>;

/// Optional overrides for the topic modifier, ease and mastery interval.
#[derive(Default)]
pub struct CalibrationHooks {
    pub topic: Option<CalibrationFn>,
    pub ease: Option<CalibrationFn>,
    pub interval: Option<CalibrationFn>,
}

fn calibrate(hook: Option<&CalibrationFn>, request: &CalibrationRequest<'_>) -> f64 {
    // Zero, negative and non-finite overrides are meaningless for every
    // calibrated quantity, so they count as "no override".
    hook.and_then(|f| f(request))
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(request.proposed)
}

pub type ReviewCallback = Box<dyn FnMut(&CardScheduleState, &ReviewContext, &ReviewResult)>;

/// Observers notified after a review is computed. They cannot change it.
#[derive(Default)]
pub struct ReviewCallbacks {
    pub session: Option<ReviewCallback>,
    pub analytics: Option<ReviewCallback>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledReview {
    pub state: CardScheduleState,
    pub result: ReviewResult,
}

fn clamp_interval_days(days: f64, config: &SchedulerConfig) -> f64 {
    let min_days = config.min_interval_days();
    if !days.is_finite() || days <= 0.0 {
        return min_days;
    }
    days.min(config.max_interval_days).max(min_days)
}

fn resolve_exam_multiplier(config: &SchedulerConfig, context: &ReviewContext, now: i64) -> Option<f64> {
    let exam = context.exam_date?;
    let days_until_exam = exam.saturating_sub(now) as f64 / SECONDS_PER_DAY;
    if (0.0..=config.exam_override_window_days).contains(&days_until_exam) {
        debug!(
            "Exam override active: {:.2} days until exam",
            days_until_exam
        );
        Some(
            config
                .exam_override_multiplier
                .clamp(EXAM_MULTIPLIER_FLOOR, 1.0),
        )
    } else {
        None
    }
}

/// Computes the next schedule for one card.
///
/// `context.now` defaults to the wall clock. Malformed config values are
/// replaced by defaults. When `callbacks` are given they are notified with
/// the new state, the effective context and the result.
pub fn apply_review(
    config: &SchedulerConfig,
    state: CardScheduleState,
    rating: Rating,
    context: &ReviewContext,
    hooks: Option<&CalibrationHooks>,
    callbacks: Option<&mut ReviewCallbacks>,
) -> ScheduledReview {
    let config = config.sanitized();
    let now = context.now.unwrap_or_else(|| Utc::now().timestamp());
    let context = ReviewContext {
        now: Some(now),
        ..context.clone()
    };
    let previous = state;
    let mut next = previous.clone();

    let request = |proposed: f64| CalibrationRequest {
        rating,
        state: &previous,
        context: &context,
        proposed,
    };
    let topic_hook = hooks.and_then(|h| h.topic.as_ref());
    let ease_hook = hooks.and_then(|h| h.ease.as_ref());
    let interval_hook = hooks.and_then(|h| h.interval.as_ref());

    let used_cram = context.cram_session || rating == Rating::Cram;
    let current_ease = if previous.ease_factor.is_finite() && previous.ease_factor > 0.0 {
        previous.ease_factor
    } else {
        config.ease_default
    };

    let mut topic_modifier = calibrate(
        topic_hook,
        &request(previous.topic_adjustment * context.topic_weight()),
    );
    if !topic_modifier.is_finite() {
        topic_modifier = 1.0;
    }
    topic_modifier =
        topic_modifier.clamp(config.topic_modifier_floor, config.topic_modifier_ceiling);
    next.topic_adjustment = topic_modifier;

    let exam_multiplier = resolve_exam_multiplier(&config, &context, now);
    let scale = topic_modifier * exam_multiplier.unwrap_or(1.0);

    next.consecutive_correct = if rating.is_correct() {
        previous.consecutive_correct.saturating_add(1)
    } else {
        0
    };

    let mut interval_minutes = if used_cram {
        let cram = previous.cram_interval_minutes;
        let base = match rating {
            Rating::Fail => config.cram_initial_minutes,
            Rating::Hard => (cram * config.cram_hard_penalty).max(config.cram_initial_minutes),
            Rating::Good | Rating::Cram => cram * config.cram_growth_multiplier,
            Rating::Easy => cram * config.cram_growth_multiplier * EASY_CRAM_BOOST,
        };
        // The stored cram interval is the unscaled baseline; only the
        // scheduled interval carries the topic/exam modifiers.
        next.cram_interval_minutes = base;

        let scheduled = (base * scale).max(config.min_interval_minutes);
        next.cram_bleed_minutes = 0.5 * previous.cram_bleed_minutes + 0.5 * scheduled;

        next.ease_factor = calibrate(ease_hook, &request(current_ease))
            .clamp(config.ease_min, config.ease_max);
        next.mode = ScheduleMode::Cram;
        scheduled
    } else {
        let mut ease = current_ease;
        let mut interval = previous.interval_days;
        match rating {
            Rating::Fail => {
                ease -= config.ease_step_fail;
                interval = config.lapse_reset_days;
            }
            Rating::Hard => {
                ease -= config.ease_step_hard;
                interval *= config.hard_factor;
            }
            Rating::Good | Rating::Cram => interval *= ease,
            Rating::Easy => {
                ease = (ease + config.ease_step_easy).clamp(config.ease_min, config.ease_max);
                interval *= ease * config.easy_bonus;
            }
        }
        next.ease_factor = ease.clamp(config.ease_min, config.ease_max);

        interval *= scale;

        if previous.cram_bleed_minutes > 0.0 {
            let ratio = config.cram_bleed_ratio;
            let bleed_days = previous.cram_bleed_minutes / MINUTES_PER_DAY;
            interval = interval * (1.0 - ratio) + bleed_days * ratio;

            next.cram_bleed_minutes = previous.cram_bleed_minutes * (1.0 - ratio);
        }

        interval = clamp_interval_days(calibrate(interval_hook, &request(interval)), &config);
        next.interval_days = interval;

        next.cram_interval_minutes += (config.cram_initial_minutes
            - previous.cram_interval_minutes)
            * config.cram_bleed_ratio;
        next.mode = ScheduleMode::Mastery;
        interval * MINUTES_PER_DAY
    };

    interval_minutes = interval_minutes.max(config.min_interval_minutes);
    next.interval_days = clamp_interval_days(next.interval_days, &config);

    let due_offset = (interval_minutes * 60.0).round() as i64;
    next.due_unix = now.saturating_add(due_offset).max(0);
    next.last_review_unix = now;
    next.version = CURRENT_SCHEMA_VERSION;

    let result = ReviewResult {
        reviewed_at: now,
        due_unix: next.due_unix,
        interval_days: interval_minutes / MINUTES_PER_DAY,
        interval_minutes,
        topic_modifier,
        ease_factor: next.ease_factor,
        consecutive_correct: next.consecutive_correct,
        used_cram,
        exam_override: exam_multiplier.is_some(),
        mode: next.mode,
    };

    if let Some(callbacks) = callbacks {
        if let Some(notify) = callbacks.session.as_mut() {
            notify(&next, &context, &result);
        }
        if let Some(notify) = callbacks.analytics.as_mut() {
            notify(&next, &context, &result);
        }
    }

    ScheduledReview {
        state: next,
        result,
    }
}

/// Interval in days each of fail/hard/good/easy would produce.
/// Used to label rating buttons before the learner answers.
pub fn preview_intervals(
    config: &SchedulerConfig,
    state: &CardScheduleState,
    context: &ReviewContext,
    hooks: Option<&CalibrationHooks>,
) -> [f64; 4] {
    let context = ReviewContext {
        now: Some(context.now.unwrap_or_else(|| Utc::now().timestamp())),
        ..context.clone()
    };
    [Rating::Fail, Rating::Hard, Rating::Good, Rating::Easy].map(|rating| {
        apply_review(config, state.clone(), rating, &context, hooks, None)
            .result
            .interval_days
    })
}
