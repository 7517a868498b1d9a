//! Study session management for spaced repetition practice.
//! Holds the queue of due cards, grades them one at a time through the
//! scheduler and hands every outcome to the registered observers.

use super::config::SchedulerConfig;
use super::review::{Rating, ReviewContext, ReviewResult, TopicContext};
use super::schedule_state::{CardScheduleState, PersistedScheduleState, pack};
use super::scheduler::{CalibrationHooks, apply_review};
use super::session_card::{CardSpec, SessionCard};
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionMode {
    Mastery,
    Cram,
    /// Queue order is kept as given and the cram flag is left to the cards.
    Custom,
    /// Outcomes are computed and broadcast but never committed.
    ExamSimulation,
}

impl SessionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Mastery => "mastery",
            SessionMode::Cram => "cram",
            SessionMode::Custom => "custom",
            SessionMode::ExamSimulation => "examSimulation",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    NotStarted,
    Active,
    Exhausted,
}

/// Whether graded events are kept in memory and shown to the devtools observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceMode {
    Disabled,
    Enabled,
}

impl Default for TraceMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            TraceMode::Enabled
        } else {
            TraceMode::Disabled
        }
    }
}

/// One grading outcome as seen by observers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub card_id: i64,
    pub rating: Rating,
    pub mode: SessionMode,
    pub simulated: bool,
    /// Queue index of the graded card.
    pub position: usize,
    /// Cards still waiting after this one.
    pub remaining: usize,
    pub state: CardScheduleState,
    pub context: ReviewContext,
    pub result: ReviewResult,
}

/// Durably stores the packed state; `false` rejects the review.
pub type AutosaveFn = Box<dyn FnMut(&ReviewEvent, &PersistedScheduleState) -> bool>;
pub type EventObserver = Box<dyn FnMut(&ReviewEvent)>;

#[derive(Default)]
pub struct SessionObservers {
    pub autosave: Option<AutosaveFn>,
    pub session: Option<EventObserver>,
    pub analytics: Option<EventObserver>,
    pub devtools: Option<EventObserver>,
}

/// Owns one session's queue and drives the scheduler over it.
/// Single-threaded; callers serialize access themselves.
pub struct SessionOrchestrator<T = ()> {
    config: SchedulerConfig,
    hooks: CalibrationHooks,
    observers: SessionObservers,
    trace_mode: TraceMode,
    trace: Vec<ReviewEvent>,
    mode: SessionMode,
    phase: SessionPhase,
    queue: Vec<SessionCard<T>>,
    index: usize,
}

/// Builds the context a review actually runs with.
///
/// Card context first, then every set field of `overrides`; a topic
/// override missing its id or weight borrows them from the card. The
/// session mode has the last word on `cram_session`.
fn compose_context<T>(
    mode: SessionMode,
    card: &SessionCard<T>,
    overrides: Option<&ReviewContext>,
) -> ReviewContext {
    let mut context = card.context.clone().unwrap_or_default();
    context.topic = card.effective_topic().cloned();

    if let Some(overrides) = overrides {
        if overrides.now.is_some() {
            context.now = overrides.now;
        }
        if overrides.exam_date.is_some() {
            context.exam_date = overrides.exam_date;
        }
        if overrides.cram_session {
            context.cram_session = true;
        }
        if let Some(topic) = &overrides.topic {
            let fallback = context.topic.take();
            let id = if topic.id.is_empty() {
                fallback.as_ref().map(|t| t.id.clone()).unwrap_or_default()
            } else {
                topic.id.clone()
            };
            let weight = if topic.weight > 0.0 {
                topic.weight
            } else {
                fallback.map(|t| t.weight).unwrap_or(1.0)
            };
            context.topic = Some(TopicContext { id, weight });
        }
    }

    match mode {
        SessionMode::Mastery | SessionMode::ExamSimulation => context.cram_session = false,
        SessionMode::Cram => context.cram_session = true,
        SessionMode::Custom => {}
    }

    if context.now.is_none() {
        context.now = Some(Utc::now().timestamp());
    }
    context
}

impl<T> SessionOrchestrator<T> {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            hooks: CalibrationHooks::default(),
            observers: SessionObservers::default(),
            trace_mode: TraceMode::default(),
            trace: Vec::new(),
            mode: SessionMode::Mastery,
            phase: SessionPhase::NotStarted,
            queue: Vec::new(),
            index: 0,
        }
    }

    pub fn with_hooks(mut self, hooks: CalibrationHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_observers(mut self, observers: SessionObservers) -> Self {
        self.observers = observers;
        self
    }

    pub fn with_trace(mut self, trace_mode: TraceMode) -> Self {
        self.trace_mode = trace_mode;
        self
    }

    /// Starts a new session, dropping whatever was queued before.
    ///
    /// Outside `Custom` mode the queue is ordered by due time, never-reviewed
    /// cards first, ties by card id. Returns `false` if the queue cannot be
    /// allocated, leaving the orchestrator `NotStarted`.
    pub fn begin(&mut self, mode: SessionMode, specs: Vec<CardSpec<T>>) -> bool {
        self.reset();

        let mut queue: Vec<SessionCard<T>> = Vec::new();
        if queue.try_reserve_exact(specs.len()).is_err() {
            return false;
        }
        queue.extend(
            specs
                .into_iter()
                .map(|spec| SessionCard::from_spec(spec, &self.config)),
        );

        if mode != SessionMode::Custom {
            queue.sort_by_key(|card| (card.state.due_unix != 0, card.state.due_unix, card.card_id));
        }

        info!("Starting {:?} session with {} cards", mode, queue.len());
        self.phase = if queue.is_empty() {
            SessionPhase::Exhausted
        } else {
            SessionPhase::Active
        };
        self.mode = mode;
        self.queue = queue;
        self.index = 0;
        true
    }

    pub fn current(&self) -> Option<&SessionCard<T>> {
        match self.phase {
            SessionPhase::Active => self.queue.get(self.index),
            _ => None,
        }
    }

    pub fn remaining(&self) -> usize {
        match self.phase {
            SessionPhase::NotStarted => 0,
            _ => self.queue.len().saturating_sub(self.index),
        }
    }

    /// Grades the current card.
    ///
    /// Returns `None` when no card is waiting or when the autosave observer
    /// rejects the new state. A rejected review leaves the card and the queue
    /// exactly as they were, so the caller may retry.
    pub fn grade(
        &mut self,
        rating: Rating,
        overrides: Option<&ReviewContext>,
    ) -> Option<ReviewResult> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        let position = self.index;
        let card = self.queue.get(position)?;

        let context = compose_context(self.mode, card, overrides);
        let simulated = self.mode == SessionMode::ExamSimulation;
        let scheduled = apply_review(
            &self.config,
            card.state.clone(),
            rating,
            &context,
            Some(&self.hooks),
            None,
        );

        let event = ReviewEvent {
            card_id: card.card_id,
            rating,
            mode: self.mode,
            simulated,
            position,
            remaining: self.queue.len() - position - 1,
            state: scheduled.state,
            context,
            result: scheduled.result,
        };

        if !simulated {
            if let Some(autosave) = self.observers.autosave.as_mut() {
                let persisted = pack(&event.state);
                if !autosave(&event, &persisted) {
                    warn!(
                        "Autosave rejected review of card {}; keeping previous state",
                        event.card_id
                    );
                    return None;
                }
            }
            if let Some(card) = self.queue.get_mut(position) {
                card.state = event.state.clone();
            }
        }

        debug!(
            "Graded card {} as {}: interval {:.3} days, due {}",
            event.card_id, rating, event.result.interval_days, event.result.due_unix
        );
        self.notify(&event);

        self.index += 1;
        if self.index >= self.queue.len() {
            info!("Session exhausted after {} cards", self.queue.len());
            self.phase = SessionPhase::Exhausted;
        }
        Some(event.result)
    }

    /// What grading the current card with `rating` would produce,
    /// without committing or notifying anyone.
    pub fn preview(&self, rating: Rating, overrides: Option<&ReviewContext>) -> Option<ReviewResult> {
        let card = self.current()?;
        let context = compose_context(self.mode, card, overrides);
        let scheduled = apply_review(
            &self.config,
            card.state.clone(),
            rating,
            &context,
            Some(&self.hooks),
            None,
        );
        Some(scheduled.result)
    }

    fn notify(&mut self, event: &ReviewEvent) {
        if let Some(observer) = self.observers.session.as_mut() {
            observer(event);
        }
        if let Some(observer) = self.observers.analytics.as_mut() {
            observer(event);
        }
        if self.trace_mode == TraceMode::Enabled {
            self.trace.push(event.clone());
            if let Some(observer) = self.observers.devtools.as_mut() {
                observer(event);
            }
        }
    }

    fn reset(&mut self) {
        self.queue = Vec::new();
        self.index = 0;
        self.phase = SessionPhase::NotStarted;
    }

    /// Drops the queue. Safe to call at any time.
    pub fn end(&mut self) {
        if self.phase != SessionPhase::NotStarted {
            info!("Ending session with {} cards left", self.remaining());
        }
        self.reset();
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn cards(&self) -> &[SessionCard<T>] {
        &self.queue
    }

    pub fn trace(&self) -> &[ReviewEvent] {
        &self.trace
    }

    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }
}
