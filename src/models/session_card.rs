//! Cards queued for review during a study session.
use super::config::SchedulerConfig;
use super::review::{ReviewContext, TopicContext};
use super::schedule_state::{
    CardScheduleState, PersistedScheduleState, init_state, unpack,
};

/// Where a queued card's schedule comes from.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum InitialState {
    /// Never scheduled; starts from `init_state`.
    #[default]
    Fresh,
    Existing(CardScheduleState),
    Persisted(PersistedScheduleState),
}

/// One row handed over by the card-selection layer.
#[derive(Clone, Debug)]
pub struct CardSpec<T = ()> {
    pub card_id: i64,
    pub user_data: T,
    pub topic: Option<TopicContext>,
    pub initial: InitialState,
    /// Per-card context that takes precedence over `topic`.
    pub context: Option<ReviewContext>,
}

impl<T: Default> CardSpec<T> {
    pub fn new(card_id: i64) -> Self {
        Self {
            card_id,
            user_data: T::default(),
            topic: None,
            initial: InitialState::Fresh,
            context: None,
        }
    }
}

impl<T> CardSpec<T> {
    pub fn with_state(mut self, state: CardScheduleState) -> Self {
        self.initial = InitialState::Existing(state);
        self
    }

    pub fn with_persisted(mut self, persisted: PersistedScheduleState) -> Self {
        self.initial = InitialState::Persisted(persisted);
        self
    }

    pub fn with_topic(mut self, topic: TopicContext) -> Self {
        self.topic = Some(topic);
        self
    }

    pub fn with_context(mut self, context: ReviewContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Runtime wrapper for a card while it sits in a session queue.
#[derive(Clone, Debug)]
pub struct SessionCard<T = ()> {
    pub card_id: i64,
    pub user_data: T,
    pub topic: Option<TopicContext>,
    pub state: CardScheduleState,
    pub context: Option<ReviewContext>,
}

impl<T> SessionCard<T> {
    pub fn from_spec(spec: CardSpec<T>, config: &SchedulerConfig) -> Self {
        let state = match spec.initial {
            InitialState::Fresh => init_state(config),
            InitialState::Existing(state) => state,
            InitialState::Persisted(persisted) => unpack(&persisted, config),
        };

        // Per-card override wins, then the card's own topic.
        let context = spec.context.map(|mut context| {
            if context.topic.is_none() {
                context.topic = spec.topic.clone();
            }
            context
        });

        Self {
            card_id: spec.card_id,
            user_data: spec.user_data,
            topic: spec.topic,
            state,
            context,
        }
    }

    /// Topic the card schedules under: the per-card override's, else its own.
    pub fn effective_topic(&self) -> Option<&TopicContext> {
        self.context
            .as_ref()
            .and_then(|context| context.topic.as_ref())
            .or(self.topic.as_ref())
    }
}
