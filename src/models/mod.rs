pub mod config;
pub mod review;
pub mod schedule_state;
pub mod scheduler;
pub mod session_card;
pub mod study_session;

pub use config::{SchedulerConfig, default_config};
pub use review::{Rating, ReviewContext, ReviewResult, TopicContext};
pub use schedule_state::{
    CardScheduleState, PersistedScheduleState, ScheduleMode, init_state, pack, unpack,
};
pub use scheduler::{
    CalibrationHooks, CalibrationRequest, ReviewCallbacks, ScheduledReview, apply_review,
    preview_intervals,
};
pub use session_card::{CardSpec, InitialState, SessionCard};
pub use study_session::{
    ReviewEvent, SessionMode, SessionObservers, SessionOrchestrator, SessionPhase, TraceMode,
};
