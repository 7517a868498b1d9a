pub mod database;
pub mod export;
pub mod models;

pub use models::{
    CardScheduleState, CardSpec, Rating, ReviewContext, ReviewEvent, ReviewResult,
    SchedulerConfig, SessionMode, SessionOrchestrator, apply_review, default_config,
};
