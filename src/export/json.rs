//! JSON import/export for scheduler configuration and review traces.
//! Config files may be partial; missing fields take the stock defaults.

use crate::models::{ReviewEvent, SchedulerConfig};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type JsonResult<T> = Result<T, JsonError>;

fn read_to_string(path: &Path) -> JsonResult<String> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Loads a scheduler config from a JSON file.
pub fn load_config_from_path(path: impl AsRef<Path>) -> JsonResult<SchedulerConfig> {
    let contents = read_to_string(path.as_ref())?;
    let config: SchedulerConfig = serde_json::from_str(&contents)?;
    log::info!("Loaded scheduler config from '{}'", path.as_ref().display());
    Ok(config)
}

/// Writes a list of review events (typically a session trace) as pretty JSON.
pub fn export_trace_to_path(events: &[ReviewEvent], path: impl AsRef<Path>) -> JsonResult<()> {
    let json_string = serde_json::to_string_pretty(events)?;
    let mut file = File::create(path.as_ref())?;
    file.write_all(json_string.as_bytes())?;
    Ok(())
}

pub fn import_trace(path: impl AsRef<Path>) -> JsonResult<Vec<ReviewEvent>> {
    let contents = read_to_string(path.as_ref())?;
    let events: Vec<ReviewEvent> = serde_json::from_str(&contents)?;
    Ok(events)
}
