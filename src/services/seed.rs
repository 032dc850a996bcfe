use crate::error::Result;
use crate::types::Task;

const SEED_TASKS: &str = include_str!("seed.json");

/// Collection written to an empty local storage slot on first read.
pub fn default_tasks() -> Result<Vec<Task>> {
    Ok(serde_json::from_str(SEED_TASKS)?)
}
