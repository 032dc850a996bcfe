use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{BackendKind, Config};
use crate::error::{Result, TaskError};
use crate::types::{NewTask, Task, TaskPatch};

pub mod local;
pub mod remote;
pub mod seed;

#[cfg(test)]
mod tests;

pub use local::{FileSlot, Latency, LocalTaskService, MemorySlot, StorageSlot};
pub use remote::{RemoteConfig, RemoteTaskService};

/// One persistence backend for tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskService: Send + Sync {
    /// All tasks, newest first
    async fn get_all(&self) -> Result<Vec<Task>>;

    async fn get_by_id(&self, id: i64) -> Result<Task>;

    /// Create a task; the backend allocates the id
    async fn create(&self, task: NewTask) -> Result<Task>;

    /// Apply a partial update and return the stored task
    async fn update(&self, id: i64, patch: TaskPatch) -> Result<Task>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Next free id: one past the largest existing id, or 1 for an empty collection.
pub fn next_id(tasks: &[Task]) -> i64 {
    tasks.iter().map(|t| t.id).max().map_or(1, |max| max + 1)
}

// Every failure is reported once here before it travels back to the caller.
pub(crate) fn logged<T>(context: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        tracing::error!("Error {}: {}", context, e);
    }
    result
}

/// Uniform task API over whichever backend was injected.
#[derive(Clone)]
pub struct TaskRepository {
    service: Arc<dyn TaskService>,
}

impl TaskRepository {
    pub fn new<S: TaskService + 'static>(service: S) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    pub fn from_service(service: Arc<dyn TaskService>) -> Self {
        Self { service }
    }

    /// Builds the backend named by the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.backend {
            BackendKind::Remote => {
                let remote = config.remote.clone().ok_or_else(|| {
                    TaskError::Config("remote backend selected without record store settings".to_string())
                })?;
                tracing::info!("Using remote record store at {}", remote.base_url);
                Ok(Self::new(RemoteTaskService::new(remote)?))
            }
            BackendKind::Local => {
                tracing::info!("Using local task storage at {}", config.storage_path.display());
                let service = LocalTaskService::new(FileSlot::new(&config.storage_path))
                    .with_latency(config.latency);
                Ok(Self::new(service))
            }
        }
    }

    pub async fn get_all(&self) -> Result<Vec<Task>> {
        self.service.get_all().await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Task> {
        self.service.get_by_id(id).await
    }

    pub async fn create(&self, task: NewTask) -> Result<Task> {
        self.service.create(task).await
    }

    pub async fn update(&self, id: i64, patch: TaskPatch) -> Result<Task> {
        self.service.update(id, patch).await
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        self.service.delete(id).await
    }
}
