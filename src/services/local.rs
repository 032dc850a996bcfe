use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tokio::sync::Mutex;

use super::{logged, next_id, seed, TaskService};
use crate::error::{Result, TaskError};
use crate::types::{NewTask, Task, TaskPatch};

/// Default file backing the local task slot.
pub const DEFAULT_STORAGE_FILE: &str = "deskflow_tasks.json";

/// A single named place holding the serialized task collection.
#[async_trait]
pub trait StorageSlot: Send + Sync {
    /// `None` when nothing has been stored yet
    async fn read(&self) -> Result<Option<String>>;
    async fn write(&self, contents: String) -> Result<()>;
}

/// Slot persisted as a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StorageSlot for FileSlot {
    async fn read(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, contents: String) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        // readers only ever see a complete file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Slot kept in process memory.
#[derive(Debug, Default)]
pub struct MemorySlot {
    contents: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
        }
    }

    pub async fn contents(&self) -> Option<String> {
        self.contents.lock().await.clone()
    }
}

#[async_trait]
impl StorageSlot for MemorySlot {
    async fn read(&self) -> Result<Option<String>> {
        Ok(self.contents.lock().await.clone())
    }

    async fn write(&self, contents: String) -> Result<()> {
        *self.contents.lock().await = Some(contents);
        Ok(())
    }
}

/// Artificial per-operation delay, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for Latency {
    fn default() -> Self {
        Self {
            min_ms: 150,
            max_ms: 300,
        }
    }
}

impl Latency {
    pub fn none() -> Self {
        Self { min_ms: 0, max_ms: 0 }
    }

    pub fn fixed(ms: u64) -> Self {
        Self { min_ms: ms, max_ms: ms }
    }

    pub fn range(min_ms: u64, max_ms: u64) -> Result<Self> {
        if min_ms > max_ms {
            return Err(TaskError::Config(format!(
                "latency minimum {}ms exceeds maximum {}ms",
                min_ms, max_ms
            )));
        }
        Ok(Self { min_ms, max_ms })
    }

    pub fn is_none(&self) -> bool {
        self.max_ms == 0
    }

    fn pick_ms(&self) -> u64 {
        if self.min_ms >= self.max_ms {
            self.min_ms
        } else {
            rand::thread_rng().gen_range(self.min_ms..=self.max_ms)
        }
    }

    async fn wait(&self) {
        if self.is_none() {
            return;
        }
        let ms = self.pick_ms();
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Task backend over a single storage slot, seeded on first use.
pub struct LocalTaskService {
    slot: Box<dyn StorageSlot>,
    seed: Option<Vec<Task>>,
    latency: Latency,
    // highest id handed out so far; held across every read-modify-write of the slot
    issued: Mutex<i64>,
}

impl LocalTaskService {
    pub fn new<S: StorageSlot + 'static>(slot: S) -> Self {
        Self {
            slot: Box::new(slot),
            seed: None,
            latency: Latency::default(),
            issued: Mutex::new(0),
        }
    }

    /// Replaces the bundled seed collection.
    pub fn with_seed(mut self, seed: Vec<Task>) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    async fn load(&self) -> Result<Vec<Task>> {
        match self.slot.read().await? {
            Some(contents) if !contents.trim().is_empty() => Ok(serde_json::from_str(&contents)?),
            _ => {
                let tasks = match &self.seed {
                    Some(seed) => seed.clone(),
                    None => seed::default_tasks()?,
                };
                tracing::info!("Seeding empty task storage with {} tasks", tasks.len());
                self.persist(&tasks).await?;
                Ok(tasks)
            }
        }
    }

    async fn persist(&self, tasks: &[Task]) -> Result<()> {
        let contents = serde_json::to_string_pretty(tasks)?;
        self.slot.write(contents).await
    }

    async fn all_sorted(&self) -> Result<Vec<Task>> {
        let _guard = self.issued.lock().await;
        let mut tasks = self.load().await?;
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn find(&self, id: i64) -> Result<Task> {
        let _guard = self.issued.lock().await;
        self.load()
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(TaskError::NotFound(id))
    }

    async fn insert(&self, task: NewTask) -> Result<Task> {
        let task = task.validated()?;
        let mut issued = self.issued.lock().await;
        let mut tasks = self.load().await?;

        let id = next_id(&tasks).max(*issued + 1);
        let created = Task {
            id,
            title: task.title,
            priority: task.priority.unwrap_or_default(),
            category: task.category.unwrap_or_default(),
            due_date: task.due_date,
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
            tags: task.tags,
        };
        tasks.insert(0, created.clone());
        self.persist(&tasks).await?;
        *issued = id;
        Ok(created)
    }

    async fn merge(&self, id: i64, patch: TaskPatch) -> Result<Task> {
        let patch = patch.validated()?;
        let _guard = self.issued.lock().await;
        let mut tasks = self.load().await?;

        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TaskError::NotFound(id))?;
        let patch = patch.with_completion_pairing(Some(&*task), Utc::now())?;
        if patch.is_empty() {
            return Ok(task.clone());
        }
        task.apply(&patch);
        let updated = task.clone();
        self.persist(&tasks).await?;
        Ok(updated)
    }

    async fn remove(&self, id: i64) -> Result<bool> {
        let _guard = self.issued.lock().await;
        let mut tasks = self.load().await?;

        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(TaskError::NotFound(id));
        }
        self.persist(&tasks).await?;
        Ok(true)
    }
}

#[async_trait]
impl TaskService for LocalTaskService {
    async fn get_all(&self) -> Result<Vec<Task>> {
        self.latency.wait().await;
        logged("fetching tasks", self.all_sorted().await)
    }

    async fn get_by_id(&self, id: i64) -> Result<Task> {
        self.latency.wait().await;
        logged(&format!("fetching task with ID {}", id), self.find(id).await)
    }

    async fn create(&self, task: NewTask) -> Result<Task> {
        self.latency.wait().await;
        let created = logged("creating task", self.insert(task).await)?;
        tracing::info!("Created task {}: {}", created.id, created.title);
        Ok(created)
    }

    async fn update(&self, id: i64, patch: TaskPatch) -> Result<Task> {
        self.latency.wait().await;
        tracing::debug!("Updating task {} with {:?}", id, patch);
        let updated = logged("updating task", self.merge(id, patch).await)?;
        tracing::info!("Updated task {}", id);
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        self.latency.wait().await;
        let deleted = logged("deleting task", self.remove(id).await)?;
        tracing::info!("Deleted task {}", id);
        Ok(deleted)
    }
}
