//! In-memory task board: the loaded collection plus the current filter.
//!
//! Mutations go through the repository first and only then patch the single
//! affected task locally, so the board never drifts from what the backend
//! accepted.

use chrono::Utc;

use crate::error::{Result, TaskError};
use crate::services::{logged, TaskRepository};
use crate::types::{
    derive_view, Category, FilterSelection, FilterValue, NewTask, Priority, StatusFilter, Task,
    TaskPatch, TaskView,
};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load tasks. Please try again.";

pub struct TaskBoard {
    repository: TaskRepository,
    tasks: Vec<Task>,
    filter: FilterSelection,
    load_error: Option<String>,
}

impl TaskBoard {
    pub fn new(repository: TaskRepository) -> Self {
        Self {
            repository,
            tasks: Vec::new(),
            filter: FilterSelection::default(),
            load_error: None,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filter(&self) -> FilterSelection {
        self.filter
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Replaces the collection with a fresh fetch.
    pub async fn load(&mut self) -> Result<()> {
        self.load_error = None;
        match self.repository.get_all().await {
            Ok(tasks) => {
                self.tasks = tasks;
                Ok(())
            }
            Err(e) => {
                self.load_error = Some(LOAD_FAILED_MESSAGE.to_string());
                Err(e)
            }
        }
    }

    pub async fn add(&mut self, task: NewTask) -> Result<Task> {
        let created = self.repository.create(task).await?;
        self.tasks.insert(0, created.clone());
        Ok(created)
    }

    /// Flips completion of a loaded task, stamping or clearing `completedAt`.
    pub async fn toggle(&mut self, id: i64) -> Result<Task> {
        let current = self
            .tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or(TaskError::NotFound(id));
        let current = logged("toggling task", current)?;

        let patch = TaskPatch::toggle_completion(current, Utc::now());
        let updated = self.repository.update(id, patch).await?;
        self.replace(updated.clone());
        Ok(updated)
    }

    pub async fn edit(&mut self, id: i64, patch: TaskPatch) -> Result<Task> {
        let updated = self.repository.update(id, patch).await?;
        self.replace(updated.clone());
        Ok(updated)
    }

    pub async fn remove(&mut self, id: i64) -> Result<bool> {
        let deleted = self.repository.delete(id).await?;
        if deleted {
            self.tasks.retain(|t| t.id != id);
        } else {
            tracing::warn!("Backend did not confirm deletion of task {}", id);
        }
        Ok(deleted)
    }

    fn replace(&mut self, task: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
        }
    }

    pub fn set_filter(&mut self, filter: FilterSelection) {
        self.filter = filter;
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.filter.status = status;
    }

    pub fn set_priority(&mut self, priority: FilterValue<Priority>) {
        self.filter.priority = priority;
    }

    pub fn set_category(&mut self, category: FilterValue<Category>) {
        self.filter.category = category;
    }

    pub fn view(&self) -> TaskView {
        derive_view(&self.tasks, &self.filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockTaskService;
    use chrono::TimeZone;

    fn task(id: i64, completed: bool, priority: Priority) -> Task {
        Task {
            id,
            title: format!("task {}", id),
            priority,
            category: Category::Projects,
            due_date: None,
            completed,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            completed_at: completed.then(|| Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
            tags: vec![],
        }
    }

    fn loaded_board(mut mock: MockTaskService) -> TaskBoard {
        mock.expect_get_all().times(1).returning(|| {
            Ok(vec![
                task(3, false, Priority::High),
                task(2, true, Priority::High),
                task(1, false, Priority::Low),
            ])
        });
        TaskBoard::new(TaskRepository::new(mock))
    }

    #[tokio::test]
    async fn test_load_and_filter() {
        let mut board = loaded_board(MockTaskService::new());
        board.load().await.unwrap();
        assert_eq!(board.tasks().len(), 3);

        board.set_status(StatusFilter::Active);
        board.set_priority(FilterValue::Only(Priority::High));
        let view = board.view();
        assert_eq!(view.visible.len(), 1);
        assert_eq!(view.visible[0].id, 3);
        assert_eq!(view.counts.total, 3);
        assert_eq!(view.counts.completed, 1);
    }

    #[tokio::test]
    async fn test_load_failure_sets_message() {
        let mut mock = MockTaskService::new();
        mock.expect_get_all()
            .times(1)
            .returning(|| Err(TaskError::operation("store offline")));
        let mut board = TaskBoard::new(TaskRepository::new(mock));

        assert!(board.load().await.is_err());
        assert_eq!(board.load_error(), Some(LOAD_FAILED_MESSAGE));
        assert!(board.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_add_prepends() {
        let mut mock = MockTaskService::new();
        mock.expect_create()
            .withf(|t| t.title == "New one")
            .times(1)
            .returning(|_| Ok(task(4, false, Priority::Medium)));
        let mut board = loaded_board(mock);
        board.load().await.unwrap();

        board.add(NewTask::new("New one")).await.unwrap();
        assert_eq!(board.tasks()[0].id, 4);
        assert_eq!(board.tasks().len(), 4);
    }

    #[tokio::test]
    async fn test_toggle_sends_paired_patch() {
        let mut mock = MockTaskService::new();
        mock.expect_update()
            .withf(|id, patch| {
                *id == 3 && patch.completed == Some(true) && matches!(patch.completed_at, Some(Some(_)))
            })
            .times(1)
            .returning(|id, patch| {
                let mut t = task(id, false, Priority::High);
                t.apply(&patch);
                Ok(t)
            });
        mock.expect_update()
            .withf(|id, patch| *id == 2 && patch.completed == Some(false) && patch.completed_at == Some(None))
            .times(1)
            .returning(|id, patch| {
                let mut t = task(id, true, Priority::High);
                t.apply(&patch);
                Ok(t)
            });
        let mut board = loaded_board(mock);
        board.load().await.unwrap();

        let done = board.toggle(3).await.unwrap();
        assert!(done.completed);
        assert!(board.tasks()[0].completed_at.is_some());

        let reopened = board.toggle(2).await.unwrap();
        assert!(!reopened.completed);
        assert!(board.tasks()[1].completed_at.is_none());
    }

    #[tokio::test]
    async fn test_toggle_unknown_task() {
        let mut board = loaded_board(MockTaskService::new());
        board.load().await.unwrap();
        assert!(matches!(board.toggle(50).await, Err(TaskError::NotFound(50))));
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_board_untouched() {
        let mut mock = MockTaskService::new();
        mock.expect_delete()
            .times(1)
            .returning(|_| Err(TaskError::operation("denied")));
        mock.expect_update()
            .times(1)
            .returning(|_, _| Err(TaskError::operation("denied")));
        let mut board = loaded_board(mock);
        board.load().await.unwrap();
        let before = board.tasks().to_vec();

        assert!(board.remove(1).await.is_err());
        assert!(board.edit(1, TaskPatch::new().with_title("x")).await.is_err());
        assert_eq!(board.tasks(), before.as_slice());
    }

    #[tokio::test]
    async fn test_unconfirmed_delete_keeps_task() {
        let mut mock = MockTaskService::new();
        mock.expect_delete().times(1).returning(|_| Ok(false));
        let mut board = loaded_board(mock);
        board.load().await.unwrap();

        assert!(!board.remove(2).await.unwrap());
        assert_eq!(board.tasks().len(), 3);
        assert!(board.tasks().iter().any(|t| t.id == 2));
    }

    #[tokio::test]
    async fn test_remove_and_edit_patch_locally() {
        let mut mock = MockTaskService::new();
        mock.expect_delete().times(1).returning(|_| Ok(true));
        mock.expect_update().times(1).returning(|id, patch| {
            let mut t = task(id, false, Priority::Low);
            t.apply(&patch);
            Ok(t)
        });
        let mut board = loaded_board(mock);
        board.load().await.unwrap();

        assert!(board.remove(2).await.unwrap());
        assert_eq!(board.tasks().len(), 2);

        board.edit(1, TaskPatch::new().with_title("Renamed")).await.unwrap();
        assert_eq!(board.tasks()[1].title, "Renamed");
    }
}
