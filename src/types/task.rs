use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, TaskError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(TaskError::validation(format!("Unknown priority: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Meetings,
    Emails,
    #[default]
    Projects,
    Personal,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Meetings,
        Category::Emails,
        Category::Projects,
        Category::Personal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Meetings => "meetings",
            Category::Emails => "emails",
            Category::Projects => "projects",
            Category::Personal => "personal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "meetings" => Ok(Category::Meetings),
            "emails" => Ok(Category::Emails),
            "projects" => Ok(Category::Projects),
            "personal" => Ok(Category::Personal),
            other => Err(TaskError::validation(format!("Unknown category: {}", other))),
        }
    }
}

/// Where a due date sits relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    Today,
    Overdue,
    Upcoming,
}

/// Canonical task as handed to callers of the repository.
///
/// Serializes to the same shape the local storage slot and seed data use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "Id")]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Task {
    pub fn due_state(&self, today: NaiveDate) -> Option<DueState> {
        let due = self.due_date?;
        Some(if due == today {
            DueState::Today
        } else if due < today {
            DueState::Overdue
        } else {
            DueState::Upcoming
        })
    }

    /// Short label for the due date, e.g. "Today", "Overdue (Mar 4)", "Mar 9".
    pub fn due_label(&self, today: NaiveDate) -> Option<String> {
        let due = self.due_date?;
        let short = due.format("%b %-d").to_string();
        self.due_state(today).map(|state| match state {
            DueState::Today => "Today".to_string(),
            DueState::Overdue => format!("Overdue ({})", short),
            DueState::Upcoming => short,
        })
    }

    /// Shallow merge: every field present in the patch replaces the stored value.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = completed_at;
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
    }
}

fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskError::validation("Task title cannot be empty"));
    }
    Ok(trimmed.to_string())
}

/// Input for creating a task. Everything but the title falls back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Rejects blank titles and returns the input with its title trimmed.
    pub fn validated(mut self) -> Result<Self> {
        self.title = validate_title(&self.title)?;
        Ok(self)
    }
}

// Keeps `null` distinguishable from a missing key for nullable patch fields.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update. `None` leaves a field untouched; for the nullable fields
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_completed(mut self, completed: bool, completed_at: Option<DateTime<Utc>>) -> Self {
        self.completed = Some(completed);
        self.completed_at = Some(completed_at);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// The patch that flips a task's completion, stamping or clearing `completedAt`.
    pub fn toggle_completion(task: &Task, now: DateTime<Utc>) -> Self {
        let completed = !task.completed;
        TaskPatch::new().with_completed(completed, completed.then_some(now))
    }

    /// Makes `completedAt` agree with `completed` once the patch is applied to
    /// `current`. `now` is stamped only on a `false -> true` transition; an
    /// already completed task keeps its timestamp. Without a stored task
    /// (`current` is `None`) a `completedAt`-only patch cannot be checked and is
    /// rejected.
    pub fn with_completion_pairing(mut self, current: Option<&Task>, now: DateTime<Utc>) -> Result<Self> {
        match (self.completed, self.completed_at) {
            (None, None) => {}
            (Some(true), Some(None)) | (Some(false), Some(Some(_))) => {
                return Err(TaskError::validation(
                    "completed and completedAt must agree",
                ));
            }
            (Some(true), Some(Some(_))) => {}
            (Some(true), None) => {
                let already_done = current.map_or(false, |t| t.completed && t.completed_at.is_some());
                if !already_done {
                    self.completed_at = Some(Some(now));
                }
            }
            (Some(false), _) => self.completed_at = Some(None),
            (None, Some(completed_at)) => match current {
                Some(task) if task.completed == completed_at.is_some() => {}
                Some(_) => {
                    return Err(TaskError::validation(
                        "completedAt cannot change without a matching completed value",
                    ));
                }
                None => {
                    return Err(TaskError::validation(
                        "completedAt can only be sent together with completed",
                    ));
                }
            },
        }
        Ok(self)
    }

    /// Rejects a blank replacement title and trims a valid one.
    pub fn validated(mut self) -> Result<Self> {
        if let Some(title) = &self.title {
            self.title = Some(validate_title(title)?);
        }
        Ok(self)
    }
}

impl From<&Task> for TaskPatch {
    fn from(task: &Task) -> Self {
        TaskPatch {
            title: Some(task.title.clone()),
            priority: Some(task.priority),
            category: Some(task.category),
            due_date: Some(task.due_date),
            completed: Some(task.completed),
            completed_at: Some(task.completed_at),
            tags: Some(task.tags.clone()),
        }
    }
}
