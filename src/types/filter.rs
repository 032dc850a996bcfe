use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Category, Priority, Task};
use crate::error::{Result, TaskError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl FromStr for StatusFilter {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" => Ok(StatusFilter::Completed),
            other => Err(TaskError::validation(format!("Unknown status filter: {}", other))),
        }
    }
}

/// Either `all` or one specific value of `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterValue<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> FilterValue<T> {
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            FilterValue::All => true,
            FilterValue::Only(wanted) => wanted == value,
        }
    }
}

impl<T: fmt::Display> fmt::Display for FilterValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::All => f.write_str("all"),
            FilterValue::Only(value) => value.fmt(f),
        }
    }
}

impl<T: FromStr<Err = TaskError>> FromStr for FilterValue<T> {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(FilterValue::All)
        } else {
            s.parse().map(FilterValue::Only)
        }
    }
}

impl<T: fmt::Display> Serialize for FilterValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T: FromStr<Err = TaskError>> Deserialize<'de> for FilterValue<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The status x priority x category selection held by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSelection {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub priority: FilterValue<Priority>,
    #[serde(default)]
    pub category: FilterValue<Category>,
}

impl FilterSelection {
    pub fn matches(&self, task: &Task) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        };
        status_ok && self.priority.accepts(&task.priority) && self.category.accepts(&task.category)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaskCounts {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
    pub visible: Vec<Task>,
    pub counts: TaskCounts,
}

/// Visible subset (input order preserved) plus counts over the whole collection.
pub fn derive_view(tasks: &[Task], filter: &FilterSelection) -> TaskView {
    let active = tasks.iter().filter(|t| !t.completed).count();
    let counts = TaskCounts {
        total: tasks.len(),
        active,
        completed: tasks.len() - active,
    };

    let visible = tasks.iter().filter(|t| filter.matches(t)).cloned().collect();

    TaskView { visible, counts }
}
