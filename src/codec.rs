//! Translation between record-store rows and canonical tasks.
//!
//! The record store tags custom columns with a `_c` suffix and adds its own
//! system columns (`Id`, `Name`, `Tags`, `CreatedOn`, ...). Decoding fills in
//! defaults for anything missing; encoding a patch only emits the fields the
//! patch actually carries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

use crate::error::{Result, TaskError};
use crate::types::{Category, NewTask, Priority, Task, TaskPatch};

/// Default table holding task rows.
pub const TASK_TABLE: &str = "task_c";

/// Columns requested on every read.
pub const RECORD_FIELDS: [&str; 14] = [
    "Name",
    "Tags",
    "Owner",
    "CreatedOn",
    "CreatedBy",
    "ModifiedOn",
    "ModifiedBy",
    "title_c",
    "priority_c",
    "category_c",
    "dueDate_c",
    "completed_c",
    "createdAt_c",
    "completedAt_c",
];

/// A task row as the record store returns it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskRecord {
    #[serde(rename = "Id", deserialize_with = "record_id")]
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Tags", default)]
    pub tags: Option<String>,
    #[serde(rename = "Owner", default)]
    pub owner: Option<Value>,
    #[serde(rename = "CreatedOn", default)]
    pub created_on: Option<String>,
    #[serde(rename = "title_c", default)]
    pub title: Option<String>,
    #[serde(rename = "priority_c", default)]
    pub priority: Option<String>,
    #[serde(rename = "category_c", default)]
    pub category: Option<String>,
    #[serde(rename = "dueDate_c", default)]
    pub due_date: Option<String>,
    #[serde(rename = "completed_c", default)]
    pub completed: Option<bool>,
    #[serde(rename = "createdAt_c", default)]
    pub created_at: Option<String>,
    #[serde(rename = "completedAt_c", default)]
    pub completed_at: Option<String>,
}

/// Coerces a textual id into a positive integer.
pub fn parse_id(raw: &str) -> Result<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(TaskError::validation(format!("Invalid task id: {:?}", raw))),
    }
}

fn record_id<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let id = match &value {
        Value::Number(n) => n.as_i64().filter(|id| *id > 0),
        Value::String(s) => parse_id(s).ok(),
        _ => None,
    };
    id.ok_or_else(|| serde::de::Error::custom(format!("Invalid record Id: {}", value)))
}

// The record store sends empty strings for unset text columns.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn parse_timestamp(field: &str, raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("Ignoring unparseable {} value {:?}: {}", field, raw, e);
            None
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        return Some(date);
    }
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(ts) => Some(ts.date_naive()),
        Err(e) => {
            tracing::warn!("Ignoring unparseable dueDate_c value {:?}: {}", raw, e);
            None
        }
    }
}

fn parse_or_default<T>(field: &str, raw: Option<&str>) -> T
where
    T: std::str::FromStr + Default,
{
    match raw {
        None => T::default(),
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown {} value {:?}, using default", field, raw);
            T::default()
        }),
    }
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|tags| {
        tags.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

/// Decodes a record into a canonical task, defaulting every missing column.
pub fn to_canonical(record: TaskRecord) -> Task {
    let created_at = non_empty(&record.created_at)
        .and_then(|raw| parse_timestamp("createdAt_c", raw))
        .or_else(|| non_empty(&record.created_on).and_then(|raw| parse_timestamp("CreatedOn", raw)))
        .unwrap_or_else(|| {
            tracing::warn!("Record {} has no creation timestamp, using the epoch", record.id);
            DateTime::<Utc>::default()
        });

    Task {
        id: record.id,
        title: non_empty(&record.title).unwrap_or_default().to_string(),
        priority: parse_or_default::<Priority>("priority_c", non_empty(&record.priority)),
        category: parse_or_default::<Category>("category_c", non_empty(&record.category)),
        due_date: non_empty(&record.due_date).and_then(parse_date),
        completed: record.completed.unwrap_or(false),
        created_at,
        completed_at: non_empty(&record.completed_at)
            .and_then(|raw| parse_timestamp("completedAt_c", raw)),
        tags: split_tags(non_empty(&record.tags)),
    }
}

/// Decodes a raw JSON row.
pub fn decode(value: Value) -> Result<Task> {
    let record: TaskRecord = serde_json::from_value(value)?;
    Ok(to_canonical(record))
}

fn date_value(date: Option<NaiveDate>) -> Value {
    date.map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        .unwrap_or(Value::Null)
}

fn timestamp_value(ts: Option<DateTime<Utc>>) -> Value {
    ts.map(|ts| Value::String(ts.to_rfc3339()))
        .unwrap_or(Value::Null)
}

/// Encodes only the fields present in `patch`.
pub fn to_record(patch: &TaskPatch) -> Map<String, Value> {
    let mut record = Map::new();
    if let Some(title) = &patch.title {
        record.insert("Name".to_string(), json!(title));
        record.insert("title_c".to_string(), json!(title));
    }
    if let Some(priority) = patch.priority {
        record.insert("priority_c".to_string(), json!(priority.as_str()));
    }
    if let Some(category) = patch.category {
        record.insert("category_c".to_string(), json!(category.as_str()));
    }
    if let Some(due_date) = patch.due_date {
        record.insert("dueDate_c".to_string(), date_value(due_date));
    }
    if let Some(completed) = patch.completed {
        record.insert("completed_c".to_string(), json!(completed));
    }
    if let Some(completed_at) = patch.completed_at {
        record.insert("completedAt_c".to_string(), timestamp_value(completed_at));
    }
    if let Some(tags) = &patch.tags {
        record.insert("Tags".to_string(), json!(tags.join(",")));
    }
    record
}

/// The full record sent when creating a task.
pub fn create_record(task: &NewTask, now: DateTime<Utc>) -> Map<String, Value> {
    let mut record = to_record(&TaskPatch {
        title: Some(task.title.clone()),
        priority: Some(task.priority.unwrap_or_default()),
        category: Some(task.category.unwrap_or_default()),
        due_date: Some(task.due_date),
        completed: Some(false),
        completed_at: Some(None),
        tags: Some(task.tags.clone()),
    });
    record.insert("createdAt_c".to_string(), timestamp_value(Some(now)));
    record
}
