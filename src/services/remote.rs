use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{logged, TaskService};
use crate::codec::{self, RECORD_FIELDS};
use crate::error::{FieldFailure, Result, TaskError};
use crate::types::{NewTask, Task, TaskPatch};

/// Rows requested per listing; there is no further paging.
pub const PAGE_SIZE: u32 = 100;

const PROJECT_ID_HEADER: &str = "X-Apper-Project-Id";
const PUBLIC_KEY_HEADER: &str = "X-Apper-Public-Key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub project_id: String,
    pub public_key: String,
    pub table: String,
}

impl RemoteConfig {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            project_id: project_id.into(),
            public_key: public_key.into(),
            table: codec::TASK_TABLE.to_string(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

// Envelope shared by every record-store endpoint
#[derive(Debug, Deserialize)]
struct StoreResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    results: Option<Vec<RecordResult>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordResult {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<RecordFieldError>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordFieldError {
    #[serde(default)]
    field_label: Option<String>,
    message: String,
}

/// Task backend talking to the hosted record store over HTTP.
pub struct RemoteTaskService {
    client: Client,
    config: RemoteConfig,
}

impl RemoteTaskService {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    fn records_url(&self) -> String {
        format!(
            "{}/tables/{}/records",
            self.config.base_url.trim_end_matches('/'),
            self.config.table
        )
    }

    fn fields() -> Value {
        Value::Array(
            RECORD_FIELDS
                .iter()
                .map(|name| json!({ "field": { "Name": name } }))
                .collect(),
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<StoreResponse> {
        let response = request
            .header(PROJECT_ID_HEADER, &self.config.project_id)
            .header(PUBLIC_KEY_HEADER, &self.config.public_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<StoreResponse>(&body)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or_else(|| format!("Record store responded with {}", status));
            return Err(TaskError::operation(message));
        }

        let parsed: StoreResponse = serde_json::from_str(&body)?;
        if !parsed.success {
            let message = parsed
                .message
                .unwrap_or_else(|| "Record store reported a failure".to_string());
            return Err(TaskError::operation(message));
        }
        Ok(parsed)
    }

    async fn fetch_all(&self) -> Result<Vec<Task>> {
        let params = json!({
            "fields": Self::fields(),
            "orderBy": [{ "fieldName": "CreatedOn", "sorttype": "DESC" }],
            "pagingInfo": { "limit": PAGE_SIZE, "offset": 0 },
        });
        let url = format!("{}/query", self.records_url());
        tracing::debug!("Fetching tasks from {}", url);

        let response = self.send(self.client.post(&url).json(&params)).await?;
        match response.data {
            Some(Value::Array(rows)) => rows.into_iter().map(codec::decode).collect(),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(TaskError::operation(format!(
                "Unexpected task listing payload: {}",
                other
            ))),
        }
    }

    async fn fetch_one(&self, id: i64) -> Result<Task> {
        let url = format!("{}/{}/query", self.records_url(), id);
        tracing::debug!("Fetching task {} from {}", id, url);

        let response = self
            .send(self.client.post(&url).json(&json!({ "fields": Self::fields() })))
            .await?;
        match response.data {
            Some(Value::Null) | None => Err(TaskError::NotFound(id)),
            Some(row) => codec::decode(row),
        }
    }

    async fn insert(&self, task: NewTask) -> Result<Task> {
        let task = task.validated()?;
        let record = codec::create_record(&task, Utc::now());
        let params = json!({ "records": [record] });

        let response = self.send(self.client.post(self.records_url()).json(&params)).await?;
        let created = successful_records(response.results, "create")?;
        match created.into_iter().next() {
            Some(result) => decode_result(result),
            None => Err(TaskError::operation("No records were created")),
        }
    }

    async fn modify(&self, id: i64, patch: TaskPatch) -> Result<Task> {
        // the stored row is not read first, so `completedAt` cannot be checked alone
        let patch = patch.validated()?.with_completion_pairing(None, Utc::now())?;
        let mut record = codec::to_record(&patch);
        record.insert("Id".to_string(), json!(id));
        let params = json!({ "records": [record] });

        let response = self.send(self.client.patch(self.records_url()).json(&params)).await?;
        let updated = successful_records(response.results, "update")?;
        match updated.into_iter().next() {
            Some(result) => decode_result(result),
            None => Err(TaskError::operation("No records were updated")),
        }
    }

    async fn remove(&self, id: i64) -> Result<bool> {
        let params = json!({ "RecordIds": [id] });
        let response = self.send(self.client.delete(self.records_url()).json(&params)).await?;
        match response.results {
            Some(results) => Ok(!successful_records(Some(results), "delete")?.is_empty()),
            None => Ok(false),
        }
    }
}

fn decode_result(result: RecordResult) -> Result<Task> {
    match result.data {
        Some(row) => codec::decode(row),
        None => Err(TaskError::operation("Record store returned no record data")),
    }
}

/// Splits per-record outcomes; any failure becomes one error listing all of them.
fn successful_records(results: Option<Vec<RecordResult>>, action: &str) -> Result<Vec<RecordResult>> {
    let (succeeded, failed): (Vec<_>, Vec<_>) = results
        .unwrap_or_default()
        .into_iter()
        .partition(|r| r.success);

    if failed.is_empty() {
        return Ok(succeeded);
    }

    tracing::error!(
        "Failed to {} {} task records: {}",
        action,
        failed.len(),
        serde_json::to_string(&failed).unwrap_or_default()
    );

    let mut failures = Vec::new();
    for record in failed {
        let before = failures.len();
        failures.extend(record.errors.into_iter().map(|e| FieldFailure {
            field: e.field_label,
            message: e.message,
        }));
        if let Some(message) = record.message {
            failures.push(FieldFailure { field: None, message });
        }
        if failures.len() == before {
            failures.push(FieldFailure {
                field: None,
                message: format!("Record could not {}", action),
            });
        }
    }
    Err(TaskError::from_failures(failures))
}

#[async_trait]
impl TaskService for RemoteTaskService {
    async fn get_all(&self) -> Result<Vec<Task>> {
        logged("fetching tasks", self.fetch_all().await)
    }

    async fn get_by_id(&self, id: i64) -> Result<Task> {
        logged(&format!("fetching task with ID {}", id), self.fetch_one(id).await)
    }

    async fn create(&self, task: NewTask) -> Result<Task> {
        let created = logged("creating task", self.insert(task).await)?;
        tracing::info!("Created task {}: {}", created.id, created.title);
        Ok(created)
    }

    async fn update(&self, id: i64, patch: TaskPatch) -> Result<Task> {
        tracing::debug!("Updating task {} with {:?}", id, patch);
        let updated = logged("updating task", self.modify(id, patch).await)?;
        tracing::info!("Updated task {}", id);
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let deleted = logged("deleting task", self.remove(id).await)?;
        tracing::info!("Delete of task {} reported success={}", id, deleted);
        Ok(deleted)
    }
}
