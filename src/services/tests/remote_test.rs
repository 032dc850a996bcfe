use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::timestamp;
use crate::error::TaskError;
use crate::services::{RemoteConfig, RemoteTaskService, TaskService};
use crate::types::{Category, NewTask, Priority, TaskPatch};

const RECORDS: &str = "/tables/task_c/records";

fn service(server: &MockServer) -> RemoteTaskService {
    RemoteTaskService::new(RemoteConfig::new(server.uri(), "proj-1", "key-1")).unwrap()
}

fn row(id: i64, title: &str) -> serde_json::Value {
    json!({
        "Id": id,
        "Name": title,
        "title_c": title,
        "priority_c": "high",
        "category_c": "meetings",
        "dueDate_c": "2024-02-01",
        "completed_c": false,
        "createdAt_c": "2024-01-15T10:00:00Z",
        "completedAt_c": null,
        "CreatedOn": "2024-01-15T10:00:01Z"
    })
}

#[tokio::test]
async fn test_get_all_decodes_rows_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/query", RECORDS)))
        .and(header("X-Apper-Project-Id", "proj-1"))
        .and(header("X-Apper-Public-Key", "key-1"))
        .and(body_partial_json(json!({
            "orderBy": [{ "fieldName": "CreatedOn", "sorttype": "DESC" }],
            "pagingInfo": { "limit": 100, "offset": 0 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [row(9, "Newest"), { "Id": 4, "CreatedOn": "2024-01-01T00:00:00Z" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = service(&server).get_all().await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, 9);
    assert_eq!(tasks[0].priority, Priority::High);
    assert_eq!(tasks[0].category, Category::Meetings);
    assert_eq!(tasks[1].id, 4);
    assert_eq!(tasks[1].priority, Priority::Medium);
    assert_eq!(tasks[1].created_at, timestamp("2024-01-01T00:00:00Z"));
}

#[tokio::test]
async fn test_get_all_surfaces_failure_flag() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/query", RECORDS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Table task_c is not accessible"
        })))
        .expect(1)
        .mount(&server)
        .await;

    match service(&server).get_all().await {
        Err(TaskError::Operation { message, .. }) => {
            assert_eq!(message, "Table task_c is not accessible")
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_http_error_uses_body_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/query", RECORDS)))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Invalid public key"
        })))
        .mount(&server)
        .await;

    let err = service(&server).get_all().await.unwrap_err();
    assert_eq!(err.to_string(), "Operation failed: Invalid public key");
}

#[tokio::test]
async fn test_get_by_id_missing_row_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/77/query", RECORDS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": null
        })))
        .mount(&server)
        .await;

    assert!(matches!(
        service(&server).get_by_id(77).await,
        Err(TaskError::NotFound(77))
    ));
}

#[tokio::test]
async fn test_create_sends_single_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RECORDS))
        .and(body_partial_json(json!({
            "records": [{
                "Name": "Plan offsite",
                "title_c": "Plan offsite",
                "priority_c": "high",
                "category_c": "projects",
                "completed_c": false,
                "completedAt_c": null
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "results": [{ "success": true, "data": row(12, "Plan offsite") }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = service(&server)
        .create(NewTask::new("  Plan offsite ").with_priority(Priority::High))
        .await
        .unwrap();
    assert_eq!(created.id, 12);
    assert_eq!(created.title, "Plan offsite");
}

#[tokio::test]
async fn test_create_blank_title_never_reaches_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    assert!(matches!(
        service(&server).create(NewTask::new(" ")).await,
        Err(TaskError::Validation(_))
    ));
}

#[tokio::test]
async fn test_create_aggregates_every_record_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RECORDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "results": [{
                "success": false,
                "message": "Record rejected",
                "errors": [
                    { "fieldLabel": "title_c", "message": "is too long" },
                    { "fieldLabel": "dueDate_c", "message": "is not a date" }
                ]
            }]
        })))
        .mount(&server)
        .await;

    match service(&server).create(NewTask::new("Too long")).await {
        Err(TaskError::Operation { message, failures }) => {
            assert_eq!(failures.len(), 3);
            assert_eq!(failures[0].field.as_deref(), Some("title_c"));
            assert_eq!(failures[1].field.as_deref(), Some("dueDate_c"));
            assert_eq!(failures[2].field, None);
            assert_eq!(
                message,
                "title_c: is too long; dueDate_c: is not a date; Record rejected"
            );
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_create_without_results_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RECORDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let err = service(&server).create(NewTask::new("Lost")).await.unwrap_err();
    assert_eq!(err.to_string(), "Operation failed: No records were created");
}

#[tokio::test]
async fn test_update_only_transmits_patch_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(RECORDS))
        .and(body_partial_json(json!({
            "records": [{ "Id": 2, "completed_c": true, "completedAt_c": "2024-01-01T00:00:00+00:00" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "results": [{
                "success": true,
                "data": {
                    "Id": 2,
                    "title_c": "Second",
                    "completed_c": true,
                    "completedAt_c": "2024-01-01T00:00:00Z",
                    "CreatedOn": "2023-12-30T00:00:00Z"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let completed_at = timestamp("2024-01-01T00:00:00Z");
    let updated = service(&server)
        .update(2, TaskPatch::new().with_completed(true, Some(completed_at)))
        .await
        .unwrap();
    assert!(updated.completed);
    assert_eq!(updated.completed_at, Some(completed_at));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let record = body["records"][0].as_object().unwrap();
    assert!(!record.contains_key("title_c"));
    assert!(!record.contains_key("priority_c"));
    assert_eq!(record.len(), 3);
}

#[tokio::test]
async fn test_delete_reports_success_and_failure() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(RECORDS))
        .and(body_partial_json(json!({ "RecordIds": [3] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "results": [{ "success": true }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(RECORDS))
        .and(body_partial_json(json!({ "RecordIds": [99] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "results": [{ "success": false, "message": "Record does not exist" }]
        })))
        .mount(&server)
        .await;

    let service = service(&server);
    assert!(service.delete(3).await.unwrap());
    let err = service.delete(99).await.unwrap_err();
    assert_eq!(err.to_string(), "Operation failed: Record does not exist");
}

#[tokio::test]
async fn test_delete_without_results_reports_false() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(RECORDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!service(&server).delete(5).await.unwrap());
}

#[tokio::test]
async fn test_update_without_results_fails() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(RECORDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let err = service(&server)
        .update(2, TaskPatch::new().with_title("Renamed"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Operation failed: No records were updated");
}

#[tokio::test]
async fn test_failed_record_without_detail_gets_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(RECORDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "results": [{ "success": false }]
        })))
        .mount(&server)
        .await;

    match service(&server).update(2, TaskPatch::new().with_title("x")).await {
        Err(TaskError::Operation { message, failures }) => {
            assert_eq!(message, "Record could not update");
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].field, None);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_completed_at_alone_never_reaches_store() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let clear_stamp = TaskPatch {
        completed_at: Some(None),
        ..Default::default()
    };
    assert!(matches!(
        service(&server).update(2, clear_stamp).await,
        Err(TaskError::Validation(_))
    ));

    let reopen = TaskPatch {
        completed: Some(false),
        completed_at: Some(Some(timestamp("2024-01-01T00:00:00Z"))),
        ..Default::default()
    };
    assert!(matches!(
        service(&server).update(2, reopen).await,
        Err(TaskError::Validation(_))
    ));
}
