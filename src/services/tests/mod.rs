use super::*;
use chrono::{DateTime, TimeZone, Utc};
use crate::types::{Category, Priority};

pub mod remote_test;

pub(crate) fn fixture(id: i64, title: &str, created_day: u32) -> Task {
    Task {
        id,
        title: title.to_string(),
        priority: Priority::Medium,
        category: Category::Projects,
        due_date: None,
        completed: false,
        created_at: Utc.with_ymd_and_hms(2024, 1, created_day, 9, 0, 0).unwrap(),
        completed_at: None,
        tags: vec![],
    }
}

pub(crate) fn timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

#[test]
fn test_next_id() {
    assert_eq!(next_id(&[]), 1);
    let tasks = vec![fixture(3, "c", 3), fixture(1, "a", 1), fixture(2, "b", 2)];
    assert_eq!(next_id(&tasks), 4);
    let gappy = vec![fixture(10, "x", 1), fixture(2, "y", 2)];
    assert_eq!(next_id(&gappy), 11);
}

#[tokio::test]
async fn test_repository_delegates_to_service() {
    let mut mock = MockTaskService::new();
    mock.expect_get_by_id()
        .withf(|id| *id == 2)
        .times(1)
        .returning(|id| Ok(fixture(id, "delegated", 2)));
    mock.expect_delete()
        .withf(|id| *id == 5)
        .times(1)
        .returning(|id| Err(TaskError::NotFound(id)));

    let repository = TaskRepository::new(mock);
    assert_eq!(repository.get_by_id(2).await.unwrap().title, "delegated");
    assert!(matches!(repository.delete(5).await, Err(TaskError::NotFound(5))));
}
