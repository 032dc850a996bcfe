use serde::Serialize;
use thiserror::Error;

/// A single field-level complaint reported by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldFailure {
    pub field: Option<String>,
    pub message: String,
}

impl std::fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    NotFound(i64),

    #[error("Operation failed: {message}")]
    Operation {
        message: String,
        failures: Vec<FieldFailure>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TaskError {
    pub fn validation(msg: impl Into<String>) -> Self {
        TaskError::Validation(msg.into())
    }

    pub fn operation(msg: impl Into<String>) -> Self {
        TaskError::Operation {
            message: msg.into(),
            failures: Vec::new(),
        }
    }

    /// Builds an operation error whose message enumerates every failure, in order.
    pub fn from_failures(failures: Vec<FieldFailure>) -> Self {
        let message = failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        TaskError::Operation { message, failures }
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
