pub mod api;
pub mod board;
pub mod codec;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use error::{Result, TaskError};
