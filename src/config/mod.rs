use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, TaskError};
use crate::services::local::DEFAULT_STORAGE_FILE;
use crate::services::{Latency, RemoteConfig};

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Local,
    Remote,
}

impl FromStr for BackendKind {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "remote" => Ok(BackendKind::Remote),
            other => Err(TaskError::Config(format!("Unknown backend: {}", other))),
        }
    }
}

/// Runtime settings, read from `DESKFLOW_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub remote: Option<RemoteConfig>,
    pub storage_path: PathBuf,
    pub latency: Latency,
    pub addr: SocketAddr,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend = match get("DESKFLOW_BACKEND") {
            Some(raw) => raw.parse()?,
            None => BackendKind::default(),
        };

        let remote = match backend {
            BackendKind::Remote => {
                let require = |key: &str| {
                    get(key).ok_or_else(|| {
                        TaskError::Config(format!("{} must be set for the remote backend", key))
                    })
                };
                let mut remote = RemoteConfig::new(
                    require("DESKFLOW_API_URL")?,
                    require("DESKFLOW_PROJECT_ID")?,
                    require("DESKFLOW_PUBLIC_KEY")?,
                );
                if let Some(table) = get("DESKFLOW_TABLE") {
                    remote = remote.with_table(table);
                }
                Some(remote)
            }
            BackendKind::Local => None,
        };

        let latency = match get("DESKFLOW_LATENCY_MS") {
            Some(raw) => parse_latency(&raw)?,
            None => Latency::default(),
        };

        let addr_raw = get("DESKFLOW_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_raw
            .parse()
            .map_err(|e| TaskError::Config(format!("Invalid DESKFLOW_ADDR {:?}: {}", addr_raw, e)))?;

        let log_level = match get("DESKFLOW_LOG") {
            Some(raw) => raw
                .parse()
                .map_err(|_| TaskError::Config(format!("Invalid DESKFLOW_LOG level: {}", raw)))?,
            None => tracing::Level::INFO,
        };

        Ok(Self {
            backend,
            remote,
            storage_path: get("DESKFLOW_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_FILE)),
            latency,
            addr,
            log_level,
        })
    }
}

/// Accepts `min-max`, a single fixed value, or `0` to disable.
pub fn parse_latency(raw: &str) -> Result<Latency> {
    let number = |s: &str| {
        s.trim()
            .parse::<u64>()
            .map_err(|_| TaskError::Config(format!("Invalid latency: {:?}", raw)))
    };
    match raw.split_once('-') {
        Some((min, max)) => Latency::range(number(min)?, number(max)?),
        None => Ok(Latency::fixed(number(raw)?)),
    }
}
