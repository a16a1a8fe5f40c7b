use crate::config::ConfigError;
use kubeauto_inventory::InventoryError;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClusterError>;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Cluster {0} not found")]
    ClusterNotFound(String),

    #[error("Cluster {0} already exists")]
    ClusterExists(String),

    #[error("Invalid IP address: {0}")]
    InvalidIp(String),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(
        "Command failed with exit code {}: {command}\nError output: {}\nStandard output: {}",
        exit_code(.status),
        or_empty(.stderr),
        or_empty(.stdout)
    )]
    ExternalWorkflow {
        command: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Command timed out after {}ms: {command}", .timeout.as_millis())]
    Timeout { command: String, timeout: Duration },

    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Invalid step: {0}")]
    InvalidStep(String),

    #[error("Unknown network plugin: {0}")]
    UnknownNetworkPlugin(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

fn exit_code(status: &Option<i32>) -> String {
    status.map_or_else(|| "signal".to_string(), |code| code.to_string())
}

fn or_empty(text: &str) -> &str {
    let text = text.trim();
    if text.is_empty() {
        "(empty)"
    } else {
        text
    }
}
