use std::io;
use thiserror::Error;

use crate::audit::AuditError;

/// Top-level application errors unifying all layer errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Report encoding failed: {0}")]
    Report(#[from] serde_json::Error),

    #[error("Audit sink error: {0}")]
    Audit(#[from] AuditError),
}
