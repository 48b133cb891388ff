// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::job::JobId;

#[derive(Error, Debug)]
pub enum JobflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Unknown executor: {0}")]
    UnknownExecutor(String),

    #[error("Task '{task}' was queued without an executor (call `.with(..)` first)")]
    MissingExecutor { task: String },

    #[error("Task '{task}' was queued without a linker (call `.then(..)` first)")]
    MissingLinker { task: String },

    #[error("A handler for result kind '{0}' is already registered")]
    DuplicateHandler(String),

    #[error("No handler registered for result kind '{0}'")]
    UnregisteredResult(String),

    #[error("{0} is no longer active; it cannot accept or dispatch tasks")]
    JobInactive(JobId),

    #[error("{0} was cancelled; no new tasks may be queued")]
    JobCancelled(JobId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of a single task body, delivered through the task's completion
/// path instead of a result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(String),

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        TaskError::Failed(message.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobflowError>;
