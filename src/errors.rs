// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! `PipelineError` covers everything that aborts the process before (or
//! outside of) task execution. Failures *inside* a task run are values
//! (`engine::TaskError`) carried by `RunResult`, never `PipelineError`s.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    UnknownTask(String),

    #[error("No path entry for category: {0}")]
    UnknownCategory(String),

    #[error("Cycle detected in task graph: {0}")]
    TaskCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
