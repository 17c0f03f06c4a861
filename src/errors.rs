// src/errors.rs

//! Crate-wide error types.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipegraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Invalid patch for node '{node}': {reason}")]
    InvalidPatch { node: String, reason: String },

    #[error("Pipeline engine is no longer running")]
    EngineStopped,

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures of a single pipeline run.
///
/// None of these are fatal to the engine; they are recorded in the run state
/// and the graph stays ready for the next edit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("No database connection")]
    NoSourceConnected,

    #[error("{0}")]
    Execution(String),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error("response for run {sequence} discarded; run {latest} is newer")]
    StaleResponseDiscarded { sequence: u64, latest: u64 },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipegraphError>;
