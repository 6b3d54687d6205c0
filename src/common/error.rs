//! Error types for triekv

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Wire / Codec Errors ===
    #[error("malformed value: {0}")]
    Malformed(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("invalid record line: {0}")]
    InvalidRecord(String),

    // === Network Errors ===
    #[error("node {node} unreachable: {reason}")]
    Unreachable { node: String, reason: String },

    #[error("request to node {node} timed out")]
    Timeout { node: String },

    // === Broker Errors ===
    #[error("not enough nodes for replication: need {needed}, have {available}")]
    InsufficientNodes { needed: usize, available: usize },

    #[error("delete aborted at node {node}: {reason}")]
    DeleteAborted { node: String, reason: String },

    // === Config Errors ===
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Does this error mean the node could not be reached at all, as opposed
    /// to the node answering with a failure?
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Unreachable { .. } | Error::Timeout { .. } | Error::Io(_)
        )
    }
}

// Implement From for common error types
impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
