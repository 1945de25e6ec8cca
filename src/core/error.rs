//! Error types for scheduler operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::worker_pool::PoolError;

/// Errors produced while building a scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The worker pool could not be started.
    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Opaque failure reported by an [`LlmClient`](super::LlmClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClientError {
    message: String,
}

impl ClientError {
    /// Create a client error carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failures raised by response parsers.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The response was not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// The response decoded to something other than a JSON object.
    #[error("expected JSON object, got {0}")]
    NotAnObject(&'static str),
    /// The blackboard entry a parser merges into holds a non-object value.
    #[error("blackboard entry '{key}' holds a {found}, not an object")]
    SlotNotAnObject {
        /// Blackboard key.
        key: &'static str,
        /// JSON type of the value found there.
        found: &'static str,
    },
    /// Parser-specific failure.
    #[error("{0}")]
    Custom(String),
}

/// Category of a failure reported through the `on_error` observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The client call failed.
    QueryError,
    /// The response could not be parsed.
    ParseError,
    /// The request exceeded the configured wall-clock timeout.
    Timeout,
    /// A role, personality, context or parser name did not resolve.
    MissingDefinition,
    /// No client is registered.
    NoClient,
}

impl ErrorKind {
    /// Stable wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QueryError => "query_error",
            Self::ParseError => "parse_error",
            Self::Timeout => "timeout",
            Self::MissingDefinition => "missing_definition",
            Self::NoClient => "no_client",
        }
    }

    /// Whether this kind counts against a requester's retry budget.
    ///
    /// Configuration errors never do.
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::QueryError | Self::ParseError | Self::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
