//! Error types for copy-analysis
//!
//! Analysis itself degrades to conservative values instead of failing; the
//! variants below cover contract misuse, invariant violations found by
//! validation, malformed input graphs and configuration problems.

use thiserror::Error;

use crate::config::ConfigError;

/// Main error type for copy-analysis operations
#[derive(Debug, Error)]
pub enum CopyAnalysisError {
    /// API contract misuse (e.g. the single-entity setter)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Analysis data invariant violated
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Malformed control flow graph
    #[error("Invalid control flow graph: {0}")]
    InvalidGraph(String),

    /// Worklist solver exceeded its iteration budget
    #[error("Fixpoint not reached for '{method}' after {iterations} iterations")]
    FixpointNotReached { method: String, iterations: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CopyAnalysisError {
    /// Create an invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        CopyAnalysisError::InvalidOperation(msg.into())
    }

    /// Create an invariant violation error
    pub fn invariant(msg: impl Into<String>) -> Self {
        CopyAnalysisError::InvariantViolation(msg.into())
    }

    /// Create an invalid graph error
    pub fn invalid_graph(msg: impl Into<String>) -> Self {
        CopyAnalysisError::InvalidGraph(msg.into())
    }
}

/// Result type alias for copy-analysis operations
pub type Result<T> = std::result::Result<T, CopyAnalysisError>;
