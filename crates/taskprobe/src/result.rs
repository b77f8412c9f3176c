//! Result and error types for Taskprobe.

use thiserror::Error;

/// Result type for Taskprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur in Taskprobe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A required UI handle never resolved within its timeout
    #[error("Element not found: {target} (waited {timeout_ms}ms)")]
    ElementNotFound {
        /// Human-readable description of what was looked up
        target: String,
        /// How long resolution was retried
        timeout_ms: u64,
    },

    /// More than one candidate satisfied a uniqueness-required query
    #[error("Ambiguous match: {count} elements satisfy {target}")]
    AmbiguousMatch {
        /// Human-readable description of what was looked up
        target: String,
        /// Number of candidates found
        count: usize,
    },

    /// An action could not find the element it needs to proceed
    #[error("{operation} failed: precondition element missing: {target}")]
    PreconditionMissing {
        /// Executor operation name
        operation: &'static str,
        /// The element that never resolved
        target: String,
    },

    /// The observed validation state matched none of the accepted variants
    #[error("Validation mismatch on {field}: expected {expected:?}, observed {actual}")]
    ValidationMismatch {
        /// Field description
        field: String,
        /// Accepted messages
        expected: Vec<String>,
        /// Observed message and validity state
        actual: String,
    },

    /// Best-effort cleanup failed for one target
    #[error("Cleanup failed for {target}: {message}")]
    CleanupFailure {
        /// Entity that could not be cleaned up
        target: String,
        /// Error message
        message: String,
    },

    /// A polled assertion never held
    #[error("Assertion {check} failed for {target} after {attempts} attempt(s) ({elapsed_ms}ms): {message}")]
    AssertionFailed {
        /// Check name
        check: &'static str,
        /// Entity or element the check targeted
        target: String,
        /// Last failure message
        message: String,
        /// Number of polls made
        attempts: usize,
        /// Time spent polling
        elapsed_ms: u64,
    },

    /// The node behind a resolved path changed before it could be used
    #[error("Stale element: {target}")]
    StaleElement {
        /// The element that went stale
        target: String,
    },

    /// Selector could not be parsed
    #[error("Invalid selector {selector:?}: {message}")]
    InvalidSelector {
        /// Selector source text
        selector: String,
        /// Error message
        message: String,
    },

    /// Invalid state error (operation called in wrong state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Whether this error must abort the current scenario.
    ///
    /// Cleanup failures are recorded and reported but never fail a run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::CleanupFailure { .. })
    }

    /// Whether the error came from a node that went stale mid-operation
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleElement { .. })
    }

    /// Re-label a resolution failure as a missing precondition of `operation`.
    ///
    /// Other errors pass through unchanged.
    #[must_use]
    pub fn into_precondition(self, operation: &'static str) -> Self {
        match self {
            Self::ElementNotFound { target, .. } => Self::PreconditionMissing { operation, target },
            other => other,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_element_not_found_message() {
        let err = ProbeError::ElementNotFound {
            target: "card \"Buy milk 1\"".to_string(),
            timeout_ms: 10_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("Buy milk 1"));
        assert!(msg.contains("10000ms"));
    }

    #[test]
    fn test_cleanup_failure_is_not_fatal() {
        let err = ProbeError::CleanupFailure {
            target: "Task 1".to_string(),
            message: "gone".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(ProbeError::config("x").is_fatal());
    }

    #[test]
    fn test_into_precondition_relabels_not_found() {
        let err = ProbeError::ElementNotFound {
            target: "input#title".to_string(),
            timeout_ms: 5,
        }
        .into_precondition("create_task");
        match err {
            ProbeError::PreconditionMissing { operation, target } => {
                assert_eq!(operation, "create_task");
                assert_eq!(target, "input#title");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_into_precondition_keeps_ambiguity() {
        let err = ProbeError::AmbiguousMatch {
            target: "card".to_string(),
            count: 2,
        }
        .into_precondition("delete_task");
        assert!(matches!(err, ProbeError::AmbiguousMatch { count: 2, .. }));
    }

    #[test]
    fn test_validation_mismatch_carries_both_sides() {
        let err = ProbeError::ValidationMismatch {
            field: "input#email".to_string(),
            expected: vec!["Please fill out this field.".to_string()],
            actual: "message=\"\" valid=true required=false".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Please fill out this field."));
        assert!(msg.contains("valid=true"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ProbeError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
