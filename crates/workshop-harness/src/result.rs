//! Result and error types for the workshop harness.
//!
//! Every suspend point in the harness fails with a named kind. Reports carry
//! the [`ErrorKind`] of the originating failure so "the app never called the
//! endpoint" stays distinguishable from "the app is slow" and from "the
//! selector drifted".

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while driving the application under test
#[derive(Debug, Error)]
pub enum HarnessError {
    /// No element matched a selector before its deadline
    #[error("Selector `{role}` ({selector}) matched nothing{}", timeout_suffix(.timeout_ms))]
    SelectorNotFound {
        /// Semantic role of the selector
        role: String,
        /// Lookup expression that was evaluated
        selector: String,
        /// Timeout that elapsed, when the lookup was part of a wait
        timeout_ms: Option<u64>,
    },

    /// More than one element matched where exactly one was expected
    #[error("Selector `{role}` ({selector}) is ambiguous: {count} matches")]
    SelectorAmbiguous {
        /// Semantic role of the selector
        role: String,
        /// Lookup expression that was evaluated
        selector: String,
        /// Number of matching elements
        count: usize,
    },

    /// The element resolved but never reached the awaited condition
    #[error("Element `{role}` never became {condition} within {timeout_ms}ms")]
    DomWaitTimeout {
        /// Semantic role of the selector
        role: String,
        /// Condition that was awaited
        condition: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// An aliased backend call did not complete in time
    #[error("{}", intercept_message(.alias, .timeout_ms, .registered))]
    InterceptTimeout {
        /// Alias that was awaited
        alias: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
        /// Whether a rule was registered for the alias at all
        registered: bool,
    },

    /// The cached session could not be established or revalidated
    #[error("Session for {identity} is invalid: {message}")]
    SessionInvalid {
        /// Credential fingerprint
        identity: String,
        /// Error message
        message: String,
    },

    /// A workflow step was issued from a state that does not allow it
    #[error("Workflow `{flow}` precondition failed: {message}")]
    WorkflowPreconditionFailed {
        /// Flow name
        flow: String,
        /// Error message
        message: String,
    },

    /// A catalog was asked for a role it does not define
    #[error("Catalog `{catalog}` has no role `{role}`")]
    UnknownRole {
        /// Catalog name and version
        catalog: String,
        /// Requested role
        role: String,
    },

    /// A post-condition or business assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// The browser backend reported an error
    #[error("Driver error: {message}")]
    Driver {
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

    /// Invalid run configuration
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

#[allow(clippy::ref_option)]
fn timeout_suffix(timeout_ms: &Option<u64>) -> String {
    timeout_ms.map_or_else(String::new, |ms| format!(" within {ms}ms"))
}

fn intercept_message(alias: &str, timeout_ms: &u64, registered: &bool) -> String {
    if *registered {
        format!("Intercept `@{alias}` saw no completed call within {timeout_ms}ms")
    } else {
        format!("Intercept `@{alias}` has no registered rule (bound {timeout_ms}ms)")
    }
}

/// Discriminant of [`HarnessError`] preserved through reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`HarnessError::SelectorNotFound`]
    SelectorNotFound,
    /// See [`HarnessError::SelectorAmbiguous`]
    SelectorAmbiguous,
    /// See [`HarnessError::DomWaitTimeout`]
    DomWaitTimeout,
    /// See [`HarnessError::InterceptTimeout`]
    InterceptTimeout,
    /// See [`HarnessError::SessionInvalid`]
    SessionInvalid,
    /// See [`HarnessError::WorkflowPreconditionFailed`]
    WorkflowPreconditionFailed,
    /// See [`HarnessError::UnknownRole`]
    UnknownRole,
    /// See [`HarnessError::AssertionFailed`]
    AssertionFailed,
    /// Driver and navigation failures
    Driver,
    /// Configuration, I/O and serialization failures
    Environment,
}

impl ErrorKind {
    /// Short machine-readable name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SelectorNotFound => "selector_not_found",
            Self::SelectorAmbiguous => "selector_ambiguous",
            Self::DomWaitTimeout => "dom_wait_timeout",
            Self::InterceptTimeout => "intercept_timeout",
            Self::SessionInvalid => "session_invalid",
            Self::WorkflowPreconditionFailed => "workflow_precondition_failed",
            Self::UnknownRole => "unknown_role",
            Self::AssertionFailed => "assertion_failed",
            Self::Driver => "driver",
            Self::Environment => "environment",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HarnessError {
    /// Kind of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SelectorNotFound { .. } => ErrorKind::SelectorNotFound,
            Self::SelectorAmbiguous { .. } => ErrorKind::SelectorAmbiguous,
            Self::DomWaitTimeout { .. } => ErrorKind::DomWaitTimeout,
            Self::InterceptTimeout { .. } => ErrorKind::InterceptTimeout,
            Self::SessionInvalid { .. } => ErrorKind::SessionInvalid,
            Self::WorkflowPreconditionFailed { .. } => ErrorKind::WorkflowPreconditionFailed,
            Self::UnknownRole { .. } => ErrorKind::UnknownRole,
            Self::AssertionFailed { .. } => ErrorKind::AssertionFailed,
            Self::Driver { .. } | Self::Navigation { .. } => ErrorKind::Driver,
            Self::Config { .. } | Self::Io(_) | Self::Json(_) | Self::Yaml(_) => {
                ErrorKind::Environment
            }
        }
    }

    /// Alias involved in the failure, if any
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::InterceptTimeout { alias, .. } => Some(alias),
            _ => None,
        }
    }

    /// Selector role involved in the failure, if any
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        match self {
            Self::SelectorNotFound { role, .. }
            | Self::SelectorAmbiguous { role, .. }
            | Self::DomWaitTimeout { role, .. }
            | Self::UnknownRole { role, .. } => Some(role),
            _ => None,
        }
    }

    pub(crate) fn driver(message: impl std::fmt::Display) -> Self {
        Self::Driver {
            message: message.to_string(),
        }
    }

    pub(crate) fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    pub(crate) fn precondition(flow: &str, message: impl Into<String>) -> Self {
        Self::WorkflowPreconditionFailed {
            flow: flow.to_string(),
            message: message.into(),
        }
    }
}
