//! Error types for resource graph construction.
//!
//! Every error this crate produces is a configuration error: it is raised
//! synchronously while the graph is being built or synthesized and is never
//! worth retrying. Categories exist so callers can give targeted advice.

use thiserror::Error;

/// Categories of graph errors for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The declared graph or one of its parameters is invalid
    Configuration,
    /// A pre-existing resource could not be resolved
    Lookup,
    /// Reading or writing a template failed
    Io,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Invalid configuration",
            Self::Lookup => "Unresolved lookup",
            Self::Io => "I/O failure",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration => "Fix the reported parameter and synthesize again",
            Self::Lookup => "Record the lookup result in the config file or disable strict mode",
            Self::Io => "Check the output path and its permissions",
        }
    }
}

/// Errors that can occur while declaring or synthesizing a stack.
#[derive(Debug, Error)]
pub enum Error {
    /// Logical id does not match the template naming rules
    #[error("invalid logical id '{id}': must be alphanumeric, start with a letter, and be at most 255 characters")]
    InvalidLogicalId {
        /// The rejected id
        id: String,
    },

    /// Two resources (or outputs) share a logical id
    #[error("duplicate logical id: {id}")]
    DuplicateLogicalId {
        /// The id declared twice
        id: String,
    },

    /// A resource references an id that is not declared in the stack
    #[error("{from} references undeclared resource {to}")]
    DanglingReference {
        /// The referencing resource or output
        from: String,
        /// The missing target
        to: String,
    },

    /// A resource failed its own validation
    #[error("invalid {id}: {message}")]
    Validation {
        /// Logical id (or name) of the invalid resource
        id: String,
        /// What is wrong with it
        message: String,
    },

    /// A lookup of pre-existing infrastructure could not be resolved
    #[error("lookup {key} failed: {message}")]
    Lookup {
        /// Lookup key, e.g. `vpc-provider:tag:name=prod`
        key: String,
        /// Why the lookup failed
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a validation error.
    pub fn validation(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a lookup error.
    pub fn lookup(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lookup {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Lookup { .. } => ErrorCategory::Lookup,
            Error::Io(_) => ErrorCategory::Io,
            _ => ErrorCategory::Configuration,
        }
    }
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, Error>;
