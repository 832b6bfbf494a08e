//! Error types for the registry and the unload coordinator.
//!
//! - [`EngineError`]: contract violations, returned synchronously by the call
//!   that made them (registration, lookup, unload validation).
//! - [`LifecycleError`]: opaque failure produced by an external lifecycle
//!   procedure (load / mount / unmount / unload). The core never inspects it.
//! - [`UnloadError`]: what a shared unload completion handle settles with.

use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("there is already an app registered with name {0}")]
    DuplicateRegistration(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no application named '{0}' has been registered")]
    NotFound(String),
}

impl EngineError {
    /// Short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::InvalidArgument(_) => "invalid_argument",
            EngineError::DuplicateRegistration(_) => "duplicate_registration",
            EngineError::Configuration(_) => "configuration_error",
            EngineError::NotFound(_) => "not_found",
        }
    }
}

/// Failure reported by an external lifecycle procedure.
///
/// `Clone` because one failure may be observed by every caller attached to
/// the same unload handle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{app}: {message}")]
pub struct LifecycleError {
    app: String,
    message: String,
}

impl LifecycleError {
    pub fn new(app: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            message: message.into(),
        }
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnloadError {
    #[error("unload failed: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// The coordinator went away before the request was settled.
    #[error("unload of '{app}' was abandoned before it settled")]
    Abandoned { app: String },
}
