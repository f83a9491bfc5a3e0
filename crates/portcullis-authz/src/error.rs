//! Error types for identity resolution and privilege decisions.

use portcullis_types::IdentityKind;
use thiserror::Error;

/// Result type for authorizer operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

/// Errors raised by the authorizer.
///
/// A missing identity, a missing group or an ungranted privilege are not
/// errors: they are ordinary `false` / `None` answers.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A collaborator was configured with something it cannot use.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An operation received an argument it cannot interpret.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The identity factory failed to build the session identity.
    #[error("failed to build {kind} identity: {source}")]
    Factory {
        kind: IdentityKind,
        #[source]
        source: FactoryError,
    },
}

/// Failure reported by an identity factory.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FactoryError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FactoryError {
    /// Creates a factory error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a factory error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
