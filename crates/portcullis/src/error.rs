//! Facade error types.

use portcullis_authz::AuthzError;
use portcullis_config::ConfigError;
use portcullis_gate::GateError;
use thiserror::Error;

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, PortcullisError>;

/// Errors raised while assembling authorizers and gates.
#[derive(Debug, Error)]
pub enum PortcullisError {
    /// Authorizer error.
    #[error("authorization error: {0}")]
    Authz(#[from] AuthzError),

    /// Gate error.
    #[error("gate error: {0}")]
    Gate(#[from] GateError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
