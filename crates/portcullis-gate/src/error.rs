//! Gate error types.

use thiserror::Error;

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;

/// Errors raised by the pipeline gate.
///
/// Denials are never errors: they are turned into responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// An outcome policy or status code cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A request carries something the gate cannot interpret.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
