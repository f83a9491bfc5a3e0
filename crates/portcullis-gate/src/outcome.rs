//! Denial outcomes.
//!
//! Each gate carries two outcome policies: one for sessions without an
//! identity, one for identities outside the required group. A policy is
//! either a fixed status code or a callback producing the response.

use std::{fmt, str::FromStr};

use crate::error::{GateError, GateResult};

/// A validated HTTP status code (100..=599).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const UNAUTHORIZED: StatusCode = StatusCode(401);
    pub const FORBIDDEN: StatusCode = StatusCode(403);

    /// Validates a status code.
    pub fn new(code: u16) -> GateResult<Self> {
        if (100..=599).contains(&code) {
            Ok(Self(code))
        } else {
            Err(GateError::InvalidConfiguration(format!(
                "status code must be between 100 and 599, got {code}"
            )))
        }
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StatusCode {
    type Err = GateError;

    /// Accepts digit strings only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GateError::InvalidConfiguration(format!(
                "outcome should be a status code or a callback, got {s:?}"
            )));
        }

        let code = s.parse::<u16>().map_err(|_| {
            GateError::InvalidConfiguration(format!("status code out of range: {s}"))
        })?;
        Self::new(code)
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = GateError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::new(code)
    }
}

/// Callback producing a denial response from the request and the response.
pub type OutcomeCallback<Req, Resp> = Box<dyn Fn(&Req, Resp) -> Resp>;

/// What the gate answers when it denies a request.
pub enum OutcomePolicy<Req, Resp> {
    /// Respond with this status and the deny body.
    Status(StatusCode),

    /// Return whatever the callback produces, verbatim.
    Callback(OutcomeCallback<Req, Resp>),
}

impl<Req, Resp> OutcomePolicy<Req, Resp> {
    /// A fixed-status policy, validated.
    pub fn status(code: u16) -> GateResult<Self> {
        StatusCode::new(code).map(OutcomePolicy::Status)
    }

    /// A callback policy.
    pub fn callback(callback: impl Fn(&Req, Resp) -> Resp + 'static) -> Self {
        OutcomePolicy::Callback(Box::new(callback))
    }

    /// Returns the fixed status, if this is a status policy.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            OutcomePolicy::Status(code) => Some(*code),
            OutcomePolicy::Callback(_) => None,
        }
    }
}

impl<Req, Resp> From<StatusCode> for OutcomePolicy<Req, Resp> {
    fn from(code: StatusCode) -> Self {
        OutcomePolicy::Status(code)
    }
}

impl<Req, Resp> FromStr for OutcomePolicy<Req, Resp> {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(OutcomePolicy::Status)
    }
}

impl<Req, Resp> fmt::Debug for OutcomePolicy<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomePolicy::Status(code) => f.debug_tuple("Status").field(code).finish(),
            OutcomePolicy::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}
