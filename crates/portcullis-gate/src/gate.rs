//! The pipeline gate.
//!
//! Allows or denies a request before its handler runs, based on a single
//! required-group check against the session authorizer.

use std::borrow::Cow;

use portcullis_authz::Authorizer;
use portcullis_config::{DEFAULT_DENY_BODY, GateConfig};
use portcullis_types::json_type_name;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::context::{PipelineRequest, PipelineResponse};
use crate::error::{GateError, GateResult};
use crate::outcome::{OutcomePolicy, StatusCode};

/// Request attribute naming the required group directly.
pub const AUTHZ_ATTRIBUTE: &str = "authz";

/// Request attribute holding the matched route.
pub const ROUTE_ATTRIBUTE: &str = "route";

/// Deprecated route field, read when `authz` is absent.
pub const LEGACY_ROUTE_FIELD: &str = "auth";

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Denial {
    NoIdentity,
    Forbidden,
}

impl Denial {
    fn as_str(self) -> &'static str {
        match self {
            Denial::NoIdentity => "no_identity",
            Denial::Forbidden => "forbidden",
        }
    }
}

/// Gate enforcing a required group in front of the next pipeline stage.
///
/// A gate borrows the per-request [`Authorizer`]; it holds no state of its
/// own between invocations and performs at most one membership check and
/// one outcome call per request.
pub struct Gate<'a, Req, Resp> {
    authorizer: &'a Authorizer,
    on_no_identity: OutcomePolicy<Req, Resp>,
    on_forbidden: OutcomePolicy<Req, Resp>,
    deny_body: Cow<'static, str>,
    audit_enabled: bool,
}

impl<'a, Req, Resp> Gate<'a, Req, Resp>
where
    Req: PipelineRequest,
    Resp: PipelineResponse,
{
    /// Creates a gate with explicit outcome policies.
    pub fn new(
        authorizer: &'a Authorizer,
        on_no_identity: OutcomePolicy<Req, Resp>,
        on_forbidden: OutcomePolicy<Req, Resp>,
    ) -> Self {
        Self {
            authorizer,
            on_no_identity,
            on_forbidden,
            deny_body: Cow::Borrowed(DEFAULT_DENY_BODY),
            audit_enabled: true,
        }
    }

    /// Creates a gate answering 401 without identity and 403 otherwise.
    pub fn with_defaults(authorizer: &'a Authorizer) -> Self {
        Self::new(
            authorizer,
            OutcomePolicy::Status(StatusCode::UNAUTHORIZED),
            OutcomePolicy::Status(StatusCode::FORBIDDEN),
        )
    }

    /// Creates a gate from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidConfiguration`] if a configured status
    /// is not a valid HTTP status.
    pub fn from_config(authorizer: &'a Authorizer, config: &GateConfig) -> GateResult<Self> {
        let gate = Self::new(
            authorizer,
            OutcomePolicy::status(config.no_identity_status)?,
            OutcomePolicy::status(config.forbidden_status)?,
        )
        .with_deny_body(config.deny_body.clone());

        Ok(if config.audit {
            gate
        } else {
            gate.without_audit()
        })
    }

    /// Replaces the body written on a status-code denial.
    #[must_use]
    pub fn with_deny_body(mut self, body: impl Into<Cow<'static, str>>) -> Self {
        self.deny_body = body.into();
        self
    }

    /// Disables decision logging (for testing).
    #[must_use]
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    pub fn authorizer(&self) -> &Authorizer {
        self.authorizer
    }

    pub fn on_no_identity(&self) -> &OutcomePolicy<Req, Resp> {
        &self.on_no_identity
    }

    pub fn on_forbidden(&self) -> &OutcomePolicy<Req, Resp> {
        &self.on_forbidden
    }

    /// Determines the group a request requires.
    ///
    /// **Lookup order:**
    /// 1. the `authz` request attribute
    /// 2. the `authz` field of the `route` attribute
    /// 3. the deprecated `auth` field of the `route` attribute
    ///
    /// Returns `Ok(None)` for an unguarded request. A `null` counts as
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidArgument`] if the group is set to
    /// something other than a string, or if `route` is not an object.
    /// Neither is coerced: `authz = 42` is not checked as group `"42"`, and
    /// a scalar `route` does not leave the request unguarded.
    /// [`handle`](Self::handle) denies such requests.
    pub fn required_group(request: &Req) -> GateResult<Option<String>> {
        if let Some(value) = present(request.attribute(AUTHZ_ATTRIBUTE)) {
            return group_name(AUTHZ_ATTRIBUTE, value).map(Some);
        }

        let Some(route) = present(request.attribute(ROUTE_ATTRIBUTE)) else {
            return Ok(None);
        };

        let Some(route) = route.as_object() else {
            return Err(GateError::InvalidArgument(format!(
                "route attribute should be an object, found {}",
                json_type_name(route)
            )));
        };

        match present(route.get(AUTHZ_ATTRIBUTE)) {
            Some(value) => group_name("route.authz", value).map(Some),
            None => present(route.get(LEGACY_ROUTE_FIELD))
                .map(|value| group_name("route.auth", value))
                .transpose(),
        }
    }

    /// Runs the gate in front of `next`.
    ///
    /// Unguarded requests and members of the required group are handed to
    /// `next` unchanged. Everything else is answered by the outcome policy
    /// for the situation: `on_no_identity` when the session carries no
    /// identity, `on_forbidden` otherwise. A denial is always a response,
    /// never an error.
    pub fn handle<N>(&self, request: &Req, response: Resp, next: N) -> Resp
    where
        N: FnOnce(&Req, Resp) -> Resp,
    {
        let group = match Self::required_group(request) {
            Ok(Some(group)) => group,
            Ok(None) => return next(request, response),
            Err(e) => {
                warn!(error = %e, "Malformed access requirement, denying request");
                let denial = self.classify();
                return self.deny(request, response, None, denial);
            }
        };

        match self.authorizer.is_in_group(&group) {
            Ok(true) => {
                if self.audit_enabled {
                    info!(group = %group, "Access granted");
                }
                next(request, response)
            }
            Ok(false) => {
                let denial = self.classify();
                self.deny(request, response, Some(&group), denial)
            }
            Err(e) => {
                error!(group = %group, error = %e, "Identity resolution failed, denying request");
                self.deny(request, response, Some(&group), Denial::NoIdentity)
            }
        }
    }

    /// Picks the denial for the authorizer's current identity.
    fn classify(&self) -> Denial {
        match self.authorizer.identity() {
            Ok(Some(_)) => Denial::Forbidden,
            Ok(None) | Err(_) => Denial::NoIdentity,
        }
    }

    fn deny(&self, request: &Req, response: Resp, group: Option<&str>, denial: Denial) -> Resp {
        if self.audit_enabled {
            warn!(
                group = group.unwrap_or("<malformed>"),
                outcome = denial.as_str(),
                "Access denied"
            );
        }

        let policy = match denial {
            Denial::NoIdentity => &self.on_no_identity,
            Denial::Forbidden => &self.on_forbidden,
        };

        match policy {
            OutcomePolicy::Callback(callback) => callback(request, response),
            OutcomePolicy::Status(status) => {
                let mut denied = response.with_status(status.as_u16());
                denied.write_body(&self.deny_body);
                denied
            }
        }
    }
}

/// Creates gates from an authorizer.
pub trait AuthorizerGateExt {
    /// Wraps the authorizer in a gate with the given outcome policies.
    fn as_gate<Req, Resp>(
        &self,
        on_no_identity: OutcomePolicy<Req, Resp>,
        on_forbidden: OutcomePolicy<Req, Resp>,
    ) -> Gate<'_, Req, Resp>
    where
        Req: PipelineRequest,
        Resp: PipelineResponse;
}

impl AuthorizerGateExt for Authorizer {
    fn as_gate<Req, Resp>(
        &self,
        on_no_identity: OutcomePolicy<Req, Resp>,
        on_forbidden: OutcomePolicy<Req, Resp>,
    ) -> Gate<'_, Req, Resp>
    where
        Req: PipelineRequest,
        Resp: PipelineResponse,
    {
        Gate::new(self, on_no_identity, on_forbidden)
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn group_name(source: &str, value: &Value) -> GateResult<String> {
    value.as_str().map(str::to_string).ok_or_else(|| {
        GateError::InvalidArgument(format!(
            "{source} should name a group, found {}",
            json_type_name(value)
        ))
    })
}
