//! # portcullis-gate: Request-pipeline gate
//!
//! Guards the next stage of a request pipeline with a single
//! required-group check:
//!
//! 1. the required group comes from the `authz` request attribute, else
//!    from the matched route's `authz` field (or its deprecated `auth`);
//! 2. unguarded requests and group members continue to the next stage;
//! 3. everyone else gets the `on_no_identity` outcome (no identity in the
//!    session) or the `on_forbidden` outcome (identity outside the group).
//!
//! ```
//! use portcullis_authz::Authorizer;
//! use portcullis_gate::{Gate, Request, Response};
//! use portcullis_types::SessionRecord;
//!
//! let authz = Authorizer::new(SessionRecord::anonymous());
//! let gate = Gate::with_defaults(&authz);
//!
//! let request = Request::new("GET", "/documents").with_attribute("authz", "user");
//! let response = gate.handle(&request, Response::new(), |_, response| response);
//!
//! assert_eq!(response.status(), 401);
//! assert_eq!(response.body(), "access denied");
//! ```

pub mod context;
pub mod error;
pub mod gate;
pub mod outcome;


// Re-export commonly used types
pub use context::{PipelineRequest, PipelineResponse, Request, Response};
pub use error::{GateError, GateResult};
pub use gate::{AuthorizerGateExt, Gate};
pub use outcome::{OutcomeCallback, OutcomePolicy, StatusCode};
