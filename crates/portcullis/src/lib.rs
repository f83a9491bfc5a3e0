//! # Portcullis
//!
//! Session authorization and request gating.
//!
//! A session record carries at most one acting identity (a `user`, or
//! failing that a `party`). Portcullis resolves it lazily, derives its
//! authorization groups and answers two questions:
//!
//! - **Is the identity in a group?** ([`Authorizer::is_in_group`])
//! - **May it exercise a privilege?** ([`Authorizer::is_allowed`])
//!
//! The [`Gate`] puts the first question in front of a request pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Portcullis                        │
//! │  ┌─────────┐   ┌──────────┐   ┌──────────┐   ┌────────┐  │
//! │  │ Session │ → │ Identity │ → │ Matcher  │ → │  Gate  │  │
//! │  │ (JSON)  │   │(factory) │   │ (groups) │   │(allow) │  │
//! │  └─────────┘   └──────────┘   └──────────┘   └────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use portcullis::{PipelineResponse, Portcullis, Request, Response, SessionRecord};
//! use serde_json::json;
//!
//! let portcullis = Portcullis::default();
//!
//! let session = SessionRecord::try_from(json!({
//!     "user": { "email": "john@example.com", "authz_groups": ["user"] }
//! }))?;
//! let authz = portcullis.authorizer(session);
//! let gate = portcullis.gate(&authz);
//!
//! let request = Request::new("GET", "/admin").with_attribute("authz", "admin");
//! let response = gate.handle(&request, Response::new(), |_, response| response.with_status(204));
//!
//! assert_eq!(response.status(), 403);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod portcullis;


pub use error::{PortcullisError, Result};
pub use portcullis::Portcullis;

// Re-export shared value types
pub use portcullis_types::{
    IdentityKind, MEMBERSHIP_PRIVILEGE, PermissionSpec, Privileges, SessionRecord, TypesError,
};

// Re-export the authorizer
pub use portcullis_authz::{
    Authorizer, AuthzError, FactoryError, FactoryKind, GenericFactory, GroupMatcher, Identity,
    IdentityFactory, PermissionMatcher, Permissions, PrivacyPreservingFactory, RecordIdentity,
    Subject,
};

// Re-export the gate
pub use portcullis_gate::{
    AuthorizerGateExt, Gate, GateError, OutcomeCallback, OutcomePolicy, PipelineRequest,
    PipelineResponse, Request, Response, StatusCode,
};

// Re-export configuration
pub use portcullis_config::{ConfigError, ConfigLoader, GateConfig, IdentityConfig, PortcullisConfig};
