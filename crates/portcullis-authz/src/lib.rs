//! # portcullis-authz: Session authorization
//!
//! Resolves the acting identity of a session, derives its authorization
//! groups and decides whether it may exercise a privilege:
//! - **Identity resolution** (`user` before `party`, lazy, memoized)
//! - **Pluggable identity factories** (generic or privacy-preserving)
//! - **Group membership checks**
//! - **Privilege decisions** against a permission specification or a subject
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  SessionRecord        │  { "user": {...} } | { "party": {...} } | {}
//! └──────────┬───────────┘
//!            │ IdentityFactory (at most once)
//!            ▼
//! ┌──────────────────────┐
//! │  Identity             │  groups() = authz_groups + email
//! └──────────┬───────────┘
//!            │ PermissionMatcher(spec, groups)
//!            ▼
//! ┌──────────────────────┐
//! │  Granted privileges   │  ∩ requested ≠ ∅  →  allowed
//! └──────────────────────┘
//! ```
//!
//! ## Permission specifications
//!
//! Specifications map **group patterns to privileges**:
//!
//! ```
//! use portcullis_authz::{Authorizer, GenericFactory};
//! use portcullis_types::PermissionSpec;
//! use serde_json::json;
//!
//! let session = json!({
//!     "user": {
//!         "id": "12345",
//!         "email": "john@example.com",
//!         "authz_groups": ["user", "/organizations/889900/users"]
//!     }
//! });
//! let authz = Authorizer::new(session.as_object().cloned().unwrap_or_default())
//!     .with_factory(GenericFactory);
//!
//! let spec = PermissionSpec::new()
//!     .grant("user", ["read"])
//!     .grant("/organizations/*/users", ["write"])
//!     .grant("admin", ["full"]);
//!
//! assert!(authz.is_in_group("user")?);
//! assert!(authz.is_allowed("write", &spec)?);
//! assert!(!authz.is_allowed("full", &spec)?);
//! # Ok::<(), portcullis_authz::AuthzError>(())
//! ```
//!
//! ## Parties
//!
//! A session may carry a `party` instead of a `user`: someone acting on
//! their own behalf without an account. The default
//! [`PrivacyPreservingFactory`] drops a party's `id` and `authz_groups`, so
//! only the group implied by its email applies.

pub mod authorizer;
pub mod error;
pub mod factory;
pub mod identity;
pub mod matcher;
pub mod subject;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use authorizer::Authorizer;
pub use error::{AuthzError, FactoryError, Result};
pub use factory::{FactoryKind, GenericFactory, IdentityFactory, PrivacyPreservingFactory};
pub use identity::{Identity, RecordIdentity};
pub use matcher::{GroupMatcher, PermissionMatcher};
pub use subject::{Permissions, Subject};
