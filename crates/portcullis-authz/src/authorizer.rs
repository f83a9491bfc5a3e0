//! The authorizer.
//!
//! Owns one session record and answers group-membership and privilege
//! questions about the identity it carries.

use std::{cell::RefCell, sync::Arc};

use portcullis_types::{
    IdentityKind, MEMBERSHIP_PRIVILEGE, PermissionSpec, Privileges, SessionRecord,
};
use tracing::{debug, error, warn};

use crate::error::{AuthzError, Result};
use crate::factory::{FactoryKind, IdentityFactory, PrivacyPreservingFactory};
use crate::identity::Identity;
use crate::matcher::{GroupMatcher, PermissionMatcher};
use crate::subject::Permissions;

/// Memoized outcome of identity resolution.
///
/// `Anonymous` is a settled answer, distinct from `Unresolved`: a session
/// without an identity is inspected once, like any other.
#[derive(Debug, Clone, Default)]
enum IdentityState {
    #[default]
    Unresolved,
    Anonymous,
    Resolved(Arc<dyn Identity>),
}

/// Authorization decisions for a single session.
///
/// Identity resolution is lazy and happens at most once per instance, so a
/// factory that performs remote lookups runs at most once. An authorizer is
/// meant to live for one request; it is `!Sync` and cannot be shared
/// across threads without external synchronization.
pub struct Authorizer {
    session: SessionRecord,
    factory: Box<dyn IdentityFactory>,
    matcher: Box<dyn PermissionMatcher>,
    identity: RefCell<IdentityState>,
}

impl Authorizer {
    /// Creates an authorizer with the privacy-preserving factory and the
    /// built-in [`GroupMatcher`].
    pub fn new(session: impl Into<SessionRecord>) -> Self {
        Self {
            session: session.into(),
            factory: Box::new(PrivacyPreservingFactory),
            matcher: Box::new(GroupMatcher),
            identity: RefCell::new(IdentityState::Unresolved),
        }
    }

    /// Replaces the identity factory.
    #[must_use]
    pub fn with_factory(mut self, factory: impl IdentityFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    /// Replaces the identity factory with a built-in one.
    #[must_use]
    pub fn with_factory_kind(mut self, kind: FactoryKind) -> Self {
        self.factory = kind.build();
        self
    }

    /// Replaces the permission matcher.
    #[must_use]
    pub fn with_matcher(mut self, matcher: impl PermissionMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    /// Returns the session record, unchanged.
    pub fn session(&self) -> &SessionRecord {
        &self.session
    }

    /// Returns the session identity, resolving it on first use.
    ///
    /// `user` takes precedence over `party`; a `null` value counts as
    /// absent. Returns `Ok(None)` for an anonymous session, and also when
    /// the winning key holds something other than an object. A factory failure is returned as
    /// [`AuthzError::Factory`] and is not memoized.
    pub fn identity(&self) -> Result<Option<Arc<dyn Identity>>> {
        if let Some(settled) = self.settled() {
            return Ok(settled);
        }

        let state = self.resolve()?;
        let settled = match &state {
            IdentityState::Resolved(identity) => Some(Arc::clone(identity)),
            _ => None,
        };
        *self.identity.borrow_mut() = state;

        Ok(settled)
    }

    /// Returns whether the session carries an identity, resolving it if needed.
    pub fn has_identity(&self) -> Result<bool> {
        Ok(self.identity()?.is_some())
    }

    /// Returns the authorization groups of the session identity.
    ///
    /// An anonymous session has no groups.
    pub fn groups(&self) -> Result<Vec<String>> {
        Ok(self
            .identity()?
            .map(|identity| identity.groups())
            .unwrap_or_default())
    }

    /// Checks whether the session identity is in `group`.
    ///
    /// The check runs through the permission matcher as a singleton
    /// membership spec, so group patterns behave exactly like they do in
    /// privilege decisions.
    pub fn is_in_group(&self, group: &str) -> Result<bool> {
        let groups = self.groups()?;
        let granted = self
            .matcher
            .matches(&PermissionSpec::membership(group), &groups);
        let member = granted.contains(MEMBERSHIP_PRIVILEGE);

        debug!(group = %group, member, "Group membership checked");
        Ok(member)
    }

    /// Checks whether the session identity holds at least one of
    /// `privileges` under the given permissions.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::InvalidArgument`] if `permissions` is raw JSON
    /// that does not decode to a specification. The matcher is not called
    /// in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use portcullis_authz::Authorizer;
    /// use portcullis_types::PermissionSpec;
    /// use serde_json::json;
    ///
    /// let session = json!({ "user": { "authz_groups": ["user"] } });
    /// let authz = Authorizer::new(session.as_object().cloned().unwrap_or_default());
    ///
    /// let spec = PermissionSpec::new()
    ///     .grant("user", ["read"])
    ///     .grant("admin", ["full"]);
    ///
    /// assert!(authz.is_allowed("read", &spec)?);
    /// assert!(!authz.is_allowed(["write", "full"], &spec)?);
    /// # Ok::<(), portcullis_authz::AuthzError>(())
    /// ```
    pub fn is_allowed<'a>(
        &self,
        privileges: impl Into<Privileges>,
        permissions: impl Into<Permissions<'a>>,
    ) -> Result<bool> {
        let privileges = privileges.into();
        let source = permissions.into().validate()?;

        let groups = self.groups()?;
        let spec = source.into_spec();
        let granted = self.matcher.matches(&spec, &groups);
        let allowed = privileges.intersects(&granted);

        debug!(
            privileges = %privileges,
            granted = ?granted,
            allowed,
            "Privilege decision"
        );
        Ok(allowed)
    }

    fn settled(&self) -> Option<Option<Arc<dyn Identity>>> {
        match &*self.identity.borrow() {
            IdentityState::Unresolved => None,
            IdentityState::Anonymous => Some(None),
            IdentityState::Resolved(identity) => Some(Some(Arc::clone(identity))),
        }
    }

    fn resolve(&self) -> Result<IdentityState> {
        let Some(kind) = self.session.identity_kind() else {
            debug!("Session carries no identity");
            return Ok(IdentityState::Anonymous);
        };

        // A malformed payload under the winning key does not hand the
        // session over to a lower-precedence kind.
        let Some(data) = self.session.identity_data(kind) else {
            warn!(kind = %kind, "Identity data is not an object, treating session as anonymous");
            return Ok(IdentityState::Anonymous);
        };

        match self.factory.create(kind, data) {
            Ok(identity) => {
                debug!(kind = %kind, "Identity resolved");
                Ok(IdentityState::Resolved(identity))
            }
            Err(source) => {
                error!(kind = %kind, error = %source, "Identity factory failed");
                Err(AuthzError::Factory { kind, source })
            }
        }
    }
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("session", &self.session)
            .field("identity", &self.identity.borrow())
            .finish_non_exhaustive()
    }
}
