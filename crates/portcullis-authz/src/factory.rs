//! Identity factories.
//!
//! A factory turns the raw `user` / `party` record of a session into an
//! [`Identity`]. Factories are injected per authorizer; any closure with the
//! right shape is a factory too.

use std::{str::FromStr, sync::Arc};

use portcullis_types::IdentityKind;
use serde_json::{Map, Value};

use crate::error::{AuthzError, FactoryError};
use crate::identity::{GROUPS_FIELD, ID_FIELD, Identity, RecordIdentity};

/// Builds an identity from the session data of one kind.
pub trait IdentityFactory {
    fn create(
        &self,
        kind: IdentityKind,
        data: &Map<String, Value>,
    ) -> Result<Arc<dyn Identity>, FactoryError>;
}

impl<F> IdentityFactory for F
where
    F: Fn(IdentityKind, &Map<String, Value>) -> Result<Arc<dyn Identity>, FactoryError>,
{
    fn create(
        &self,
        kind: IdentityKind,
        data: &Map<String, Value>,
    ) -> Result<Arc<dyn Identity>, FactoryError> {
        self(kind, data)
    }
}

/// Copies the record verbatim for both kinds.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericFactory;

impl IdentityFactory for GenericFactory {
    fn create(
        &self,
        _kind: IdentityKind,
        data: &Map<String, Value>,
    ) -> Result<Arc<dyn Identity>, FactoryError> {
        Ok(Arc::new(RecordIdentity::from_data(data.clone())))
    }
}

/// Strips `id` and `authz_groups` from party records.
///
/// A visiting party never inherits user-level groups; only the group
/// implied by its email applies. User records pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivacyPreservingFactory;

impl IdentityFactory for PrivacyPreservingFactory {
    fn create(
        &self,
        kind: IdentityKind,
        data: &Map<String, Value>,
    ) -> Result<Arc<dyn Identity>, FactoryError> {
        let mut data = data.clone();

        if kind == IdentityKind::Party {
            data.remove(ID_FIELD);
            data.remove(GROUPS_FIELD);
        }

        Ok(Arc::new(RecordIdentity::from_data(data)))
    }
}

/// Names a built-in factory, for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FactoryKind {
    /// [`GenericFactory`].
    Generic,

    /// [`PrivacyPreservingFactory`].
    #[default]
    PrivacyPreserving,
}

impl FactoryKind {
    /// Returns the configuration name of this factory.
    pub fn name(self) -> &'static str {
        match self {
            FactoryKind::Generic => "generic",
            FactoryKind::PrivacyPreserving => "privacy-preserving",
        }
    }

    /// Instantiates the named factory.
    pub fn build(self) -> Box<dyn IdentityFactory> {
        match self {
            FactoryKind::Generic => Box::new(GenericFactory),
            FactoryKind::PrivacyPreserving => Box::new(PrivacyPreservingFactory),
        }
    }
}

impl FromStr for FactoryKind {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generic" => Ok(FactoryKind::Generic),
            "privacy-preserving" => Ok(FactoryKind::PrivacyPreserving),
            other => Err(AuthzError::InvalidConfiguration(format!(
                "unknown identity factory {other:?} (expected \"generic\" or \"privacy-preserving\")"
            ))),
        }
    }
}
