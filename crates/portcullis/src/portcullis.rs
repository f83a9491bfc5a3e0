//! Main entry point for Portcullis.
//!
//! `Portcullis` holds a validated configuration and hands out one
//! [`Authorizer`] and one [`Gate`] per request. Nothing it creates is shared
//! between requests.

use std::path::Path;

use portcullis_authz::{Authorizer, FactoryKind};
use portcullis_config::PortcullisConfig;
use portcullis_gate::{Gate, OutcomePolicy, PipelineRequest, PipelineResponse, StatusCode};
use portcullis_types::SessionRecord;
use tracing::debug;

use crate::error::Result;

/// Builds per-request authorizers and gates from configuration.
#[derive(Debug, Clone)]
pub struct Portcullis {
    config: PortcullisConfig,
    factory: FactoryKind,
    no_identity_status: StatusCode,
    forbidden_status: StatusCode,
}

impl Portcullis {
    /// Validates `config` and prepares it for use.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error for an out-of-range status and
    /// with `InvalidConfiguration` for an unknown identity factory.
    pub fn new(config: PortcullisConfig) -> Result<Self> {
        config.validate()?;

        let factory = config.identity.factory.parse::<FactoryKind>()?;
        let no_identity_status = StatusCode::new(config.gate.no_identity_status)?;
        let forbidden_status = StatusCode::new(config.gate.forbidden_status)?;

        debug!(
            factory = factory.name(),
            no_identity_status = %no_identity_status,
            forbidden_status = %forbidden_status,
            audit = config.gate.audit,
            "Portcullis configured"
        );

        Ok(Self {
            config,
            factory,
            no_identity_status,
            forbidden_status,
        })
    }

    /// Loads configuration from the default locations.
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self::new(PortcullisConfig::load()?)?)
    }

    /// Loads configuration for a specific project directory.
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(PortcullisConfig::load_from_dir(project_dir)?)?)
    }

    pub fn config(&self) -> &PortcullisConfig {
        &self.config
    }

    pub fn factory_kind(&self) -> FactoryKind {
        self.factory
    }

    /// Creates an authorizer for one session, using the configured factory.
    pub fn authorizer(&self, session: impl Into<SessionRecord>) -> Authorizer {
        Authorizer::new(session).with_factory_kind(self.factory)
    }

    /// Creates a gate over `authorizer` with the configured outcomes.
    pub fn gate<'a, Req, Resp>(&self, authorizer: &'a Authorizer) -> Gate<'a, Req, Resp>
    where
        Req: PipelineRequest,
        Resp: PipelineResponse,
    {
        self.gate_with(
            authorizer,
            OutcomePolicy::Status(self.no_identity_status),
            OutcomePolicy::Status(self.forbidden_status),
        )
    }

    /// Creates a gate with custom outcome policies, keeping the configured
    /// deny body and audit setting.
    pub fn gate_with<'a, Req, Resp>(
        &self,
        authorizer: &'a Authorizer,
        on_no_identity: OutcomePolicy<Req, Resp>,
        on_forbidden: OutcomePolicy<Req, Resp>,
    ) -> Gate<'a, Req, Resp>
    where
        Req: PipelineRequest,
        Resp: PipelineResponse,
    {
        let gate = Gate::new(authorizer, on_no_identity, on_forbidden)
            .with_deny_body(self.config.gate.deny_body.clone());

        if self.config.gate.audit {
            gate
        } else {
            gate.without_audit()
        }
    }
}

impl Default for Portcullis {
    fn default() -> Self {
        Self {
            config: PortcullisConfig::default(),
            factory: FactoryKind::default(),
            no_identity_status: StatusCode::UNAUTHORIZED,
            forbidden_status: StatusCode::FORBIDDEN,
        }
    }
}
