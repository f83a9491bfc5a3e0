//! Portcullis settings: which identity factory to use and how the gate
//! answers denials.
//!
//! [`ConfigLoader`] merges these sources, each overriding the previous one:
//! built-in defaults, `~/.config/portcullis/config.toml`, `portcullis.toml`,
//! `portcullis.local.toml`, and `PORTCULLIS_<SECTION>__<KEY>` environment
//! variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Default status for requests whose session carries no identity.
pub const DEFAULT_NO_IDENTITY_STATUS: u16 = 401;

/// Default status for identities outside the required group.
pub const DEFAULT_FORBIDDEN_STATUS: u16 = 403;

/// Default body written on a status-code denial.
pub const DEFAULT_DENY_BODY: &str = "access denied";

/// Complete Portcullis settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortcullisConfig {
    pub identity: IdentityConfig,
    pub gate: GateConfig,
}

/// How session identities are built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Built-in factory name: `generic` or `privacy-preserving`
    pub factory: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            factory: "privacy-preserving".to_string(),
        }
    }
}

/// Outcomes of the pipeline gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub no_identity_status: u16,
    pub forbidden_status: u16,
    pub deny_body: String,
    /// Log every gate decision
    pub audit: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            no_identity_status: DEFAULT_NO_IDENTITY_STATUS,
            forbidden_status: DEFAULT_FORBIDDEN_STATUS,
            deny_body: DEFAULT_DENY_BODY.to_string(),
            audit: true,
        }
    }
}

impl GateConfig {
    /// Reject status codes that are not valid HTTP statuses
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, status) in [
            ("gate.no_identity_status", self.no_identity_status),
            ("gate.forbidden_status", self.forbidden_status),
        ] {
            if !(100..=599).contains(&status) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 100 and 599, got {status}"
                )));
            }
        }
        Ok(())
    }
}

impl PortcullisConfig {
    /// Load configuration from default locations
    pub fn load() -> anyhow::Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file, without layering
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gate.validate()
    }
}
