//! Layered configuration loading.
//!
//! Later layers win: built-in defaults, the user file, `portcullis.toml`,
//! `portcullis.local.toml`, then the environment.

use crate::{Paths, PortcullisConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Separates sections from keys in environment names:
/// `PORTCULLIS_GATE__FORBIDDEN_STATUS` sets `gate.forbidden_status`.
const ENV_SEPARATOR: &str = "__";

/// Builds a [`PortcullisConfig`] from every configured source.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    env_vars: Option<config::Map<String, String>>,
    user_config: bool,
}

impl ConfigLoader {
    /// Loader rooted at the working directory, reading `PORTCULLIS_*`.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "PORTCULLIS".to_string(),
            env_vars: None,
            user_config: true,
        }
    }

    /// Directory holding `portcullis.toml` and `portcullis.local.toml`.
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Reads environment overrides from `vars` instead of the process
    /// environment. Names still carry the prefix.
    pub fn with_env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        );
        self
    }

    /// Ignores the per-user config file.
    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// Merges all layers and validates the result.
    pub fn load(self) -> Result<PortcullisConfig> {
        let defaults = PortcullisConfig::default();
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&defaults)?);

        let user_file = self
            .user_config
            .then(|| Paths::new().user_config_file().ok())
            .flatten();
        let files = user_file.into_iter().chain([
            Paths::project_config_file(&self.project_dir),
            Paths::local_config_file(&self.project_dir),
        ]);
        for file in files.filter(|file| file.exists()) {
            builder = builder.add_source(
                config::File::from(file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(self.env_vars),
        );

        let config: PortcullisConfig = builder
            .build()
            .context("Failed to merge configuration sources")?
            .try_deserialize()
            .context("Configuration does not match the expected shape")?;

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Like [`load`](Self::load), falling back to the defaults on any error.
    pub fn load_or_default(self) -> PortcullisConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
