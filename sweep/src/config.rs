//! Cleanup run configuration.
//!
//! Settings load from a JSON file merged over built-in defaults, with
//! `SWEEP_*` environment variables overriding both. The file location comes
//! from `--config`, falling back to `config.json` in the working directory,
//! then `config.json` under the user configuration directory.

use config::{Config as ConfigRs, Environment, File, FileFormat};
use libsweep::error::{Result, SweepError};
use libsweep::{Credentials, RetentionPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Root settings structure.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Settings {
    #[serde(default)]
    pub registry: Registry,
    #[serde(default)]
    pub cleanup: Cleanup,
    #[serde(default)]
    pub paths: Paths,
}

/// Registry endpoint, credential, and container name.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registry {
    /// Base URL of the registry. Required; everything else has a default.
    #[serde(default)]
    pub url: String,
    /// Basic-auth username
    #[serde(default)]
    pub user: String,
    /// Basic-auth password
    #[serde(default)]
    pub password: String,
    /// Name of the container running the registry, used for storage
    /// measurement and garbage collection
    #[serde(default = "default_container")]
    pub container: String,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            container: default_container(),
        }
    }
}

fn default_container() -> String {
    "registry".to_string()
}

/// Retention policy settings.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cleanup {
    /// Tags younger than this many days are kept
    #[serde(default = "default_days_to_keep")]
    pub days_to_keep: i64,
    /// Tags kept on exact match
    #[serde(default)]
    pub protected_tags: Vec<String>,
    /// Tags kept on case-insensitive substring match
    #[serde(default)]
    pub protected_patterns: Vec<String>,
    #[serde(default)]
    pub age_reference: AgeReference,
}

impl Default for Cleanup {
    fn default() -> Self {
        Self {
            days_to_keep: default_days_to_keep(),
            protected_tags: Vec::new(),
            protected_patterns: Vec::new(),
            age_reference: AgeReference::default(),
        }
    }
}

fn default_days_to_keep() -> i64 {
    30
}

/// The reference timestamp for age arithmetic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AgeReference {
    /// A fresh wall-clock timestamp per tag
    #[default]
    PerTag,
    /// One timestamp captured when the run starts
    RunStart,
}

/// Paths used by storage measurement and garbage collection.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paths {
    /// Registry configuration file inside the container, handed to the
    /// garbage collector
    #[serde(default = "default_registry_config")]
    pub config: String,
    /// Storage root inside the container
    #[serde(default = "default_storage")]
    pub storage: String,
    /// Storage root as mounted on the host, when visible from this process
    #[serde(default)]
    pub host_storage: Option<String>,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            config: default_registry_config(),
            storage: default_storage(),
            host_storage: None,
        }
    }
}

fn default_registry_config() -> String {
    "/etc/docker/registry/config.yml".to_string()
}

fn default_storage() -> String {
    "/var/lib/registry".to_string()
}

impl Settings {
    /// Parses `Settings` from a JSON string.
    ///
    /// This function is primarily used for testing.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let builder = Self::builder()?.add_source(File::from_str(s, FileFormat::Json));
        Self::from_builder(builder)
    }

    /// Loads settings from an explicit path, or from the default locations.
    ///
    /// An explicit path must exist. Without one, `config.json` in the
    /// working directory is tried, then the user configuration directory;
    /// when neither exists the built-in defaults apply. Environment
    /// variables prefixed `SWEEP_` override everything, with `__` as the
    /// nesting separator (`SWEEP_REGISTRY__URL`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder()?;

        match path {
            Some(explicit) => {
                builder = builder.add_source(File::from(explicit).required(true));
            }
            None => {
                if let Some(found) = Self::discover_path() {
                    builder = builder.add_source(File::from(found.as_path()).required(true));
                }
            }
        }

        builder = builder.add_source(Environment::with_prefix("SWEEP").separator("__"));

        let settings = Self::from_builder(builder)?;
        settings.validate(path)?;
        Ok(settings)
    }

    /// Returns the first default config location that exists.
    fn discover_path() -> Option<PathBuf> {
        let local = PathBuf::from("config.json");
        if local.exists() {
            return Some(local);
        }

        let user = dirs::config_dir()?.join("sweep").join("config.json");
        user.exists().then_some(user)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = ConfigRs::try_from(&Settings::default()).map_err(|e| {
            SweepError::config_with_source(
                "Failed to build default configuration",
                None::<&str>,
                e,
            )
        })?;

        Ok(ConfigRs::builder().add_source(defaults))
    }

    fn from_builder(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| {
                SweepError::config_with_source("Failed to load configuration", None::<&str>, e)
            })
    }

    /// Checks settings that have no usable default.
    fn validate(&self, path: Option<&Path>) -> Result<()> {
        if self.registry.url.trim().is_empty() {
            return Err(SweepError::config(
                "registry.url is required".to_string(),
                path.map(|p| p.display().to_string()),
            ));
        }

        Ok(())
    }

    /// Returns the credential to apply, when one is fully configured.
    ///
    /// Both the username and the password must be non-empty; anything less
    /// runs anonymously.
    pub fn credentials(&self) -> Option<Credentials> {
        if self.registry.user.is_empty() || self.registry.password.is_empty() {
            return None;
        }

        Some(Credentials::basic(
            &self.registry.user,
            &self.registry.password,
        ))
    }

    /// Builds the retention policy from the cleanup settings.
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.cleanup.days_to_keep)
            .with_protected_tags(self.cleanup.protected_tags.clone())
            .with_protected_patterns(self.cleanup.protected_patterns.clone())
    }
}
