//! Fixture configuration via `fixture.toml`
//!
//! A test can describe everything it needs declaratively: which instance to
//! use, how long to wait for it, and the indices to install. The same
//! structure can be built in code with `FixtureBuilder`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use strata_fixture_core::{Error, IndexSpec, Result};
use strata_fixture_schema::compile_index;

use super::poll::PollConfig;

/// Config file name looked up by `FixtureConfig::from_dir`.
pub const CONFIG_FILE_NAME: &str = "fixture.toml";

/// Registry key used for shared instances that have no explicit name.
pub const DEFAULT_SHARED_INSTANCE: &str = "shared";

/// How a fixture obtains its instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstancePolicy {
    /// Start a fresh instance owned by this fixture alone; stopped at teardown
    #[default]
    Exclusive,
    /// Lease a named instance from the registry; kept running after teardown
    Shared,
}

/// Instance section of the configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceConfig {
    /// Instance name; also the registry key for shared instances
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Exclusive or shared
    #[serde(default)]
    pub policy: InstancePolicy,
    /// Backend-specific start settings
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub settings: Map<String, Value>,
}

impl InstanceConfig {
    /// Registry key for the shared instance
    pub fn shared_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_SHARED_INSTANCE)
    }
}

fn default_true() -> bool {
    true
}

/// Fixture configuration loaded from `fixture.toml`.
///
/// # Example
///
/// ```toml
/// force_recreate = false
/// verify = true
///
/// [instance]
/// policy = "exclusive"
///
/// [readiness]
/// max_attempts = 50
/// interval_ms = 100
///
/// [[index]]
/// name = "library"
///
/// [[index.mapping]]
/// type = "book"
///
/// [[index.mapping.field]]
/// name = "title"
/// type = "string"
/// store = "yes"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureConfig {
    /// Drop and recreate indices that already exist instead of failing
    #[serde(default)]
    pub force_recreate: bool,
    /// Verify installed mappings against the compiled ones during setup
    #[serde(default = "default_true")]
    pub verify: bool,
    /// Report teardown failures as errors even when the test body succeeded
    #[serde(default)]
    pub strict_teardown: bool,
    /// Instance section
    #[serde(default)]
    pub instance: InstanceConfig,
    /// Budget for instance readiness
    #[serde(default)]
    pub readiness: PollConfig,
    /// Budget for index creation/deletion to become visible
    #[serde(default = "PollConfig::propagation_default")]
    pub propagation: PollConfig,
    /// Indices installed during setup, in order
    #[serde(default, rename = "index", skip_serializing_if = "Vec::is_empty")]
    pub indices: Vec<IndexSpec>,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            force_recreate: false,
            verify: true,
            strict_teardown: false,
            instance: InstanceConfig::default(),
            readiness: PollConfig::default(),
            propagation: PollConfig::propagation_default(),
            indices: Vec::new(),
        }
    }
}

impl FixtureConfig {
    /// Validate poll budgets and compile every declared index.
    pub fn validate(&self) -> Result<()> {
        self.readiness.validate("readiness")?;
        self.propagation.validate("propagation")?;
        for spec in &self.indices {
            compile_index(spec)?;
        }
        Ok(())
    }

    /// Parse config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: FixtureConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse fixture config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Read `fixture.toml` from a directory.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        Self::from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Strata fixture configuration
#
# Drop and recreate indices that already exist (default: false).
# When false, an existing index fails the fixture with IndexAlreadyExists.
force_recreate = false

# Compare installed mappings with the compiled ones during setup (default: true).
verify = true

# Turn teardown failures after a passing test into errors (default: false).
strict_teardown = false

[instance]
# "exclusive" (default): fresh instance per fixture, stopped at teardown
# "shared": named instance leased from the registry and reused across tests
policy = "exclusive"
# name = "shared"

[readiness]
max_attempts = 50
interval_ms = 100

[propagation]
max_attempts = 20
interval_ms = 50

# [[index]]
# name = "library"
#
# [[index.mapping]]
# type = "book"
#
# [[index.mapping.field]]
# name = "title"
# type = "string"
# store = "yes"
"#
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
