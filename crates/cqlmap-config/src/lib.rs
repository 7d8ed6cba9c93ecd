//! Mapper configuration: keyspace defaults, statement defaults and schema
//! planning switches, loaded from TOML.

mod options;

pub use options::{Consistency, ExcludedKeyPolicy, Replication};

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

///
/// MapperConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapperConfig {
    pub keyspace: KeyspaceConfig,
    pub statements: StatementConfig,
    pub schema: SchemaConfig,
}

impl MapperConfig {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.keyspace.replication {
            Replication::Simple { factor } if *factor == 0 => Err(ConfigError::Invalid(
                "keyspace.replication.factor must be greater than zero".to_string(),
            )),
            Replication::NetworkTopology { datacenters } if datacenters.is_empty() => {
                Err(ConfigError::Invalid(
                    "keyspace.replication.datacenters must not be empty".to_string(),
                ))
            }
            Replication::NetworkTopology { datacenters } => {
                for (dc, factor) in datacenters {
                    if dc.trim().is_empty() {
                        return Err(ConfigError::Invalid(
                            "keyspace.replication data-center names must not be empty"
                                .to_string(),
                        ));
                    }
                    if *factor == 0 {
                        return Err(ConfigError::Invalid(format!(
                            "keyspace.replication factor for data center '{dc}' must be greater than zero"
                        )));
                    }
                }

                self.validate_statements()
            }
            Replication::Simple { .. } => self.validate_statements(),
        }
    }

    fn validate_statements(&self) -> Result<(), ConfigError> {
        if let Some(level) = self.statements.consistency
            && level.is_serial()
        {
            return Err(ConfigError::Invalid(format!(
                "statements.consistency cannot be the serial level {level}"
            )));
        }
        if let Some(level) = self.statements.serial_consistency
            && !level.is_serial()
        {
            return Err(ConfigError::Invalid(format!(
                "statements.serial_consistency must be SERIAL or LOCAL_SERIAL, got {level}"
            )));
        }

        Ok(())
    }
}

///
/// KeyspaceConfig
///
/// Defaults for keyspaces whose declaration carries no options.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyspaceConfig {
    pub replication: Replication,
    pub durable_writes: bool,
}

impl Default for KeyspaceConfig {
    fn default() -> Self {
        Self {
            replication: Replication::default(),
            durable_writes: true,
        }
    }
}

///
/// StatementConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatementConfig {
    pub consistency: Option<Consistency>,
    pub serial_consistency: Option<Consistency>,
    pub excluded_keys: ExcludedKeyPolicy,
}

///
/// SchemaConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    pub if_not_exists: bool,
    pub seed_data: bool,
    pub excluded_keys: ExcludedKeyPolicy,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            if_not_exists: true,
            seed_data: true,
            excluded_keys: ExcludedKeyPolicy::Skip,
        }
    }
}

///
/// TESTS
///
