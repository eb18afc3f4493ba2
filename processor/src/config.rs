//! Module configuration.
//!
//! The host hands the module a flat mapping of named parameters. It is read
//! fresh on every hook invocation so changes in the configuration UI take
//! effect on the next hook without a restart.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Script used when the host never set `e01_script_path`.
pub const DEFAULT_SCRIPT_PATH: &str = "/opt/iris/e01_processing/process_e01.sh";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid module parameters: {0}")]
    Params(#[from] serde_json::Error),

    #[error("invalid config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration unavailable: {0}")]
    Unavailable(String),
}

/// Parameters recognised by the module. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// `None` (explicit null) or an empty string means "not configured".
    #[serde(default = "default_script_path")]
    pub e01_script_path: Option<String>,

    /// Extra arguments, split with shell-word rules at launch time.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub e01_script_extra_args: String,

    #[serde(default)]
    pub log_debug: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_script_path() -> Option<String> {
    Some(DEFAULT_SCRIPT_PATH.to_string())
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            e01_script_path: default_script_path(),
            e01_script_extra_args: String::new(),
            log_debug: false,
        }
    }
}

impl ModuleConfig {
    /// Build from the host's parameter mapping.
    pub fn from_params(params: &Map<String, Value>) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(Value::Object(params.clone()))?)
    }

    /// Load from a TOML file holding the same keys as the host mapping.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The configured script, or `None` when unset or blank.
    pub fn script_path(&self) -> Option<&str> {
        self.e01_script_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Values owned by the host application rather than by this module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSettings {
    /// Root of the host's upload tree (`UPLOADED_PATH`).
    #[serde(default)]
    pub uploaded_path: Option<PathBuf>,
}

/// Host seam for reading the module configuration on each hook call.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<ModuleConfig, ConfigError>;
}

/// A configuration that never changes. Useful for replay tooling and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig(pub ModuleConfig);

impl ConfigSource for StaticConfig {
    fn load(&self) -> Result<ModuleConfig, ConfigError> {
        Ok(self.0.clone())
    }
}

/// Reads a TOML file on every call.
#[derive(Debug, Clone)]
pub struct TomlFileConfig {
    path: PathBuf,
}

impl TomlFileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for TomlFileConfig {
    fn load(&self) -> Result<ModuleConfig, ConfigError> {
        ModuleConfig::from_toml_file(&self.path)
    }
}
