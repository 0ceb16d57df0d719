#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Settings for the dengue map toolchain.
//!
//! A [`Config`] is loaded once at startup (from TOML or defaults) and passed
//! by reference to every component. It is never mutated in place; test
//! setups derive modified copies with [`Config::with_override`].

pub mod paths;
pub mod sections;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use paths::{PathsConfig, ensure_parent_dir};
pub use sections::{
    AppConfig, CacheConfig, CrsConfig, DatasetConfig, MapConfig, MountTarget, OutlineStyle,
    RefreshConfig, RiskColors, RiskConfig, ServerConfig, StaticMount, StyleConfig, UiConfig,
};

/// Errors raised while loading, overriding or validating a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The TOML text is malformed or has ill-typed values.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be rendered as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A dotted key does not name a config field.
    #[error("unknown config key '{key}'")]
    UnknownKey { key: String },

    /// An override value does not fit the field it replaces.
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Validation found problems.
    #[error("invalid config: {}", format_issues(.issues))]
    Invalid { issues: Vec<ConfigIssue> },
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted key of the offending field.
    pub key: String,
    pub message: String,
}

impl ConfigIssue {
    fn new(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Complete toolchain configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub paths: PathsConfig,
    pub server: ServerConfig,
    pub map: MapConfig,
    pub style: StyleConfig,
    pub crs: CrsConfig,
    pub ui: UiConfig,
    pub risk: RiskConfig,
    pub refresh: RefreshConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Loads the config from `path`, or returns the defaults when no path
    /// is given.
    ///
    /// A relative `paths.root` in the file is resolved against the file's
    /// directory.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Io`] if the file cannot be read
    /// * [`ConfigError::Parse`] if the file is not valid config TOML
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            log::debug!("No config file given, using defaults");
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;

        if config.paths.root.is_relative()
            && let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            config.paths.root = dir.join(&config.paths.root);
        }

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses a config from TOML text. Missing sections and fields take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is malformed or a value
    /// has the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Renders the config as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reads the value at a dotted key such as `map.zoom_start`.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::UnknownKey`] if the key does not exist
    /// * [`ConfigError::Serialize`] if the config cannot be converted
    pub fn get_value(&self, key: &str) -> Result<toml::Value, ConfigError> {
        let root = toml::Value::try_from(self)?;
        let mut current = &root;
        for part in key.split('.') {
            current = current
                .get(part)
                .ok_or_else(|| ConfigError::UnknownKey {
                    key: key.to_string(),
                })?;
        }
        Ok(current.clone())
    }

    /// Returns a copy with the field at a dotted key replaced.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::UnknownKey`] if the key does not exist
    /// * [`ConfigError::InvalidValue`] if the value does not fit the field
    pub fn with_override(
        &self,
        key: &str,
        value: impl Into<toml::Value>,
    ) -> Result<Self, ConfigError> {
        let mut root = toml::Value::try_from(self)?;
        let unknown = || ConfigError::UnknownKey {
            key: key.to_string(),
        };

        let mut current = &mut root;
        for part in key.split('.') {
            current = current.get_mut(part).ok_or_else(unknown)?;
        }
        *current = value.into();

        root.try_into().map_err(|e: toml::de::Error| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.message().to_string(),
        })
    }

    /// Resolved directory served by a static mount.
    #[must_use]
    pub fn mount_dir(&self, target: MountTarget) -> PathBuf {
        match target {
            MountTarget::Web => self.paths.web_dir(),
            MountTarget::Data => self.paths.data_dir(),
            MountTarget::Template => self.paths.template_dir(),
        }
    }

    /// Collects every validation finding. An empty list means the config is
    /// usable.
    #[must_use]
    pub fn issues(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        for (key, dir) in [
            ("paths.data_dir", self.paths.data_dir()),
            ("paths.template_dir", self.paths.template_dir()),
            ("paths.web_dir", self.paths.web_dir()),
        ] {
            if !dir.is_dir() {
                issues.push(ConfigIssue::new(
                    key,
                    format!("directory {} does not exist", dir.display()),
                ));
            }
        }

        if !self.map.fixed_center().is_valid() {
            issues.push(ConfigIssue::new(
                "map.center",
                format!("{} is not a valid latitude/longitude", self.map.fixed_center()),
            ));
        }
        if self.map.zoom_start.is_nan() || self.map.zoom_start <= 0.0 {
            issues.push(ConfigIssue::new("map.zoom_start", "must be positive"));
        }
        if self.map.tile_min_zoom > self.map.tile_max_zoom {
            issues.push(ConfigIssue::new(
                "map.tile_min_zoom",
                "must not exceed map.tile_max_zoom",
            ));
        }
        if self.map.name_field.trim().is_empty() {
            issues.push(ConfigIssue::new("map.name_field", "must not be empty"));
        }

        if !self.risk.thresholds.is_ordered() {
            issues.push(ConfigIssue::new(
                "risk.thresholds",
                "must be positive and strictly increasing (medium < high < extreme)",
            ));
        }

        if self.refresh.max_retries == 0 {
            issues.push(ConfigIssue::new("refresh.max_retries", "must be at least 1"));
        }
        if self.refresh.datasets.is_empty() {
            issues.push(ConfigIssue::new(
                "refresh.datasets",
                "at least one dataset is required",
            ));
        }

        issues
    }

    /// Checks the config for problems.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every finding.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { issues })
        }
    }
}
