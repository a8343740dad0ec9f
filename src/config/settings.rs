//! TOML-based configuration for Atoll.
//!
//! Supports a config file (atoll.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! common_column = "boundary_code"
//! boundary_sheet = "boundary_data"
//!
//! [template]
//! sheet_name = "boundaries"
//!
//! [template.labels]
//! District = "District / Zone"
//! Village = "Village"
//!
//! [cache]
//! max_entries = 32
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

static ENV_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var pattern"));

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Header name of the boundary-code join column.
    pub common_column: String,

    /// Name of the sheet carrying the full administrative path in uploaded
    /// workbooks.
    pub boundary_sheet: String,

    #[serde(default)]
    pub template: TemplateSettings,

    #[serde(default)]
    pub cache: CacheSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            common_column: "boundary_code".to_string(),
            boundary_sheet: "boundary_data".to_string(),
            template: TemplateSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

/// Template generation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Sheet name used when rows are not split by level.
    pub sheet_name: String,

    /// Translated header labels per hierarchy level; levels without an
    /// entry fall back to their own name.
    pub labels: BTreeMap<String, String>,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            sheet_name: "boundaries".to_string(),
            labels: BTreeMap::new(),
        }
    }
}

impl TemplateSettings {
    /// The display label for a hierarchy level.
    pub fn label_for(&self, boundary_type: &str) -> String {
        self.labels
            .get(boundary_type)
            .cloned()
            .unwrap_or_else(|| boundary_type.to_string())
    }
}

/// Derived-tree cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { max_entries: 32 }
    }
}

impl Settings {
    /// Load settings from a TOML file with `${VAR}` expansion.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let expanded = expand_env_vars(&raw)?;
        Ok(toml::from_str(&expanded)?)
    }

    /// Load `atoll.toml` from the working directory, falling back to
    /// defaults when absent.
    pub fn load_or_default() -> Result<Self, SettingsError> {
        match Self::load_from_path("atoll.toml") {
            Ok(settings) => Ok(settings),
            Err(SettingsError::FileNotFound(_)) => Ok(Self::default()),
            Err(err) => Err(err),
        }
    }
}

fn expand_env_vars(raw: &str) -> Result<String, SettingsError> {
    let mut missing = None;
    let expanded = ENV_VAR.replace_all(raw, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match env::var(name) {
            Ok(value) => value,
            Err(_) => {
                if missing.is_none() {
                    missing = Some(name.to_string());
                }
                String::new()
            }
        }
    });
    match missing {
        Some(name) => Err(SettingsError::MissingEnvVar(name)),
        None => Ok(expanded.into_owned()),
    }
}
