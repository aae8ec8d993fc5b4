//! Configuration system (layered: defaults < TOML file < environment).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FolioError, Result};
use crate::types::{GenerationSettings, ReasoningEffort};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 500;

/// Settings that may come from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WidgetSettings {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: Option<f64>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub base_url: Option<String>,
    /// Alternative profile (owner data, preamble, suggestions).
    pub profile: Option<PathBuf>,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: None,
            reasoning_effort: Some(ReasoningEffort::Minimal),
            base_url: None,
            profile: None,
        }
    }
}

/// Resolved configuration for the chat widget.
///
/// Resolution order, lowest to highest:
/// 1. Built-in defaults
/// 2. A TOML file (explicit path, or `config.toml` in the platform config dir)
/// 3. Environment variables (a `.env` file is loaded first if present)
#[derive(Clone, Default)]
pub struct FolioConfig {
    api_key: Option<String>,
    settings: WidgetSettings,
}

impl fmt::Debug for FolioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolioConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("settings", &self.settings)
            .finish()
    }
}

impl FolioConfig {
    /// Config with defaults only and no credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from settings without touching the environment.
    pub fn with_settings(settings: WidgetSettings) -> Self {
        Self {
            api_key: None,
            settings,
        }
    }

    /// Full layered load. An explicit `path` must exist; the default path is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let settings = match path {
            Some(path) => WidgetSettings::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => WidgetSettings::from_file(&path)?,
                _ => WidgetSettings::default(),
            },
        };
        let mut config = Self::with_settings(settings);
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Overlay environment values read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for var in ["GEMINI_API_KEY", "GOOGLE_API_KEY"] {
            if let Some(key) = lookup(var).filter(|v| !v.trim().is_empty()) {
                self.api_key = Some(key);
                break;
            }
        }
        if let Some(url) = lookup("GEMINI_BASE_URL") {
            self.settings.base_url = Some(url);
        }
        if let Some(model) = lookup("FOLIO_MODEL") {
            self.settings.model = model;
        }
        if let Some(raw) = lookup("FOLIO_MAX_OUTPUT_TOKENS") {
            match raw.parse() {
                Ok(max) => self.settings.max_output_tokens = max,
                Err(_) => warn!(value = %raw, "ignoring invalid FOLIO_MAX_OUTPUT_TOKENS"),
            }
        }
        if let Some(raw) = lookup("FOLIO_REASONING_EFFORT") {
            match ReasoningEffort::from_str(&raw) {
                Ok(effort) => self.settings.reasoning_effort = Some(effort),
                Err(_) => warn!(value = %raw, "ignoring invalid FOLIO_REASONING_EFFORT"),
            }
        }
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.api_key = Some(key.into());
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key.clone()
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn settings(&self) -> &WidgetSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut WidgetSettings {
        &mut self.settings
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn base_url(&self) -> Option<&str> {
        self.settings.base_url.as_deref()
    }

    /// Generation settings applied to every turn.
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings::builder()
            .max_output_tokens(self.settings.max_output_tokens)
            .maybe_temperature(self.settings.temperature)
            .maybe_reasoning_effort(self.settings.reasoning_effort)
            .build()
    }
}

impl WidgetSettings {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading widget settings");
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FolioError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }
}

/// `config.toml` inside the platform configuration directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "folio", "folio")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
