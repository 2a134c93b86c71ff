//! Deploy configuration.
//!
//! Credentials are looked up through a [`ConfigSource`] on every use, so a
//! rotated token applies to the next deployment without a restart. The
//! default source is the process environment with a TOML settings file as
//! fallback:
//! - Linux: `~/.config/shipyard/deploy.toml`
//! - Windows: `%APPDATA%/shipyard/deploy.toml`

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shipyard_github::RepoSlug;

use crate::error::DeployError;

pub const RENDER_API_KEY: &str = "RENDER_API_KEY";
pub const RENDER_OWNER_ID: &str = "RENDER_OWNER_ID";
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const GITHUB_APPS_REPO: &str = "GITHUB_APPS_REPO";
pub const REQUEST_TIMEOUT_SECS: &str = "SHIPYARD_REQUEST_TIMEOUT_SECS";
pub const GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const RENDER_API_URL: &str = "RENDER_API_URL";

/// Repository that receives one branch per deployed project.
pub const DEFAULT_APPS_REPO: &str = "shipyard-apps/generated-apps";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Key/value lookup for deploy settings.
///
/// Implementations must return `None` for absent or empty values.
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn github_token(&self) -> Result<String, DeployError> {
        require(self.get(GITHUB_TOKEN), GITHUB_TOKEN)
    }

    fn render_api_key(&self) -> Result<String, DeployError> {
        require(self.get(RENDER_API_KEY), RENDER_API_KEY)
    }

    fn render_owner_id(&self) -> Result<String, DeployError> {
        require(self.get(RENDER_OWNER_ID), RENDER_OWNER_ID)
    }

    fn apps_repo(&self) -> Result<RepoSlug, DeployError> {
        let raw = self
            .get(GITHUB_APPS_REPO)
            .unwrap_or_else(|| DEFAULT_APPS_REPO.to_string());
        raw.parse().map_err(|_| DeployError::InvalidConfig {
            key: GITHUB_APPS_REPO,
            reason: format!("{raw:?} is not of the form owner/repo"),
        })
    }

    fn request_timeout(&self) -> Result<Duration, DeployError> {
        match self.get(REQUEST_TIMEOUT_SECS) {
            None => Ok(DEFAULT_REQUEST_TIMEOUT),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
                _ => Err(DeployError::InvalidConfig {
                    key: REQUEST_TIMEOUT_SECS,
                    reason: format!("{raw:?} is not a positive number of seconds"),
                }),
            },
        }
    }
}

fn require(value: Option<String>, key: &'static str) -> Result<String, DeployError> {
    value.ok_or(DeployError::MissingConfig { key })
}

/// Settings file contents. Every field is optional; environment variables
/// take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub render_api_key: Option<String>,
    #[serde(default)]
    pub render_owner_id: Option<String>,
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default)]
    pub github_apps_repo: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub github_api_url: Option<String>,
    #[serde(default)]
    pub render_api_url: Option<String>,
}

impl Settings {
    /// Loads settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the settings file at the default path, or defaults if absent.
    pub fn load_default() -> Result<Self, DeployError> {
        let path = settings_path();
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading settings");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Value for an environment key, if set here.
    pub fn value(&self, key: &str) -> Option<String> {
        let v = match key {
            RENDER_API_KEY => self.render_api_key.clone(),
            RENDER_OWNER_ID => self.render_owner_id.clone(),
            GITHUB_TOKEN => self.github_token.clone(),
            GITHUB_APPS_REPO => self.github_apps_repo.clone(),
            REQUEST_TIMEOUT_SECS => self.request_timeout_secs.map(|s| s.to_string()),
            GITHUB_API_URL => self.github_api_url.clone(),
            RENDER_API_URL => self.render_api_url.clone(),
            _ => None,
        };
        v.filter(|s| !s.trim().is_empty())
    }
}

/// Process environment first, settings file second.
///
/// Explicit overrides (command-line flags) win over both.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    overrides: HashMap<String, String>,
    settings: Settings,
}

impl EnvConfig {
    pub fn new(settings: Settings) -> Self {
        Self {
            overrides: HashMap::new(),
            settings,
        }
    }

    pub fn with_override(mut self, key: &str, value: impl Into<String>) -> Self {
        self.overrides.insert(key.to_string(), value.into());
        self
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.overrides
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.settings.value(key))
    }
}

/// Fixed in-memory configuration.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }
}

impl ConfigSource for MapConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

/// Returns the platform-specific settings file path.
pub fn settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("shipyard").join("deploy.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let base = std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
                PathBuf::from(home).join(".config")
            });
        base.join("shipyard").join("deploy.toml")
    }
}
