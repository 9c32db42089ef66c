use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::paths::paths;
use crate::source::{DEFAULT_HOST, DEFAULT_PROTOCOL};

/// Process-wide defaults loaded from `settings.toml`.
///
/// Every field is optional; a missing file means all defaults.
///
/// Example TOML:
/// ```toml
/// git      = "/usr/bin/git"
/// user     = "deploy"
/// protocol = "https"
/// host     = "github.com"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Git executable; looked up on the search path when unset.
    #[serde(default)]
    pub git: Option<String>,
    /// Run-as identity used when a resource does not name one.
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
}

impl Settings {
    pub fn git_binary(&self) -> &str {
        self.git.as_deref().unwrap_or("git")
    }

    pub fn protocol(&self) -> &str {
        self.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL)
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }
}

/// Load `settings.toml` from the gitstate home directory.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_settings() -> Result<Settings> {
    let p = paths()?;
    load_settings_from(&p.settings)
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        log::debug!("no settings at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    let txt = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let settings: Settings =
        toml::from_str(&txt).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(settings)
}
