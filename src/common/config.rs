use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::common::errors::Result;

/// Per-service credentials, persisted as one small JSON document.
/// Every field is optional; a missing credential just means that
/// service is unconfigured (or, for Gofile, anonymous).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pixeldrain: PixeldrainConfig,
    #[serde(default)]
    pub gofile: GofileConfig,
    #[serde(default)]
    pub google_drive: GoogleDriveConfig,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PixeldrainConfig {
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GofileConfig {
    /// Absent means uploads are anonymous.
    #[serde(default)]
    pub api_token: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GoogleDriveConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Long-lived OAuth2 credential captured on the first authorization.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Reads and rewrites the config file wholesale. Single-user,
/// single-process tool, so no locking.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Config lives at the platform config dir, e.g.
    /// `~/.config/updrop/config.json` on Linux.
    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "updrop")
            .context("could not determine a config directory for this platform")?;
        Ok(Self {
            path: dirs.config_dir().join("config.json"),
        })
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Missing file means defaults. A corrupt file is an error rather
    /// than silently resetting saved credentials.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config = serde_json::from_str(&data)
            .with_context(|| format!("corrupt config file at {}", self.path.display()))?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    /// Read-modify-write helper so callers can't forget the save.
    pub fn update(&self, apply: impl FnOnce(&mut Config)) -> Result<Config> {
        let mut config = self.load()?;
        apply(&mut config);
        self.save(&config)?;
        Ok(config)
    }
}
