use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment override for the download inactivity timeout (seconds)
pub const INACTIVITY_TIMEOUT_ENV: &str = "GHINSTALLER_INACTIVITY_TIMEOUT";

/// Top‑level configuration, stored as TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub github: GitHubConfig,
    pub download: DownloadConfig,
    pub scan: ScanConfig,
    pub helper: HelperConfig,
}

/// Where repositories, archives and API metadata live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: String,
    /// Base for `/{owner}/{name}/archive/refs/heads/{branch}.zip`
    pub web_url: String,
    /// Host segment that must precede `owner/name` in a repository URL
    pub host: String,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".into(),
            web_url: "https://github.com".into(),
            host: "github.com".into(),
            user_agent: concat!("ghinstaller/", env!("CARGO_PKG_VERSION")).into(),
            connect_timeout_secs: 30,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Leading share of a phase's progress range spent downloading; extraction gets the rest
    pub download_share: f32,
    pub inactivity_timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_share: 0.8,
            inactivity_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Compared case-insensitively against every file name in the extracted tree
    pub installer_names: Vec<String>,
    pub max_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            installer_names: vec!["installerready.exe".into(), "installerready.bat".into()],
            max_depth: 64,
        }
    }
}

/// Fixed repository whose latest release provides a fallback installer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    pub enabled: bool,
    pub owner: String,
    pub name: String,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            owner: "coltonsr77".into(),
            name: "InstallerReady".into(),
        }
    }
}

impl DownloadConfig {
    /// Inactivity timeout, honouring `GHINSTALLER_INACTIVITY_TIMEOUT` when it parses
    pub fn inactivity_timeout(&self) -> Duration {
        std::env::var(INACTIVITY_TIMEOUT_ENV)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(self.inactivity_timeout_secs))
    }

    /// `download_share` clamped to a usable split point
    pub fn share(&self) -> f32 {
        if self.download_share.is_finite() {
            self.download_share.clamp(0.0, 1.0)
        } else {
            DownloadConfig::default().download_share
        }
    }
}

/// Default location: `<config dir>/ghinstaller/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("ghinstaller")
        .join("config.toml"))
}

impl FetchConfig {
    /// Load from `path`, or from the default location (writing defaults there first if absent)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let cfg_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = default_config_path()?;
                if !default_path.exists() {
                    Self::write_default(&default_path)?;
                }
                default_path
            }
        };

        let cfg_str = fs::read_to_string(&cfg_path)
            .with_context(|| format!("Failed to read config file {}", cfg_path.display()))?;
        let cfg: FetchConfig = toml::from_str(&cfg_str)
            .with_context(|| format!("Failed to parse config {}", cfg_path.display()))?;

        log::debug!("Using config from: {}", cfg_path.display());
        Ok(cfg)
    }

    fn write_default(cfg_path: &Path) -> Result<()> {
        log::info!(
            "Config not found at {}, creating default configuration",
            cfg_path.display()
        );

        if let Some(parent) = cfg_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_toml = toml::to_string_pretty(&FetchConfig::default())
            .context("Failed to serialize default config")?;
        fs::write(cfg_path, default_toml).context("Failed to write config file")?;
        Ok(())
    }
}
