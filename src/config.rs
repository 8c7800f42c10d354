// ~/.config/cashew/config.toml
// ref: toml crate — https://docs.rs/toml/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const PROJECTS_DIR_ENV: &str = "CASHEW_PROJECTS_DIR";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Root holding one directory per project. Falls back to ~/Projects or ~/projects.
    pub projects_dir: Option<PathBuf>,
    /// Companion CLI that owns worktrees, messaging and status queries.
    pub dev_bin: String,
    pub tmux_bin: String,
    pub log_file: Option<PathBuf>,
    /// Prefix for windows opened when cashew itself runs inside tmux.
    pub window_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects_dir: None,
            dev_bin: "dev".to_string(),
            tmux_bin: "tmux".to_string(),
            log_file: None,
            window_prefix: "cashew-".to_string(),
        }
    }
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("cashew").join("config.toml"))
    }

    /// Load from the default location, then apply environment overrides.
    /// No config dir (e.g. HOME unset) is treated like a missing file.
    pub fn load() -> Result<Self> {
        Self::load_with(Self::config_path().as_deref(), std::env::var(PROJECTS_DIR_ENV).ok())
    }

    fn load_with(path: Option<&Path>, projects_dir: Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::default(),
        };
        config.apply_env(projects_dir);
        Ok(config)
    }

    fn apply_env(&mut self, projects_dir: Option<String>) {
        if let Some(dir) = projects_dir {
            if !dir.trim().is_empty() {
                self.projects_dir = Some(PathBuf::from(dir.trim()));
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn projects_root(&self) -> PathBuf {
        if let Some(dir) = &self.projects_dir {
            return expand_path(&dir.to_string_lossy());
        }
        let home = dirs::home_dir().unwrap_or_default();
        if home.join("Projects").is_dir() {
            home.join("Projects")
        } else {
            home.join("projects")
        }
    }

    pub fn log_path(&self) -> PathBuf {
        match &self.log_file {
            Some(p) => expand_path(&p.to_string_lossy()),
            None => dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("cashew")
                .join("cashew.log"),
        }
    }

    /// Directory name the catalog skips: the companion tool's own checkout.
    pub fn self_name(&self) -> String {
        Path::new(&self.dev_bin)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.dev_bin.clone())
    }
}

pub fn expand_path(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(s)
}
