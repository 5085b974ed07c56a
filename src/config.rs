use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MIN_LIST_WIDTH: u16 = 20;
pub const MAX_LIST_WIDTH: u16 = 80;

/// State carried between sessions: loaded before the UI starts and written
/// back when it closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub config_version: u32,
    pub message: String,
    pub show_unversioned: bool,
    pub list_width_percent: u16,
    pub svn_binary: String,
    pub confirm_remove: bool,
    pub close_after_submit: bool,
    pub report_failures: bool,
    pub patch_file: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            config_version: 1,
            message: String::new(),
            show_unversioned: false,
            list_width_percent: 40,
            svn_binary: "svn".to_string(),
            confirm_remove: true,
            close_after_submit: true,
            report_failures: true,
            patch_file: "changes.patch".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn load_or_default() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read session: {}", path.display()))?;

        let mut parsed = toml::from_str::<SessionConfig>(&raw)
            .with_context(|| format!("failed to parse session: {}", path.display()))?;
        parsed.list_width_percent = clamp_list_width(parsed.list_width_percent);

        Ok(parsed)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;

        let body = toml::to_string_pretty(self).context("failed to serialize session")?;
        fs::write(path, body)
            .with_context(|| format!("failed to write session: {}", path.display()))
    }
}

pub fn clamp_list_width(percent: u16) -> u16 {
    percent.clamp(MIN_LIST_WIDTH, MAX_LIST_WIDTH)
}

pub fn config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("could not resolve config directory")?;
    Ok(base.join("svn-commit-tui").join("session.toml"))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory: {}", parent.display()))?;
    }
    Ok(())
}
