//! Optional per-project settings in `.mission/config.yaml`.
//!
//! Every field has a default, so a missing file (or a file that only sets
//! one key) is valid.

use crate::document::FrontmatterError;
use crate::error::{MissionError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// GitConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitConfig {
    /// Executable used by the VCS adapter.
    #[serde(default = "default_git_binary")]
    pub binary: String,
    /// Identity stamped on checkpoint commits, so checkpoints work in
    /// repositories without a configured `user.name`.
    #[serde(default = "default_author_name")]
    pub author_name: String,
    #[serde(default = "default_author_email")]
    pub author_email: String,
}

fn default_git_binary() -> String {
    "git".to_string()
}

fn default_author_name() -> String {
    "mission".to_string()
}

fn default_author_email() -> String {
    "mission@localhost".to_string()
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: default_git_binary(),
            author_name: default_author_name(),
            author_email: default_author_email(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub git: GitConfig,
}

impl Config {
    /// Load `.mission/config.yaml`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        let Some(data) = crate::io::read_optional(&path)? else {
            return Ok(Self::default());
        };
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&data)
            .map_err(|e| MissionError::malformed(&path, FrontmatterError::Yaml(e).to_string()))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::config_path(root), data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
