//! Load and save the Plaid configuration file.
//!
//! Saves go through a temporary sibling file and a rename, so a crash in
//! the middle never leaves a half-written credential store behind.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use legerdemain_models::PlaidConfig;
use tracing::{debug, info};

const APP_DIR: &str = "legerdemain";
const CONFIG_FILE: &str = "plaid.json";

/// Default location: `<config_dir>/legerdemain/plaid.json`.
pub fn default_path(config_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match config_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::config_dir()
            .context("could not determine the user configuration directory")?
            .join(APP_DIR),
    };
    Ok(dir.join(CONFIG_FILE))
}

/// JSON file holding the [`PlaidConfig`].
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<PlaidConfig> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let config: PlaidConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        debug!(
            path = %self.path.display(),
            environments = config.environments.len(),
            users = config.users.len(),
            "plaid config loaded"
        );
        Ok(config)
    }

    pub fn save(&self, config: &PlaidConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(config).context("failed to serialize config")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        info!(path = %self.path.display(), "plaid config saved");
        Ok(())
    }
}
