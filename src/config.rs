//! Configuration for the playbook runner invocation: which binary to call,
//! where the inventory, playbooks, and vars files live.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "corral.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Playbook runner binary, resolved on PATH.
    pub runner_binary: String,
    /// Inventory file partitioning hosts into the `odd`/`even` groups.
    pub inventory: PathBuf,
    /// Directory holding the per-operation playbooks.
    pub playbook_dir: PathBuf,
    /// Directory the vars files are written into.
    pub vars_dir: PathBuf,
    /// Extra arguments appended to every runner invocation.
    pub runner_args: Vec<String>,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            runner_binary: "ansible-playbook".to_string(),
            inventory: PathBuf::from("ansible/inventory/hosts.ini"),
            playbook_dir: PathBuf::from("ansible/playbooks"),
            vars_dir: PathBuf::from("ansible/vars"),
            runner_args: Vec::new(),
        }
    }
}

/// Per-user config directory (`corral.toml` lives here when not in the
/// working directory).
pub fn get_global_config_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "corral", "corral")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))
}

impl AutomationConfig {
    /// Load configuration: explicit path if given, otherwise discovery
    /// (working directory, then the per-user config dir), otherwise
    /// defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::discover()?,
        };
        config.merge_env_vars();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&contents)?)
    }

    fn discover() -> Result<Self> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Ok(dir) = get_global_config_dir() {
            let global = dir.join(CONFIG_FILE_NAME);
            if global.exists() {
                return Self::from_file(&global);
            }
        }

        Ok(Self::default())
    }

    pub fn merge_env_vars(&mut self) {
        if let Ok(binary) = std::env::var("CORRAL_RUNNER") {
            self.runner_binary = binary;
        }

        if let Ok(inventory) = std::env::var("CORRAL_INVENTORY") {
            self.inventory = PathBuf::from(inventory);
        }

        if let Ok(playbook_dir) = std::env::var("CORRAL_PLAYBOOK_DIR") {
            self.playbook_dir = PathBuf::from(playbook_dir);
        }

        if let Ok(vars_dir) = std::env::var("CORRAL_VARS_DIR") {
            self.vars_dir = PathBuf::from(vars_dir);
        }

        if let Ok(args) = std::env::var("CORRAL_RUNNER_ARGS") {
            if let Ok(parsed) = shell_words::split(&args) {
                self.runner_args = parsed;
            }
        }
    }

    /// Absolute or relative path of one playbook under the playbook dir.
    pub fn playbook_path(&self, name: &str) -> PathBuf {
        self.playbook_dir.join(name)
    }
}
