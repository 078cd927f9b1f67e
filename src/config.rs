use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ReleaseError, Result};

/// Represents the complete configuration for git-release.
///
/// Everything has a working default; a `gitrelease.toml` only needs to
/// name the fields it changes.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Branch carrying the filtered, publishable content.
    #[serde(default = "default_publish_branch")]
    pub publish_branch: String,

    /// Remote used when the current branch has no upstream.
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Exclude patterns applied on every release, merged with `-x`.
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub commands: CommandsConfig,
}

/// External build and publish command lines.
///
/// The publish command receives the target version, the remote, and the
/// branch as extra arguments; the build command receives none.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CommandsConfig {
    #[serde(default = "default_build_command")]
    pub build: Vec<String>,

    #[serde(default = "default_publish_command")]
    pub publish: Vec<String>,
}

fn default_publish_branch() -> String {
    "latest".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_build_command() -> Vec<String> {
    vec!["sh".to_string(), "build.sh".to_string()]
}

fn default_publish_command() -> Vec<String> {
    vec!["sh".to_string(), "publish.sh".to_string()]
}

impl Default for CommandsConfig {
    fn default() -> Self {
        CommandsConfig {
            build: default_build_command(),
            publish: default_publish_command(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            publish_branch: default_publish_branch(),
            remote: default_remote(),
            exclude: Vec::new(),
            commands: CommandsConfig::default(),
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitrelease.toml` in the repository root
/// 3. `.gitrelease.toml` in the user config directory
/// 4. Default configuration if no file found
pub fn load_config(dir: &Path, config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if dir.join("gitrelease.toml").exists() {
        fs::read_to_string(dir.join("gitrelease.toml"))?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(".gitrelease.toml");
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    toml::from_str(&config_str).map_err(|e| ReleaseError::config(e.to_string()))
}
