use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;
use eyre::Result;
use hatch_engine::LoaderConfig;
use hatch_store::{RegistryConfig, RegistryMode, ValidatorConfig};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub install: InstallConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
    /// Partition of the package store this host uses.
    pub origin: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct InstallConfig {
    pub concurrency: usize,
    pub allow_flagged: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: get_default_data_dir()
                .join("packages")
                .to_string_lossy()
                .to_string(),
            origin: "default".to_string(),
        }
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            allow_flagged: true,
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        get_default_config_dir().join("config.json")
    }

    /// Load the config at `path`, writing defaults there if it does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await? {
            let default_config = Self::default();
            default_config.save(path).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| eyre::eyre!("Invalid config at {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    pub async fn reset(path: &Path) -> Result<Self> {
        let config = Self::default();
        config.save(path).await?;
        Ok(config)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["storage", "path"] => self.storage.path = value.to_string(),
            ["storage", "origin"] => self.storage.origin = value.to_string(),
            ["registry", "base_url"] => self.registry.base_url = value.to_string(),
            ["registry", "mode"] => {
                self.registry.mode = <RegistryMode as clap::ValueEnum>::from_str(value, true)
                    .map_err(|_| eyre::eyre!("Invalid registry mode: {} (direct|archive)", value))?;
            }
            ["registry", "source_path"] => self.registry.source_path = value.to_string(),
            ["registry", "repository", "raw_base"] => {
                self.registry.repository.raw_base = value.to_string()
            }
            ["registry", "repository", "branch"] => {
                self.registry.repository.branch = value.to_string()
            }
            ["registry", "timeout_secs"] => self.registry.timeout_secs = parse(value)?,
            ["registry", "user_agent"] => self.registry.user_agent = value.to_string(),
            ["validator", "max_unpacked_size"] => {
                self.validator.max_unpacked_size = parse(value)?
            }
            ["validator", "flagged_permissions"] => {
                self.validator.flagged_permissions = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            ["loader", "recursion_limit"] => self.loader.recursion_limit = parse(value)?,
            ["loader", "loop_iteration_limit"] => {
                self.loader.loop_iteration_limit = parse(value)?
            }
            ["install", "concurrency"] => {
                let concurrency: usize = parse(value)?;
                if concurrency == 0 {
                    return Err(eyre::eyre!("install.concurrency must be at least 1"));
                }
                self.install.concurrency = concurrency;
            }
            ["install", "allow_flagged"] => self.install.allow_flagged = parse(value)?,
            _ => {
                return Err(eyre::eyre!("Unknown configuration key: {}", key));
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        let value = match parts.as_slice() {
            ["storage", "path"] => self.storage.path.clone(),
            ["storage", "origin"] => self.storage.origin.clone(),
            ["registry", "base_url"] => self.registry.base_url.clone(),
            ["registry", "mode"] => mode_name(self.registry.mode).to_string(),
            ["registry", "source_path"] => self.registry.source_path.clone(),
            ["registry", "repository", "raw_base"] => self.registry.repository.raw_base.clone(),
            ["registry", "repository", "branch"] => self.registry.repository.branch.clone(),
            ["registry", "timeout_secs"] => self.registry.timeout_secs.to_string(),
            ["registry", "user_agent"] => self.registry.user_agent.clone(),
            ["validator", "max_unpacked_size"] => self.validator.max_unpacked_size.to_string(),
            ["validator", "flagged_permissions"] => self.validator.flagged_permissions.join(","),
            ["loader", "recursion_limit"] => self.loader.recursion_limit.to_string(),
            ["loader", "loop_iteration_limit"] => self.loader.loop_iteration_limit.to_string(),
            ["install", "concurrency"] => self.install.concurrency.to_string(),
            ["install", "allow_flagged"] => self.install.allow_flagged.to_string(),
            _ => {
                return Err(eyre::eyre!("Unknown configuration key: {}", key));
            }
        };

        Ok(value)
    }

    pub fn show_all(&self) -> String {
        let flagged = if self.validator.flagged_permissions.is_empty() {
            "(none)".to_string()
        } else {
            self.validator.flagged_permissions.join(", ")
        };

        format!(
            "Configuration:\n\
             Storage:\n\
             ├─ path: {}\n\
             └─ origin: {}\n\
             Registry:\n\
             ├─ base_url: {}\n\
             ├─ mode: {}\n\
             ├─ source_path: {}\n\
             ├─ repository.raw_base: {}\n\
             ├─ repository.branch: {}\n\
             ├─ timeout_secs: {}\n\
             └─ user_agent: {}\n\
             Validator:\n\
             ├─ max_unpacked_size: {}\n\
             └─ flagged_permissions: {}\n\
             Loader:\n\
             ├─ recursion_limit: {}\n\
             └─ loop_iteration_limit: {}\n\
             Install:\n\
             ├─ concurrency: {}\n\
             └─ allow_flagged: {}",
            self.storage.path,
            self.storage.origin,
            self.registry.base_url,
            mode_name(self.registry.mode),
            self.registry.source_path,
            self.registry.repository.raw_base,
            self.registry.repository.branch,
            self.registry.timeout_secs,
            self.registry.user_agent,
            self.validator.max_unpacked_size,
            flagged,
            self.loader.recursion_limit,
            self.loader.loop_iteration_limit,
            self.install.concurrency,
            self.install.allow_flagged,
        )
    }
}

fn parse<T: FromStr>(value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| eyre::eyre!("Invalid value: {}", value))
}

fn mode_name(mode: RegistryMode) -> &'static str {
    match mode {
        RegistryMode::Direct => "direct",
        RegistryMode::Archive => "archive",
    }
}

/// Get the default configuration directory
fn get_default_config_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "hatch", "hatch") {
        proj_dirs.config_dir().to_path_buf()
    } else {
        PathBuf::from(".hatch").join("config")
    }
}

/// Get the default data directory
fn get_default_data_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "hatch", "hatch") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".hatch").join("data")
    }
}
