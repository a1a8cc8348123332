//! Configuration for the economy
//!
//! Read from TOML. The founder identity may also come from the environment
//! (`JESTER_OWNER_ID`, then the bot's historical `OWNER_ID`).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::economy::EconomyRules;
use crate::ledger::JsonFileStore;
use crate::{EconomyError, PlayerId, Result};

/// Environment variables consulted for the founder, in order
pub const FOUNDER_ENV_VARS: [&str; 2] = ["JESTER_OWNER_ID", "OWNER_ID"];

fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JesterConfig {
    /// The one identity holding the Founder rank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founder: Option<PlayerId>,

    /// Identities allowed to grant favor and override ranks
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub privileged: BTreeSet<PlayerId>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Ledger file; relative paths resolve against the config file
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("users.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between favor expiry sweeps
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    60
}

/// Longest accepted sweep interval, one week
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval(),
        }
    }
}

impl JesterConfig {
    /// Load configuration from standard locations
    pub async fn load() -> Result<Self> {
        load_config_from_standard_locations().await
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        load_config(path).await
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        save_config(self, path).await
    }

    /// Take the founder from the process environment when one is set there
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let founder = FOUNDER_ENV_VARS
            .iter()
            .filter_map(|key| lookup(*key).map(|value| (*key, value)))
            .map(|(key, value)| (key, PlayerId::new(value)))
            .find(|(_, id)| !id.is_empty());
        if let Some((key, id)) = founder {
            debug!("Founder taken from {}", key);
            self.founder = Some(id);
        }
    }

    pub fn rules(&self) -> EconomyRules {
        EconomyRules {
            founder: self.founder.clone(),
            privileged: self.privileged.clone(),
        }
    }

    pub fn ledger_store(&self) -> JsonFileStore {
        JsonFileStore::new(&self.storage.path)
    }

    pub fn sweep_interval(&self) -> chrono::Duration {
        let secs = self.sweep.interval_secs.clamp(1, MAX_SWEEP_INTERVAL_SECS);
        i64::try_from(secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(|| chrono::Duration::seconds(default_sweep_interval() as i64))
    }
}

/// Load configuration from a TOML file
pub async fn load_config(path: &Path) -> Result<JesterConfig> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        EconomyError::configuration(path.display().to_string(), "file", "readable TOML file", e.to_string())
    })?;

    let mut config: JesterConfig = toml::from_str(&content).map_err(|e| {
        EconomyError::configuration(
            path.display().to_string(),
            "content",
            "valid TOML configuration",
            e.to_string(),
        )
    })?;

    if config.sweep.interval_secs == 0 {
        return Err(EconomyError::configuration(
            path.display().to_string(),
            "sweep.interval_secs",
            "a positive number of seconds",
            "interval is zero",
        ));
    }
    if config.sweep.interval_secs > MAX_SWEEP_INTERVAL_SECS {
        return Err(EconomyError::configuration(
            path.display().to_string(),
            "sweep.interval_secs",
            format!("at most {} seconds", MAX_SWEEP_INTERVAL_SECS),
            format!("interval of {} seconds is too long", config.sweep.interval_secs),
        ));
    }

    let base_dir = path.parent().unwrap_or(Path::new("."));
    config.storage.path = resolve_path(base_dir, &config.storage.path);

    Ok(config)
}

/// Save configuration to a TOML file
pub async fn save_config(config: &JesterConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            EconomyError::configuration(
                parent.display().to_string(),
                "directory",
                "writable directory",
                e.to_string(),
            )
        })?;
    }

    let content = toml::to_string_pretty(config).map_err(|e| {
        EconomyError::configuration(
            path.display().to_string(),
            "serialization",
            "serializable config structure",
            e.to_string(),
        )
    })?;

    tokio::fs::write(path, content).await.map_err(|e| {
        EconomyError::configuration(path.display().to_string(), "file", "writable file", e.to_string())
    })?;

    Ok(())
}

/// Standard configuration locations, most specific first
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("jester.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("jester").join("config.toml"));
    }

    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".jester").join("config.toml"));
    }

    paths
}

pub async fn load_config_from_standard_locations() -> Result<JesterConfig> {
    for path in config_paths() {
        if path.exists() {
            return load_config(&path).await;
        }
    }
    Ok(JesterConfig::default())
}
