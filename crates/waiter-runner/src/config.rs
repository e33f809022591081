use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::default_waiter_name;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub waiter: WaiterConfig,
    pub deliver: DeliverConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the order database. `~` is expanded.
    pub kitchen: String,
    pub database: String,
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kitchen: ".".to_string(),
            database: "simplewaiter".to_string(),
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaiterConfig {
    pub name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverConfig {
    /// Run the delivery command line through `sh -c`.
    pub shell: bool,
}

impl Default for DeliverConfig {
    fn default() -> Self {
        Self { shell: true }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    /// `<kitchen>/<database>.db`
    pub fn database_path(&self) -> PathBuf {
        let kitchen = shellexpand::tilde(&self.store.kitchen).to_string();
        let file = if self.store.database.ends_with(".db") {
            self.store.database.clone()
        } else {
            format!("{}.db", self.store.database)
        };
        PathBuf::from(kitchen).join(file)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.store.busy_timeout_ms)
    }

    pub fn waiter_name(&self) -> String {
        self.waiter.name.clone().unwrap_or_else(default_waiter_name)
    }
}
