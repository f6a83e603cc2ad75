use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on the auto-clear delay, whatever the file says.
pub const MAX_CLEAR_AFTER_SECS: u64 = 900;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadyCheckConfig {
    pub show_results_in_chat: bool,
    pub max_unready_to_list_in_chat: usize,
    /// Holds the chat report back so it lands after the host's own message.
    pub report_delay_ms: u64,
    pub clear_after_time: bool,
    pub clear_after_secs: u64,
    pub clear_entering_instance: bool,
    pub clear_in_combat: bool,
    pub clear_in_combat_in_instance: bool,
    pub instanced_territories: Vec<u16>,
    pub tick_interval_ms: u64,
}

impl Default for ReadyCheckConfig {
    fn default() -> Self {
        Self {
            show_results_in_chat: true,
            max_unready_to_list_in_chat: 3,
            report_delay_ms: 500,
            clear_after_time: false,
            clear_after_secs: 60,
            clear_entering_instance: true,
            clear_in_combat: false,
            clear_in_combat_in_instance: true,
            instanced_territories: Vec::new(),
            tick_interval_ms: 50,
        }
    }
}

impl ReadyCheckConfig {
    pub fn load_or_create() -> Result<(Self, PathBuf)> {
        let config_dir = dirs::config_dir()
            .context("unable to locate OS config directory")?
            .join("ready-check-helper");
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("failed creating config dir at {}", config_dir.display()))?;

        let config_path = config_dir.join("config.json");
        if !config_path.exists() {
            let default = Self::default();
            default.save(&config_path)?;
            return Ok((default, config_path));
        }

        Ok((Self::load(&config_path)?, config_path))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        let config = serde_json::from_str::<Self>(&text)
            .with_context(|| format!("invalid json in {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let payload = serde_json::to_string_pretty(self).context("failed serializing config")?;
        fs::write(path, payload).with_context(|| format!("failed writing {}", path.display()))?;
        Ok(())
    }

    pub fn clear_delay(&self) -> Duration {
        Duration::from_secs(self.clear_after_secs.min(MAX_CLEAR_AFTER_SECS))
    }

    pub fn report_delay(&self) -> Duration {
        Duration::from_millis(self.report_delay_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn is_instanced(&self, territory_id: u16) -> bool {
        self.instanced_territories.contains(&territory_id)
    }
}
