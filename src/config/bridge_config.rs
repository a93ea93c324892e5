use std::path::Path;

use log::{LevelFilter, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::core::bluetooth::{HOST_FLAG, INVOKE_PREFIX};
use crate::error::Result;
use crate::utils::ensure_directory_exists;

pub const CONFIG_FILE_NAME: &str = "bridge_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Namespace prepended to every host command.
    pub invoke_prefix: String,

    /// Global flag that marks the host bridge environment.
    pub host_flag: String,

    /// Device scan timeout (ms) sent to the host when a request carries none.
    pub default_request_timeout_ms: Option<u64>,

    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            invoke_prefix: INVOKE_PREFIX.to_string(),
            host_flag: HOST_FLAG.to_string(),
            default_request_timeout_ms: None,
            log_level: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Loads the config from `config_dir`, falling back to defaults when the
    /// file does not exist.
    pub async fn load_config(config_dir: &Path) -> Result<Self> {
        let file_path = config_dir.join(CONFIG_FILE_NAME);
        let file_path_str = file_path.to_string_lossy().into_owned();

        if !file_path.exists() {
            warn!(
                "Config file not found at {:?}, using default.",
                file_path_str
            );
            return Ok(Self::default());
        }

        let config_json = fs::read_to_string(&file_path).await?;
        let config: Self = serde_json::from_str(&config_json)?;

        info!("Config loaded from {:?}", file_path_str);
        Ok(config)
    }

    /// Saves the config into `config_dir`, creating the directory if needed.
    pub async fn save_config(&self, config_dir: &Path) -> Result<()> {
        ensure_directory_exists(config_dir).await?;

        let file_path = config_dir.join(CONFIG_FILE_NAME);
        let file_path_str = file_path.to_string_lossy().into_owned();

        let config_json = match serde_json::to_string_pretty(&self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize bridge config to JSON: {}", e);
                return Err(e.into());
            }
        };

        fs::write(&file_path, config_json).await?;

        info!("Bridge config saved to {:?}.", file_path_str);
        Ok(())
    }

    /// Parsed `log_level`; unknown values fall back to `Info`.
    pub fn log_level(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level {:?}, using info", self.log_level);
            LevelFilter::Info
        })
    }
}
