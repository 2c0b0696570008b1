use std::{path::Path, time::Duration};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{PacerError, workout::RestartPolicy};

use super::TICK_INTERVAL_MS;

const CONFIG_DIR_NAME: &str = "pacer";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    pub restart_policy: RestartPolicy,
    /// Maximum number of workout records kept, unbounded when `None`
    pub history_capacity: Option<usize>,
    /// Maximum number of positions kept on the trail of a running workout
    pub trail_capacity: Option<usize>,
    pub tick_interval_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            restart_policy: RestartPolicy::default(),
            history_capacity: None,
            trail_capacity: None,
            tick_interval_ms: TICK_INTERVAL_MS,
        }
    }
}

impl TrackerConfig {
    /// Load the config saved in the user's config directory, if any.
    pub fn from_local_file() -> Result<Option<Self>, PacerError> {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(None);
        };
        let config_path = config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Self::from_file(&config_path).map(Some)
        } else {
            debug!("No config file at {:?}", config_path);
            Ok(None)
        }
    }

    pub fn from_file(config_path: &Path) -> Result<Self, PacerError> {
        let file = std::fs::File::open(config_path)
            .map_err(|e| PacerError::ConfigIOError { source: e })?;
        let config: Self = serde_json::from_reader(file)
            .map_err(|e| PacerError::ConfigParseError { source: e })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), PacerError> {
        let config_path = dirs::config_dir()
            .ok_or(PacerError::NoConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), PacerError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PacerError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| PacerError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| PacerError::ConfigSerializeError { source: e })
    }

    pub fn validate(&self) -> Result<(), PacerError> {
        if self.tick_interval_ms == 0 {
            return Err(PacerError::InvalidUserInput {
                field: "tick_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.history_capacity == Some(0) {
            return Err(PacerError::InvalidUserInput {
                field: "history_capacity".to_string(),
                reason: "must keep at least one record".to_string(),
            });
        }
        if self.trail_capacity == Some(0) {
            return Err(PacerError::InvalidUserInput {
                field: "trail_capacity".to_string(),
                reason: "must keep at least one position".to_string(),
            });
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
