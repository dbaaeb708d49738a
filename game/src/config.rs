use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::challenge::ChallengeSpec;
use crate::enemy::EnemyConfig;
use crate::error::ConfigError;
use crate::flow::FlowConfig;
use crate::interference::InterferenceConfig;
use crate::judge::ScoringConfig;

pub const CONFIG_ENV: &str = "TYPESTRIKE_CONFIG";

/// Every tunable of a round. Missing fields fall back to the defaults, so a
/// config file only needs to name what it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoundConfig {
    pub version: u32,
    pub slot_count: usize,
    pub challenge: ChallengeSpec,
    #[serde(with = "crate::serde_secs")]
    pub reveal_duration: Duration,
    #[serde(with = "crate::serde_secs")]
    pub time_limit: Duration,
    #[serde(with = "crate::serde_secs")]
    pub status_hold: Duration,
    pub scoring: ScoringConfig,
    pub flow_mode: FlowConfig,
    pub interference: InterferenceConfig,
    pub enemies: EnemyConfig,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            version: 1,
            slot_count: 6,
            challenge: ChallengeSpec::default(),
            reveal_duration: Duration::from_millis(350),
            time_limit: Duration::from_secs(180),
            status_hold: Duration::from_secs(1),
            scoring: ScoringConfig::default(),
            flow_mode: FlowConfig::default(),
            interference: InterferenceConfig::default(),
            enemies: EnemyConfig::default(),
        }
    }
}

impl RoundConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_count == 0 {
            return Err(ConfigError::NonPositive { field: "slot_count" });
        }
        if self.time_limit.is_zero() {
            return Err(ConfigError::NonPositive { field: "time_limit" });
        }
        self.challenge.validate()?;
        self.scoring.validate()?;
        self.flow_mode.validate()?;
        self.interference.validate()?;
        self.enemies.validate()
    }

    /// Parses and validates.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: RoundConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading round config");
        Self::from_json_str(&text)
    }

    /// Explicit path first, then `TYPESTRIKE_CONFIG`, then the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::resolve_with(explicit, std::env::var_os(CONFIG_ENV))
    }

    pub fn resolve_with(explicit: Option<&Path>, env: Option<OsString>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from));
        match path {
            Some(path) => Self::load_json_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
