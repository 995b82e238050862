//! Host-facing device configuration.
//!
//! Loaded from JSON. Every section falls back to its defaults, so a partial
//! file (or an empty object) is valid.

use crate::logging::{LogCategory, LogConfig, LogLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),
    #[error("Unknown log category: {0}")]
    UnknownCategory(String),
}

/// Video standard reported to the boot code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TvType {
    Pal,
    #[default]
    Ntsc,
    Mpal,
}

impl TvType {
    /// Value the PIF leaves in `s4`
    pub fn code(self) -> u64 {
        match self {
            TvType::Pal => 0,
            TvType::Ntsc => 1,
            TvType::Mpal => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetType {
    #[default]
    Cold,
    Nmi,
}

impl ResetType {
    /// Value the PIF leaves in `s5`
    pub fn code(self) -> u64 {
        match self {
            ResetType::Cold => 0,
            ResetType::Nmi => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// category name -> level name
    pub categories: HashMap<String, String>,
    pub rate_limit: usize,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "off".to_string(),
            categories: HashMap::new(),
            rate_limit: 60,
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Push this configuration into [`LogConfig::global`]
    pub fn apply(&self) -> Result<(), ConfigError> {
        self.apply_to(LogConfig::global())
    }

    fn apply_to(&self, config: &LogConfig) -> Result<(), ConfigError> {
        let level = parse_level(&self.level)?;
        let mut levels = Vec::with_capacity(self.categories.len());
        for (name, level) in &self.categories {
            let category = LogCategory::from_str(name)
                .ok_or_else(|| ConfigError::UnknownCategory(name.clone()))?;
            levels.push((category, parse_level(level)?));
        }

        config.set_global_level(level);
        for (category, level) in levels {
            config.set_level(category, level);
        }
        config.set_rate_limit(self.rate_limit);
        if let Some(path) = &self.file {
            config
                .set_log_file(path.clone())
                .map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

fn parse_level(s: &str) -> Result<LogLevel, ConfigError> {
    LogLevel::from_str(s).ok_or_else(|| ConfigError::UnknownLevel(s.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtcConfig {
    /// Run the RTC of timer cartridges; read by `GbCart::with_config`
    pub enabled: bool,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootConfig {
    pub tv_type: TvType,
    pub reset_type: ResetType,
    /// Force a CIC model (e.g. 6102) instead of detecting it from the boot code
    pub cic_model: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub logging: LoggingConfig,
    pub rtc: RtcConfig,
    pub boot: BootConfig,
}

impl DeviceConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeviceConfig::default();
        assert_eq!(config.logging.level, "off");
        assert_eq!(config.logging.rate_limit, 60);
        assert!(config.rtc.enabled);
        assert_eq!(config.boot.tv_type, TvType::Ntsc);
        assert_eq!(config.boot.reset_type, ResetType::Cold);
        assert_eq!(config.boot.cic_model, None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            DeviceConfig::from_json_str(r#"{ "boot": { "tv_type": "pal" } }"#).unwrap();
        assert_eq!(config.boot.tv_type, TvType::Pal);
        assert_eq!(config.boot.reset_type, ResetType::Cold);
        assert!(config.rtc.enabled);

        let empty = DeviceConfig::from_json_str("{}").unwrap();
        assert_eq!(empty, DeviceConfig::default());
    }

    #[test]
    fn test_roundtrip_json() {
        let mut config = DeviceConfig::default();
        config.boot.cic_model = Some(6105);
        config.rtc.enabled = false;

        let json = config.to_json_string().unwrap();
        assert_eq!(DeviceConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            DeviceConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_tv_and_reset_codes() {
        assert_eq!(TvType::Pal.code(), 0);
        assert_eq!(TvType::Ntsc.code(), 1);
        assert_eq!(TvType::Mpal.code(), 2);
        assert_eq!(ResetType::Cold.code(), 0);
        assert_eq!(ResetType::Nmi.code(), 1);
    }

    #[test]
    fn test_logging_apply() {
        let logging = LoggingConfig {
            level: "warn".to_string(),
            categories: HashMap::from([("rtc".to_string(), "trace".to_string())]),
            rate_limit: 10,
            file: None,
        };
        let target = LogConfig::new();
        logging.apply_to(&target).unwrap();

        assert_eq!(target.get_global_level(), LogLevel::Warn);
        assert_eq!(target.get_level(LogCategory::Rtc), LogLevel::Trace);
        assert_eq!(target.get_rate_limit(), 10);
    }

    #[test]
    fn test_logging_apply_rejects_unknown_names() {
        let target = LogConfig::new();

        let bad_level = LoggingConfig {
            level: "loud".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            bad_level.apply_to(&target),
            Err(ConfigError::UnknownLevel(_))
        ));

        let bad_category = LoggingConfig {
            categories: HashMap::from([("gpu".to_string(), "info".to_string())]),
            ..Default::default()
        };
        assert!(matches!(
            bad_category.apply_to(&target),
            Err(ConfigError::UnknownCategory(_))
        ));
    }
}
