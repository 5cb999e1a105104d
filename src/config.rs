//! Persistent configuration handling for LERC.
//!
//! Persists configuration in a JSON file:
//! `~/.config/lerc/config.json` (platform config dir).
//!
//! Every key is optional on disk; missing keys take the defaults below. The resolved
//! [`AppConfig`] is handed to components at construction.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::system::ocr::{OcrConfig, OEM_DEFAULT, PSM_SINGLE_BLOCK};

const APP_CONFIG_DIR_NAME: &str = "lerc";
const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_DATABASE_PATH: &str = "items.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No config directory available on this platform")]
    NoConfigDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ERROR" => Some(Self::Error),
            "WARN" | "WARNING" => Some(Self::Warn),
            "INFO" => Some(Self::Info),
            "DEBUG" => Some(Self::Debug),
            "TRACE" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Directive for `EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyConfig {
    pub modifiers: String,
    pub key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            modifiers: "control+shift".to_string(),
            key: "d".to_string(),
        }
    }
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    /// Explicit Tesseract binary; searched for when `None`.
    pub tesseract_cmd: Option<PathBuf>,
    pub tesseract_psm: u8,
    pub tesseract_oem: u8,
    pub tesseract_lang: Option<String>,
    pub hotkey: HotkeyConfig,
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            tesseract_cmd: None,
            tesseract_psm: PSM_SINGLE_BLOCK,
            tesseract_oem: OEM_DEFAULT,
            tesseract_lang: None,
            hotkey: HotkeyConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl AppConfig {
    /// OCR settings for the located Tesseract `command`.
    pub fn ocr_config(&self, command: PathBuf) -> OcrConfig {
        let mut config = OcrConfig::new(command);
        config.page_segmentation_mode = self.tesseract_psm;
        config.engine_mode = self.tesseract_oem;
        config.language = self.tesseract_lang.clone();
        config
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    database_path: Option<String>,
    #[serde(default)]
    tesseract_cmd: Option<String>,
    #[serde(default)]
    tesseract_psm: Option<u8>,
    #[serde(default)]
    tesseract_oem: Option<u8>,
    #[serde(default)]
    tesseract_lang: Option<String>,
    #[serde(default)]
    hotkey_modifiers: Option<String>,
    #[serde(default)]
    hotkey_key: Option<String>,
    #[serde(default)]
    log_level: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            database_path: non_empty(raw.database_path)
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            tesseract_cmd: non_empty(raw.tesseract_cmd).map(PathBuf::from),
            tesseract_psm: raw.tesseract_psm.unwrap_or(defaults.tesseract_psm),
            tesseract_oem: raw.tesseract_oem.unwrap_or(defaults.tesseract_oem),
            tesseract_lang: non_empty(raw.tesseract_lang),
            hotkey: HotkeyConfig {
                modifiers: non_empty(raw.hotkey_modifiers).unwrap_or(defaults.hotkey.modifiers),
                key: non_empty(raw.hotkey_key).unwrap_or(defaults.hotkey.key),
            },
            log_level: raw
                .log_level
                .as_deref()
                .and_then(LogLevel::from_str)
                .unwrap_or(defaults.log_level),
        }
    }
}

impl From<&AppConfig> for RawConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            database_path: Some(config.database_path.to_string_lossy().into_owned()),
            tesseract_cmd: config
                .tesseract_cmd
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            tesseract_psm: Some(config.tesseract_psm),
            tesseract_oem: Some(config.tesseract_oem),
            tesseract_lang: config.tesseract_lang.clone(),
            hotkey_modifiers: Some(config.hotkey.modifiers.clone()),
            hotkey_key: Some(config.hotkey.key.clone()),
            log_level: Some(config.log_level.as_filter().to_string()),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    let path = config_dir()?
        .join(APP_CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME);
    Some(path)
}

/// Loads the config file from the platform config dir. A missing file yields defaults.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        debug!(?path, "Config file does not exist, using defaults");
        return Ok(AppConfig::default());
    }

    let data = fs::read_to_string(path)?;
    let raw: RawConfig = serde_json::from_str(&data)?;
    debug!(?path, "Config loaded");
    Ok(raw.into())
}

pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(&RawConfig::from(config))?;
    fs::write(path, data)?;
    debug!(?path, "Config saved");
    Ok(())
}

/// Writes the defaults to disk on first run so there is a file to edit. Returns the path
/// when a file was created.
pub fn write_default_if_missing() -> Result<Option<PathBuf>, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    if path.exists() {
        return Ok(None);
    }
    save_config_to(&path, &AppConfig::default())?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.database_path, PathBuf::from("items.csv"));
        assert_eq!(config.tesseract_psm, 6);
        assert_eq!(config.tesseract_oem, 3);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "database_path": "D:\\game\\items.csv", "hotkey_key": "", "log_level": "DEBUG" }"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("D:\\game\\items.csv"));
        assert_eq!(config.hotkey, HotkeyConfig::default());
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.tesseract_cmd, None);
    }

    #[test]
    fn test_save_then_load_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig {
            tesseract_cmd: Some(PathBuf::from("/opt/tesseract/bin/tesseract")),
            tesseract_lang: Some("eng".to_string()),
            hotkey: HotkeyConfig {
                modifiers: "alt".to_string(),
                key: "l".to_string(),
            },
            ..AppConfig::default()
        };

        save_config_to(&path, &config).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_ocr_config_carries_engine_settings() {
        let config = AppConfig {
            tesseract_psm: 7,
            tesseract_lang: Some("deu".to_string()),
            ..AppConfig::default()
        };
        let ocr = config.ocr_config(PathBuf::from("tesseract"));
        assert_eq!(ocr.page_segmentation_mode, 7);
        assert_eq!(ocr.engine_mode, 3);
        assert_eq!(ocr.language.as_deref(), Some("deu"));
        assert!(ocr.temp_dir.is_none());
    }
}
