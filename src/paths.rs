//! Per-user data locations.

use std::path::PathBuf;

const APP_DATA_DIR_NAME: &str = "lerc";
const LOG_FILE_NAME: &str = "lerc.log";

/// Gets the base application data directory, e.g. `~/.local/share/lerc` or
/// `%LOCALAPPDATA%\lerc`.
pub fn get_app_data_dir() -> Result<PathBuf, String> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DATA_DIR_NAME))
        .ok_or_else(|| "Could not determine local data directory".to_string())
}

/// Gets the log file path: `<app data dir>/lerc.log`
pub fn get_log_file() -> Result<PathBuf, String> {
    Ok(get_app_data_dir()?.join(LOG_FILE_NAME))
}
