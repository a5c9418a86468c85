//! Configuration and data paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/formcheck/`, `~/.local/share/formcheck/`
//! - macOS: `~/Library/Application Support/formcheck/`
//! - Windows: `%APPDATA%\formcheck\`

use std::io;
use std::path::PathBuf;

const APP_NAME: &str = "formcheck";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the data directory where local results are kept
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Default location of the local result sink
pub fn results_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("results.jsonl"))
}

/// Ensure the parent directory of `path` exists
pub fn ensure_parent(path: &std::path::Path) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}
