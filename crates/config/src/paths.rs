//! Config path utilities

use std::path::PathBuf;

/// Data directory (~/.tatty), falling back to ./.tatty when no home is known
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".tatty"))
        .unwrap_or_else(|| PathBuf::from(".tatty"))
}

/// Default config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
