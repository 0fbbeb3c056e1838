//! Persistence: the shared key-value store and TOML configuration.

mod config;
pub mod store;

pub use config::{Config, SitesConfig, TimerConfig};
pub use store::{keys, Store, StoreChange, WidgetPosition};

use std::path::PathBuf;

/// Returns `~/.config/mindtap[-dev]/` based on MINDTAP_ENV, creating it if
/// needed. MINDTAP_DATA_DIR overrides the location entirely (used by tests).
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Ok(dir) = std::env::var("MINDTAP_DATA_DIR") {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir)?;
        return Ok(dir);
    }

    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MINDTAP_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("mindtap-dev")
    } else {
        base_dir.join("mindtap")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
