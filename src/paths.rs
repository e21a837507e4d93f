//! Path resolution for bridgeward
//!
//! # Environment Variables
//!
//! - `BRIDGEWARD_CONFIG_DIR` - Override config directory
//! - `BRIDGEWARD_STATE_DIR` - Override state directory
//!
//! For config_dir():
//! 1. `BRIDGEWARD_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/bridgeward` (if set)
//! 3. `~/.config/bridgeward`
//!
//! For state_dir():
//! 1. `BRIDGEWARD_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/bridgeward` (if set)
//! 3. `~/.local/state/bridgeward`

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP: &str = "bridgeward";

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "BRIDGEWARD_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "BRIDGEWARD_STATE_DIR";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {ENV_CONFIG_DIR}: {}", path.display());
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join(APP))
}

/// Get the state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {ENV_STATE_DIR}: {}", path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".local").join("state").join(APP))
}

/// Expand `~` and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
