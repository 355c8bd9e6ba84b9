use crate::error::{AgError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

pub const HOME_ENV: &str = "AG_HOME";
pub const DEFAULT_HOME_DIR: &str = "Agentic";

pub const CONFIG_FILE: &str = "ag.yaml";
pub const PLUGINS_DIR: &str = "plugins";
pub const VENV_REGISTRY_FILE: &str = "venv_registry.json";

pub const DEFAULT_REQUIRED_DIRS: &[&str] = &["projects", "shared", "tmp", "logs", "cache", "backups"];

pub const MAX_PLUGIN_NAME_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Home resolution
// ---------------------------------------------------------------------------

/// Resolve the Agentic home directory.
///
/// Priority:
/// 1. `explicit` (the `AG_HOME` environment variable, read by the caller)
/// 2. `<user home>/Agentic`
pub fn resolve_home(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    let home = home::home_dir().ok_or(AgError::HomeNotFound)?;
    Ok(home.join(DEFAULT_HOME_DIR))
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(home: &Path) -> PathBuf {
    home.join(CONFIG_FILE)
}

pub fn plugins_dir(home: &Path) -> PathBuf {
    home.join(PLUGINS_DIR)
}

pub fn venv_registry_path(home: &Path) -> PathBuf {
    home.join(VENV_REGISTRY_FILE)
}

// ---------------------------------------------------------------------------
// Plugin name validation
// ---------------------------------------------------------------------------

/// Plugin names become the first CLI argument, so they must be a single
/// shell-safe word that cannot be mistaken for a flag.
pub fn validate_plugin_name(name: &str) -> Result<()> {
    let well_formed = !name.is_empty()
        && name.len() <= MAX_PLUGIN_NAME_LEN
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !well_formed {
        return Err(AgError::InvalidPluginName(name.to_string()));
    }
    Ok(())
}
