//! Plugin descriptors and the loader reference grammar.
//!
//! A descriptor is what discovery produces: a command name plus an opaque
//! locator string. The locator is only parsed into a [`LoaderReference`] by the
//! loader, at the moment the command is actually invoked.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub loader_reference: String,
    /// Identifier of the discovery source that reported this descriptor.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PluginDescriptor {
    pub fn new(
        name: impl Into<String>,
        loader_reference: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            loader_reference: loader_reference.into(),
            source: source.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// ---------------------------------------------------------------------------
// LoaderReference
// ---------------------------------------------------------------------------

pub const EXEC_SCHEME: &str = "exec";
pub const SYMBOL_SCHEME: &str = "symbol";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderReference {
    /// External executable: a path, or a bare program name looked up on PATH.
    Exec(String),
    /// Handler factory linked into the binary.
    Symbol(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("empty loader reference")]
    Empty,

    #[error("unknown loader scheme '{0}' (expected 'exec:' or 'symbol:')")]
    UnknownScheme(String),

    #[error("loader reference '{0}' has no target after the scheme")]
    MissingTarget(String),
}

impl LoaderReference {
    pub fn parse(raw: &str) -> Result<Self, ReferenceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ReferenceError::Empty);
        }
        let Some((scheme, target)) = raw.split_once(':') else {
            return Err(ReferenceError::UnknownScheme(raw.to_string()));
        };
        let target = target.trim();
        if target.is_empty() {
            return Err(ReferenceError::MissingTarget(raw.to_string()));
        }
        match scheme {
            EXEC_SCHEME => Ok(LoaderReference::Exec(target.to_string())),
            SYMBOL_SCHEME => Ok(LoaderReference::Symbol(target.to_string())),
            other => Err(ReferenceError::UnknownScheme(other.to_string())),
        }
    }
}

/// Whether an `exec:` target is a filesystem path rather than a program name
/// to look up on PATH.
pub fn is_path_target(target: &str) -> bool {
    let path = Path::new(target);
    path.is_absolute() || path.components().count() > 1
}

/// Rewrite a relative `exec:` path in `raw` so it is anchored at `base`.
///
/// Relative paths in a manifest or in `ag.yaml` mean "next to this file",
/// never "relative to wherever ag was started". Bare program names, absolute
/// paths, `symbol:` and malformed references come back unchanged; the loader
/// reports the malformed ones.
pub fn anchor_exec_target(raw: &str, base: &Path) -> String {
    match LoaderReference::parse(raw) {
        Ok(LoaderReference::Exec(target))
            if is_path_target(&target) && Path::new(&target).is_relative() =>
        {
            LoaderReference::Exec(base.join(&target).display().to_string()).to_string()
        }
        _ => raw.to_string(),
    }
}

impl fmt::Display for LoaderReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderReference::Exec(target) => write!(f, "{EXEC_SCHEME}:{target}"),
            LoaderReference::Symbol(target) => write!(f, "{SYMBOL_SCHEME}:{target}"),
        }
    }
}
