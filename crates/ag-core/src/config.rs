use crate::descriptor::LoaderReference;
use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: String) -> Self {
        Self {
            level: WarnLevel::Warning,
            message,
        }
    }

    fn error(message: String) -> Self {
        Self {
            level: WarnLevel::Error,
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// EnvironmentConfig
// ---------------------------------------------------------------------------

/// What `ag env check` expects to find in the Agentic home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default = "default_required_dirs")]
    pub required_dirs: Vec<String>,
    #[serde(default = "default_required_tools")]
    pub required_tools: Vec<String>,
}

fn default_required_dirs() -> Vec<String> {
    paths::DEFAULT_REQUIRED_DIRS
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_required_tools() -> Vec<String> {
    vec!["uv".to_string(), "gh".to_string()]
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            required_dirs: default_required_dirs(),
            required_tools: default_required_tools(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Extra manifest directories, scanned after `<home>/plugins`.
    /// Relative entries are resolved against the Agentic home.
    #[serde(default)]
    pub plugin_dirs: Vec<PathBuf>,
    /// Scan PATH for `<path_prefix><name>` executables.
    #[serde(default = "default_path_scan")]
    pub path_scan: bool,
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    /// Statically configured plugins: name -> loader reference.
    #[serde(default)]
    pub plugins: BTreeMap<String, String>,
    #[serde(default)]
    pub environment: EnvironmentConfig,
}

fn default_path_scan() -> bool {
    true
}

fn default_path_prefix() -> String {
    "ag-".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugin_dirs: Vec::new(),
            path_scan: default_path_scan(),
            path_prefix: default_path_prefix(),
            plugins: BTreeMap::new(),
            environment: EnvironmentConfig::default(),
        }
    }
}

impl Config {
    /// Load `<home>/ag.yaml`. A missing file yields the defaults.
    pub fn load(home: &Path) -> Result<Self> {
        let path = paths::config_path(home);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, home: &Path) -> Result<()> {
        let path = paths::config_path(home);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Every manifest directory to scan, in discovery order.
    pub fn manifest_dirs(&self, home: &Path) -> Vec<PathBuf> {
        let mut dirs = vec![paths::plugins_dir(home)];
        for dir in &self.plugin_dirs {
            let resolved = if dir.is_absolute() {
                dir.clone()
            } else {
                home.join(dir)
            };
            if !dirs.contains(&resolved) {
                dirs.push(resolved);
            }
        }
        dirs
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, home: &Path) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Static plugin table: names must be invocable, references parseable
        for (name, entry) in &self.plugins {
            if paths::validate_plugin_name(name).is_err() {
                warnings.push(ConfigWarning::error(format!(
                    "invalid plugin name '{name}' in plugins"
                )));
            }
            if let Err(e) = LoaderReference::parse(entry) {
                warnings.push(ConfigWarning::error(format!(
                    "plugin '{name}' has a malformed entry: {e}"
                )));
            }
        }

        // 2. PATH scanning needs a prefix, otherwise every executable is a plugin
        if self.path_scan && self.path_prefix.trim().is_empty() {
            warnings.push(ConfigWarning::error(
                "path_prefix must not be empty when path_scan is enabled".to_string(),
            ));
        }

        // 3. Extra manifest directories that do not exist
        for dir in self.manifest_dirs(home).iter().skip(1) {
            if !dir.is_dir() {
                warnings.push(ConfigWarning::warning(format!(
                    "plugin directory '{}' does not exist",
                    dir.display()
                )));
            }
        }

        // 4. Environment expectations
        for dir in &self.environment.required_dirs {
            if dir.trim().is_empty() || Path::new(dir).is_absolute() {
                warnings.push(ConfigWarning::warning(format!(
                    "required directory '{dir}' should be a non-empty path relative to the home"
                )));
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(cfg.path_scan);
        assert_eq!(cfg.path_prefix, "ag-");
        assert_eq!(cfg.environment.required_tools, vec!["uv", "gh"]);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("ag.yaml"),
            "path_scan: false\nplugins:\n  note: exec:/opt/ag-note\n",
        )
        .unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert!(!cfg.path_scan);
        assert_eq!(cfg.path_prefix, "ag-");
        assert_eq!(cfg.plugins.get("note").unwrap(), "exec:/opt/ag-note");
        assert_eq!(cfg.environment.required_dirs.len(), 6);
    }

    #[test]
    fn save_then_load_preserves_plugins() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.plugins
            .insert("github".to_string(), "exec:ag-github".to_string());
        cfg.save(dir.path()).unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), cfg);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ag.yaml"), "plugins: [unclosed").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }

    #[test]
    fn manifest_dirs_resolve_relative_entries() {
        let home = Path::new("/tmp/agentic");
        let cfg = Config {
            plugin_dirs: vec![
                PathBuf::from("shared/plugins"),
                PathBuf::from("/opt/ag/plugins"),
                PathBuf::from("plugins"),
            ],
            ..Config::default()
        };
        assert_eq!(
            cfg.manifest_dirs(home),
            vec![
                PathBuf::from("/tmp/agentic/plugins"),
                PathBuf::from("/tmp/agentic/shared/plugins"),
                PathBuf::from("/opt/ag/plugins"),
            ]
        );
    }

    #[test]
    fn validate_default_config_no_warnings() {
        let dir = TempDir::new().unwrap();
        assert!(Config::default().validate(dir.path()).is_empty());
    }

    #[test]
    fn validate_flags_bad_plugin_entries() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.plugins
            .insert("-bad".to_string(), "exec:ag-bad".to_string());
        cfg.plugins
            .insert("note".to_string(), "agentic_note:main".to_string());
        let warnings = cfg.validate(dir.path());
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("'-bad'")));
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("plugin 'note'")));
    }

    #[test]
    fn validate_warns_on_missing_plugin_dir() {
        let dir = TempDir::new().unwrap();
        let cfg = Config {
            plugin_dirs: vec![PathBuf::from("nowhere")],
            ..Config::default()
        };
        let warnings = cfg.validate(dir.path());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert!(warnings[0].message.contains("nowhere"));
    }

    #[test]
    fn validate_rejects_empty_prefix() {
        let dir = TempDir::new().unwrap();
        let cfg = Config {
            path_prefix: String::new(),
            ..Config::default()
        };
        assert!(cfg
            .validate(dir.path())
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("path_prefix")));
    }
}
