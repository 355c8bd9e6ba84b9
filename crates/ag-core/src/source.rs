//! Discovery sources: the places plugin descriptors come from.
//!
//! A source only enumerates `(name, loader reference)` pairs. It never
//! executes or loads plugin code.

use crate::descriptor::{anchor_exec_target, PluginDescriptor, EXEC_SCHEME};
use crate::error::{AgError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub trait DiscoverySource {
    /// Stable identifier used in error messages and listings.
    fn id(&self) -> String;

    fn enumerate(&self) -> Result<Vec<PluginDescriptor>>;
}

// ---------------------------------------------------------------------------
// Manifest directory
// ---------------------------------------------------------------------------

/// On-disk plugin manifest, one YAML file per plugin.
///
/// A relative `exec:` path in `entry` is relative to the manifest's directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    pub entry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A directory of `*.yaml` / `*.yml` plugin manifests.
#[derive(Debug, Clone)]
pub struct ManifestDirSource {
    dir: PathBuf,
}

impl ManifestDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_manifest(&self, path: &Path) -> Result<PluginDescriptor> {
        let source_id = format!("manifest:{}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|e| AgError::discovery(&source_id, e))?;
        let manifest: PluginManifest =
            serde_yaml::from_str(&raw).map_err(|e| AgError::discovery(&source_id, e))?;
        paths::validate_plugin_name(&manifest.name)
            .map_err(|e| AgError::discovery(&source_id, e))?;

        let base = path.parent().unwrap_or(self.dir.as_path());
        let entry = anchor_exec_target(&manifest.entry, base);
        let descriptor = PluginDescriptor::new(manifest.name, entry, source_id);
        Ok(match manifest.description {
            Some(description) => descriptor.with_description(description),
            None => descriptor,
        })
    }
}

impl DiscoverySource for ManifestDirSource {
    fn id(&self) -> String {
        format!("manifest:{}", self.dir.display())
    }

    fn enumerate(&self) -> Result<Vec<PluginDescriptor>> {
        if !self.dir.exists() {
            tracing::debug!(dir = %self.dir.display(), "manifest directory absent");
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|e| AgError::discovery(self.id(), e))?;
        let mut manifests: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AgError::discovery(self.id(), e))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            let is_yaml = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            );
            if is_yaml && path.is_file() {
                manifests.push(path);
            }
        }
        // read_dir order is platform-dependent
        manifests.sort();

        manifests
            .iter()
            .map(|path| self.read_manifest(path))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Executable search path
// ---------------------------------------------------------------------------

/// Executables named `<prefix><name>` on a search path, git-style.
///
/// Earlier entries shadow later ones, matching shell lookup, so this source
/// never reports one name twice.
#[derive(Debug, Clone)]
pub struct PathSource {
    prefix: String,
    search_path: Option<OsString>,
}

impl PathSource {
    pub fn new(prefix: impl Into<String>, search_path: Option<OsString>) -> Self {
        Self {
            prefix: prefix.into(),
            search_path,
        }
    }

    pub fn from_env(prefix: impl Into<String>) -> Self {
        Self::new(prefix, std::env::var_os("PATH"))
    }

    fn command_name(&self, file_name: &str) -> Option<String> {
        let rest = file_name.strip_prefix(&self.prefix)?;
        let rest = if cfg!(windows) {
            rest.strip_suffix(".exe").unwrap_or(rest)
        } else {
            rest
        };
        paths::validate_plugin_name(rest).ok()?;
        Some(rest.to_string())
    }
}

impl DiscoverySource for PathSource {
    fn id(&self) -> String {
        "path".to_string()
    }

    fn enumerate(&self) -> Result<Vec<PluginDescriptor>> {
        let Some(search_path) = &self.search_path else {
            return Ok(Vec::new());
        };
        if self.prefix.is_empty() {
            return Err(AgError::discovery(self.id(), "empty executable prefix"));
        }

        let mut found: BTreeMap<String, PluginDescriptor> = BTreeMap::new();
        for dir in std::env::split_paths(search_path) {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    // Stale or unreadable PATH entries are routine
                    tracing::debug!(dir = %dir.display(), error = %e, "skipping search path entry");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let file_name = entry.file_name().to_string_lossy().into_owned();
                let Some(name) = self.command_name(&file_name) else {
                    continue;
                };
                let path = entry.path();
                if found.contains_key(&name) || !crate::io::is_executable(&path) {
                    continue;
                }
                let descriptor = PluginDescriptor::new(
                    name.clone(),
                    format!("{EXEC_SCHEME}:{}", path.display()),
                    format!("path:{}", path.display()),
                );
                found.insert(name, descriptor);
            }
        }
        Ok(found.into_values().collect())
    }
}

// ---------------------------------------------------------------------------
// Configuration table
// ---------------------------------------------------------------------------

/// The `plugins:` table of `ag.yaml`. Relative `exec:` paths are relative to
/// the directory holding `ag.yaml`.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    config_path: PathBuf,
    plugins: BTreeMap<String, String>,
}

impl ConfigSource {
    pub fn new(config_path: impl Into<PathBuf>, plugins: BTreeMap<String, String>) -> Self {
        Self {
            config_path: config_path.into(),
            plugins,
        }
    }
}

impl DiscoverySource for ConfigSource {
    fn id(&self) -> String {
        format!("config:{}", self.config_path.display())
    }

    fn enumerate(&self) -> Result<Vec<PluginDescriptor>> {
        let id = self.id();
        let base = self.config_path.parent().unwrap_or(Path::new("."));
        self.plugins
            .iter()
            .map(|(name, entry)| {
                paths::validate_plugin_name(name).map_err(|e| AgError::discovery(&id, e))?;
                let entry = anchor_exec_target(entry, base);
                Ok(PluginDescriptor::new(name.clone(), entry, id.clone()))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Static list
// ---------------------------------------------------------------------------

/// A fixed in-memory list of descriptors.
#[derive(Debug, Clone)]
pub struct StaticSource {
    id: String,
    descriptors: Vec<PluginDescriptor>,
}

impl StaticSource {
    pub fn new<N, R>(id: impl Into<String>, entries: impl IntoIterator<Item = (N, R)>) -> Self
    where
        N: Into<String>,
        R: Into<String>,
    {
        let id = id.into();
        let descriptors = entries
            .into_iter()
            .map(|(name, reference)| PluginDescriptor::new(name, reference, id.clone()))
            .collect();
        Self { id, descriptors }
    }
}

impl DiscoverySource for StaticSource {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn enumerate(&self) -> Result<Vec<PluginDescriptor>> {
        for descriptor in &self.descriptors {
            paths::validate_plugin_name(&descriptor.name)
                .map_err(|e| AgError::discovery(&self.id, e))?;
        }
        Ok(self.descriptors.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_manifest_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let source = ManifestDirSource::new(dir.path().join("plugins"));
        assert!(source.enumerate().unwrap().is_empty());
    }

    #[test]
    fn manifest_dir_reads_yaml_files_in_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("note.yaml"),
            "name: note\nentry: exec:ag-note\ndescription: Take notes\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("github.yml"), "name: github\nentry: symbol:github\n")
            .unwrap();
        std::fs::write(dir.path().join("README.md"), "not a manifest").unwrap();
        std::fs::write(dir.path().join(".hidden.yaml"), "garbage: [").unwrap();

        let descriptors = ManifestDirSource::new(dir.path()).enumerate().unwrap();
        let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["github", "note"]);
        assert_eq!(descriptors[1].description.as_deref(), Some("Take notes"));
        assert!(descriptors[1].source.starts_with("manifest:"));
        assert!(descriptors[1].source.ends_with("note.yaml"));
    }

    #[test]
    fn manifest_exec_paths_are_relative_to_the_manifest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("todo.yaml"),
            "name: todo\nentry: exec:bin/ag-todo\n",
        )
        .unwrap();
        let descriptors = ManifestDirSource::new(dir.path()).enumerate().unwrap();
        assert_eq!(
            descriptors[0].loader_reference,
            format!("exec:{}", dir.path().join("bin/ag-todo").display())
        );
    }

    #[test]
    fn manifest_round_trips_through_yaml() {
        let manifest = PluginManifest {
            name: "todo".to_string(),
            entry: "exec:/opt/ag-todo".to_string(),
            description: Some("cafe\u{301} \"list\": \u{7f}".to_string()),
        };
        let yaml = serde_yaml::to_string(&manifest).unwrap();
        let parsed: PluginManifest = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn malformed_manifest_fails_discovery() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "name: broken\n").unwrap();
        let err = ManifestDirSource::new(dir.path()).enumerate().unwrap_err();
        assert!(matches!(err, AgError::Discovery { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn manifest_with_invalid_name_fails_discovery() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("x.yaml"), "name: --help\nentry: exec:x\n").unwrap();
        let err = ManifestDirSource::new(dir.path()).enumerate().unwrap_err();
        assert!(matches!(err, AgError::Discovery { .. }));
    }

    #[cfg(unix)]
    fn write_executable(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn path_source_finds_prefixed_executables() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let winner = write_executable(first.path(), "ag-note");
        write_executable(second.path(), "ag-note");
        write_executable(second.path(), "ag-github");
        write_executable(second.path(), "unrelated");
        std::fs::write(second.path().join("ag-not-executable"), "").unwrap();

        let search_path =
            std::env::join_paths([first.path(), Path::new("/definitely/missing"), second.path()])
                .unwrap();
        let descriptors = PathSource::new("ag-", Some(search_path)).enumerate().unwrap();

        let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["github", "note"]);
        let note = &descriptors[1];
        assert_eq!(note.loader_reference, format!("exec:{}", winner.display()));
        assert_eq!(note.source, format!("path:{}", winner.display()));
    }

    #[test]
    fn path_source_without_path_is_empty() {
        assert!(PathSource::new("ag-", None).enumerate().unwrap().is_empty());
    }

    #[test]
    fn config_source_reports_config_path() {
        let mut plugins = BTreeMap::new();
        plugins.insert("note".to_string(), "exec:ag-note".to_string());
        plugins.insert("todo".to_string(), "exec:plugins/bin/ag-todo".to_string());
        let source = ConfigSource::new("/tmp/agentic/ag.yaml", plugins);
        let descriptors = source.enumerate().unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].source, "config:/tmp/agentic/ag.yaml");
        assert_eq!(descriptors[0].loader_reference, "exec:ag-note");
        assert_eq!(
            descriptors[1].loader_reference,
            "exec:/tmp/agentic/plugins/bin/ag-todo"
        );
    }

    #[test]
    fn static_source_rejects_invalid_names() {
        let source = StaticSource::new("test", [("bad name", "exec:x")]);
        assert!(matches!(
            source.enumerate(),
            Err(AgError::Discovery { .. })
        ));
    }
}
