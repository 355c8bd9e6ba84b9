use crate::config::Config;
use crate::descriptor::PluginDescriptor;
use crate::error::{AgError, Result};
use crate::paths;
use crate::source::{ConfigSource, DiscoverySource, ManifestDirSource, PathSource};
use std::collections::BTreeMap;
use std::path::Path;

/// The deduplicated result of one discovery pass, keyed and ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginSet {
    by_name: BTreeMap<String, PluginDescriptor>,
}

impl PluginSet {
    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Descriptors sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.by_name.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Add a descriptor, refusing to pick a winner when the name is taken.
    pub fn insert(&mut self, descriptor: PluginDescriptor) -> Result<()> {
        if let Some(existing) = self.by_name.get(&descriptor.name) {
            return Err(AgError::DuplicatePlugin {
                name: descriptor.name,
                first: existing.source.clone(),
                second: descriptor.source,
            });
        }
        self.by_name.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }
}

/// Anything that can enumerate the plugins visible to this process.
pub trait Discover {
    fn discover(&self) -> Result<PluginSet>;
}

/// Discovery over an ordered list of sources.
#[derive(Default)]
pub struct Registry {
    sources: Vec<Box<dyn DiscoverySource>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl DiscoverySource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn add_source(&mut self, source: Box<dyn DiscoverySource>) {
        self.sources.push(source);
    }

    /// The standard source set for an Agentic home: manifest directories,
    /// then the config table, then PATH executables.
    pub fn from_config(home: &Path, config: &Config) -> Self {
        let mut registry = Registry::new();
        for dir in config.manifest_dirs(home) {
            registry.add_source(Box::new(ManifestDirSource::new(dir)));
        }
        if !config.plugins.is_empty() {
            registry.add_source(Box::new(ConfigSource::new(
                paths::config_path(home),
                config.plugins.clone(),
            )));
        }
        if config.path_scan {
            registry.add_source(Box::new(PathSource::from_env(config.path_prefix.clone())));
        }
        registry
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id()).collect()
    }
}

impl Discover for Registry {
    fn discover(&self) -> Result<PluginSet> {
        let mut set = PluginSet::default();
        for source in &self.sources {
            let descriptors = source.enumerate()?;
            tracing::debug!(source = %source.id(), count = descriptors.len(), "enumerated plugins");
            for descriptor in descriptors {
                set.insert(descriptor)?;
            }
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticSource;
    use tempfile::TempDir;

    struct Unavailable;

    impl DiscoverySource for Unavailable {
        fn id(&self) -> String {
            "unavailable".to_string()
        }

        fn enumerate(&self) -> Result<Vec<PluginDescriptor>> {
            Err(AgError::discovery(self.id(), "metadata store unreadable"))
        }
    }

    #[test]
    fn merges_sources_in_name_order() {
        let registry = Registry::new()
            .with_source(StaticSource::new("site", [("note", "exec:ag-note")]))
            .with_source(StaticSource::new("user", [("github", "symbol:github")]));
        let set = registry.discover().unwrap();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["github", "note"]);
        assert_eq!(set.get("note").unwrap().source, "site");
    }

    #[test]
    fn duplicate_across_sources_names_both() {
        let registry = Registry::new()
            .with_source(StaticSource::new("site", [("note", "exec:ag-note")]))
            .with_source(StaticSource::new("user", [("note", "exec:/opt/ag-note")]));
        match registry.discover() {
            Err(AgError::DuplicatePlugin {
                name,
                first,
                second,
            }) => {
                assert_eq!(name, "note");
                assert_eq!(first, "site");
                assert_eq!(second, "user");
            }
            other => panic!("expected DuplicatePlugin, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_within_manifest_dir_names_both_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.yaml"), "name: note\nentry: exec:one\n").unwrap();
        std::fs::write(dir.path().join("b.yaml"), "name: note\nentry: exec:two\n").unwrap();
        let registry = Registry::new().with_source(ManifestDirSource::new(dir.path()));
        let err = registry.discover().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("a.yaml"), "{msg}");
        assert!(msg.contains("b.yaml"), "{msg}");
    }

    #[test]
    fn source_failure_is_fatal() {
        let registry = Registry::new()
            .with_source(StaticSource::new("site", [("note", "exec:ag-note")]))
            .with_source(Unavailable);
        assert!(matches!(
            registry.discover(),
            Err(AgError::Discovery { .. })
        ));
    }

    #[test]
    fn from_config_orders_sources() {
        let dir = TempDir::new().unwrap();
        let mut config = Config {
            path_scan: false,
            ..Config::default()
        };
        config
            .plugins
            .insert("note".to_string(), "exec:ag-note".to_string());
        let ids = Registry::from_config(dir.path(), &config).source_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids[0].starts_with("manifest:"));
        assert!(ids[1].starts_with("config:"));
    }

    #[test]
    fn manifest_and_config_collide() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("plugins")).unwrap();
        std::fs::write(
            dir.path().join("plugins/note.yaml"),
            "name: note\nentry: exec:ag-note\n",
        )
        .unwrap();
        let mut config = Config {
            path_scan: false,
            ..Config::default()
        };
        config
            .plugins
            .insert("note".to_string(), "exec:other".to_string());
        let err = Registry::from_config(dir.path(), &config)
            .discover()
            .unwrap_err();
        assert!(matches!(err, AgError::DuplicatePlugin { .. }));
    }
}
