use std::collections::BTreeMap;
use std::ffi::OsString;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use crate::descriptor::{is_path_target, LoaderReference, PluginDescriptor};
use crate::error::{AgError, Result};
use crate::exec::ExecHandler;
use crate::handler::{panic_message, CommandHandler};

/// Builds a handler for a `symbol:` reference.
pub type HandlerFactory = Box<dyn Fn() -> anyhow::Result<Box<dyn CommandHandler>>>;

/// Turns one descriptor into a runnable handler.
pub trait Load {
    fn load(&self, descriptor: &PluginDescriptor) -> Result<Box<dyn CommandHandler>>;
}

/// Resolves `exec:` references against the filesystem and `symbol:`
/// references against a table of linked-in factories.
#[derive(Default)]
pub struct Loader {
    symbols: BTreeMap<String, HandlerFactory>,
    search_path: Option<OsString>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol<F>(mut self, symbol: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Box<dyn CommandHandler>> + 'static,
    {
        self.symbols.insert(symbol.into(), Box::new(factory));
        self
    }

    /// Look up bare `exec:` program names in `search_path` instead of `PATH`.
    pub fn with_search_path(mut self, search_path: OsString) -> Self {
        self.search_path = Some(search_path);
        self
    }

    fn resolve_program(&self, target: &str) -> std::result::Result<PathBuf, String> {
        let as_path = Path::new(target);
        if is_path_target(target) {
            if !as_path.exists() {
                return Err(format!("program '{target}' does not exist"));
            }
            if !crate::io::is_executable(as_path) {
                return Err(format!("program '{target}' is not executable"));
            }
            return Ok(as_path.to_path_buf());
        }

        let found = match &self.search_path {
            Some(search_path) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                which::which_in(target, Some(search_path), cwd)
            }
            None => which::which(target),
        };
        found.map_err(|e| format!("program '{target}' not found on PATH: {e}"))
    }

    fn build_symbol(&self, symbol: &str) -> std::result::Result<Box<dyn CommandHandler>, String> {
        let factory = self
            .symbols
            .get(symbol)
            .ok_or_else(|| format!("symbol '{symbol}' is not registered in this build"))?;
        match panic::catch_unwind(AssertUnwindSafe(|| factory())) {
            Ok(Ok(handler)) => Ok(handler),
            Ok(Err(e)) => Err(format!("{e:#}")),
            Err(payload) => Err(format!(
                "factory for '{symbol}' panicked: {}",
                panic_message(&*payload)
            )),
        }
    }
}

impl Load for Loader {
    fn load(&self, descriptor: &PluginDescriptor) -> Result<Box<dyn CommandHandler>> {
        let name = &descriptor.name;
        let reference = LoaderReference::parse(&descriptor.loader_reference)
            .map_err(|e| AgError::load_failure(name, e))?;
        tracing::debug!(plugin = %name, %reference, "loading plugin");

        match reference {
            LoaderReference::Exec(target) => {
                let program = self
                    .resolve_program(&target)
                    .map_err(|cause| AgError::load_failure(name, cause))?;
                Ok(Box::new(ExecHandler::new(program)))
            }
            LoaderReference::Symbol(symbol) => self
                .build_symbol(&symbol)
                .map_err(|cause| AgError::load_failure(name, cause)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handler::Context;
    use tempfile::TempDir;

    struct Echo;

    impl CommandHandler for Echo {
        fn run(&self, _ctx: &Context, args: &[String]) -> anyhow::Result<i32> {
            Ok(args.len() as i32)
        }
    }

    fn descriptor(reference: &str) -> PluginDescriptor {
        PluginDescriptor::new("note", reference, "test")
    }

    fn load_err(loader: &Loader, reference: &str) -> String {
        match loader.load(&descriptor(reference)) {
            Err(e @ AgError::LoadFailure { .. }) => e.to_string(),
            Err(other) => panic!("expected LoadFailure, got {other:?}"),
            Ok(_) => panic!("expected LoadFailure for {reference}"),
        }
    }

    #[test]
    fn symbol_reference_builds_handler() {
        let loader =
            Loader::new().with_symbol("note", || Ok(Box::new(Echo) as Box<dyn CommandHandler>));
        let handler = loader.load(&descriptor("symbol:note")).unwrap();
        let ctx = Context::new("/tmp/agentic", Config::default());
        assert_eq!(handler.run(&ctx, &["a".into(), "b".into()]).unwrap(), 2);
    }

    #[test]
    fn missing_symbol_is_load_failure() {
        let msg = load_err(&Loader::new(), "symbol:note");
        assert!(msg.starts_with("plugin 'note' failed to load:"), "{msg}");
        assert!(msg.contains("not registered"), "{msg}");
    }

    #[test]
    fn failing_factory_is_load_failure() {
        let loader = Loader::new().with_symbol("note", || anyhow::bail!("incompatible signature"));
        assert!(load_err(&loader, "symbol:note").contains("incompatible signature"));
    }

    #[test]
    fn panicking_factory_is_load_failure() {
        let loader = Loader::new().with_symbol("note", || panic!("boom"));
        let msg = load_err(&loader, "symbol:note");
        assert!(msg.contains("panicked: boom"), "{msg}");
    }

    #[test]
    fn malformed_reference_is_load_failure() {
        let msg = load_err(&Loader::new(), "agentic_note.cli:main");
        assert!(msg.contains("unknown loader scheme"), "{msg}");
    }

    #[test]
    fn missing_exec_path_is_load_failure() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("ag-note");
        let msg = load_err(&Loader::new(), &format!("exec:{}", missing.display()));
        assert!(msg.contains("does not exist"), "{msg}");
    }

    #[test]
    fn bare_program_is_searched_on_search_path() {
        let dir = TempDir::new().unwrap();
        let loader = Loader::new().with_search_path(dir.path().as_os_str().to_owned());
        let msg = load_err(&loader, "exec:ag-nowhere-to-be-found");
        assert!(msg.contains("not found on PATH"), "{msg}");
    }

    #[cfg(unix)]
    #[test]
    fn exec_reference_resolves_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ag-note");
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();

        let msg = load_err(&Loader::new(), &format!("exec:{}", path.display()));
        assert!(msg.contains("not executable"), "{msg}");

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        let loader = Loader::new().with_search_path(dir.path().as_os_str().to_owned());
        assert!(loader.load(&descriptor("exec:ag-note")).is_ok());
        assert!(loader
            .load(&descriptor(&format!("exec:{}", path.display())))
            .is_ok());
    }
}
