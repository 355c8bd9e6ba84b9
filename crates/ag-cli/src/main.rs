mod cmd;
mod output;

use ag_core::config::Config;
use ag_core::{exit_code, paths, AgError, Context, Discover, Dispatcher, PluginSet, Registry};
use std::path::{Path, PathBuf};

/// Stands in for discovery when ag.yaml cannot be read: an unreadable config
/// could hide plugins, so plugin dispatch must fail rather than guess.
struct UnreadableConfig {
    path: PathBuf,
    cause: String,
}

impl Discover for UnreadableConfig {
    fn discover(&self) -> ag_core::Result<PluginSet> {
        Err(AgError::discovery(
            format!("config:{}", self.path.display()),
            &self.cause,
        ))
    }
}

fn build_dispatcher(home: &Path) -> ag_core::Result<Dispatcher> {
    let builtins = cmd::builtin_table()?;
    let loader = cmd::plugin_loader();

    let dispatcher = match Config::load(home) {
        Ok(config) => {
            let registry = Registry::from_config(home, &config);
            Dispatcher::new(Context::new(home, config), builtins, registry, loader)
        }
        Err(e) => {
            let path = paths::config_path(home);
            tracing::warn!("ignoring unreadable {}: {e}", path.display());
            let discovery = UnreadableConfig {
                path,
                cause: e.to_string(),
            };
            Dispatcher::new(
                Context::new(home, Config::default()),
                builtins,
                discovery,
                loader,
            )
        }
    };
    Ok(dispatcher.with_program("ag", env!("CARGO_PKG_VERSION")))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Panics inside handlers are reported by the dispatcher; keep the default
    // hook's output out of the user's terminal unless logging asks for it.
    std::panic::set_hook(Box::new(|info| {
        tracing::debug!("{info}");
    }));

    let argv: Vec<String> = match std::env::args_os()
        .skip(1)
        .map(|a| a.into_string())
        .collect::<Result<_, _>>()
    {
        Ok(argv) => argv,
        Err(arg) => {
            eprintln!("error: argument is not valid UTF-8: {arg:?}");
            std::process::exit(exit_code::USAGE);
        }
    };

    let explicit_home = std::env::var_os(paths::HOME_ENV).map(PathBuf::from);
    let dispatcher = match paths::resolve_home(explicit_home.as_deref())
        .and_then(|home| build_dispatcher(&home))
    {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(exit_code::DISCOVERY_FAILURE);
        }
    };

    std::process::exit(dispatcher.dispatch(&argv));
}
