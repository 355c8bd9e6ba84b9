use crate::config::Config;
use std::any::Any;
use std::path::{Path, PathBuf};

/// Everything a handler may know about the invocation. Passed explicitly so
/// handlers never reach for process-wide state.
#[derive(Debug, Clone)]
pub struct Context {
    pub home: PathBuf,
    pub config: Config,
    /// The command name the handler was dispatched under.
    pub command: String,
}

impl Context {
    pub fn new(home: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            home: home.into(),
            config,
            command: String::new(),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub(crate) fn for_command(&self, command: &str) -> Self {
        Self {
            command: command.to_string(),
            ..self.clone()
        }
    }
}

/// A runnable command, built-in or plugin-provided.
///
/// `args` excludes the command name. Handlers parse their own flags; nothing
/// is pre-validated by the dispatcher. `Ok(code)` is forwarded verbatim as the
/// process exit code; `Err` means the handler crashed.
pub trait CommandHandler {
    fn run(&self, ctx: &Context, args: &[String]) -> anyhow::Result<i32>;
}

impl<F> CommandHandler for F
where
    F: Fn(&Context, &[String]) -> anyhow::Result<i32>,
{
    fn run(&self, ctx: &Context, args: &[String]) -> anyhow::Result<i32> {
        self(ctx, args)
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
