//! Command resolution: `argv -> exit code`.
//!
//! Resolution order is fixed: top-level flags, then built-ins, then plugins.
//! Discovery only runs when argv[0] is not a built-in, and only the plugin
//! whose name matches argv[0] is ever loaded.

use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};

use crate::builtin::{Builtin, BuiltinTable};
use crate::error::AgError;
use crate::handler::{panic_message, CommandHandler, Context};
use crate::loader::Load;
use crate::registry::{Discover, PluginSet};

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    /// No command given, or a built-in reported an ordinary failure.
    pub const USAGE: i32 = 1;
    pub const DISCOVERY_FAILURE: i32 = 2;
    pub const LOAD_FAILURE: i32 = 3;
    pub const HANDLER_CRASH: i32 = 4;
    pub const UNKNOWN_COMMAND: i32 = 127;
}

pub struct Dispatcher {
    program: String,
    version: String,
    builtins: BuiltinTable,
    discovery: Box<dyn Discover>,
    loader: Box<dyn Load>,
    ctx: Context,
}

impl Dispatcher {
    pub fn new(
        ctx: Context,
        builtins: BuiltinTable,
        discovery: impl Discover + 'static,
        loader: impl Load + 'static,
    ) -> Self {
        Self {
            program: "ag".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            builtins,
            discovery: Box::new(discovery),
            loader: Box::new(loader),
            ctx,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>, version: impl Into<String>) -> Self {
        self.program = program.into();
        self.version = version.into();
        self
    }

    /// Dispatch against the process's stdout and stderr.
    pub fn dispatch(&self, argv: &[String]) -> i32 {
        let stdout = io::stdout();
        let stderr = io::stderr();
        self.dispatch_to(argv, &mut stdout.lock(), &mut stderr.lock())
    }

    pub fn dispatch_to(&self, argv: &[String], out: &mut dyn Write, err: &mut dyn Write) -> i32 {
        let Some((name, rest)) = argv.split_first() else {
            self.write_usage(err);
            return exit_code::USAGE;
        };

        match name.as_str() {
            "-h" | "--help" => {
                self.write_usage(out);
                return exit_code::SUCCESS;
            }
            "-V" | "--version" => {
                let _ = writeln!(out, "{} {}", self.program, self.version);
                return exit_code::SUCCESS;
            }
            _ => {}
        }

        if let Some(builtin) = self.builtins.get(name) {
            tracing::debug!(command = %name, "dispatching to built-in");
            return self.run_builtin(builtin, rest, err);
        }

        let plugins = match self.discover(err) {
            Ok(plugins) => plugins,
            Err(e) => {
                tracing::debug!(error = ?e, "discovery failed");
                let _ = writeln!(err, "error: {e}");
                return exit_code::DISCOVERY_FAILURE;
            }
        };

        let Some(descriptor) = plugins.get(name) else {
            let _ = writeln!(err, "{}", AgError::UnknownCommand(name.clone()));
            let _ = writeln!(err, "available commands:");
            self.write_command_list(err, Some(&plugins));
            return exit_code::UNKNOWN_COMMAND;
        };

        let handler = match self.loader.load(descriptor) {
            Ok(handler) => handler,
            Err(e) => {
                tracing::debug!(plugin = %name, source = %descriptor.source, error = ?e, "load failed");
                let _ = writeln!(err, "error: {e}");
                return exit_code::LOAD_FAILURE;
            }
        };

        self.run_plugin(name, handler.as_ref(), rest, err)
    }

    fn discover(&self, err: &mut dyn Write) -> crate::Result<PluginSet> {
        let plugins = self.discovery.discover()?;
        for shadowed in plugins.iter().filter(|d| self.builtins.contains(&d.name)) {
            tracing::debug!(plugin = %shadowed.name, source = %shadowed.source, "plugin shadowed");
            let _ = writeln!(
                err,
                "warning: plugin '{}' from {} is shadowed by the built-in command",
                shadowed.name, shadowed.source
            );
        }
        Ok(plugins)
    }

    fn run_builtin(&self, builtin: &Builtin, rest: &[String], err: &mut dyn Write) -> i32 {
        let ctx = self.ctx.for_command(&builtin.name);
        match panic::catch_unwind(AssertUnwindSafe(|| builtin.handler().run(&ctx, rest))) {
            Ok(Ok(code)) => code,
            Ok(Err(e)) => {
                let _ = writeln!(err, "error: {e:#}");
                exit_code::USAGE
            }
            Err(payload) => {
                let _ = writeln!(
                    err,
                    "error: built-in '{}' crashed: {}",
                    builtin.name,
                    panic_message(&*payload)
                );
                exit_code::HANDLER_CRASH
            }
        }
    }

    fn run_plugin(
        &self,
        name: &str,
        handler: &dyn CommandHandler,
        rest: &[String],
        err: &mut dyn Write,
    ) -> i32 {
        let ctx = self.ctx.for_command(name);
        let cause = match panic::catch_unwind(AssertUnwindSafe(|| handler.run(&ctx, rest))) {
            Ok(Ok(code)) => {
                tracing::debug!(plugin = %name, code, "plugin finished");
                return code;
            }
            Ok(Err(e)) => {
                tracing::debug!(plugin = %name, error = ?e, "plugin returned an error");
                format!("{e:#}")
            }
            Err(payload) => panic_message(&*payload),
        };
        let crash = AgError::HandlerCrash {
            name: name.to_string(),
            cause,
        };
        let _ = writeln!(err, "error: {crash}");
        exit_code::HANDLER_CRASH
    }

    // -----------------------------------------------------------------------
    // Usage and command listings
    // -----------------------------------------------------------------------

    fn write_usage(&self, w: &mut dyn Write) {
        let _ = writeln!(w, "usage: {} <command> [args...]", self.program);
        let _ = writeln!(w);
        let _ = writeln!(w, "commands:");
        match self.discovery.discover() {
            Ok(plugins) => self.write_command_list(w, Some(&plugins)),
            Err(e) => {
                self.write_command_list(w, None);
                let _ = writeln!(w);
                let _ = writeln!(w, "note: plugins unavailable: {e}");
            }
        }
    }

    /// Built-ins in table order, then plugins by name. Shadowed plugins are
    /// listed once, as the built-in.
    fn write_command_list(&self, w: &mut dyn Write, plugins: Option<&PluginSet>) {
        let mut rows: Vec<(&str, &str)> = self
            .builtins
            .iter()
            .map(|b| (b.name.as_str(), b.summary.as_str()))
            .collect();
        if let Some(plugins) = plugins {
            rows.extend(
                plugins
                    .iter()
                    .filter(|d| !self.builtins.contains(&d.name))
                    .map(|d| (d.name.as_str(), d.description.as_deref().unwrap_or(""))),
            );
        }

        let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        for (name, summary) in rows {
            let line = format!("  {name:<width$}  {summary}");
            let _ = writeln!(w, "{}", line.trim_end());
        }
    }
}
