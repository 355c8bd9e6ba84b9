pub mod config;
pub mod env;
pub mod plugins;

use ag_core::{exit_code, BuiltinTable, Loader};
use clap::Parser;

/// The first-party commands, in the order they are listed.
pub fn builtin_table() -> ag_core::Result<BuiltinTable> {
    let mut table = BuiltinTable::new();
    table.register("env", "Check and initialize the Agentic home", env::run)?;
    table.register("config", "Show, validate and edit ag.yaml", config::run)?;
    table.register("plugins", "List, inspect and scaffold plugins", plugins::run)?;
    Ok(table)
}

/// Loader used for plugin dispatch. No handlers are linked into this binary,
/// so only `exec:` entries resolve.
pub fn plugin_loader() -> Loader {
    Loader::new()
}

/// Parse a built-in's own argument vector.
///
/// On failure clap's message has already been printed and the error carries
/// the exit code to return: 0 for `--help`/`--version`, 1 for bad arguments.
pub fn parse_args<P: Parser>(command: &str, args: &[String]) -> Result<P, i32> {
    let argv = std::iter::once(format!("ag {command}")).chain(args.iter().cloned());
    P::try_parse_from(argv).map_err(|e| {
        let _ = e.print();
        if e.use_stderr() {
            exit_code::USAGE
        } else {
            exit_code::SUCCESS
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_is_well_formed() {
        let table = builtin_table().unwrap();
        assert_eq!(table.names(), vec!["env", "config", "plugins"]);
        for name in table.names() {
            ag_core::paths::validate_plugin_name(&name).unwrap();
        }
    }
}
