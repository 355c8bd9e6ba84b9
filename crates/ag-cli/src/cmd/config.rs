use crate::output::print_json;
use ag_core::config::{Config, ConfigWarning, WarnLevel};
use ag_core::{exit_code, paths, Context, LoaderReference};
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(about = "Show, validate and edit ag.yaml")]
struct ConfigCli {
    #[command(subcommand)]
    subcommand: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the effective configuration
    Show {
        /// Output as JSON
        #[arg(long, short = 'j')]
        json: bool,
    },

    /// Print the path of ag.yaml
    Path,

    /// Validate the config for common mistakes
    Validate {
        /// Output as JSON
        #[arg(long, short = 'j')]
        json: bool,
    },

    /// Register a plugin in the config's plugin table
    SetPlugin {
        /// Command name
        name: String,
        /// Loader reference, e.g. exec:/usr/local/bin/ag-note or symbol:note
        entry: String,
    },

    /// Remove a plugin from the config's plugin table
    RemovePlugin {
        /// Command name
        name: String,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Always reads ag.yaml from disk: these commands are how a broken file gets
/// diagnosed, so they cannot rely on the config loaded at startup.
pub fn run(ctx: &Context, args: &[String]) -> anyhow::Result<i32> {
    let cli: ConfigCli = match super::parse_args("config", args) {
        Ok(cli) => cli,
        Err(code) => return Ok(code),
    };
    let home = ctx.home();
    match cli.subcommand {
        ConfigSubcommand::Show { json } => show(home, json),
        ConfigSubcommand::Path => {
            println!("{}", paths::config_path(home).display());
            Ok(exit_code::SUCCESS)
        }
        ConfigSubcommand::Validate { json } => validate(home, json),
        ConfigSubcommand::SetPlugin { name, entry } => set_plugin(home, &name, &entry),
        ConfigSubcommand::RemovePlugin { name } => remove_plugin(home, &name),
    }
}

fn load(home: &Path) -> anyhow::Result<Config> {
    Config::load(home)
        .with_context(|| format!("failed to load {}", paths::config_path(home).display()))
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(home: &Path, json: bool) -> anyhow::Result<i32> {
    let config = load(home)?;
    if json {
        print_json(&config)?;
    } else {
        print!("{}", serde_yaml::to_string(&config)?);
    }
    Ok(exit_code::SUCCESS)
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(home: &Path, json: bool) -> anyhow::Result<i32> {
    let config = load(home)?;
    let mut warnings = config.validate(home);
    warnings.extend(shadowed_plugins(&config)?);

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }
    Ok(exit_code::SUCCESS)
}

fn shadowed_plugins(config: &Config) -> anyhow::Result<Vec<ConfigWarning>> {
    let builtins = super::builtin_table()?;
    Ok(config
        .plugins
        .keys()
        .filter(|name| builtins.contains(name))
        .map(|name| ConfigWarning {
            level: WarnLevel::Warning,
            message: format!("plugin '{name}' is shadowed by the built-in command"),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// set-plugin / remove-plugin
// ---------------------------------------------------------------------------

fn set_plugin(home: &Path, name: &str, entry: &str) -> anyhow::Result<i32> {
    paths::validate_plugin_name(name)?;
    LoaderReference::parse(entry).with_context(|| format!("invalid entry for plugin '{name}'"))?;

    let mut config = load(home)?;
    let previous = config.plugins.insert(name.to_string(), entry.trim().to_string());
    config.save(home).context("failed to save config")?;

    match previous {
        Some(old) => println!("Plugin '{name}' updated: {old} -> {}", entry.trim()),
        None => println!("Plugin '{name}' registered: {}", entry.trim()),
    }
    if super::builtin_table()?.contains(name) {
        println!("warning: '{name}' is a built-in command; the plugin will be shadowed");
    }
    Ok(exit_code::SUCCESS)
}

fn remove_plugin(home: &Path, name: &str) -> anyhow::Result<i32> {
    let mut config = load(home)?;
    if config.plugins.remove(name).is_none() {
        anyhow::bail!("plugin '{name}' is not in the config's plugin table");
    }
    config.save(home).context("failed to save config")?;
    println!("Plugin '{name}' removed.");
    Ok(exit_code::SUCCESS)
}
