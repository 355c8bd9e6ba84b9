//! `ag plugins`: inspect what discovery sees without running anything.
//!
//! Plugins are found in three places, in this order:
//!   <home>/plugins/*.yaml       manifests (`name`, `entry`, `description`)
//!   ag.yaml `plugins:` table    name -> entry
//!   PATH                        executables named `ag-<name>`

use crate::output::{print_json, print_table};
use ag_core::config::Config;
use ag_core::source::PluginManifest;
use ag_core::{exit_code, io, paths, Context, Discover, Load, PluginSet, Registry};
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::Path;

#[derive(Parser)]
#[command(about = "List, inspect and scaffold plugins")]
struct PluginsCli {
    #[command(subcommand)]
    subcommand: PluginsSubcommand,
}

#[derive(Subcommand)]
enum PluginsSubcommand {
    /// List every discovered plugin
    List {
        /// Output as JSON
        #[arg(long, short = 'j')]
        json: bool,
    },

    /// Show one plugin's descriptor
    Info {
        /// Plugin name
        name: String,
        /// Output as JSON
        #[arg(long, short = 'j')]
        json: bool,
    },

    /// Resolve a plugin's entry without running it
    Check {
        /// Plugin name
        name: String,
    },

    /// Create a manifest and a shell script skeleton for a new plugin
    Scaffold {
        /// Plugin name (becomes the command name)
        name: String,
        /// One-sentence description shown in listings
        #[arg(long)]
        description: Option<String>,
    },
}

pub fn run(ctx: &Context, args: &[String]) -> anyhow::Result<i32> {
    let cli: PluginsCli = match super::parse_args("plugins", args) {
        Ok(cli) => cli,
        Err(code) => return Ok(code),
    };
    match cli.subcommand {
        PluginsSubcommand::List { json } => with_listing(ctx, |l| l.list(json)),
        PluginsSubcommand::Info { name, json } => with_listing(ctx, |l| l.info(&name, json)),
        PluginsSubcommand::Check { name } => with_listing(ctx, |l| l.check(&name)),
        PluginsSubcommand::Scaffold { name, description } => {
            scaffold(ctx.home(), &name, description.as_deref())
        }
    }
}

/// Run discovery, then hand the result to `f`. Discovery failures map to the
/// same exit code the dispatcher uses.
fn with_listing<F>(ctx: &Context, f: F) -> anyhow::Result<i32>
where
    F: FnOnce(&Listing<'_>) -> anyhow::Result<i32>,
{
    // Re-read the config: a startup fallback to defaults must not hide plugins.
    let config = Config::load(ctx.home()).context("failed to load ag.yaml")?;
    let plugins = match Registry::from_config(ctx.home(), &config).discover() {
        Ok(plugins) => plugins,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(exit_code::DISCOVERY_FAILURE);
        }
    };
    let listing = Listing {
        plugins: &plugins,
        builtins: super::builtin_table()?.names(),
    };
    f(&listing)
}

#[derive(Serialize)]
struct PluginRow<'a> {
    name: &'a str,
    entry: &'a str,
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    shadowed: bool,
}

struct Listing<'a> {
    plugins: &'a PluginSet,
    builtins: Vec<String>,
}

impl Listing<'_> {
    fn rows(&self) -> Vec<PluginRow<'_>> {
        self.plugins
            .iter()
            .map(|d| PluginRow {
                name: &d.name,
                entry: &d.loader_reference,
                source: &d.source,
                description: d.description.as_deref(),
                shadowed: self.builtins.contains(&d.name),
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // list
    // -----------------------------------------------------------------------

    fn list(&self, json: bool) -> anyhow::Result<i32> {
        let rows = self.rows();
        if json {
            print_json(&rows)?;
            return Ok(exit_code::SUCCESS);
        }
        if rows.is_empty() {
            println!("No plugins installed.");
            println!("Run 'ag plugins scaffold <name>' to create one.");
            return Ok(exit_code::SUCCESS);
        }
        print_table(
            &["NAME", "ENTRY", "SOURCE", "STATUS"],
            rows.iter()
                .map(|r| {
                    vec![
                        r.name.to_string(),
                        r.entry.to_string(),
                        r.source.to_string(),
                        if r.shadowed { "shadowed" } else { "ok" }.to_string(),
                    ]
                })
                .collect(),
        );
        Ok(exit_code::SUCCESS)
    }

    // -----------------------------------------------------------------------
    // info
    // -----------------------------------------------------------------------

    fn info(&self, name: &str, json: bool) -> anyhow::Result<i32> {
        let Some(row) = self.rows().into_iter().find(|r| r.name == name) else {
            eprintln!("error: no plugin named '{name}'");
            return Ok(exit_code::USAGE);
        };
        if json {
            print_json(&row)?;
            return Ok(exit_code::SUCCESS);
        }
        println!("Name:        {}", row.name);
        println!("Entry:       {}", row.entry);
        println!("Source:      {}", row.source);
        if let Some(description) = row.description {
            println!("Description: {description}");
        }
        if row.shadowed {
            println!("Status:      shadowed by the built-in '{}' command", row.name);
        }
        Ok(exit_code::SUCCESS)
    }

    // -----------------------------------------------------------------------
    // check
    // -----------------------------------------------------------------------

    fn check(&self, name: &str) -> anyhow::Result<i32> {
        let Some(descriptor) = self.plugins.get(name) else {
            eprintln!("error: no plugin named '{name}'");
            return Ok(exit_code::USAGE);
        };
        match super::plugin_loader().load(descriptor) {
            Ok(_) => {
                println!("Plugin '{name}' loads: {}", descriptor.loader_reference);
                Ok(exit_code::SUCCESS)
            }
            Err(e) => {
                eprintln!("error: {e}");
                Ok(exit_code::LOAD_FAILURE)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// scaffold
// ---------------------------------------------------------------------------

fn scaffold(home: &Path, name: &str, description: Option<&str>) -> anyhow::Result<i32> {
    paths::validate_plugin_name(name)?;

    let plugins_dir = paths::plugins_dir(home);
    let manifest_path = plugins_dir.join(format!("{name}.yaml"));
    let script_path = plugins_dir.join("bin").join(format!("ag-{name}"));
    for existing in [&manifest_path, &script_path] {
        if existing.exists() {
            anyhow::bail!(
                "plugin '{}' already exists at {}",
                name,
                existing.display()
            );
        }
    }

    let script = build_scaffold_script(name);
    io::atomic_write(&script_path, script.as_bytes()).context("failed to write plugin script")?;
    make_executable(&script_path)?;

    let manifest = PluginManifest {
        name: name.to_string(),
        entry: format!("exec:{}", script_path.display()),
        description: Some(description.unwrap_or("No description").to_string()),
    };
    let yaml = serde_yaml::to_string(&manifest).context("failed to serialize plugin manifest")?;
    io::atomic_write(&manifest_path, yaml.as_bytes())
        .context("failed to write plugin manifest")?;

    println!("created {}", manifest_path.display());
    println!("created {}", script_path.display());
    if super::builtin_table()?.contains(name) {
        println!("warning: '{name}' is a built-in command; the plugin will be shadowed");
    }
    println!("Run: ag {name} --help");
    Ok(exit_code::SUCCESS)
}

fn build_scaffold_script(name: &str) -> String {
    format!(
        r#"#!/bin/sh
# ag plugin: {name}
#
# Invoked as `ag {name} [args...]`. Arguments arrive unparsed.
# AG_HOME and AG_COMMAND are set by ag. The exit status is returned to the caller.

case "$1" in
  -h|--help|"")
    echo "usage: ag {name} <args...>"
    exit 0
    ;;
esac

echo "{name}: $*"
"#
    )
}

#[cfg(unix)]
fn make_executable(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .with_context(|| format!("failed to mark {} executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}
