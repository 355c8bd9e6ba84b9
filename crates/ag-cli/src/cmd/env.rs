//! `ag env`: health checks and setup for the Agentic home.

use crate::output::print_json;
use ag_core::env_check::{self, CheckSection, EnvironmentReport};
use ag_core::{exit_code, paths, Context};
use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(about = "Check and initialize the Agentic home")]
struct EnvCli {
    #[command(subcommand)]
    subcommand: EnvSubcommand,
}

#[derive(Subcommand)]
enum EnvSubcommand {
    /// Verify directories, external tools and the venv registry
    Check {
        /// Output as JSON
        #[arg(long, short = 'j')]
        json: bool,
    },

    /// Create missing directories, the venv registry and a default ag.yaml
    Init,

    /// Show where everything lives
    Info {
        /// Output as JSON
        #[arg(long, short = 'j')]
        json: bool,
    },
}

pub fn run(ctx: &Context, args: &[String]) -> anyhow::Result<i32> {
    let cli: EnvCli = match super::parse_args("env", args) {
        Ok(cli) => cli,
        Err(code) => return Ok(code),
    };
    match cli.subcommand {
        EnvSubcommand::Check { json } => check(ctx, json),
        EnvSubcommand::Init => init(ctx),
        EnvSubcommand::Info { json } => info(ctx, json),
    }
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

fn check(ctx: &Context, json: bool) -> anyhow::Result<i32> {
    let report = env_check::check_environment(ctx.home(), &ctx.config);
    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(if report.all_ok() {
        exit_code::SUCCESS
    } else {
        exit_code::USAGE
    })
}

fn print_report(report: &EnvironmentReport) {
    println!("Agentic environment check: {}", report.home.display());
    for section in [
        CheckSection::Tools,
        CheckSection::Directories,
        CheckSection::Registry,
    ] {
        let items: Vec<_> = report.section(section).collect();
        if items.is_empty() {
            continue;
        }
        println!();
        println!("{}", section.title());
        for item in items {
            let mark = if item.ok { "✓" } else { "✗" };
            println!("  {mark} {}", item.label);
            if let Some(detail) = item.detail.as_deref().filter(|_| !item.ok) {
                println!("      {detail}");
            }
        }
    }

    println!();
    let failures = report.failures().count();
    if failures == 0 {
        println!("Environment is set up correctly.");
    } else {
        println!("Environment has {failures} issue(s) that need to be addressed.");
    }
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(ctx: &Context) -> anyhow::Result<i32> {
    let created = env_check::init_environment(ctx.home(), &ctx.config)
        .with_context(|| format!("failed to initialize {}", ctx.home().display()))?;
    if created.is_empty() {
        println!("Agentic home already initialized: {}", ctx.home().display());
    } else {
        for path in &created {
            println!("created {}", path.display());
        }
    }
    Ok(exit_code::SUCCESS)
}

// ---------------------------------------------------------------------------
// info
// ---------------------------------------------------------------------------

fn info(ctx: &Context, json: bool) -> anyhow::Result<i32> {
    let home = ctx.home();
    let manifest_dirs = ctx.config.manifest_dirs(home);
    let required_dirs: Vec<_> = ctx
        .config
        .environment
        .required_dirs
        .iter()
        .map(|d| home.join(d))
        .collect();

    if json {
        let value = serde_json::json!({
            "home": home,
            "config": paths::config_path(home),
            "manifest_dirs": manifest_dirs,
            "path_scan": ctx.config.path_scan,
            "path_prefix": ctx.config.path_prefix,
            "venv_registry": paths::venv_registry_path(home),
            "directories": required_dirs,
        });
        print_json(&value)?;
        return Ok(exit_code::SUCCESS);
    }

    println!("Home:           {}", home.display());
    println!("Config:         {}", paths::config_path(home).display());
    println!("Venv registry:  {}", paths::venv_registry_path(home).display());
    println!("Plugin manifests:");
    for dir in &manifest_dirs {
        println!("  {}", dir.display());
    }
    if ctx.config.path_scan {
        println!("PATH executables: {}<name>", ctx.config.path_prefix);
    } else {
        println!("PATH executables: (scan disabled)");
    }
    println!("Directories:");
    for dir in &required_dirs {
        println!("  {}", dir.display());
    }
    Ok(exit_code::SUCCESS)
}
