//! Subprocess handler for `exec:` plugins.
//!
//! The plugin executable receives the remaining arguments verbatim and
//! inherits stdin/stdout/stderr. Its exit status becomes the command's exit
//! code; termination by a signal counts as a crash.
//!
//! # Environment
//! - `AG_HOME`:    resolved Agentic home directory
//! - `AG_COMMAND`: the command name the plugin was invoked as

use anyhow::Context as _;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::handler::{CommandHandler, Context};
use crate::paths::HOME_ENV;

pub const COMMAND_ENV: &str = "AG_COMMAND";

#[derive(Debug, Clone)]
pub struct ExecHandler {
    program: PathBuf,
}

impl ExecHandler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn build_command(&self, ctx: &Context, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd.env(HOME_ENV, &ctx.home);
        cmd.env(COMMAND_ENV, &ctx.command);
        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        cmd
    }
}

impl CommandHandler for ExecHandler {
    fn run(&self, ctx: &Context, args: &[String]) -> anyhow::Result<i32> {
        tracing::debug!(program = %self.program.display(), ?args, "spawning plugin");
        let status = self
            .build_command(ctx, args)
            .status()
            .with_context(|| format!("failed to spawn {}", self.program.display()))?;

        if let Some(code) = status.code() {
            return Ok(code);
        }
        anyhow::bail!("{}", describe_abnormal_exit(&status))
    }
}

#[cfg(unix)]
fn describe_abnormal_exit(status: &std::process::ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(sig) => format!("terminated by signal {sig}"),
        None => format!("exited abnormally ({status})"),
    }
}

#[cfg(not(unix))]
fn describe_abnormal_exit(status: &std::process::ExitStatus) -> String {
    format!("exited abnormally ({status})")
}
