//! Health checks for an Agentic home: directory layout, external tools and the
//! virtual-environment registry file.

use crate::config::Config;
use crate::error::Result;
use crate::io;
use crate::paths;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSection {
    Tools,
    Directories,
    Registry,
}

impl CheckSection {
    pub fn title(&self) -> &'static str {
        match self {
            CheckSection::Tools => "External tools",
            CheckSection::Directories => "Directory structure",
            CheckSection::Registry => "Registry file",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckItem {
    pub section: CheckSection,
    pub label: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckItem {
    fn pass(section: CheckSection, label: String) -> Self {
        Self {
            section,
            label,
            ok: true,
            detail: None,
        }
    }

    fn fail(section: CheckSection, label: String, detail: impl Into<String>) -> Self {
        Self {
            section,
            label,
            ok: false,
            detail: Some(detail.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentReport {
    pub home: PathBuf,
    pub checks: Vec<CheckItem>,
}

impl EnvironmentReport {
    pub fn all_ok(&self) -> bool {
        self.checks.iter().all(|c| c.ok)
    }

    pub fn section(&self, section: CheckSection) -> impl Iterator<Item = &CheckItem> {
        self.checks.iter().filter(move |c| c.section == section)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckItem> {
        self.checks.iter().filter(|c| !c.ok)
    }
}

/// Run every check. Never fails: problems are reported as failed items.
pub fn check_environment(home: &Path, config: &Config) -> EnvironmentReport {
    let mut checks = Vec::new();
    for tool in &config.environment.required_tools {
        checks.push(check_tool(tool));
    }
    checks.push(check_dir(home, "Agentic home".to_string()));
    for dir in &config.environment.required_dirs {
        checks.push(check_dir(&home.join(dir), dir.clone()));
    }
    checks.push(check_registry(&paths::venv_registry_path(home)));
    EnvironmentReport {
        home: home.to_path_buf(),
        checks,
    }
}

fn check_tool(tool: &str) -> CheckItem {
    let Ok(path) = which::which(tool) else {
        return CheckItem::fail(
            CheckSection::Tools,
            format!("{tool} is not installed"),
            format!("install {tool} and make sure it is on PATH"),
        );
    };
    match tool_version(&path) {
        Some(version) => {
            CheckItem::pass(CheckSection::Tools, format!("{tool} is installed ({version})"))
        }
        None => CheckItem::fail(
            CheckSection::Tools,
            format!("{tool} is installed but did not report a version"),
            format!("try running '{tool} --version' manually"),
        ),
    }
}

fn tool_version(path: &Path) -> Option<String> {
    let output = Command::new(path)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}

fn check_dir(path: &Path, label: String) -> CheckItem {
    let label = format!("{label}: {}", path.display());
    if path.is_dir() {
        CheckItem::pass(CheckSection::Directories, label)
    } else {
        CheckItem::fail(
            CheckSection::Directories,
            label,
            "directory is missing; run 'ag env init'",
        )
    }
}

fn check_registry(path: &Path) -> CheckItem {
    let label = format!("Virtual environment registry: {}", path.display());
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return CheckItem::fail(CheckSection::Registry, label, "registry file does not exist")
        }
        Err(e) => {
            return CheckItem::fail(
                CheckSection::Registry,
                label,
                format!("error reading registry file: {e}"),
            )
        }
    };
    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(_) => {
            return CheckItem::fail(CheckSection::Registry, label, "registry file is not valid JSON")
        }
    };
    let count = match value.get("virtual_environments") {
        Some(serde_json::Value::Object(envs)) => envs.len(),
        Some(serde_json::Value::Array(envs)) => envs.len(),
        Some(_) | None => {
            return CheckItem::fail(
                CheckSection::Registry,
                label,
                "registry file is missing the 'virtual_environments' field",
            )
        }
    };
    CheckItem::pass(CheckSection::Registry, format!("{label} ({count} environments)"))
}

/// Create the home, the required directories, an empty registry and a default
/// `ag.yaml`. Existing files are never overwritten. Returns what was created.
pub fn init_environment(home: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    if io::ensure_dir(home)? {
        created.push(home.to_path_buf());
    }
    for dir in config
        .environment
        .required_dirs
        .iter()
        .map(|d| home.join(d))
        .chain(std::iter::once(paths::plugins_dir(home)))
    {
        if io::ensure_dir(&dir)? {
            created.push(dir);
        }
    }

    let registry = paths::venv_registry_path(home);
    if io::write_if_missing(&registry, b"{\n  \"virtual_environments\": {}\n}\n")? {
        created.push(registry);
    }

    let config_path = paths::config_path(home);
    if !config_path.exists() {
        config.save(home)?;
        created.push(config_path);
    }
    Ok(created)
}
