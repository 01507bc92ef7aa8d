//! Host operating system and target architecture inputs

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, RunnerError};

/// Host operating system the launcher runs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    Windows,
    Other(String),
}

impl HostOs {
    /// Host the binary was compiled for
    pub fn current() -> Self {
        Self::from_name(std::env::consts::OS)
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "linux" => HostOs::Linux,
            "windows" => HostOs::Windows,
            other => HostOs::Other(other.to_string()),
        }
    }

    /// Fails for hosts the vendor tools are not shipped for
    pub fn ensure_supported(&self) -> Result<()> {
        match self {
            HostOs::Linux | HostOs::Windows => Ok(()),
            HostOs::Other(name) => Err(RunnerError::UnsupportedPlatform(name.clone())),
        }
    }

    /// Separator used in PATH-like environment variables
    pub fn path_list_separator(&self) -> char {
        match self {
            HostOs::Windows => ';',
            _ => ':',
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostOs::Linux => write!(f, "Linux"),
            HostOs::Windows => write!(f, "Windows"),
            HostOs::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Instruction set family of the built image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetArch {
    Arm,
    Arm64,
}

impl TargetArch {
    /// Parse a Zephyr `CONFIG_ARCH` value
    pub fn parse(arch: &str) -> Result<Self> {
        match arch.trim().trim_matches('"') {
            "arm" => Ok(TargetArch::Arm),
            "arm64" => Ok(TargetArch::Arm64),
            other => Err(RunnerError::UnsupportedArch(other.to_string())),
        }
    }
}

impl fmt::Display for TargetArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetArch::Arm => write!(f, "arm"),
            TargetArch::Arm64 => write!(f, "arm64"),
        }
    }
}

/// Read the raw `CONFIG_ARCH` value from a Zephyr build directory.
///
/// Returns an empty string when the build directory has no `.config` or
/// the option is absent, which later fails as an unsupported architecture.
pub fn read_build_arch(build_dir: &Path) -> Result<String> {
    let dotconfig = build_dir.join("zephyr").join(".config");
    if !dotconfig.exists() {
        debug!("No build configuration at {}", dotconfig.display());
        return Ok(String::new());
    }

    let content = std::fs::read_to_string(&dotconfig)?;
    Ok(parse_config_arch(&content).unwrap_or_default())
}

fn parse_config_arch(content: &str) -> Option<String> {
    content
        .lines()
        .filter_map(|line| line.trim().strip_prefix("CONFIG_ARCH="))
        .map(|value| value.replace('"', ""))
        .last()
}
