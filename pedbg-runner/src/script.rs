//! GDB control script generation

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::Result;
use crate::Action;

/// Ordered GDB commands run by the client on startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GdbScript {
    lines: Vec<String>,
}

impl GdbScript {
    /// Connect, reset and select the image; `debug` additionally loads it to flash
    pub fn for_action(action: Action, server_port: u16, elf_file: &Path) -> Self {
        let mut lines = vec![
            format!("target remote localhost:{}", server_port),
            "monitor reset".to_string(),
            format!("file {}", as_posix(elf_file)),
        ];
        if action == Action::Debug {
            lines.push("load".to_string());
        }
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// GDB accepts forward slashes on every host
pub fn as_posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// A script written into its own temporary directory.
///
/// The directory and the script are removed when this value is dropped.
#[derive(Debug)]
pub struct ScriptFile {
    path: PathBuf,
    _dir: TempDir,
}

impl ScriptFile {
    /// Write `script` as `runner.<runner_name>` in a fresh temporary directory
    pub fn create(runner_name: &str, script: &GdbScript) -> Result<Self> {
        let dir = tempfile::Builder::new().suffix(runner_name).tempdir()?;
        let path = dir.path().join(format!("runner.{}", runner_name));
        std::fs::write(&path, script.render())?;
        debug!("GDB script {}:\n{}", path.display(), script.render());

        Ok(Self { path, _dir: dir })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
