//! Discovery of installed vendor tools

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};

use crate::error::{Result, RunnerError};

/// Directory name prefix of P&E Micro GDB server plugins inside an Eclipse install
const PEMICRO_PLUGIN_PATTERN: &str = r"^com\.pemicro\.debug\.gdbjtag\.pne_.*";

/// Find an executable in `search_path` (PATH-like list), or in `PATH` when none is given.
pub fn which(name: &str, search_path: Option<&Path>) -> Option<PathBuf> {
    let dirs: Vec<PathBuf> = match search_path {
        Some(path) => std::env::split_paths(path.as_os_str()).collect(),
        None => std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default(),
    };

    let exe_name = format!("{}{}", name, std::env::consts::EXE_SUFFIX);
    dirs.into_iter()
        .flat_map(|dir| [dir.join(name), dir.join(&exe_name)])
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Like [`which`], but a missing program is an error
pub fn require(name: &str, search_path: Option<&Path>) -> Result<PathBuf> {
    let found = which(name, search_path).ok_or_else(|| {
        let location = match search_path {
            Some(path) => path.display().to_string(),
            None => "PATH".to_string(),
        };
        RunnerError::MissingProgram(format!("{} (searched {})", name, location))
    })?;

    debug!("Found {} at {}", name, found.display());
    Ok(found)
}

/// List the P&E Micro plugins installed in an NXP IDE, sorted by path
pub fn find_pemicro_plugins(ide_path: &Path) -> Result<Vec<PathBuf>> {
    let base_path = ide_path.join("eclipse").join("plugins");
    if !base_path.is_dir() {
        debug!("No plugin directory at {}", base_path.display());
        return Ok(Vec::new());
    }

    let regex = Regex::new(PEMICRO_PLUGIN_PATTERN)
        .map_err(|e| RunnerError::InvalidConfig(format!("Invalid plugin pattern: {}", e)))?;

    let mut plugins = Vec::new();
    for entry in std::fs::read_dir(&base_path)?.flatten() {
        if let Some(name) = entry.file_name().to_str() {
            if regex.is_match(name) {
                plugins.push(entry.path());
            }
        }
    }
    plugins.sort();

    info!("Found {} P&E Micro plugin(s) in {}", plugins.len(), base_path.display());
    Ok(plugins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    fn touch_executable(path: &Path) {
        touch(path);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    #[test]
    fn test_which_in_search_path() {
        let tmp = TempDir::new().unwrap();
        touch_executable(&tmp.path().join("s32ds.sh"));

        let found = which("s32ds.sh", Some(tmp.path())).unwrap();
        assert_eq!(found, tmp.path().join("s32ds.sh"));
    }

    #[test]
    fn test_which_nonexistent() {
        let tmp = TempDir::new().unwrap();
        assert!(which("nonexistent_binary_12345", Some(tmp.path())).is_none());
        assert!(which("nonexistent_binary_12345", None).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_which_skips_non_executable_files() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("s32ds.sh"));
        assert!(which("s32ds.sh", Some(tmp.path())).is_none());
    }

    #[test]
    fn test_which_ignores_directories() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("s32ds")).unwrap();
        assert!(which("s32ds", Some(tmp.path())).is_none());
    }

    #[test]
    fn test_require_missing_program() {
        let tmp = TempDir::new().unwrap();
        let err = require("s32ds.sh", Some(tmp.path())).unwrap_err();
        assert!(matches!(err, RunnerError::MissingProgram(msg) if msg.starts_with("s32ds.sh")));
    }

    #[test]
    fn test_find_pemicro_plugins_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        let plugins = tmp.path().join("eclipse").join("plugins");
        for name in [
            "com.pemicro.debug.gdbjtag.pne_5.9.5.202412131551",
            "com.pemicro.debug.gdbjtag.pne_5.7.1.202301010000",
            "com.pemicro.debug.gdbjtag.pne.ui_5.9.5",
            "org.eclipse.cdt.debug.gdbjtag_9.0.0",
        ] {
            std::fs::create_dir_all(plugins.join(name)).unwrap();
        }

        let found = find_pemicro_plugins(tmp.path()).unwrap();
        assert_eq!(
            found,
            vec![
                plugins.join("com.pemicro.debug.gdbjtag.pne_5.7.1.202301010000"),
                plugins.join("com.pemicro.debug.gdbjtag.pne_5.9.5.202412131551"),
            ]
        );
    }

    #[test]
    fn test_find_pemicro_plugins_without_install() {
        let tmp = TempDir::new().unwrap();
        assert!(find_pemicro_plugins(tmp.path()).unwrap().is_empty());
    }
}
