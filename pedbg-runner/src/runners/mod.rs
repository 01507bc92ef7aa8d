//! Runner variants
//!
//! Both variants drive the same P&E GDB server. They differ in where the
//! GDB client comes from, how the server plugin is located, and whether the
//! client needs extra environment.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::platform::{HostOs, TargetArch};
use crate::process::EnvOverrides;

pub mod nxp_pedbg;
pub mod pedbg;

pub use nxp_pedbg::NxpPeDebugProbe;
pub use pedbg::PeDebugProbe;

/// Tool locations and environment of one runner variant
pub trait DebugProbeBackend {
    /// Runner name, also used to name the temporary GDB script
    fn name(&self) -> &'static str;

    /// Locate installed tools before any command line is built
    fn prepare(&mut self, host: &HostOs) -> Result<()>;

    /// Directory of the P&E Micro GDB server plugin
    fn plugin_path(&self) -> Option<&Path>;

    /// Value of the server's `-device=` flag, if any
    fn device(&self) -> Option<String>;

    /// GDB client executable for `arch`
    fn client_program(&self, arch: TargetArch) -> Result<PathBuf>;

    /// Variables added to the inherited environment of the session processes
    fn runtime_environment(&self, host: &HostOs) -> Option<EnvOverrides>;
}

/// Path of the P&E GDB server console inside a plugin directory
pub fn server_program(plugin_path: &Path, host: &HostOs) -> PathBuf {
    let platform_dir = match host {
        HostOs::Windows => "win32",
        _ => "lin",
    };
    plugin_path.join(platform_dir).join("pegdbserver_console")
}
