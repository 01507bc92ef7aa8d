//! P&E Micro debug probe runner
//!
//! Launches the P&E GDB server (`pegdbserver_console`) and a GDB client to
//! debug, attach to, or serve a target behind a P&E Micro Multilink /
//! OpenSDA probe. Two runner variants are provided: `pedbg` (Zephyr SDK
//! client) and `nxp_pedbg` (NXP S32 Design Studio tools).

pub mod config;
pub mod discovery;
pub mod error;
pub mod launcher;
pub mod platform;
pub mod probe;
pub mod process;
pub mod runners;
pub mod script;
pub mod selection;

pub use config::{Args, Config, ProbeConfig, ToolOptions};
pub use error::{Result, RunnerError};
pub use launcher::{Action, DebugLauncher, DryRun, LaunchPlan};
pub use platform::{HostOs, TargetArch};
pub use process::{EnvOverrides, ProcessRunner, SystemRunner};
pub use runners::{DebugProbeBackend, NxpPeDebugProbe, PeDebugProbe};
