//! Configuration for the pedbg runner

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::{Result, RunnerError};
use crate::launcher::Action;
use crate::platform::HostOs;

/// Default probe connection name of [`ProbeConfig`]; an empty one triggers USB discovery
pub const DEFAULT_DEV_ID: &str = "pedbg";
/// Default P&E GDB server port
pub const DEFAULT_SERVER_PORT: u16 = 7224;
/// Default shift frequency in kHz
pub const DEFAULT_SPEED_KHZ: u32 = 5000;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "pedbg-runner")]
#[command(about = "Start debug sessions through a P&E Micro Multilink / OpenSDA probe")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub runner: RunnerArgs,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log file path (defaults to stderr)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

/// Runner variants
#[derive(Subcommand, Debug)]
pub enum RunnerArgs {
    /// P&E GDB server with a Zephyr SDK GDB client
    #[command(name = "pedbg")]
    Pedbg(PedbgArgs),

    /// P&E GDB server and GDB client shipped with NXP S32 Design Studio
    #[command(name = "nxp_pedbg")]
    NxpPedbg(NxpPedbgArgs),
}

impl RunnerArgs {
    pub fn common(&self) -> &CommonArgs {
        match self {
            RunnerArgs::Pedbg(args) => &args.common,
            RunnerArgs::NxpPedbg(args) => &args.common,
        }
    }
}

/// Flags shared by both runners
#[derive(clap::Args, Debug)]
pub struct CommonArgs {
    /// Action to perform
    #[arg(value_enum)]
    pub action: Action,

    /// Zephyr build directory
    #[arg(long, default_value = "build")]
    pub build_dir: PathBuf,

    /// ELF image to debug (defaults to <build-dir>/zephyr/zephyr.elf)
    #[arg(long)]
    pub elf_file: Option<PathBuf>,

    /// Debug probe connection string as in "pedbg[:<address>]"; auto-detected over USB when omitted
    #[arg(long)]
    pub dev_id: Option<String>,

    /// P&E GDB server port
    #[arg(long, default_value_t = DEFAULT_SERVER_PORT)]
    pub server_port: u16,

    /// Shift frequency in kHz
    #[arg(long, default_value_t = DEFAULT_SPEED_KHZ)]
    pub speed: u32,

    /// Additional options for the GDB client ("debug"/"attach") or the P&E GDB server ("debugserver")
    #[arg(long, allow_hyphen_values = true)]
    pub tool_opt: Vec<String>,

    /// Print the launch plan as JSON instead of starting any process
    #[arg(long)]
    pub dry_run: bool,
}

/// Flags of the `pedbg` runner
#[derive(clap::Args, Debug)]
pub struct PedbgArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Device name being debugged (e.g. "NXP_S32K1xx_S32K148F2M0M11")
    #[arg(long)]
    pub device: String,

    /// Path to Zephyr SDK (e.g. /opt/zephyr-sdk-0.17.0)
    #[arg(long, env = "ZEPHYR_SDK_INSTALL_DIR")]
    pub sdk_path: Option<PathBuf>,

    /// Path to P&E Micro plugin
    #[arg(long)]
    pub pemicro_plugin_path: PathBuf,
}

/// Flags of the `nxp_pedbg` runner
#[derive(clap::Args, Debug)]
pub struct NxpPedbgArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// SoC name as supported by the debug probe (e.g. "S32K148")
    #[arg(long)]
    pub soc_name: String,

    /// Directory holding the NXP IDE launcher (defaults to searching PATH)
    #[arg(long)]
    pub nxpide_path: Option<PathBuf>,

    /// Path to P&E Micro plugin (defaults to the one installed in the NXP IDE)
    #[arg(long)]
    pub pemicro_plugin_path: Option<PathBuf>,

    /// Pick the N-th installed plugin (1-based) instead of prompting when several are found
    #[arg(long)]
    pub select_plugin: Option<usize>,
}

/// Probe connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub dev_id: String,
    pub server_port: u16,
    pub speed: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            dev_id: DEFAULT_DEV_ID.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            speed: DEFAULT_SPEED_KHZ,
        }
    }
}

/// Extra tool arguments, appended verbatim in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOptions(Vec<String>);

impl ToolOptions {
    /// Split each raw `--tool-opt` value with shell quoting rules
    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self> {
        let mut opts = Vec::new();
        for value in raw {
            let value = value.as_ref();
            let words = shlex::split(value).ok_or_else(|| {
                RunnerError::InvalidConfig(format!("Unbalanced quotes in tool option: {}", value))
            })?;
            opts.extend(words);
        }
        Ok(Self(opts))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Runtime configuration for one launcher invocation.
///
/// Host and target architecture are explicit so nothing is read from the
/// ambient environment once the launcher is built.
#[derive(Debug, Clone)]
pub struct Config {
    pub probe: ProbeConfig,
    pub tool_opt: ToolOptions,
    pub host: HostOs,
    /// Raw `CONFIG_ARCH` of the build
    pub arch: String,
    pub elf_file: PathBuf,
    pub dry_run: bool,
}

impl Config {
    pub fn from_args(args: &CommonArgs, host: HostOs, arch: impl Into<String>) -> Result<Self> {
        let elf_file = args
            .elf_file
            .clone()
            .unwrap_or_else(|| args.build_dir.join("zephyr").join("zephyr.elf"));

        Ok(Self {
            probe: ProbeConfig {
                dev_id: args.dev_id.clone().unwrap_or_default(),
                server_port: args.server_port,
                speed: args.speed,
            },
            tool_opt: ToolOptions::parse(&args.tool_opt)?,
            host,
            arch: arch.into(),
            elf_file,
            dry_run: args.dry_run,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe: ProbeConfig::default(),
            tool_opt: ToolOptions::default(),
            host: HostOs::current(),
            arch: "arm".to_string(),
            elf_file: PathBuf::from("build/zephyr/zephyr.elf"),
            dry_run: false,
        }
    }
}
