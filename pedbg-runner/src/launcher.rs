//! Debug session launcher
//!
//! Checks host and target, lets the runner variant locate its tools, picks
//! the probe, then either runs the P&E GDB server on its own or runs it in
//! the background under a GDB client driven by a generated script.

use std::path::Path;

use clap::ValueEnum;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, RunnerError};
use crate::platform::TargetArch;
use crate::process::{EnvOverrides, ProcessRunner};
use crate::probe;
use crate::runners::{self, DebugProbeBackend};
use crate::script::{as_posix, GdbScript, ScriptFile};

/// GDB/MI port the P&E server is pinned to
pub const GDBMI_PORT: u16 = 6224;

/// Requested runner action
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Start the P&E GDB server in the foreground
    #[value(name = "debugserver")]
    DebugServer,
    /// Connect GDB to the running target without loading the image
    Attach,
    /// Load the image and start debugging it
    Debug,
}

/// Command lines and environment of one session, computed per invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchPlan {
    pub server: Vec<String>,
    pub client: Option<Vec<String>>,
    pub env: Option<EnvOverrides>,
}

/// What `--dry-run` reports instead of launching
#[derive(Debug, Clone, Serialize)]
pub struct DryRun {
    pub runner: &'static str,
    pub action: Action,
    pub dev_id: String,
    pub plan: LaunchPlan,
    pub gdb_script: Option<Vec<String>>,
}

pub struct DebugLauncher<B, R> {
    backend: B,
    config: Config,
    runner: R,
}

impl<B: DebugProbeBackend, R: ProcessRunner> DebugLauncher<B, R> {
    pub fn new(backend: B, config: Config, runner: R) -> Self {
        Self { backend, config, runner }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Execute `action`, returning once the awaited process exits
    pub async fn run(&mut self, action: Action) -> Result<()> {
        let arch = self.prepare().await?;

        match action {
            Action::Attach | Action::Debug => self.do_attach_debug(action, arch).await,
            Action::DebugServer => self.do_debugserver(arch).await,
        }
    }

    /// Same checks and discovery as [`run`](Self::run), without launching anything
    pub async fn dry_run(&mut self, action: Action) -> Result<DryRun> {
        let arch = self.prepare().await?;

        let (plan, gdb_script) = match action {
            Action::Attach | Action::Debug => {
                self.ensure_elf()?;
                let script = self.gdb_script(action);
                let script_path = format!("runner.{}", self.backend.name());
                let plan = self.plan(action, arch, Path::new(&script_path))?;
                (plan, Some(script.lines().to_vec()))
            }
            Action::DebugServer => (self.plan(action, arch, Path::new(""))?, None),
        };

        Ok(DryRun {
            runner: self.backend.name(),
            action,
            dev_id: self.config.probe.dev_id.clone(),
            plan,
            gdb_script,
        })
    }

    /// Fail fast on unsupported hosts/targets, locate tools and resolve the probe
    async fn prepare(&mut self) -> Result<TargetArch> {
        self.config.host.ensure_supported()?;
        let arch = TargetArch::parse(&self.config.arch)?;

        self.backend.prepare(&self.config.host)?;

        if self.config.probe.dev_id.is_empty() {
            let serial = probe::get_probe(&self.config.host, &self.runner).await?;
            info!("using debug probe \"pedbg:{}\"", serial);
            self.config.probe.dev_id = serial;
        }

        Ok(arch)
    }

    fn ensure_elf(&self) -> Result<()> {
        if self.config.elf_file.is_file() {
            Ok(())
        } else {
            Err(RunnerError::MissingArtifact(self.config.elf_file.clone()))
        }
    }

    fn gdb_script(&self, action: Action) -> GdbScript {
        GdbScript::for_action(action, self.config.probe.server_port, &self.config.elf_file)
    }

    /// P&E GDB server command line, without tool options
    pub fn server_command(&self) -> Vec<String> {
        let plugin_path = self.backend.plugin_path().unwrap_or_else(|| Path::new(""));
        let app = runners::server_program(plugin_path, &self.config.host);

        let mut cmd = vec![app.to_string_lossy().into_owned()];
        if let Some(device) = self.backend.device() {
            cmd.push(format!("-device={}", device));
        }
        cmd.extend([
            "-startserver".to_string(),
            "-singlesession".to_string(),
            format!("-serverport={}", self.config.probe.server_port),
            format!("-gdbmiport={}", GDBMI_PORT),
            "-interface=OPENSDA".to_string(),
            format!("-speed={}", self.config.probe.speed),
            "-porD".to_string(),
        ]);
        cmd
    }

    /// GDB client command line running `script_path` on startup
    pub fn client_command(&self, arch: TargetArch, script_path: &Path) -> Result<Vec<String>> {
        let client = self.backend.client_program(arch)?;

        let mut cmd = vec![
            client.to_string_lossy().into_owned(),
            "-x".to_string(),
            as_posix(script_path),
        ];
        cmd.extend(self.config.tool_opt.as_slice().iter().cloned());
        Ok(cmd)
    }

    /// Derive the command lines for `action`; tool options go to the client
    /// when there is one and to the server otherwise
    pub fn plan(&self, action: Action, arch: TargetArch, script_path: &Path) -> Result<LaunchPlan> {
        let mut server = self.server_command();

        match action {
            Action::DebugServer => {
                server.extend(self.config.tool_opt.as_slice().iter().cloned());
                Ok(LaunchPlan { server, client: None, env: None })
            }
            Action::Attach | Action::Debug => Ok(LaunchPlan {
                server,
                client: Some(self.client_command(arch, script_path)?),
                env: self.backend.runtime_environment(&self.config.host),
            }),
        }
    }

    async fn do_attach_debug(&self, action: Action, arch: TargetArch) -> Result<()> {
        self.ensure_elf()?;

        let script = self.gdb_script(action);
        let script_file = ScriptFile::create(self.backend.name(), &script)?;

        let plan = self.plan(action, arch, script_file.path())?;
        let client = plan.client.as_deref().unwrap_or_default();
        info!("Server: {}", plan.server.join(" "));
        info!("Client: {}", client.join(" "));
        if let Some(env) = &plan.env {
            info!("Client environment overrides: {:?}", env);
        }

        let result = self
            .runner
            .run_server_and_client(&plan.server, client, plan.env.as_ref())
            .await;

        if let Err(e) = &result {
            warn!("Debug session ended with error: {}", e);
        }
        result
    }

    async fn do_debugserver(&self, arch: TargetArch) -> Result<()> {
        let plan = self.plan(Action::DebugServer, arch, Path::new(""))?;
        info!("Server: {}", plan.server.join(" "));
        self.runner.check_call(&plan.server, None).await
    }
}
