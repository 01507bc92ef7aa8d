//! `nxp_pedbg`: P&E GDB server and GDB client from NXP S32 Design Studio

use std::path::{Path, PathBuf};

use tracing::info;

use crate::discovery;
use crate::error::{Result, RunnerError};
use crate::platform::{HostOs, TargetArch};
use crate::process::EnvOverrides;
use crate::selection::{self, Resolver};

use super::DebugProbeBackend;

/// SoC names with a known P&E device identifier
const SOC_DEVICES: &[(&str, &str)] = &[("S32K148", "NXP_S32K1xx_S32K148F2M0M11")];

/// Device identifier the P&E GDB server expects for `soc_name`
pub fn device_for_soc(soc_name: &str) -> Option<&'static str> {
    SOC_DEVICES
        .iter()
        .find(|(soc, _)| *soc == soc_name)
        .map(|(_, device)| *device)
}

/// Tools are located through the IDE install. When several P&E plugins are
/// installed and none was given, the resolver picks one.
pub struct NxpPeDebugProbe {
    soc_name: String,
    nxpide_path_override: Option<PathBuf>,
    pemicro_plugin_path: Option<PathBuf>,
    resolver: Box<dyn Resolver>,
    nxpide_path: Option<PathBuf>,
}

impl NxpPeDebugProbe {
    pub fn new(
        soc_name: impl Into<String>,
        nxpide_path_override: Option<PathBuf>,
        pemicro_plugin_path: Option<PathBuf>,
        resolver: Box<dyn Resolver>,
    ) -> Self {
        Self {
            soc_name: soc_name.into(),
            nxpide_path_override,
            pemicro_plugin_path,
            resolver,
            nxpide_path: None,
        }
    }

    /// IDE root found by [`DebugProbeBackend::prepare`]
    pub fn nxpide_path(&self) -> Option<&Path> {
        self.nxpide_path.as_deref()
    }

    fn require_nxpide_path(&self) -> Result<&Path> {
        self.nxpide_path
            .as_deref()
            .ok_or_else(|| RunnerError::MissingProgram("NXP IDE installation".to_string()))
    }

    fn select_pemicro_plugin(&mut self, nxpide_path: &Path) -> Result<PathBuf> {
        let plugins: Vec<String> = discovery::find_pemicro_plugins(nxpide_path)?
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        let selected = selection::select("P&E Micro plugins installed", plugins, self.resolver.as_mut())?;
        Ok(PathBuf::from(selected))
    }
}

impl DebugProbeBackend for NxpPeDebugProbe {
    fn name(&self) -> &'static str {
        "nxp_pedbg"
    }

    fn prepare(&mut self, host: &HostOs) -> Result<()> {
        let app_name = match host {
            HostOs::Windows => "s32ds",
            _ => "s32ds.sh",
        };
        let launcher = discovery::require(app_name, self.nxpide_path_override.as_deref())?;
        let nxpide_path = launcher
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        info!("Using NXP IDE at {}", nxpide_path.display());

        if self.pemicro_plugin_path.is_none() {
            let plugin = self.select_pemicro_plugin(&nxpide_path)?;
            info!("Using P&E Micro plugin {}", plugin.display());
            self.pemicro_plugin_path = Some(plugin);
        }

        self.nxpide_path = Some(nxpide_path);
        Ok(())
    }

    fn plugin_path(&self) -> Option<&Path> {
        self.pemicro_plugin_path.as_deref()
    }

    fn device(&self) -> Option<String> {
        device_for_soc(&self.soc_name).map(str::to_string)
    }

    fn client_program(&self, arch: TargetArch) -> Result<PathBuf> {
        let client_exec_name = match arch {
            TargetArch::Arm => "arm-none-eabi-gdb-py",
            TargetArch::Arm64 => "aarch64-none-elf-gdb-py",
        };

        Ok(self
            .require_nxpide_path()?
            .join("S32DS")
            .join("tools")
            .join("gdb-arm")
            .join("arm32-eabi")
            .join("bin")
            .join(client_exec_name))
    }

    /// The IDE's GDB on Windows embeds a Python 2.7 that only finds its
    /// standard library through `PYTHONPATH`.
    fn runtime_environment(&self, host: &HostOs) -> Option<EnvOverrides> {
        if *host != HostOs::Windows {
            return None;
        }

        let python_lib = self
            .nxpide_path
            .as_deref()?
            .join("S32DS")
            .join("build_tools")
            .join("msys32")
            .join("mingw32")
            .join("lib")
            .join("python2.7");

        let mut env = EnvOverrides::new();
        env.insert(
            "PYTHONPATH".to_string(),
            format!(
                "{}{}{}",
                python_lib.display(),
                host.path_list_separator(),
                python_lib.join("site-packages").display()
            ),
        );
        Some(env)
    }
}
