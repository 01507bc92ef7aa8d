//! `pedbg`: P&E GDB server with a Zephyr SDK GDB client

use std::path::{Path, PathBuf};

use crate::error::{Result, RunnerError};
use crate::platform::{HostOs, TargetArch};
use crate::process::EnvOverrides;

use super::DebugProbeBackend;

/// The plugin path is always given explicitly; nothing is discovered.
#[derive(Debug, Clone)]
pub struct PeDebugProbe {
    device: String,
    sdk_path: Option<PathBuf>,
    pemicro_plugin_path: PathBuf,
}

impl PeDebugProbe {
    pub fn new(
        device: impl Into<String>,
        sdk_path: Option<PathBuf>,
        pemicro_plugin_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            device: device.into(),
            sdk_path,
            pemicro_plugin_path: pemicro_plugin_path.into(),
        }
    }
}

impl DebugProbeBackend for PeDebugProbe {
    fn name(&self) -> &'static str {
        "pedbg"
    }

    fn prepare(&mut self, _host: &HostOs) -> Result<()> {
        Ok(())
    }

    fn plugin_path(&self) -> Option<&Path> {
        Some(&self.pemicro_plugin_path)
    }

    fn device(&self) -> Option<String> {
        Some(self.device.clone())
    }

    fn client_program(&self, arch: TargetArch) -> Result<PathBuf> {
        let sdk_path = self.sdk_path.as_ref().ok_or_else(|| {
            RunnerError::MissingProgram(
                "Zephyr SDK (set --sdk-path or ZEPHYR_SDK_INSTALL_DIR)".to_string(),
            )
        })?;

        let client_path = match arch {
            TargetArch::Arm => "arm-zephyr-eabi/bin/arm-zephyr-eabi-gdb-py",
            TargetArch::Arm64 => "aarch64-zephyr-elf/bin/aarch64-zephyr-elf-gdb-py",
        };
        Ok(sdk_path.join(client_path))
    }

    fn runtime_environment(&self, _host: &HostOs) -> Option<EnvOverrides> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_per_arch() {
        let backend = PeDebugProbe::new("X", Some(PathBuf::from("/opt/zephyr-sdk-0.17.0")), "/opt/pemicro");
        assert_eq!(
            backend.client_program(TargetArch::Arm).unwrap(),
            PathBuf::from("/opt/zephyr-sdk-0.17.0/arm-zephyr-eabi/bin/arm-zephyr-eabi-gdb-py")
        );
        assert_eq!(
            backend.client_program(TargetArch::Arm64).unwrap(),
            PathBuf::from("/opt/zephyr-sdk-0.17.0/aarch64-zephyr-elf/bin/aarch64-zephyr-elf-gdb-py")
        );
    }

    #[test]
    fn test_client_without_sdk() {
        let backend = PeDebugProbe::new("X", None, "/opt/pemicro");
        assert!(matches!(
            backend.client_program(TargetArch::Arm),
            Err(RunnerError::MissingProgram(_))
        ));
    }

    #[test]
    fn test_never_augments_environment() {
        let backend = PeDebugProbe::new("X", None, "/opt/pemicro");
        assert!(backend.runtime_environment(&HostOs::Windows).is_none());
        assert!(backend.runtime_environment(&HostOs::Linux).is_none());
    }

    #[test]
    fn test_device_always_passed() {
        let backend = PeDebugProbe::new("NXP_S32K1xx_S32K148F2M0M11", None, "/opt/pemicro");
        assert_eq!(backend.device().as_deref(), Some("NXP_S32K1xx_S32K148F2M0M11"));
    }
}
