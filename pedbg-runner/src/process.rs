//! Child process launching
//!
//! Everything that spawns an external program goes through [`ProcessRunner`],
//! so the launcher can be driven against a recording double in tests.

use std::collections::BTreeMap;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Result, RunnerError};

/// Environment variables set on top of the inherited environment
pub type EnvOverrides = BTreeMap<String, String>;

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `argv` in the foreground and fail on a non-zero exit
    async fn check_call(&self, argv: &[String], env: Option<&EnvOverrides>) -> Result<()>;

    /// Run `argv` and return its standard output, discarding standard error
    async fn check_output(&self, argv: &[String]) -> Result<Vec<u8>>;

    /// Start `server` in the background, run `client` in the foreground, then stop the server
    async fn run_server_and_client(
        &self,
        server: &[String],
        client: &[String],
        env: Option<&EnvOverrides>,
    ) -> Result<()>;
}

/// Launches real child processes with tokio
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(argv: &[String], env: Option<&EnvOverrides>) -> Result<Command> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| RunnerError::InvalidConfig("empty command line".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(env) = env {
            cmd.envs(env);
        }
        Ok(cmd)
    }

    /// Detach the server from the terminal's process group so Ctrl-C in GDB leaves it running
    fn isolate_from_interrupts(cmd: &mut Command) {
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }
        #[cfg(windows)]
        {
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }
    }

    fn spawn_error(argv: &[String], e: std::io::Error) -> RunnerError {
        if e.kind() == std::io::ErrorKind::NotFound {
            RunnerError::MissingProgram(argv[0].clone())
        } else {
            RunnerError::IoError(e)
        }
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn check_call(&self, argv: &[String], env: Option<&EnvOverrides>) -> Result<()> {
        debug!("Running {:?}", argv);
        let status = Self::command(argv, env)?
            .status()
            .await
            .map_err(|e| Self::spawn_error(argv, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(RunnerError::ProcessFailed { program: argv[0].clone(), code: status.code() })
        }
    }

    async fn check_output(&self, argv: &[String]) -> Result<Vec<u8>> {
        debug!("Capturing output of {:?}", argv);
        let output = Self::command(argv, None)?
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| Self::spawn_error(argv, e))?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(RunnerError::ProcessFailed { program: argv[0].clone(), code: output.status.code() })
        }
    }

    async fn run_server_and_client(
        &self,
        server: &[String],
        client: &[String],
        env: Option<&EnvOverrides>,
    ) -> Result<()> {
        let mut server_cmd = Self::command(server, env)?;
        Self::isolate_from_interrupts(&mut server_cmd);
        server_cmd.kill_on_drop(true);

        let mut server_proc = server_cmd.spawn().map_err(|e| Self::spawn_error(server, e))?;
        info!("Started {} (pid {:?})", server[0], server_proc.id());

        let client_result = run_client(client, env).await;

        if let Ok(Some(status)) = server_proc.try_wait() {
            debug!("{} already exited with {}", server[0], status);
        } else {
            if let Err(e) = server_proc.start_kill() {
                warn!("Failed to stop {}: {}", server[0], e);
            }
            let _ = server_proc.wait().await;
        }

        client_result
    }
}

/// Run the client in the foreground; Ctrl-C belongs to the client while it runs
async fn run_client(client: &[String], env: Option<&EnvOverrides>) -> Result<()> {
    let mut child = SystemRunner::command(client, env)?
        .spawn()
        .map_err(|e| SystemRunner::spawn_error(client, e))?;

    let status = loop {
        tokio::select! {
            status = child.wait() => break status?,
            _ = tokio::signal::ctrl_c() => {
                debug!("Ignoring interrupt while {} is running", client[0]);
            }
        }
    };

    if status.success() {
        Ok(())
    } else {
        Err(RunnerError::ProcessFailed { program: client[0].clone(), code: status.code() })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_check_call_success() {
        SystemRunner.check_call(&argv(&["true"]), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_call_propagates_exit_code() {
        let err = SystemRunner
            .check_call(&argv(&["sh", "-c", "exit 7"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::ProcessFailed { code: Some(7), .. }));
    }

    #[tokio::test]
    async fn test_check_call_missing_program() {
        let err = SystemRunner
            .check_call(&argv(&["nonexistent_binary_12345"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::MissingProgram(_)));
    }

    #[tokio::test]
    async fn test_empty_command_line() {
        let err = SystemRunner.check_call(&[], None).await.unwrap_err();
        assert!(matches!(err, RunnerError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_check_output_captures_stdout() {
        let out = SystemRunner.check_output(&argv(&["echo", "sdafd0a1b2c"])).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "sdafd0a1b2c");
    }

    #[tokio::test]
    async fn test_env_overrides_reach_child() {
        let mut env = EnvOverrides::new();
        env.insert("PEDBG_TEST_VAR".to_string(), "expected".to_string());
        SystemRunner
            .check_call(&argv(&["sh", "-c", "test \"$PEDBG_TEST_VAR\" = expected"]), Some(&env))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_server_stopped_after_client() {
        let server = argv(&["sleep", "30"]);
        let client = argv(&["true"]);
        let started = std::time::Instant::now();
        SystemRunner.run_server_and_client(&server, &client, None).await.unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_client_failure_is_reported() {
        let server = argv(&["sleep", "30"]);
        let client = argv(&["false"]);
        let err = SystemRunner.run_server_and_client(&server, &client, None).await.unwrap_err();
        assert!(matches!(err, RunnerError::ProcessFailed { program, code: Some(1) } if program == "false"));
    }
}
