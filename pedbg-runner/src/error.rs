//! Error types for the debug session launcher

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the launcher
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("runner not supported on {0} systems")]
    UnsupportedPlatform(String),

    #[error("architecture {0} not supported")]
    UnsupportedArch(String),

    #[error("Required program not found: {0}")]
    MissingProgram(String),

    #[error("there are no {0}")]
    NoCandidates(String),

    #[error("multiple {kind}: {}", .candidates.join(", "))]
    Ambiguous { kind: String, candidates: Vec<String> },

    #[error("Selection cancelled")]
    SelectionCancelled,

    #[error("Build artifact not found: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("error while looking for debug probes connected: {0}")]
    ProbeEnumeration(String),

    #[error("{program} exited with {}", exit_description(.code))]
    ProcessFailed { program: String, code: Option<i32> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl RunnerError {
    /// Exit code the CLI should terminate with for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            RunnerError::ProcessFailed { code: Some(code), .. } => {
                u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1)
            }
            _ => 1,
        }
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "no exit status (terminated by signal)".to_string(),
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RunnerError>;
