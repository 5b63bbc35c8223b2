use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Failed to read hostfile {path}: {source}")]
    HostfileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Hostfile line {line} has no address field: '{content}'")]
    MalformedHostLine { line: usize, content: String },
    #[error("Hostfile {0} lists no hosts")]
    EmptyRoster(String),
    #[error("Failed to read launch file {path}: {source}")]
    LaunchFileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse launch file: {0}")]
    LaunchFileParse(#[from] serde_yaml::Error),
    #[error("Stagger delay must be a finite, non-negative number of seconds, got {0}")]
    InvalidStagger(f64),
    #[error("Output name refers to '{0}', which is not a run parameter")]
    UnknownNameField(String),
    #[error("The launch file sets `output` but no `exp_name`")]
    MissingExpName,
    #[error("Failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to connect SSH session or execute SSH command: {0}")]
    Ssh(#[from] openssh::Error),
    #[error("Remote command on {address} exited with {status}")]
    RemoteExit { address: String, status: String },
    #[error("Failed to dispatch worker to {address}: {reason}")]
    DispatchFailed { address: String, reason: String },
    #[error("Failed to terminate stale process on {address}: {reason}")]
    TerminationFailed { address: String, reason: String },
}
