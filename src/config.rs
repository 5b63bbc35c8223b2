//! Configuration for the launcher.
//!
//! Holds the clap structs for command line arguments and the launch file,
//! a YAML description of one distributed run.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::error::LauncherError;
use crate::launcher::FixedDelay;
use crate::output::OutputSpec;
use crate::params::ParamValue;

/// Log settings prepended to every worker command.
pub const DEFAULT_ENV: &str = "GLOG_logtostderr=true GLOG_v=-1 GLOG_minloglevel=0";

#[derive(Parser)]
#[command(version, author)]
pub struct Config {
    /// Launch (l), Kill (k), and Show (s) mode
    #[arg(value_enum)]
    pub mode: Mode,

    /// Launch file to use. Defaults to `launch.yaml`
    #[arg(long, short, default_value = "launch.yaml")]
    pub launch_file: String,

    /// Hostfile to use instead of the one named in the launch file
    #[arg(long)]
    pub hostfile: Option<String>,

    /// Seconds to wait after starting client 0
    #[arg(long)]
    pub stagger_secs: Option<f64>,
}

impl Config {
    /// Read the launch file and apply command line overrides.
    ///
    /// The stagger delay is checked here so a bad value fails before any
    /// host is touched.
    pub fn load_launch_file(&self) -> Result<LaunchFile, LauncherError> {
        let mut launch = LaunchFile::load(&self.launch_file)?;
        if let Some(hostfile) = &self.hostfile {
            launch.hostfile = hostfile.clone();
        }
        if let Some(secs) = self.stagger_secs {
            launch.stagger_secs = secs;
        }
        launch.stagger()?;
        Ok(launch)
    }
}

#[derive(PartialEq, Clone, ValueEnum)]
pub enum Mode {
    /// Kill stale workers, then start a new run
    #[value(name = "l")]
    Launch,
    /// Kill workers on every host
    #[value(name = "k")]
    Kill,
    /// Print the command each client would run
    #[value(name = "s")]
    Show,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LaunchFile {
    /// Experiment name, the first part of the output directory name.
    #[serde(default)]
    pub exp_name: Option<String>,
    /// Worker executable, as seen from the cluster machines.
    pub program: String,
    /// Name to kill stale workers by. Defaults to the file name of `program`.
    #[serde(default)]
    pub process_name: Option<String>,
    pub hostfile: String,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    #[serde(default = "default_env")]
    pub env: String,
    #[serde(default = "default_stagger_secs")]
    pub stagger_secs: f64,
    #[serde(default)]
    pub output: Option<OutputSpec>,
    /// Where each worker's stdout and stderr go, as `client_<id>.log`.
    /// Defaults to the output directory when there is one.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Algorithm parameters, passed through to the workers.
    #[serde(default)]
    pub params: HashMap<String, ParamValue>,
}

fn default_num_threads() -> usize {
    1
}

fn default_env() -> String {
    DEFAULT_ENV.to_string()
}

fn default_stagger_secs() -> f64 {
    2.0
}

impl LaunchFile {
    pub fn load(path: &str) -> Result<Self, LauncherError> {
        let file = File::open(path).map_err(|source| LauncherError::LaunchFileRead {
            path: path.to_string(),
            source,
        })?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn stagger(&self) -> Result<FixedDelay, LauncherError> {
        FixedDelay::from_secs_f64(self.stagger_secs)
    }

    pub fn process_name(&self) -> String {
        match &self.process_name {
            Some(name) => name.clone(),
            None => Path::new(&self.program)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.program.clone()),
        }
    }
}
