//! Launching a distributed run.
//!
//! A run goes through these steps, in order:
//!
//! 1. Parse the hostfile into a roster. An empty roster stops here.
//! 2. Build the parameter template and name the output directory. Any
//!    configuration error stops here, before a single host is touched.
//! 3. Kill stale workers on every host.
//! 4. Create the output directory.
//! 5. Start one worker per host, in roster order. Client 0 gets a head start
//!    so it can set up before the others connect to it.
//!
//! Once step 5 begins every host gets its dispatch, whatever happened to
//! the hosts before it.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::LaunchFile;
use crate::error::LauncherError;
use crate::host::{read_hostfile, tags, HostEntry};
use crate::output::{absolute, prepare_output_dir};
use crate::params::{shell_escape, topology_params, RunConfig};
use crate::reaper::{reap, FailedHost, ReapReport};
use crate::session::RemoteChannel;

/// The wait between starting client 0 and the rest.
#[async_trait]
pub trait Stagger: Send + Sync {
    async fn wait(&self);
}

/// Sleep for a fixed duration. No readiness check.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    /// Negative, infinite, NaN and out-of-range values are rejected.
    pub fn from_secs_f64(secs: f64) -> Result<Self, LauncherError> {
        Duration::try_from_secs_f64(secs)
            .map(Self)
            .map_err(|_| LauncherError::InvalidStagger(secs))
    }
}

#[async_trait]
impl Stagger for FixedDelay {
    async fn wait(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// Everything needed to build each client's command line.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    /// Environment assignments prepended to the command.
    pub env: String,
    /// Worker executable.
    pub program: String,
    /// Parameters shared by all clients. Has no `client_id`.
    pub template: RunConfig,
    /// Directory shared by all clients of this run, if any.
    pub output_dir: Option<PathBuf>,
    /// Directory for per-client log files. Worker output is discarded
    /// without one.
    pub log_dir: Option<PathBuf>,
}

impl LaunchPlan {
    /// Derive the plan for `roster` from a launch file.
    ///
    /// `hostfile` is the path handed to the workers.
    pub fn new(
        launch: &LaunchFile,
        hostfile: &str,
        roster: &[HostEntry],
    ) -> Result<Self, LauncherError> {
        let topology = topology_params(hostfile, launch.num_threads, roster.len());
        let mut template = RunConfig::merge(topology, launch.params.clone());

        let output_dir = match &launch.output {
            Some(output) => {
                let exp_name = launch.exp_name.as_deref().ok_or(LauncherError::MissingExpName)?;
                let dir = output.run_dir(exp_name, &template)?;
                template.insert("output_dir", dir.to_string_lossy().into_owned());
                Some(dir)
            }
            None => None,
        };

        let log_dir = match &launch.log_dir {
            Some(dir) => Some(absolute(dir)?),
            None => output_dir.clone(),
        };

        Ok(Self {
            env: launch.env.clone(),
            program: launch.program.clone(),
            template,
            output_dir,
            log_dir,
        })
    }

    pub fn log_file(&self, client_id: usize) -> Option<PathBuf> {
        self.log_dir
            .as_ref()
            .map(|dir| dir.join(format!("client_{}.log", client_id)))
    }

    /// The worker command with its output sent to the client's log file.
    pub fn dispatch_command(&self, client_id: usize) -> String {
        let command = self.command(client_id);
        match self.log_file(client_id) {
            Some(log) => format!("{} > {} 2>&1", command, shell_escape(&log.to_string_lossy())),
            None => command,
        }
    }

    /// The full command line for one client.
    pub fn command(&self, client_id: usize) -> String {
        let flags = self.template.for_client(client_id).to_flags();
        let mut parts = Vec::with_capacity(flags.len() + 2);
        if !self.env.trim().is_empty() {
            parts.push(self.env.trim().to_string());
        }
        parts.push(shell_escape(&self.program));
        parts.extend(flags.iter().map(|flag| shell_escape(flag)));
        parts.join(" ")
    }
}

#[derive(Debug, Default)]
pub struct LaunchReport {
    /// Client ids whose dispatch was accepted.
    pub dispatched: Vec<usize>,
    pub failed: Vec<FailedHost>,
}

/// Dispatch one detached worker per roster entry, in roster order.
///
/// Waits on `stagger` once, right after client 0, if anyone follows it.
/// A failed dispatch is recorded and the loop moves on.
pub async fn launch_clients(
    plan: &LaunchPlan,
    roster: &[HostEntry],
    channel: &dyn RemoteChannel,
    stagger: &dyn Stagger,
) -> LaunchReport {
    let colorhosts = tags(roster);
    let mut report = LaunchReport::default();

    for (client_id, host) in roster.iter().enumerate() {
        let command = plan.dispatch_command(client_id);
        tracing::info!("{} === launch '{}' ===", colorhosts[client_id], command);
        match channel.execute(&host.address, &command, true).await {
            Ok(()) => {
                tracing::info!("{} Dispatched client {}", colorhosts[client_id], client_id);
                report.dispatched.push(client_id);
            }
            Err(e) => {
                tracing::error!("{} Dispatch failed: {}", colorhosts[client_id], e);
                report.failed.push(FailedHost {
                    client_id,
                    error: LauncherError::DispatchFailed {
                        address: host.address.clone(),
                        reason: e.to_string(),
                    },
                });
            }
        }

        if client_id == 0 && roster.len() > 1 {
            tracing::info!("Waiting for first client to set up");
            stagger.wait().await;
        }
    }

    tracing::info!(
        "Dispatched {} of {} clients. Worker liveness is not checked.",
        report.dispatched.len(),
        roster.len()
    );
    report
}

/// Kill stale workers on every host of the launch file's hostfile.
pub async fn kill(
    launch: &LaunchFile,
    channel: &dyn RemoteChannel,
) -> Result<ReapReport, LauncherError> {
    let roster = read_hostfile(&launch.hostfile)?;
    Ok(reap(&roster, &launch.process_name(), channel).await)
}

/// Resolve the roster and plan without touching any host.
pub fn prepare(launch: &LaunchFile) -> Result<(Vec<HostEntry>, LaunchPlan), LauncherError> {
    let roster = read_hostfile(&launch.hostfile)?;
    // Workers get an absolute hostfile path. `read_hostfile` already proved it exists.
    let hostfile = std::fs::canonicalize(&launch.hostfile)
        .map_err(|source| LauncherError::HostfileRead {
            path: launch.hostfile.clone(),
            source,
        })?
        .to_string_lossy()
        .into_owned();
    let plan = LaunchPlan::new(launch, &hostfile, &roster)?;
    Ok((roster, plan))
}

/// The whole launch sequence.
pub async fn run(
    launch: &LaunchFile,
    channel: &dyn RemoteChannel,
    stagger: &dyn Stagger,
) -> Result<(ReapReport, LaunchReport), LauncherError> {
    let (roster, plan) = prepare(launch)?;
    let reaped = reap(&roster, &launch.process_name(), channel).await;
    if let Some(dir) = &plan.output_dir {
        prepare_output_dir(dir)?;
    }
    if let Some(dir) = &plan.log_dir {
        prepare_output_dir(dir)?;
    }
    let launched = launch_clients(&plan, &roster, channel, stagger).await;
    Ok((reaped, launched))
}
