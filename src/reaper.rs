//! Killing stale workers before a new run.

use std::fmt::Debug;

use futures::future::join_all;

use crate::error::LauncherError;
use crate::host::{tags, HostEntry};
use crate::params::shell_escape;
use crate::session::RemoteChannel;

/// A host action that did not go through.
pub struct FailedHost {
    pub client_id: usize,
    pub error: LauncherError,
}

impl Debug for FailedHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client {} ({})", self.client_id, self.error)
    }
}

#[derive(Debug, Default)]
pub struct ReapReport {
    /// Client ids whose kill request completed.
    pub reaped: Vec<usize>,
    pub failed: Vec<FailedHost>,
}

/// Kill command that succeeds whether or not the process is running.
pub fn kill_command(process_name: &str) -> String {
    format!("killall -q {} || true", shell_escape(process_name))
}

/// Ask every host to kill `process_name`. Requests go out together and are
/// all awaited. Failures are recorded and logged, never returned.
pub async fn reap(
    roster: &[HostEntry],
    process_name: &str,
    channel: &dyn RemoteChannel,
) -> ReapReport {
    let command = kill_command(process_name);
    let colorhosts = tags(roster);
    let requests = roster.iter().map(|host| channel.execute(&host.address, &command, false));
    let results = join_all(requests).await;

    let mut report = ReapReport::default();
    for (client_id, result) in results.into_iter().enumerate() {
        match result {
            Ok(()) => {
                tracing::info!("{} Killed {} if running", colorhosts[client_id], process_name);
                report.reaped.push(client_id);
            }
            Err(e) => {
                tracing::warn!("{} Kill request failed: {}", colorhosts[client_id], e);
                report.failed.push(FailedHost {
                    client_id,
                    error: LauncherError::TerminationFailed {
                        address: roster[client_id].address.clone(),
                        reason: e.to_string(),
                    },
                });
            }
        }
    }
    tracing::info!("Done killing");
    report
}
