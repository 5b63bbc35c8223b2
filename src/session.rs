//! Remote command execution.
//!
//! Everything the launcher does on a cluster machine goes through
//! [`RemoteChannel`]: killing stale workers and starting new ones. The
//! production implementation speaks SSH; tests substitute mocks.

use async_trait::async_trait;
use openssh::{KnownHosts, Session as SSHSession, Stdio};

use crate::error::LauncherError;

#[async_trait]
pub trait RemoteChannel: Send + Sync {
    /// Run `command` through the shell on `address`.
    ///
    /// When `detached` is false this returns once the command exits, and a
    /// non-zero exit is an error. When `detached` is true the command is put
    /// in the background on the remote side and this returns as soon as the
    /// remote shell has accepted it.
    async fn execute(&self, address: &str, command: &str, detached: bool)
        -> Result<(), LauncherError>;
}

/// Runs commands over SSH, one multiplexed connection per call.
///
/// Host keys are accepted without prompting so a batch launch never stops
/// on a confirmation question.
#[derive(Debug, Default, Clone)]
pub struct SshChannel;

impl SshChannel {
    async fn connect(address: &str) -> Result<SSHSession, LauncherError> {
        match SSHSession::connect_mux(address, KnownHosts::Accept).await {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::debug!("[{}] Failed to connect to host: {:?}", address, e);
                Err(e.into())
            }
        }
    }
}

/// Wrap a command so it survives the SSH connection going away and does not
/// hold the channel open through its stdio. Redirections inside `command`
/// still apply to the worker.
pub fn detach(command: &str) -> String {
    format!(
        "nohup sh -c {} > /dev/null 2>&1 < /dev/null &",
        crate::params::shell_escape(command)
    )
}

#[async_trait]
impl RemoteChannel for SshChannel {
    async fn execute(
        &self,
        address: &str,
        command: &str,
        detached: bool,
    ) -> Result<(), LauncherError> {
        let session = Self::connect(address).await?;
        let remote = if detached {
            detach(command)
        } else {
            command.to_string()
        };
        let result = {
            let mut cmd = session.command("sh");
            cmd.arg("-c")
                .arg(&remote)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
            cmd.status().await
        };
        if let Err(e) = session.close().await {
            tracing::debug!("[{}] Error while terminating connection: {}", address, e);
        }
        let status = result?;
        if status.success() {
            Ok(())
        } else {
            Err(LauncherError::RemoteExit {
                address: address.to_string(),
                status: status.to_string(),
            })
        }
    }
}
