//! Launch a distributed parameter-server run across the machines of a hostfile.

// Serde helper module.
mod serde;
// Command line arguments and the launch file.
pub mod config;
// Error handling.
pub mod error;
// How to parse and represent hosts.
pub mod host;
// Staggered dispatch of workers.
pub mod launcher;
// Output directory naming.
pub mod output;
// Run parameters and worker flags.
pub mod params;
// Killing stale workers.
pub mod reaper;
// Remote command execution.
pub mod session;

pub use config::{Config, LaunchFile, Mode};
pub use error::LauncherError;
pub use host::{parse_hostfile, read_hostfile, HostEntry};
pub use launcher::{launch_clients, FixedDelay, LaunchPlan, LaunchReport, Stagger};
pub use output::{output_name, prepare_output_dir, NameField, OutputSpec};
pub use params::{topology_params, ParamValue, RunConfig};
pub use reaper::{reap, FailedHost, ReapReport};
pub use session::{RemoteChannel, SshChannel};
