use clap::Parser;
use tracing_subscriber::EnvFilter;

use petuum_launch::launcher;
use petuum_launch::{Config, LauncherError, Mode, SshChannel};

#[tokio::main]
async fn main() -> Result<(), LauncherError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Config::parse();
    let launch = cli.load_launch_file()?;
    let channel = SshChannel;

    match cli.mode {
        Mode::Launch => {
            tracing::info!("Launching {}", launch.program);
            let stagger = launch.stagger()?;
            let (reaped, launched) = launcher::run(&launch, &channel, &stagger).await?;
            if !reaped.failed.is_empty() {
                tracing::warn!("Kill requests that failed: {:?}", reaped.failed);
            }
            if !launched.failed.is_empty() {
                tracing::warn!("Dispatches that failed: {:?}", launched.failed);
            }
        }
        Mode::Kill => {
            let reaped = launcher::kill(&launch, &channel).await?;
            if !reaped.failed.is_empty() {
                tracing::warn!("Kill requests that failed: {:?}", reaped.failed);
            }
        }
        Mode::Show => {
            let (roster, plan) = launcher::prepare(&launch)?;
            if let Some(dir) = &plan.output_dir {
                println!("# output_dir: {}", dir.display());
            }
            for (client_id, host) in roster.iter().enumerate() {
                println!("# {} client {}", host, client_id);
                println!("{}", plan.dispatch_command(client_id));
            }
        }
    };

    Ok(())
}
