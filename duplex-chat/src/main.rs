use anyhow::{Result, bail};
use clap::Parser;
use tracing::warn;

use duplex_chat::{cli::Cli, client};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the chat itself, so logs go to stderr.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let report = client::run(cli).await?;
    if !(report.inbound.is_clean() && report.outbound.is_clean()) {
        warn!(?report, "session ended on a failure");
        bail!(
            "session ended on a failure (inbound: {:?}, outbound: {:?})",
            report.inbound,
            report.outbound
        );
    }

    Ok(())
}
