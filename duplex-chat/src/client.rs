use anyhow::{Context, Result};
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::{
    cli::Cli,
    codec::write_text_line,
    connection::{self, StreamHalf},
    session::{SessionBuilder, SessionReport},
    user_io::{WriterOutput, spawn_stdin_reader},
};

const INPUT_BACKLOG: usize = 64;

/// Connects to the server and runs a console session on stdin/stdout until
/// the link dies, the user leaves, or Ctrl-C is pressed.
pub async fn run(args: Cli) -> Result<SessionReport> {
    let stream = TcpStream::connect(args.server)
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;
    info!("connected to {}", args.server);

    let (reader, mut writer) = connection::split(stream);
    if let Some(name) = &args.name {
        if let Err(err) = write_text_line(&mut writer, name).await {
            release_unused(reader, writer).await;
            return Err(err).context("failed to announce name");
        }
    }

    let session = SessionBuilder::new(args.session_config())
        .network_reader(reader)
        .network_writer(writer)
        .user_input(spawn_stdin_reader(INPUT_BACKLOG).context("failed to start stdin reader")?)
        .user_output(WriterOutput::new(tokio::io::stdout()))
        .build()?;

    let handle = session.handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                handle.close();
            }
            Err(error) => warn!(?error, "failed to install ctrl-c handler"),
        }
    });

    let report = session.run().await?;
    info!(?report, "session finished");
    Ok(report)
}

async fn release_unused<R: StreamHalf, W: StreamHalf>(reader: R, writer: W) {
    if let Err(error) = reader.close().await {
        warn!(?error, "failed to close network reader");
    }
    if let Err(error) = writer.close().await {
        warn!(?error, "failed to close network writer");
    }
}
