use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use duplex_chat::{
    codec::{read_text_line, write_message, write_text_line},
    connection,
    inbound::OutputMode,
    message::{DisplayLine, Message},
    pump::PumpExit,
    session::{Session, SessionBuilder, SessionConfig, SessionPhase},
    user_io::{ChannelInput, ChannelOutput},
};
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
    time::timeout,
};

const STEP: Duration = Duration::from_secs(2);

type TcpSession = Session<BufReader<OwnedReadHalf>, OwnedWriteHalf, ChannelInput, ChannelOutput>;

struct Client {
    session: TcpSession,
    typed: mpsc::Sender<String>,
    shown: mpsc::Receiver<DisplayLine>,
}

struct Server {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

async fn connect(config: SessionConfig) -> Result<(Client, Server)> {
    connect_with_display(config, 16).await
}

async fn connect_with_display(config: SessionConfig, display: usize) -> Result<(Client, Server)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    let (server_stream, _) = accepted?;
    let (reader, writer) = connection::split(client?);
    let (server_reader, server_writer) = connection::split(server_stream);

    let (typed, typed_rx) = mpsc::channel(16);
    let (shown_tx, shown) = mpsc::channel(display);
    let session = SessionBuilder::new(config)
        .network_reader(reader)
        .network_writer(writer)
        .user_input(ChannelInput::new(typed_rx))
        .user_output(ChannelOutput::new(shown_tx))
        .build()?;

    Ok((
        Client {
            session,
            typed,
            shown,
        },
        Server {
            reader: server_reader,
            writer: server_writer,
        },
    ))
}

async fn server_line(server: &mut Server) -> Result<Option<String>> {
    Ok(timeout(STEP, read_text_line(&mut server.reader)).await??)
}

async fn shown(display: &mut mpsc::Receiver<DisplayLine>) -> Result<DisplayLine> {
    timeout(STEP, display.recv())
        .await?
        .context("display channel closed early")
}

#[tokio::test]
async fn chat_then_leave_over_tcp() -> Result<()> {
    let (mut client, mut server) = connect(SessionConfig::default()).await?;
    let handle = client.session.handle();
    let session = tokio::spawn(client.session.run());

    write_text_line(&mut server.writer, "[2024/03/09 12:30:05] bob > hi alice").await?;
    let line = shown(&mut client.shown).await?;
    assert_eq!(line.text, "[2024/03/09 12:30:05] bob > hi alice");
    assert_eq!(line.author.as_deref(), Some("bob"));

    client.typed.send("hello bob".into()).await?;
    assert_eq!(server_line(&mut server).await?.as_deref(), Some("hello bob"));

    client.typed.send("bye".into()).await?;
    assert_eq!(server_line(&mut server).await?.as_deref(), Some("bye"));

    let report = timeout(STEP, session).await???;
    assert_eq!(report.outbound, PumpExit::LeaveCommand);
    assert_eq!(report.inbound, PumpExit::Stopped);
    assert!(report.cleanup.reader_closed);
    assert!(report.cleanup.writer_closed);
    assert_eq!(handle.phase(), SessionPhase::Stopped);

    // The client shut its write side down, so the server sees end of stream.
    assert_eq!(server_line(&mut server).await?, None);
    Ok(())
}

#[tokio::test]
async fn structured_messages_keep_their_author() -> Result<()> {
    let config = SessionConfig {
        mode: OutputMode::Structured,
        ..SessionConfig::default()
    };
    let (mut client, mut server) = connect(config).await?;
    let session = tokio::spawn(client.session.run());

    let sent_at = Utc
        .with_ymd_and_hms(2024, 3, 9, 12, 30, 5)
        .single()
        .context("timestamp")?;
    write_message(
        &mut server.writer,
        &Message::new("hello").with_author("alice").at(sent_at),
    )
    .await?;
    write_message(&mut server.writer, &Message::new("alice logged out").at(sent_at)).await?;

    let first = shown(&mut client.shown).await?;
    assert_eq!(first.text, "[2024/03/09 12:30:05] alice > hello");
    assert_eq!(first.author.as_deref(), Some("alice"));
    let second = shown(&mut client.shown).await?;
    assert_eq!(second.text, "[2024/03/09 12:30:05] alice logged out");
    assert_eq!(second.author, None);

    server.writer.shutdown().await?;

    let report = timeout(STEP, session).await???;
    assert_eq!(report.inbound, PumpExit::EndOfStream);
    assert_eq!(report.outbound, PumpExit::Stopped);
    Ok(())
}

#[tokio::test]
async fn garbage_from_the_server_ends_the_session() -> Result<()> {
    let config = SessionConfig {
        mode: OutputMode::Structured,
        ..SessionConfig::default()
    };
    let (client, mut server) = connect(config).await?;
    let session = tokio::spawn(client.session.run());

    write_text_line(&mut server.writer, "this is not json").await?;

    let report = timeout(STEP, session).await???;
    assert_eq!(report.inbound, PumpExit::ReadFailed);
    assert_eq!(report.outbound, PumpExit::Stopped);
    assert_eq!(server_line(&mut server).await?, None);
    drop(client.typed);
    Ok(())
}

#[tokio::test]
async fn server_hangup_while_user_is_idle() -> Result<()> {
    let (mut client, server) = connect(SessionConfig::default()).await?;
    let session = tokio::spawn(client.session.run());

    drop(server);

    let report = timeout(STEP, session).await???;
    assert_eq!(report.inbound, PumpExit::EndOfStream);
    assert_eq!(report.outbound, PumpExit::Stopped);

    // Nothing typed after the session ended can reach anyone.
    assert!(client.typed.send("too late".into()).await.is_err());
    assert!(client.shown.recv().await.is_none());
    Ok(())
}

#[tokio::test]
async fn user_leaving_the_front_end_ends_the_session() -> Result<()> {
    let (client, mut server) = connect(SessionConfig::default()).await?;
    let session = tokio::spawn(client.session.run());

    client.typed.send("last words".into()).await?;
    drop(client.typed);

    assert_eq!(server_line(&mut server).await?.as_deref(), Some("last words"));
    let report = timeout(STEP, session).await???;
    assert_eq!(report.outbound, PumpExit::EndOfStream);
    assert_eq!(report.inbound, PumpExit::Stopped);
    assert_eq!(server_line(&mut server).await?, None);
    Ok(())
}

#[tokio::test]
async fn close_releases_a_session_whose_display_is_full() -> Result<()> {
    let (client, mut server) = connect_with_display(SessionConfig::default(), 1).await?;
    let handle = client.session.handle();
    let session = tokio::spawn(client.session.run());

    for line in ["a", "b", "c"] {
        write_text_line(&mut server.writer, line).await?;
    }
    // "a" fills the display, which nobody drains; the pump waits to hand over "b".
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(handle.close());

    assert!(timeout(STEP, handle.stopped()).await?);
    assert_eq!(handle.phase(), SessionPhase::Stopped);
    let report = timeout(STEP, session).await???;
    assert_eq!(report.inbound, PumpExit::Stopped);
    assert_eq!(report.outbound, PumpExit::Stopped);
    assert!(report.cleanup.reader_closed && report.cleanup.writer_closed);
    assert_eq!(server_line(&mut server).await?, None);

    drop(client.shown);
    drop(client.typed);
    Ok(())
}
