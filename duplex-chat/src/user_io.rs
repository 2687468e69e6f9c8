//! The two seams between the pumps and whatever front end shows the chat:
//! [`UserOutput`] appends what arrives from the server, [`UserInput`] yields
//! what the user typed.

use std::{future::Future, io, thread};

use tokio::{
    io::{AsyncBufRead, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tracing::{debug, warn};

use crate::{
    codec::{read_text_line, write_message, write_text_line},
    message::{DisplayLine, Message},
};

/// Where inbound units end up. Which of the two write methods gets called is
/// fixed for the session by its [`OutputMode`](crate::inbound::OutputMode).
pub trait UserOutput: Send + 'static {
    fn write_text(&mut self, line: &str) -> impl Future<Output = io::Result<()>> + Send;

    fn write_structured(
        &mut self,
        message: &Message,
    ) -> impl Future<Output = io::Result<()>> + Send;

    /// Releases whatever the output holds. Called once by the inbound pump on
    /// its way out.
    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;
}

/// Where outbound lines come from. `Ok(None)` means the user side is gone.
pub trait UserInput: Send + 'static {
    fn next_line(&mut self) -> impl Future<Output = io::Result<Option<String>>> + Send;
}

/// Console output: text lines as they are, structured messages as JSON lines
/// so another program can consume them.
#[derive(Debug)]
pub struct WriterOutput<W> {
    writer: W,
}

impl<W> WriterOutput<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W> UserOutput for WriterOutput<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn write_text(&mut self, line: &str) -> io::Result<()> {
        write_text_line(&mut self.writer, line).await
    }

    async fn write_structured(&mut self, message: &Message) -> io::Result<()> {
        write_message(&mut self.writer, message).await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

/// Output for a graphical front end: every unit becomes a [`DisplayLine`] on
/// a channel. A front end that dropped its receiver makes writes fail.
#[derive(Debug, Clone)]
pub struct ChannelOutput {
    lines: mpsc::Sender<DisplayLine>,
}

impl ChannelOutput {
    pub fn new(lines: mpsc::Sender<DisplayLine>) -> Self {
        Self { lines }
    }

    async fn send(&self, line: DisplayLine) -> io::Result<()> {
        self.lines
            .send(line)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "display closed"))
    }
}

impl UserOutput for ChannelOutput {
    async fn write_text(&mut self, line: &str) -> io::Result<()> {
        self.send(DisplayLine::from_text(line)).await
    }

    async fn write_structured(&mut self, message: &Message) -> io::Result<()> {
        self.send(DisplayLine::from(message)).await
    }

    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Lines read from any buffered async reader.
#[derive(Debug)]
pub struct LineInput<R> {
    reader: R,
}

impl<R> LineInput<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R> UserInput for LineInput<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        read_text_line(&mut self.reader).await
    }
}

/// Lines pushed by a front end. The input ends once every sender is dropped.
#[derive(Debug)]
pub struct ChannelInput {
    lines: mpsc::Receiver<String>,
}

impl ChannelInput {
    pub fn new(lines: mpsc::Receiver<String>) -> Self {
        Self { lines }
    }
}

impl UserInput for ChannelInput {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.recv().await)
    }
}

/// Reads stdin on its own OS thread and feeds the lines into a
/// [`ChannelInput`].
///
/// A blocking stdin read cannot be cancelled, so it is kept off the runtime:
/// the session can stop while the thread is still parked in `read_line`, and
/// the thread goes away with the process.
pub fn spawn_stdin_reader(capacity: usize) -> io::Result<ChannelInput> {
    let (tx, rx) = mpsc::channel(capacity);
    thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in io::stdin().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            debug!("stdin reader: session no longer listening");
                            return;
                        }
                    }
                    Err(error) => {
                        warn!(?error, "stdin reader failed");
                        return;
                    }
                }
            }
            debug!("stdin reached end of input");
        })?;
    Ok(ChannelInput::new(rx))
}
