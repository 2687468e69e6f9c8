use clap::ValueEnum;
use tokio::io::AsyncBufRead;
use tracing::{info, warn};

use crate::{
    codec::{read_message, read_text_line},
    error::PumpError,
    message::Message,
    pump::{ForwardingLoop, PumpOutcome, Sink, Source},
    run_state::RunState,
    user_io::UserOutput,
};

/// How the server's stream is decoded and handed to the user output.
/// Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// One text line per unit, shown as-is.
    #[default]
    Text,
    /// One JSON-encoded [`Message`] per line.
    Structured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundUnit {
    Text(String),
    Structured(Message),
}

struct NetworkSource<R> {
    reader: R,
    mode: OutputMode,
}

impl<R> Source for NetworkSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    type Unit = InboundUnit;

    async fn next_unit(&mut self) -> Result<Option<InboundUnit>, PumpError> {
        let unit = match self.mode {
            OutputMode::Text => read_text_line(&mut self.reader)
                .await
                .map(|line| line.map(InboundUnit::Text)),
            OutputMode::Structured => read_message::<_, Message>(&mut self.reader)
                .await
                .map(|message| message.map(InboundUnit::Structured)),
        };
        unit.map_err(PumpError::from_read)
    }
}

struct OutputSink<O> {
    output: O,
}

impl<O> Sink<InboundUnit> for OutputSink<O>
where
    O: UserOutput,
{
    async fn forward(&mut self, unit: &InboundUnit) -> Result<(), PumpError> {
        match unit {
            InboundUnit::Text(line) => self.output.write_text(line).await?,
            InboundUnit::Structured(message) => self.output.write_structured(message).await?,
        }
        Ok(())
    }
}

fn never_final(_: &InboundUnit) -> bool {
    false
}

/// Moves units from the server to the user until the link dies or the
/// session stops.
pub struct InboundPump<R, O> {
    reader: R,
    output: O,
    mode: OutputMode,
    run_state: RunState,
}

impl<R, O> InboundPump<R, O>
where
    R: AsyncBufRead + Unpin + Send,
    O: UserOutput,
{
    pub fn new(reader: R, output: O, mode: OutputMode, run_state: RunState) -> Self {
        Self {
            reader,
            output,
            mode,
            run_state,
        }
    }

    /// Runs the loop, then closes the user output. The network reader is
    /// returned untouched for the session to release.
    pub async fn run(self) -> PumpOutcome<R> {
        let source = NetworkSource {
            reader: self.reader,
            mode: self.mode,
        };
        let sink = OutputSink {
            output: self.output,
        };
        let finished = ForwardingLoop::new("inbound", source, sink, never_final, self.run_state)
            .run()
            .await;

        let mut output = finished.sink.output;
        info!("inbound: closing user output");
        if let Err(error) = output.close().await {
            warn!(?error, "inbound: closing user output failed");
        }

        PumpOutcome {
            exit: finished.exit,
            half: finished.source.reader,
        }
    }
}
