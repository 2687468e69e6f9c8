use tokio::io::AsyncWrite;

use crate::{
    codec::write_text_line,
    error::PumpError,
    pump::{ForwardingLoop, PumpOutcome, Sink, Source},
    run_state::RunState,
    user_io::UserInput,
};

/// Typed by a user to leave the chat, unless configured otherwise.
pub const DEFAULT_LEAVE_COMMAND: &str = "bye";

struct InputSource<I> {
    input: I,
}

impl<I> Source for InputSource<I>
where
    I: UserInput,
{
    type Unit = String;

    async fn next_unit(&mut self) -> Result<Option<String>, PumpError> {
        Ok(self.input.next_line().await?)
    }
}

struct NetworkSink<W> {
    writer: W,
}

impl<W> Sink<String> for NetworkSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn forward(&mut self, line: &String) -> Result<(), PumpError> {
        Ok(write_text_line(&mut self.writer, line).await?)
    }
}

/// Moves what the user types to the server, one flushed line at a time,
/// until the user leaves or the session stops.
pub struct OutboundPump<I, W> {
    input: I,
    writer: W,
    leave_command: String,
    run_state: RunState,
}

impl<I, W> OutboundPump<I, W>
where
    I: UserInput,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: I, writer: W, leave_command: impl Into<String>, run_state: RunState) -> Self {
        Self {
            input,
            writer,
            leave_command: leave_command.into(),
            run_state,
        }
    }

    /// Runs the loop and hands the network writer back unclosed. The leave
    /// command itself is sent before the loop ends on it.
    pub async fn run(self) -> PumpOutcome<W> {
        let leave_command = self.leave_command;
        let source = InputSource { input: self.input };
        let sink = NetworkSink {
            writer: self.writer,
        };
        let is_leave = move |line: &String| *line == leave_command;

        let finished = ForwardingLoop::new("outbound", source, sink, is_leave, self.run_state)
            .run()
            .await;

        PumpOutcome {
            exit: finished.exit,
            half: finished.sink.writer,
        }
    }
}
