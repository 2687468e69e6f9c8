//! One client session: both pumps over one connection, and the cleanup that
//! follows them.
//!
//! The session moves through three phases. It is `Running` while both pumps
//! loop, `Stopping` as soon as the run state is cleared (by either pump or
//! by [`SessionHandle::close`]), and `Stopped` once both pumps have returned
//! and both network halves have been released.

use std::future::Future;

use tokio::{
    io::{AsyncBufRead, AsyncWrite},
    sync::watch,
};
use tracing::{debug, info, warn};

use crate::{
    connection::StreamHalf,
    error::{SessionError, SetupError},
    inbound::{InboundPump, OutputMode},
    outbound::{DEFAULT_LEAVE_COMMAND, OutboundPump},
    pump::{PumpExit, PumpOutcome},
    run_state::RunState,
    user_io::{UserInput, UserOutput},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub mode: OutputMode,
    pub leave_command: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            leave_command: DEFAULT_LEAVE_COMMAND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Running,
    Stopping,
    Stopped,
}

/// Lets a front end end the session (window closed, Ctrl-C) and watch it
/// wind down.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    run_state: RunState,
    phase: watch::Receiver<SessionPhase>,
}

impl SessionHandle {
    /// Asks both pumps to stop. Returns `false` if the session was already
    /// stopping.
    pub fn close(&self) -> bool {
        let first = self.run_state.stop();
        if first {
            info!("session close requested");
        }
        first
    }

    pub fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Waits until both pumps have returned and the connection is released.
    ///
    /// Returns `false` if the session was dropped before getting there, for
    /// instance because `run` was never called. Nothing was released then.
    pub async fn stopped(&self) -> bool {
        let mut phase = self.phase.clone();
        while *phase.borrow_and_update() != SessionPhase::Stopped {
            if phase.changed().await.is_err() {
                debug!("session dropped before it stopped");
                return false;
            }
        }
        true
    }
}

/// Which network halves were released without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub reader_closed: bool,
    pub writer_closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub inbound: PumpExit,
    pub outbound: PumpExit,
    pub cleanup: CleanupReport,
}

/// Collects the four ends of a session; [`SessionBuilder::build`] refuses
/// to produce a session while any of them is missing.
pub struct SessionBuilder<R, W, I, O> {
    config: SessionConfig,
    reader: Option<R>,
    writer: Option<W>,
    input: Option<I>,
    output: Option<O>,
}

impl<R, W, I, O> SessionBuilder<R, W, I, O> {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            reader: None,
            writer: None,
            input: None,
            output: None,
        }
    }

    pub fn network_reader(mut self, reader: R) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn network_writer(mut self, writer: W) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn user_input(mut self, input: I) -> Self {
        self.input = Some(input);
        self
    }

    pub fn user_output(mut self, output: O) -> Self {
        self.output = Some(output);
        self
    }

    pub fn build(self) -> Result<Session<R, W, I, O>, SetupError> {
        let reader = self.reader.ok_or(SetupError::MissingNetworkReader)?;
        let writer = self.writer.ok_or(SetupError::MissingNetworkWriter)?;
        let input = self.input.ok_or(SetupError::MissingUserInput)?;
        let output = self.output.ok_or(SetupError::MissingUserOutput)?;
        let (phase, _) = watch::channel(SessionPhase::Running);

        Ok(Session {
            config: self.config,
            run_state: RunState::new(),
            phase,
            reader,
            writer,
            input,
            output,
        })
    }
}

pub struct Session<R, W, I, O> {
    config: SessionConfig,
    run_state: RunState,
    phase: watch::Sender<SessionPhase>,
    reader: R,
    writer: W,
    input: I,
    output: O,
}

impl<R, W, I, O> Session<R, W, I, O>
where
    R: AsyncBufRead + Unpin + StreamHalf,
    W: AsyncWrite + Unpin + StreamHalf,
    I: UserInput,
    O: UserOutput,
{
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            run_state: self.run_state.clone(),
            phase: self.phase.subscribe(),
        }
    }

    /// Runs both pumps until one of them, or a [`SessionHandle`], ends the
    /// session, then closes the network reader and writer exactly once each.
    pub async fn run(self) -> Result<SessionReport, SessionError> {
        let Session {
            config,
            run_state,
            phase,
            reader,
            writer,
            input,
            output,
        } = self;
        info!(mode = ?config.mode, leave = %config.leave_command, "session running");

        let inbound = spawn_pump(
            &run_state,
            InboundPump::new(reader, output, config.mode, run_state.clone()).run(),
        );
        let outbound = spawn_pump(
            &run_state,
            OutboundPump::new(input, writer, config.leave_command, run_state.clone()).run(),
        );

        run_state.stopped().await;
        phase.send_replace(SessionPhase::Stopping);
        info!("session stopping");

        let (inbound, outbound) = tokio::join!(inbound, outbound);
        let (inbound_exit, reader, inbound_err) = split_join("inbound", inbound);
        let (outbound_exit, writer, outbound_err) = split_join("outbound", outbound);

        let cleanup = CleanupReport {
            reader_closed: release("reader", reader).await,
            writer_closed: release("writer", writer).await,
        };
        phase.send_replace(SessionPhase::Stopped);
        info!(?inbound_exit, ?outbound_exit, ?cleanup, "session stopped");

        if let Some(err) = inbound_err.or(outbound_err) {
            return Err(err);
        }
        Ok(SessionReport {
            // Both are present whenever neither join failed.
            inbound: inbound_exit.unwrap_or(PumpExit::Stopped),
            outbound: outbound_exit.unwrap_or(PumpExit::Stopped),
            cleanup,
        })
    }
}

/// Clears the run state when dropped, so a pump that panics still releases
/// its peer.
struct StopOnDrop(RunState);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        if self.0.stop() {
            warn!("pump ended without clearing the run state");
        }
    }
}

fn spawn_pump<H, F>(run_state: &RunState, pump: F) -> tokio::task::JoinHandle<PumpOutcome<H>>
where
    H: Send + 'static,
    F: Future<Output = PumpOutcome<H>> + Send + 'static,
{
    let guard = StopOnDrop(run_state.clone());
    tokio::spawn(async move {
        let _guard = guard;
        pump.await
    })
}

fn split_join<H>(
    pump: &'static str,
    joined: Result<PumpOutcome<H>, tokio::task::JoinError>,
) -> (Option<PumpExit>, Option<H>, Option<SessionError>) {
    match joined {
        Ok(outcome) => {
            debug!(pump, exit = ?outcome.exit, "pump returned");
            (Some(outcome.exit), Some(outcome.half), None)
        }
        Err(source) => {
            warn!(pump, error = %source, "pump task failed");
            (None, None, Some(SessionError::PumpTask { pump, source }))
        }
    }
}

async fn release<H: StreamHalf>(name: &'static str, half: Option<H>) -> bool {
    let Some(half) = half else {
        warn!(half = name, "network half lost with its pump, nothing to close");
        return false;
    };
    info!(half = name, "closing network half");
    match half.close().await {
        Ok(()) => true,
        Err(error) => {
            warn!(half = name, ?error, "closing network half failed");
            false
        }
    }
}
