//! The forwarding loop shared by both directions of the client.
//!
//! A pump pulls one unit at a time from a [`Source`], hands it to a [`Sink`],
//! and keeps going while the session's [`RunState`] says so. Whatever ends the
//! loop, the pump clears the run state on its way out so its peer stops too.

use std::future::Future;

use tokio::select;
use tracing::{debug, info, warn};

use crate::{error::PumpError, run_state::RunState};

/// Produces the units a pump forwards. `Ok(None)` is end of stream.
pub trait Source: Send {
    type Unit: Send;

    fn next_unit(
        &mut self,
    ) -> impl Future<Output = Result<Option<Self::Unit>, PumpError>> + Send;
}

/// Consumes the units a pump forwards.
pub trait Sink<U>: Send {
    fn forward(&mut self, unit: &U) -> impl Future<Output = Result<(), PumpError>> + Send;
}

/// Why a pump loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// The run state was cleared by the peer or by an external close request.
    Stopped,
    /// The source reported end of stream.
    EndOfStream,
    /// The leave command was forwarded.
    LeaveCommand,
    /// Reading or decoding the next unit failed.
    ReadFailed,
    /// The sink refused a unit.
    ForwardFailed,
}

impl PumpExit {
    /// Exits that are part of a normal session end rather than a failure.
    pub fn is_clean(self) -> bool {
        matches!(self, Self::Stopped | Self::EndOfStream | Self::LeaveCommand)
    }
}

/// A source and sink wired together under a shared run state.
///
/// `is_final` is checked on every unit; a unit for which it returns `true`
/// is still forwarded, and then the loop ends.
pub struct ForwardingLoop<S, K, F> {
    name: &'static str,
    source: S,
    sink: K,
    is_final: F,
    run_state: RunState,
}

/// What a finished loop hands back: its exit reason plus both ends, so the
/// owner decides how they are released.
pub struct Finished<S, K> {
    pub exit: PumpExit,
    pub source: S,
    pub sink: K,
}

/// The network half a pump hands back to the session once it has returned.
#[derive(Debug)]
pub struct PumpOutcome<H> {
    pub exit: PumpExit,
    pub half: H,
}

impl<S, K, F> ForwardingLoop<S, K, F>
where
    S: Source,
    K: Sink<S::Unit>,
    F: FnMut(&S::Unit) -> bool + Send,
{
    pub fn new(name: &'static str, source: S, sink: K, is_final: F, run_state: RunState) -> Self {
        Self {
            name,
            source,
            sink,
            is_final,
            run_state,
        }
    }

    pub async fn run(mut self) -> Finished<S, K> {
        let name = self.name;
        debug!(pump = name, "pump started");

        let exit = loop {
            if !self.run_state.is_running() {
                break PumpExit::Stopped;
            }

            // A stop request wins over a pending read; the partially read
            // unit, if any, is dropped with the session.
            let next = select! {
                biased;
                () = self.run_state.stopped() => None,
                next = self.source.next_unit() => Some(next),
            };
            let Some(next) = next else {
                break PumpExit::Stopped;
            };

            let unit = match next {
                Ok(Some(unit)) => unit,
                Ok(None) => {
                    info!(pump = name, "end of stream");
                    break PumpExit::EndOfStream;
                }
                Err(error) => {
                    warn!(pump = name, %error, "read failed");
                    break PumpExit::ReadFailed;
                }
            };

            // A stop also wins over a forward parked on a full display or a
            // peer that stopped reading; the unit being handed over is dropped.
            let is_final = (self.is_final)(&unit);
            let forwarded = select! {
                biased;
                () = self.run_state.stopped() => None,
                forwarded = self.sink.forward(&unit) => Some(forwarded),
            };
            match forwarded {
                None => {
                    debug!(pump = name, "stopped while forwarding");
                    break PumpExit::Stopped;
                }
                Some(Err(error)) => {
                    warn!(pump = name, %error, "forward failed");
                    break PumpExit::ForwardFailed;
                }
                Some(Ok(())) => {}
            }
            if is_final {
                info!(pump = name, "leave command sent");
                break PumpExit::LeaveCommand;
            }
        };

        if self.run_state.stop() {
            info!(pump = name, ?exit, "changing run state at the end");
        } else {
            debug!(pump = name, ?exit, "run state already cleared");
        }

        Finished {
            exit,
            source: self.source,
            sink: self.sink,
        }
    }
}
