use std::sync::Arc;

use tokio::sync::watch;

/// The run flag shared by both pumps of a session.
///
/// Backed by a `watch` channel: reads and writes go through the channel's
/// lock, so a stop issued by one pump is visible to the other before its next
/// poll, and a pump parked in a read can await [`RunState::stopped`] instead
/// of waiting for its stream to be closed underneath it.
///
/// The flag starts out `true` and only ever moves to `false`.
#[derive(Debug, Clone)]
pub struct RunState {
    running: Arc<watch::Sender<bool>>,
}

impl RunState {
    pub fn new() -> Self {
        let (running, _) = watch::channel(true);
        Self {
            running: Arc::new(running),
        }
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Clears the flag. Returns `true` only for the call that actually moved
    /// it from running to stopped; every later call is a no-op.
    pub fn stop(&self) -> bool {
        self.running.send_if_modified(|running| {
            let was_running = *running;
            *running = false;
            was_running
        })
    }

    /// Resolves once the flag has been cleared.
    pub async fn stopped(&self) {
        let mut updates = self.running.subscribe();
        while *updates.borrow_and_update() {
            // The sender lives as long as `self`, so `changed` cannot report
            // a closed channel while we are awaiting it.
            if updates.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
