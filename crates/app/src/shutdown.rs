//! Cooperative shutdown signal backed by a tokio [`watch`] channel.
//!
//! The control loop and the collector `select!` on [`Shutdown::triggered`]
//! at their suspension points, so a trigger interrupts probe waits and the
//! inter-tick sleep without waiting them out.

use tokio::sync::watch;

/// Sending half, held by whoever decides to stop the loop (signal handler,
/// test harness).
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

/// Receiving half, cloned into every component that can suspend.
///
/// Dropping the [`ShutdownTrigger`] counts as a shutdown request.
#[derive(Debug, Clone)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

/// Create a connected trigger/signal pair.
#[must_use]
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownTrigger { sender }, Shutdown { receiver })
}

impl ShutdownTrigger {
    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

impl Shutdown {
    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow() || self.receiver.has_changed().is_err()
    }

    /// Resolve once shutdown is requested (immediately if it already was).
    pub async fn triggered(&self) {
        let mut receiver = self.receiver.clone();
        // An error means the trigger was dropped, which also stops the loop.
        let _ = receiver.wait_for(|stop| *stop).await;
    }
}
