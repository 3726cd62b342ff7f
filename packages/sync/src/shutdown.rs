//! Cooperative shutdown for background tasks.

use tokio::sync::watch;

/// Receiving side handed to each background task.
pub type Shutdown = watch::Receiver<bool>;

/// Sending side kept by whoever owns the tasks. Dropping it also signals
/// shutdown.
#[derive(Debug)]
pub struct ShutdownTrigger(watch::Sender<bool>);

impl ShutdownTrigger {
    pub fn fire(&self) {
        self.0.send_replace(true);
    }
}

#[must_use]
pub fn shutdown_pair() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger(tx), rx)
}

/// Completes once shutdown has been signalled or the trigger is gone.
pub async fn cancelled(shutdown: &mut Shutdown) {
    // An error means the trigger was dropped.
    let _ = shutdown.wait_for(|stop| *stop).await;
}
