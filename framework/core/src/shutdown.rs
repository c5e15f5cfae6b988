use std::sync::Arc;

use tokio::sync::broadcast::{Receiver, Sender};
use tokio::sync::Mutex;

/// Broadcasts the end-of-run signal to every virtual user and background task.
///
/// A single handle is created by the runner. Anything that needs to stop when the run ends,
/// whether because the configured duration elapsed or because the operator pressed Ctrl-C,
/// takes a listener from this handle.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
        }
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.sender.send(()) {
            // Only fails when nobody is listening, which happens if the run never started
            // any virtual users.
            log::warn!("Failed to send shutdown signal: {e:?}");
        }
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener::new(self.sender.subscribe())
    }
}

#[derive(Clone, Debug)]
pub struct DelegatedShutdownListener {
    receiver: Arc<Mutex<Receiver<()>>>,
}

impl DelegatedShutdownListener {
    pub(crate) fn new(receiver: Receiver<()>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Point-in-time check for the shutdown signal. When this returns true the caller must
    /// stop starting new work so that the run can finish.
    pub fn should_shutdown(&mut self) -> bool {
        match self.receiver.try_lock() {
            Ok(mut guard) => match guard.try_recv() {
                Ok(_) => true,
                Err(tokio::sync::broadcast::error::TryRecvError::Closed) => true,
                // Empty or lagged, either way no shutdown has been requested.
                Err(_) => false,
            },
            Err(_) => false,
        }
    }

    /// Wait for the shutdown signal. Safe to race against another future so that in-flight
    /// work can be abandoned when the run ends.
    pub async fn wait_for_shutdown(&mut self) {
        self.receiver
            .lock()
            .await
            .recv()
            .await
            .expect("Failed to receive shutdown signal");
    }
}

/// Returned from work that was cancelled because the run is shutting down.
///
/// The runner treats this error as expected when it unwinds a virtual user at the end of a
/// scenario, so it is never logged as a behaviour failure.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Execution cancelled by shutdown signal".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listener_sees_the_signal() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();

        assert!(!listener.should_shutdown());

        handle.shutdown();

        assert!(listener.should_shutdown());
    }

    #[tokio::test]
    async fn every_listener_receives_the_signal() {
        let handle = ShutdownHandle::new();
        let mut first = handle.new_listener();
        let mut second = handle.new_listener();

        handle.shutdown();

        assert!(first.should_shutdown());
        assert!(second.should_shutdown());
    }
}
