use std::future::Future;

use footfall_core::prelude::{ShutdownHandle, ShutdownSignalError};

/// The shared async runtime for a run.
///
/// Virtual users are plain OS threads; any async work they need, which is mostly issuing HTTP
/// requests and sleeping out think time, is submitted here.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            runtime,
            shutdown_handle,
        }
    }

    /// Run async code in place, blocking the calling thread until it completes.
    ///
    /// The future is raced against the shutdown signal: when the run ends, an in-flight
    /// iteration is abandoned and this returns a [ShutdownSignalError]. Whatever the iteration
    /// recorded before that point stays recorded.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        self.runtime.block_on(async move {
            tokio::select! {
                result = fut => result,
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(anyhow::anyhow!(ShutdownSignalError::default()))
                },
            }
        })
    }

    /// Submit async code to run in the background. Not cancelled on shutdown, and the runner
    /// does not wait for it; use [Executor::execute_in_place] from behaviour hooks.
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }
}
