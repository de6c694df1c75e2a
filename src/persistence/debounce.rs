//! Trailing debouncer on the tokio runtime.
//!
//! At most one timer is pending. Scheduling aborts the previous timer, so a
//! burst of calls runs the task once, `delay` after the last call. When the
//! timer fires, the task is spawned as its own tokio task: cancelling or
//! rescheduling afterwards never aborts a task that already started.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{ClipdeckError, Result};

/// Single-slot trailing timer. Dropping it cancels a pending timer.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `task` after the delay unless rescheduled or cancelled first.
    /// Fails with [`ClipdeckError::NoRuntime`] outside a tokio runtime.
    pub fn schedule<F, Fut>(&mut self, task: F) -> Result<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|_| ClipdeckError::NoRuntime)?;
        self.cancel();

        let delay = self.delay;
        let runtime = handle.clone();
        self.pending = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            runtime.spawn(task());
        }));
        Ok(())
    }

    /// Drop the pending timer. Returns true if one was waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(timer) => {
                let waiting = !timer.is_finished();
                timer.abort();
                waiting
            }
            None => false,
        }
    }

    /// Whether a timer is armed and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
