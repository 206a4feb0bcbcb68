use parking_lot::{Condvar, Mutex};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

/// A one-way flag raised when the application begins to shut down.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    shutdown: AtomicBool,
    lock: Mutex<()>,
    signalled: Condvar,
}

impl ShutdownSignal {
    /// Creates a signal that has not been raised.
    #[must_use]
    pub fn new() -> Self {
        ShutdownSignal::default()
    }

    /// Raises the signal and wakes every waiting thread.
    pub fn signal(&self) {
        let _guard = self.lock.lock();
        self.shutdown.store(true, Ordering::Release);
        self.signalled.notify_all();
    }

    /// Whether the signal was raised.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Waits until the signal is raised or `timeout` has passed. Returns
    /// whether the signal was raised.
    pub fn await_shutdown(&self, timeout: Duration) -> bool {
        if self.is_shutdown() {
            return true;
        }

        let mut guard = self.lock.lock();
        match Instant::now().checked_add(timeout) {
            Some(deadline) => {
                while !self.is_shutdown() {
                    if self.signalled.wait_until(&mut guard, deadline).timed_out()
                    {
                        break;
                    }
                }
            }
            None => {
                while !self.is_shutdown() {
                    self.signalled.wait(&mut guard);
                }
            }
        }
        self.is_shutdown()
    }
}
