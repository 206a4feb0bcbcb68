use crate::{
    tasks::invoke_task, DynSvc, Key, ShutdownSignal, Svc, TaskInvoker,
};
use log::{debug, error};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

/// Passed to a daemon operation on every invocation.
///
/// A daemon is invoked again and again until the application shuts down, so
/// each invocation should do one unit of work and return. Long waits should
/// go through [`DaemonContext::await_shutdown`] so the daemon stops promptly.
pub struct DaemonContext {
    name: String,
    signal: Svc<ShutdownSignal>,
    interrupted: Svc<AtomicBool>,
}

impl DaemonContext {
    pub(crate) fn new(
        name: String,
        signal: Svc<ShutdownSignal>,
        interrupted: Svc<AtomicBool>,
    ) -> Self {
        DaemonContext {
            name,
            signal,
            interrupted,
        }
    }

    /// The name of the daemon, which is also the name of its thread.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the application is shutting down.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.signal.is_shutdown()
    }

    /// Waits until the application shuts down or `timeout` has passed.
    /// Returns whether the application is shutting down.
    pub fn await_shutdown(&self, timeout: Duration) -> bool {
        self.signal.await_shutdown(timeout)
    }

    /// Whether the daemon was interrupted by the application stopping. Only
    /// daemons configured with
    /// [`DaemonConfig::interrupt_on_stop`](crate::DaemonConfig::interrupt_on_stop)
    /// are interrupted.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }
}

pub(crate) fn run_daemon(
    context: Svc<DaemonContext>,
    run: TaskInvoker,
    restart_delay: Duration,
) {
    let value: DynSvc = context.clone();
    let operation = [(Key::of::<DaemonContext>(), value)];

    debug!("daemon {} started", context.name());
    while !context.is_shutdown() {
        if let Err(error) = invoke_task(&run, &operation) {
            error!("daemon {} failed: {error}", context.name());
            context.await_shutdown(restart_delay);
        }
    }
    debug!("daemon {} stopped", context.name());
}
