use crate::{
    LifetimeError, LifetimeState, ManagedLifetimeController, ShutdownSignal,
    Svc,
};
use std::time::Duration;

/// A view of the running application, injectable into any bean.
pub struct ApplicationContext {
    name: String,
    controller: Svc<ManagedLifetimeController>,
    shutdown: Svc<ShutdownSignal>,
}

impl ApplicationContext {
    pub(crate) fn new(
        name: String,
        controller: Svc<ManagedLifetimeController>,
        shutdown: Svc<ShutdownSignal>,
    ) -> Self {
        ApplicationContext {
            name,
            controller,
            shutdown,
        }
    }

    /// The name of the application.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current state of the application.
    #[must_use]
    pub fn state(&self) -> LifetimeState {
        self.controller.state()
    }

    /// Waits until the application reaches `target` or until `timeout` has
    /// passed.
    pub fn await_state(
        &self,
        target: LifetimeState,
        timeout: Duration,
    ) -> Result<bool, LifetimeError> {
        self.controller.await_state_timeout(target, timeout)
    }

    /// Whether the application is shutting down.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_shutdown()
    }

    /// The signal raised when the application begins to shut down.
    #[must_use]
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }
}
