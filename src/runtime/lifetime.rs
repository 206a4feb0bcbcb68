use crate::InjectError;
use derive_more::Display;
use parking_lot::{Condvar, Mutex};
use std::{
    error::Error,
    fmt::{Display as FmtDisplay, Formatter},
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// The lifecycle state of an application. States only ever move forward.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display,
)]
#[repr(u8)]
pub enum LifetimeState {
    /// The application was created but its arena was not written yet.
    #[display(fmt = "UNINITIALIZED")]
    Uninitialized = 0,
    /// The arena is being written.
    #[display(fmt = "INITIALIZING")]
    Initializing = 1,
    /// Every singleton was created.
    #[display(fmt = "INITIALIZED")]
    Initialized = 2,
    /// Start hooks and the entry point are running.
    #[display(fmt = "STARTING")]
    Starting = 3,
    /// The application runs its tasks.
    #[display(fmt = "RUNNING")]
    Running = 4,
    /// Tasks are being stopped and stop hooks are running.
    #[display(fmt = "SHUTDOWN")]
    Shutdown = 5,
    /// The application stopped, or failed to launch.
    #[display(fmt = "TERMINATED")]
    Terminated = 6,
}

impl LifetimeState {
    /// The position of the state in the lifecycle.
    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    fn from_ordinal(ordinal: u8) -> Self {
        match ordinal {
            0 => LifetimeState::Uninitialized,
            1 => LifetimeState::Initializing,
            2 => LifetimeState::Initialized,
            3 => LifetimeState::Starting,
            4 => LifetimeState::Running,
            5 => LifetimeState::Shutdown,
            _ => LifetimeState::Terminated,
        }
    }
}

/// An error raised by the lifecycle of an application.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum LifetimeError {
    /// The operation is not allowed in the current state, for example
    /// starting an application that was never initialized.
    IllegalState {
        /// The operation that was attempted.
        operation: &'static str,

        /// The state the application was in.
        state: LifetimeState,
    },

    /// The application failed while launching. Its arena was discarded and it
    /// was terminated.
    LaunchFailed {
        /// The last state the application reached before it failed.
        reached: LifetimeState,

        /// The error that made the launch fail.
        cause: Arc<InjectError>,
    },
}

impl Error for LifetimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LifetimeError::LaunchFailed { cause, .. } => Some(cause.as_ref()),
            LifetimeError::IllegalState { .. } => None,
        }
    }
}

impl FmtDisplay for LifetimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LifetimeError::IllegalState { operation, state } => write!(
                f,
                "cannot {operation} an application that is {state}"
            ),
            LifetimeError::LaunchFailed { reached, cause } => write!(
                f,
                "the application failed after reaching {reached}: {cause}"
            ),
        }
    }
}

/// What a call to stop has to do.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum StopAction {
    /// The application is running and now shutting down.
    Stop,
    /// The application never started; it is now shutting down.
    Idle,
    /// The application is starting and stops once it runs.
    Deferred,
    /// The application already stopped or is stopping.
    Done,
}

#[derive(Default)]
struct Control {
    failure: Option<(LifetimeState, Arc<InjectError>)>,
    stop_requested: bool,
}

/// Drives the lifecycle of one application.
///
/// The state can be read without locking. Every transition happens under the
/// controller's lock and wakes every thread waiting for a state.
pub struct ManagedLifetimeController {
    state: AtomicU8,
    control: Mutex<Control>,
    changed: Condvar,
}

impl ManagedLifetimeController {
    pub(crate) fn new() -> Self {
        ManagedLifetimeController {
            state: AtomicU8::new(LifetimeState::Uninitialized.ordinal()),
            control: Mutex::new(Control::default()),
            changed: Condvar::new(),
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> LifetimeState {
        LifetimeState::from_ordinal(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: LifetimeState) {
        self.state.store(state.ordinal(), Ordering::Release);
        self.changed.notify_all();
    }

    /// The launch failure, if the application failed.
    #[must_use]
    pub fn failure(&self) -> Option<LifetimeError> {
        let control = self.control.lock();
        control
            .failure
            .as_ref()
            .map(|(reached, cause)| LifetimeError::LaunchFailed {
                reached: *reached,
                cause: cause.clone(),
            })
    }

    pub(crate) fn transition(
        &self,
        operation: &'static str,
        from: LifetimeState,
        to: LifetimeState,
    ) -> Result<(), LifetimeError> {
        let _control = self.control.lock();
        let state = self.state();
        if state != from {
            return Err(LifetimeError::IllegalState { operation, state });
        }
        self.set_state(to);
        Ok(())
    }

    /// Records a launch failure and terminates the controller.
    pub(crate) fn fail(&self, cause: InjectError) -> LifetimeError {
        let mut control = self.control.lock();
        let reached = match &control.failure {
            Some((reached, _)) => *reached,
            None => self.state(),
        };
        let cause = Arc::new(cause);
        control.failure = Some((reached, cause.clone()));
        self.set_state(LifetimeState::Terminated);
        LifetimeError::LaunchFailed { reached, cause }
    }

    pub(crate) fn begin_stop(&self) -> Result<StopAction, LifetimeError> {
        let mut control = self.control.lock();
        match self.state() {
            state @ (LifetimeState::Uninitialized | LifetimeState::Initializing) => {
                Err(LifetimeError::IllegalState {
                    operation: "stop",
                    state,
                })
            }
            LifetimeState::Initialized => {
                self.set_state(LifetimeState::Shutdown);
                Ok(StopAction::Idle)
            }
            LifetimeState::Starting => {
                control.stop_requested = true;
                Ok(StopAction::Deferred)
            }
            LifetimeState::Running => {
                self.set_state(LifetimeState::Shutdown);
                Ok(StopAction::Stop)
            }
            LifetimeState::Shutdown | LifetimeState::Terminated => {
                Ok(StopAction::Done)
            }
        }
    }

    /// Whether a stop was requested while the application was starting.
    pub(crate) fn take_stop_request(&self) -> bool {
        std::mem::take(&mut self.control.lock().stop_requested)
    }

    fn failed_before(
        control: &Control,
        target: LifetimeState,
    ) -> Option<LifetimeError> {
        control
            .failure
            .as_ref()
            .filter(|(reached, _)| target > *reached)
            .map(|(reached, cause)| LifetimeError::LaunchFailed {
                reached: *reached,
                cause: cause.clone(),
            })
    }

    /// Blocks until the state is at least `target`. Fails if the application
    /// failed before reaching `target`.
    pub fn await_state(
        &self,
        target: LifetimeState,
    ) -> Result<(), LifetimeError> {
        let mut control = self.control.lock();
        loop {
            if let Some(error) = Self::failed_before(&control, target) {
                return Err(error);
            }
            if self.state() >= target {
                return Ok(());
            }
            self.changed.wait(&mut control);
        }
    }

    /// Blocks until the state is at least `target` or until `timeout` has
    /// passed. Returns whether `target` was reached.
    pub fn await_state_timeout(
        &self,
        target: LifetimeState,
        timeout: Duration,
    ) -> Result<bool, LifetimeError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.await_state(target).map(|()| true);
        };

        let mut control = self.control.lock();
        loop {
            if let Some(error) = Self::failed_before(&control, target) {
                return Err(error);
            }
            if self.state() >= target {
                return Ok(true);
            }
            if self.changed.wait_until(&mut control, deadline).timed_out() {
                if let Some(error) = Self::failed_before(&control, target) {
                    return Err(error);
                }
                return Ok(self.state() >= target);
            }
        }
    }
}

impl Default for ManagedLifetimeController {
    fn default() -> Self {
        ManagedLifetimeController::new()
    }
}
