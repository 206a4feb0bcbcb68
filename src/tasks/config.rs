use derive_more::Display;
use std::time::Duration;

/// The kind of thread a daemon or scheduled operation runs on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum ThreadKind {
    /// An operating system thread with the default stack size.
    #[display(fmt = "platform")]
    Platform,
    /// A lightweight thread with a small fixed stack, see
    /// [`ApplicationConfig::with_virtual_stack_size`](crate::ApplicationConfig::with_virtual_stack_size).
    #[display(fmt = "virtual")]
    Virtual,
}

/// Configures a daemon operation.
#[derive(Clone, Debug, Default)]
pub struct DaemonConfig {
    pub(crate) name: Option<String>,
    pub(crate) thread_kind: Option<ThreadKind>,
    pub(crate) interrupt_on_stop: bool,
    pub(crate) restart_delay: Option<Duration>,
}

impl DaemonConfig {
    /// Creates a configuration with every setting taken from the
    /// application.
    #[must_use]
    pub fn new() -> Self {
        DaemonConfig::default()
    }

    /// Names the daemon thread. Defaults to the name of the operation.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Runs the daemon on the given kind of thread.
    #[must_use]
    pub fn with_thread_kind(mut self, thread_kind: ThreadKind) -> Self {
        self.thread_kind = Some(thread_kind);
        self
    }

    /// Sets the interrupt flag of the daemon's context and unparks its thread
    /// when the application stops.
    #[must_use]
    pub fn interrupt_on_stop(mut self) -> Self {
        self.interrupt_on_stop = true;
        self
    }

    /// How long to wait before invoking the daemon again after it failed.
    #[must_use]
    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = Some(delay);
        self
    }

    /// Whether the daemon is interrupted on stop.
    #[must_use]
    pub fn interrupts_on_stop(&self) -> bool {
        self.interrupt_on_stop
    }
}

/// Configures a scheduled operation.
#[derive(Clone, Debug)]
pub struct ScheduleConfig {
    pub(crate) name: Option<String>,
    pub(crate) period: Duration,
    pub(crate) initial_delay: Duration,
    pub(crate) thread_kind: Option<ThreadKind>,
}

impl ScheduleConfig {
    /// Runs the operation once per `period`, the first time after one full
    /// period has passed.
    #[must_use]
    pub fn every(period: Duration) -> Self {
        ScheduleConfig {
            name: None,
            period,
            initial_delay: period,
            thread_kind: None,
        }
    }

    /// Changes the delay before the first invocation.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Names the task thread. Defaults to the name of the operation.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Runs the operation on the given kind of thread.
    #[must_use]
    pub fn with_thread_kind(mut self, thread_kind: ThreadKind) -> Self {
        self.thread_kind = Some(thread_kind);
        self
    }

    /// The time between two invocations.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }
}
