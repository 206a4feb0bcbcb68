use crate::ThreadKind;
use std::time::Duration;

/// Settings of an application that are not expressed as beans.
///
/// ```
/// use bean_injector::{ApplicationConfig, ThreadKind};
/// use std::time::Duration;
///
/// let config = ApplicationConfig::default()
///     .with_default_thread_kind(ThreadKind::Virtual)
///     .with_daemon_restart_delay(Duration::from_millis(250));
///
/// assert_eq!(ThreadKind::Virtual, config.default_thread_kind());
/// ```
#[derive(Clone, Debug)]
pub struct ApplicationConfig {
    default_thread_kind: ThreadKind,
    daemon_restart_delay: Duration,
    virtual_stack_size: usize,
}

impl ApplicationConfig {
    /// The thread kind of tasks that do not choose one.
    #[must_use]
    pub fn default_thread_kind(&self) -> ThreadKind {
        self.default_thread_kind
    }

    /// Changes the thread kind of tasks that do not choose one.
    #[must_use]
    pub fn with_default_thread_kind(mut self, thread_kind: ThreadKind) -> Self {
        self.default_thread_kind = thread_kind;
        self
    }

    /// How long a daemon waits before it is invoked again after a failure.
    #[must_use]
    pub fn daemon_restart_delay(&self) -> Duration {
        self.daemon_restart_delay
    }

    /// Changes how long a daemon waits after a failure.
    #[must_use]
    pub fn with_daemon_restart_delay(mut self, delay: Duration) -> Self {
        self.daemon_restart_delay = delay;
        self
    }

    /// The stack size, in bytes, of [`ThreadKind::Virtual`] threads.
    #[must_use]
    pub fn virtual_stack_size(&self) -> usize {
        self.virtual_stack_size
    }

    /// Changes the stack size of [`ThreadKind::Virtual`] threads.
    #[must_use]
    pub fn with_virtual_stack_size(mut self, bytes: usize) -> Self {
        self.virtual_stack_size = bytes;
        self
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        ApplicationConfig {
            default_thread_kind: ThreadKind::Platform,
            daemon_restart_delay: Duration::from_secs(1),
            virtual_stack_size: 256 * 1024,
        }
    }
}
