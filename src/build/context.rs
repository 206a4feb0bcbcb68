use crate::BuildError;
use std::thread::{self, ThreadId};

/// State shared by every mutation of one build. A build happens on a single
/// thread: the thread that created the context. Registries and the arena
/// layout check the context before they change.
#[derive(Debug)]
pub struct BuildContext {
    thread: ThreadId,
}

impl BuildContext {
    /// Creates a context owned by the current thread.
    #[must_use]
    pub fn new() -> Self {
        BuildContext {
            thread: thread::current().id(),
        }
    }

    /// The thread the build runs on.
    #[must_use]
    pub fn build_thread(&self) -> ThreadId {
        self.thread
    }

    /// Fails if the current thread is not the build thread.
    pub fn check_build_thread(&self) -> Result<(), BuildError> {
        let actual = thread::current().id();
        if actual == self.thread {
            Ok(())
        } else {
            Err(BuildError::WrongThread {
                expected: self.thread,
                actual,
            })
        }
    }

    /// Asserts that the current thread is the build thread.
    ///
    /// # Panics
    ///
    /// Panics if called from any other thread.
    pub fn assert_build_thread(&self) {
        if let Err(error) = self.check_build_thread() {
            panic!("{}", error);
        }
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        BuildContext::new()
    }
}
