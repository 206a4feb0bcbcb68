use crate::{Key, ProviderScope, ServiceInfo};
use std::{
    error::Error,
    fmt::{Display, Formatter},
    panic::Location,
    thread::ThreadId,
};

/// A problem found while building an application.
#[derive(Debug)]
#[non_exhaustive]
pub enum BuildError {
    /// More than one provider was registered for a key in the same scope.
    DuplicateProvider {
        /// The key that was registered more than once.
        key: Key,

        /// The scope the providers were registered in.
        scope: String,

        /// Every place the key was registered, in registration order.
        sites: Vec<&'static Location<'static>>,
    },

    /// A required dependency has no provider in any searched scope.
    UnresolvedDependency {
        /// The key that could not be resolved.
        key: Key,

        /// The bean declaring the consuming operation.
        bean: ServiceInfo,

        /// The consuming operation, with the unresolved parameters marked.
        consumer: String,

        /// Where the consuming operation was declared.
        site: &'static Location<'static>,
    },

    /// More than one searched scope provides a dependency.
    AmbiguousDependency {
        /// The key that was resolved.
        key: Key,

        /// The consuming operation.
        consumer: String,

        /// Every scope that provides the key.
        scopes: Vec<ProviderScope>,
    },

    /// Singletons depend on each other.
    DependencyCycle {
        /// The operations in the cycle. The first operation depends on the
        /// second, and so on; the last operation is the first one again.
        cycle: Vec<String>,
    },

    /// An exported or imported service cannot be forwarded.
    InvalidDelegation {
        /// The forwarded key.
        key: Key,

        /// The scope the forwarding provider was registered in.
        scope: String,

        /// Why the service cannot be forwarded.
        reason: &'static str,

        /// Where the forwarding provider was registered.
        site: &'static Location<'static>,
    },

    /// An operation was declared where it is not allowed.
    InvalidOperation {
        /// The bean declaring the operation.
        bean: ServiceInfo,

        /// The operation.
        operation: String,

        /// Why the operation is not allowed.
        reason: &'static str,

        /// Where the operation was declared.
        site: &'static Location<'static>,
    },

    /// The build was changed from a thread other than the one that started
    /// it.
    WrongThread {
        /// The thread that started the build.
        expected: ThreadId,

        /// The thread that tried to change the build.
        actual: ThreadId,
    },
}

impl Error for BuildError {}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::DuplicateProvider { key, scope, sites } => {
                write!(f, "{key} has {} providers in {scope}:", sites.len())?;
                for site in sites {
                    write!(f, " {site}")?;
                }
                Ok(())
            }
            BuildError::UnresolvedDependency {
                key,
                bean,
                consumer,
                site,
            } => write!(
                f,
                "{consumer} requires {key}, which has no provider (bean {bean}, declared at {site})"
            ),
            BuildError::AmbiguousDependency {
                key,
                consumer,
                scopes,
            } => {
                let scopes: Vec<_> =
                    scopes.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "{consumer} requires {key}, which is provided by more than one scope [{}]",
                    scopes.join(", ")
                )
            }
            BuildError::DependencyCycle { cycle } => write!(
                f,
                "a cycle was detected between singletons [{}]",
                cycle.join(" -> ")
            ),
            BuildError::InvalidDelegation {
                key,
                scope,
                reason,
                site,
            } => write!(
                f,
                "{key} cannot be forwarded from {scope} ({site}): {reason}"
            ),
            BuildError::InvalidOperation {
                bean,
                operation,
                reason,
                site,
            } => write!(
                f,
                "{operation} cannot be declared on {bean} ({site}): {reason}"
            ),
            BuildError::WrongThread { expected, actual } => write!(
                f,
                "the build was changed from {actual:?}, but it runs on {expected:?}"
            ),
        }
    }
}

/// Every problem found while building an application. No application can be
/// created from a failed build.
#[derive(Debug)]
pub struct BuildFailure {
    application: String,
    errors: Vec<BuildError>,
}

impl BuildFailure {
    pub(crate) fn new(application: String, errors: Vec<BuildError>) -> Self {
        BuildFailure {
            application,
            errors,
        }
    }

    /// The name of the application that failed to build.
    #[must_use]
    pub fn application(&self) -> &str {
        &self.application
    }

    /// The problems, in the order they were found.
    #[must_use]
    pub fn errors(&self) -> &[BuildError] {
        &self.errors
    }

    /// Takes the problems.
    #[must_use]
    pub fn into_errors(self) -> Vec<BuildError> {
        self.errors
    }
}

impl Error for BuildFailure {}

impl Display for BuildFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "application {} failed to build with {} error(s)",
            self.application,
            self.errors.len()
        )?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}
