use crate::Key;
use downcast_rs::{impl_downcast, DowncastSync};
use std::{
    any::{Any, TypeId},
    error::Error,
    fmt::{Display, Formatter},
};

/// A reference-counted pointer holding a service. Services are shared between
/// the build thread, the launching thread and every task thread, so the
/// pointer is always an [`Arc<T>`](std::sync::Arc).
pub type Svc<T> = std::sync::Arc<T>;

/// A service pointer holding an instance of `dyn Service`.
pub type DynSvc = Svc<dyn Service>;

/// A boxed error returned by user code (fallible factories, hooks, tasks).
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Implemented automatically on types that are capable of being a service.
pub trait Service: DowncastSync {}
impl<T: ?Sized + DowncastSync> Service for T {}

impl_downcast!(sync Service);

/// A result from attempting to inject dependencies into a service and
/// construct an instance of it.
pub type InjectResult<T> = Result<T, InjectError>;

/// Type information about a service.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct ServiceInfo {
    id: TypeId,
    name: &'static str,
}

impl ServiceInfo {
    /// Creates a [`ServiceInfo`] for the given type.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ServiceInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Gets the [`TypeId`] for this service.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Gets the full type name of this service.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Gets the type name of this service with every module path removed,
    /// for example `Arc<Config>` rather than `alloc::sync::Arc<app::Config>`.
    #[must_use]
    pub fn short_name(&self) -> String {
        short_type_name(self.name)
    }
}

impl Display for ServiceInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.short_name())
    }
}

/// Strips module paths from every path segment of a type name.
pub(crate) fn short_type_name(name: &str) -> String {
    let mut short = String::with_capacity(name.len());
    let mut segment = String::new();
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            c if c.is_alphanumeric() || c == '_' => segment.push(c),
            other => {
                short.push_str(&segment);
                segment.clear();
                short.push(other);
            }
        }
    }
    short.push_str(&segment);
    short
}

/// An error that has occurred while running the compiled bean graph of an
/// application.
#[derive(Debug)]
#[non_exhaustive]
pub enum InjectError {
    /// No service is registered for the requested key.
    MissingService {
        /// The key that was requested.
        key: Key,
    },

    /// A value was produced for a key, but it had a different type than the
    /// one requested.
    TypeMismatch {
        /// The key that was requested.
        key: Key,

        /// The type the caller expected.
        expected: ServiceInfo,
    },

    /// An arena slot was read before its writer ran.
    SlotNotWritten {
        /// The index of the slot.
        slot: usize,

        /// The key the slot was reserved for.
        key: Key,
    },

    /// A write-once arena slot was written a second time.
    SlotAlreadyWritten {
        /// The index of the slot.
        slot: usize,

        /// The key the slot was reserved for.
        key: Key,
    },

    /// An arena slot holding a constant was replaced as if it were mutable.
    SlotNotMutable {
        /// The index of the slot.
        slot: usize,

        /// The key the slot was reserved for.
        key: Key,
    },

    /// A factory bound to a constant slot produced no value.
    NullConstant {
        /// The key the slot was reserved for.
        key: Key,
    },

    /// A prototype factory produced no value for a required dependency.
    NullInstance {
        /// The operation that produced no value.
        site: String,
    },

    /// A cycle was detected while invoking prototype operations.
    CycleDetected {
        /// The chain of operations that were invoked, ending with the
        /// operation that was invoked a second time.
        cycle: Vec<String>,
    },

    /// An error occurred inside a factory, hook or task operation.
    ActivationFailed {
        /// The operation that failed.
        site: String,

        /// The error returned by the operation.
        inner: BoxError,
    },

    /// The application has not been initialized, or its arena was discarded
    /// after a failed launch.
    NotInitialized,

    /// A task thread could not be spawned.
    TaskSpawnFailed {
        /// The name of the task.
        name: String,

        /// The error reported by the operating system.
        inner: std::io::Error,
    },

    /// An unexpected error has occurred. This is usually caused by a bug in
    /// the library itself.
    InternalError(String),
}

impl Error for InjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InjectError::ActivationFailed { inner, .. } => Some(inner.as_ref()),
            InjectError::TaskSpawnFailed { inner, .. } => Some(inner),
            _ => None,
        }
    }
}

impl Display for InjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "an error occurred during injection: ")?;
        match self {
            InjectError::MissingService { key } => {
                write!(f, "{key} has no provider")
            }
            InjectError::TypeMismatch { key, expected } => write!(
                f,
                "the value provided for {key} is not a {}",
                expected.name()
            ),
            InjectError::SlotNotWritten { slot, key } => write!(
                f,
                "arena slot {slot} ({key}) was read before it was written"
            ),
            InjectError::SlotAlreadyWritten { slot, key } => write!(
                f,
                "arena slot {slot} ({key}) holds a constant and was already written"
            ),
            InjectError::SlotNotMutable { slot, key } => write!(
                f,
                "arena slot {slot} ({key}) holds a constant and cannot be replaced"
            ),
            InjectError::NullConstant { key } => {
                write!(f, "the factory for constant {key} produced no value")
            }
            InjectError::NullInstance { site } => {
                write!(f, "{site} produced no value")
            }
            InjectError::CycleDetected { cycle } => write!(
                f,
                "a cycle was detected during activation [{}]",
                cycle.join(" -> ")
            ),
            InjectError::ActivationFailed { site, .. } => {
                write!(f, "an error occurred during activation of {site}")
            }
            InjectError::NotInitialized => {
                write!(f, "the application has not been initialized")
            }
            InjectError::TaskSpawnFailed { name, .. } => {
                write!(f, "the thread for task {name} could not be spawned")
            }
            InjectError::InternalError(message) => {
                write!(f, "an unexpected error occurred: {message}")
            }
        }
    }
}
