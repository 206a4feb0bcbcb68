use crate::{
    Dependency, DynSvc, InjectError, InjectResult, Key, Qualifier, Service,
    ServiceInfo, Svc,
};
use std::{
    fmt::{Debug, Formatter},
    marker::PhantomData,
    ops::Deref,
};

/// Resolves a deferred dependency each time it is called.
pub type DeferredProvider =
    Svc<dyn Fn() -> InjectResult<DynSvc> + Send + Sync>;

/// The value bound to one dependency when its consumer is invoked.
#[derive(Clone)]
pub enum Argument {
    /// The resolved service.
    Value(DynSvc),
    /// An optional dependency with no provider.
    Absent,
    /// A dependency that is resolved on demand.
    Deferred(DeferredProvider),
}

impl Argument {
    /// Converts this argument into a service pointer of the requested type.
    pub fn into_service<T: Service>(self, key: Key) -> InjectResult<Svc<T>> {
        let value = match self {
            Argument::Value(value) => value,
            Argument::Deferred(provide) => provide()?,
            Argument::Absent => return Err(InjectError::MissingService { key }),
        };

        value
            .downcast_arc::<T>()
            .map_err(|_| InjectError::TypeMismatch {
                key,
                expected: ServiceInfo::of::<T>(),
            })
    }
}

impl Debug for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Argument::Value(_) => f.write_str("Value(..)"),
            Argument::Absent => f.write_str("Absent"),
            Argument::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A parameter type that can be injected into a constructor or member
/// operation. The implementation both declares the dependency (at build time)
/// and extracts the value bound to it (at invocation time).
///
/// - [`Svc<T>`]: a required service.
/// - `Option<Svc<T>>`: an optional service, `None` when nothing provides it.
/// - [`Qualified<Q, T>`]: a required service registered under qualifier `Q`.
/// - `Option<Qualified<Q, T>>`: the optional form of the above.
/// - [`Supplier<T>`]: a required service resolved each time it is requested.
pub trait Inject: Sized + 'static {
    /// Declares the dependency.
    fn dependency() -> Dependency;

    /// Extracts the bound value.
    fn extract(argument: Argument) -> InjectResult<Self>;
}

impl<T: Service> Inject for Svc<T> {
    fn dependency() -> Dependency {
        Dependency::required(Key::of::<T>())
    }

    fn extract(argument: Argument) -> InjectResult<Self> {
        argument.into_service(Key::of::<T>())
    }
}

impl<T: Service> Inject for Option<Svc<T>> {
    fn dependency() -> Dependency {
        Dependency::optional(Key::of::<T>())
    }

    fn extract(argument: Argument) -> InjectResult<Self> {
        match argument {
            Argument::Absent => Ok(None),
            argument => argument.into_service(Key::of::<T>()).map(Some),
        }
    }
}

/// A service registered under the qualifier `Q`. Dereferences to the
/// service itself.
pub struct Qualified<Q: Qualifier, T: Service> {
    service: Svc<T>,
    marker: PhantomData<fn() -> Q>,
}

impl<Q: Qualifier, T: Service> Qualified<Q, T> {
    /// The key this parameter requests.
    #[must_use]
    pub fn key() -> Key {
        Key::qualified::<T, Q>()
    }

    /// Gets the service pointer.
    #[must_use]
    pub fn into_inner(self) -> Svc<T> {
        self.service
    }
}

impl<Q: Qualifier, T: Service> Clone for Qualified<Q, T> {
    fn clone(&self) -> Self {
        Qualified {
            service: self.service.clone(),
            marker: PhantomData,
        }
    }
}

impl<Q: Qualifier, T: Service> Deref for Qualified<Q, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.service
    }
}

impl<Q: Qualifier, T: Service> Inject for Qualified<Q, T> {
    fn dependency() -> Dependency {
        Dependency::required(Self::key())
    }

    fn extract(argument: Argument) -> InjectResult<Self> {
        Ok(Qualified {
            service: argument.into_service(Self::key())?,
            marker: PhantomData,
        })
    }
}

impl<Q: Qualifier, T: Service> Inject for Option<Qualified<Q, T>> {
    fn dependency() -> Dependency {
        Dependency::optional(Qualified::<Q, T>::key())
    }

    fn extract(argument: Argument) -> InjectResult<Self> {
        match argument {
            Argument::Absent => Ok(None),
            argument => Qualified::extract(argument).map(Some),
        }
    }
}

/// A handle that resolves a service each time [`Supplier::get`] is called.
/// A supplier does not force its service to exist before the consumer, which
/// lets prototypes refer to each other.
pub struct Supplier<T: Service> {
    provide: DeferredProvider,
    marker: PhantomData<fn() -> T>,
}

impl<T: Service> Supplier<T> {
    /// Resolves the service. Prototype services are created anew on every
    /// call.
    pub fn get(&self) -> InjectResult<Svc<T>> {
        Argument::Deferred(self.provide.clone()).into_service(Key::of::<T>())
    }
}

impl<T: Service> Clone for Supplier<T> {
    fn clone(&self) -> Self {
        Supplier {
            provide: self.provide.clone(),
            marker: PhantomData,
        }
    }
}

impl<T: Service> Inject for Supplier<T> {
    fn dependency() -> Dependency {
        Dependency::required(Key::of::<T>()).deferred()
    }

    fn extract(argument: Argument) -> InjectResult<Self> {
        let provide: DeferredProvider = match argument {
            Argument::Deferred(provide) => provide,
            Argument::Value(value) => Svc::new(move || Ok(value.clone())),
            Argument::Absent => {
                return Err(InjectError::MissingService {
                    key: Key::of::<T>(),
                })
            }
        };
        Ok(Supplier {
            provide,
            marker: PhantomData,
        })
    }
}
