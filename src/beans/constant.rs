use crate::{DynSvc, Key, Qualifier, Service, Svc};

/// A value registered as-is. Constants are always resolvable and are never
/// recreated, so state can be stored in them through interior mutability.
pub struct ConstantProvider<T: Service> {
    key: Key,
    value: Svc<T>,
}

impl<T: Service> ConstantProvider<T> {
    /// Creates a new `ConstantProvider` using a predetermined value.
    #[must_use]
    pub fn new(value: T) -> Self {
        ConstantProvider {
            key: Key::of::<T>(),
            value: Svc::new(value),
        }
    }

    /// Registers the value under the qualifier `Q`.
    #[must_use]
    pub fn qualified<Q: Qualifier>(self) -> Self {
        ConstantProvider {
            key: self.key.with_qualifier::<Q>(),
            ..self
        }
    }

    /// The key the value is registered under.
    #[must_use]
    pub fn key(&self) -> Key {
        self.key
    }

    pub(crate) fn into_parts(self) -> (Key, DynSvc) {
        (self.key, self.value)
    }
}

/// Create a service from a constant value.
///
/// # Example
///
/// ```
/// use bean_injector::{constant, Application, Svc};
///
/// let mut assembly = Application::builder("example");
/// assembly.provide(constant(8i32));
///
/// let application = assembly.build().unwrap().launch().unwrap();
/// let value: Svc<i32> = application.get().unwrap();
///
/// assert_eq!(8, *value);
/// ```
#[must_use]
pub fn constant<T: Service>(value: T) -> ConstantProvider<T> {
    ConstantProvider::new(value)
}
