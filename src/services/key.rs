use crate::ServiceInfo;
use std::{
    any::Any,
    fmt::{Display, Formatter},
};

/// A marker type that distinguishes two services of the same type, such as a
/// `Left` and a `Right` connection pool.
///
/// ```
/// use bean_injector::{Key, Qualifier};
///
/// struct Left;
/// impl Qualifier for Left {}
///
/// struct Pool;
///
/// assert_ne!(Key::of::<Pool>(), Key::qualified::<Pool, Left>());
/// assert_eq!("@Left Pool", Key::qualified::<Pool, Left>().to_string());
/// ```
pub trait Qualifier: 'static {}

/// The identity of a requestable service: a type plus an optional qualifier.
/// Two keys are equal if and only if both their type and their qualifier
/// match.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Key {
    service: ServiceInfo,
    qualifier: Option<ServiceInfo>,
}

impl Key {
    /// Creates an unqualified key for the given type.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        Key {
            service: ServiceInfo::of::<T>(),
            qualifier: None,
        }
    }

    /// Creates a key for the given type qualified by `Q`.
    #[inline]
    #[must_use]
    pub fn qualified<T: ?Sized + Any, Q: Qualifier>() -> Self {
        Key::of::<T>().with_qualifier::<Q>()
    }

    /// Replaces the qualifier of this key.
    #[inline]
    #[must_use]
    pub fn with_qualifier<Q: Qualifier>(self) -> Self {
        Key {
            qualifier: Some(ServiceInfo::of::<Q>()),
            ..self
        }
    }

    /// Gets the type of the service this key identifies.
    #[inline]
    #[must_use]
    pub fn service(&self) -> ServiceInfo {
        self.service
    }

    /// Gets the qualifier of this key, if any.
    #[inline]
    #[must_use]
    pub fn qualifier(&self) -> Option<ServiceInfo> {
        self.qualifier
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(qualifier) = self.qualifier {
            write!(f, "@{qualifier} ")?;
        }
        write!(f, "{}", self.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Left;
    impl Qualifier for Left {}

    struct Right;
    impl Qualifier for Right {}

    struct Pool;

    #[test]
    fn keys_compare_type_and_qualifier() {
        assert_eq!(Key::of::<Pool>(), Key::of::<Pool>());
        assert_eq!(
            Key::qualified::<Pool, Left>(),
            Key::of::<Pool>().with_qualifier::<Left>()
        );
        assert_ne!(Key::qualified::<Pool, Left>(), Key::qualified::<Pool, Right>());
        assert_ne!(Key::of::<Pool>(), Key::of::<u8>());

        let keys: HashSet<_> = [
            Key::of::<Pool>(),
            Key::qualified::<Pool, Left>(),
            Key::qualified::<Pool, Left>(),
        ]
        .into_iter()
        .collect();
        assert_eq!(2, keys.len());
    }
}
