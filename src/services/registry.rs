use crate::{BuildContext, Key, Registration, ServiceProvider};
use indexmap::IndexMap;
use std::{
    fmt::{Debug, Formatter},
    panic::Location,
};

/// Stores the providers of one resolution scope (a container, a namespace or
/// the locals of a bean).
///
/// Every registration is kept, so a key registered twice can be reported
/// with all of its declaration sites. Lookups only ever see the first one.
#[derive(Default)]
pub(crate) struct ServiceRegistry {
    providers: IndexMap<Key, Vec<Registration>>,
}

impl ServiceRegistry {
    pub fn register(
        &mut self,
        cx: &BuildContext,
        key: Key,
        provider: ServiceProvider,
        site: &'static Location<'static>,
    ) {
        cx.assert_build_thread();
        self.providers
            .entry(key)
            .or_default()
            .push(Registration { provider, site });
    }

    pub fn lookup(&self, key: &Key) -> Option<&ServiceProvider> {
        self.registration(key)
            .map(|registration| &registration.provider)
    }

    pub fn registration(&self, key: &Key) -> Option<&Registration> {
        self.providers.get(key).and_then(|registrations| registrations.first())
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.providers.contains_key(key)
    }

    /// Iterates every key that has more than one provider, together with all
    /// of its declaration sites.
    pub fn duplicates(
        &self,
    ) -> impl Iterator<Item = (Key, Vec<&'static Location<'static>>)> + '_ {
        self.providers
            .iter()
            .filter(|(_, registrations)| registrations.len() > 1)
            .map(|(key, registrations)| {
                (*key, registrations.iter().map(|r| r.site).collect())
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Registration)> + '_ {
        self.providers.iter().filter_map(|(key, registrations)| {
            registrations.first().map(|registration| (key, registration))
        })
    }
}

impl Debug for ServiceRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.providers.iter().map(|(key, registrations)| {
                (key.to_string(), format!("<{} providers>", registrations.len()))
            }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DynSvc, ProviderKind, Svc};

    #[test]
    fn second_registration_does_not_overwrite_the_first() {
        let cx = BuildContext::new();
        let mut registry = ServiceRegistry::default();
        let first: DynSvc = Svc::new(1i32);
        let second: DynSvc = Svc::new(2i32);
        registry.register(
            &cx,
            Key::of::<i32>(),
            ServiceProvider::Constant(first),
            Location::caller(),
        );
        registry.register(
            &cx,
            Key::of::<i32>(),
            ServiceProvider::Constant(second),
            Location::caller(),
        );

        match registry.lookup(&Key::of::<i32>()) {
            Some(ServiceProvider::Constant(value)) => {
                assert_eq!(Some(&1), value.downcast_ref::<i32>());
            }
            _ => panic!("expected the first constant"),
        }

        let duplicates: Vec<_> = registry.duplicates().collect();
        assert_eq!(1, duplicates.len());
        assert_eq!(Key::of::<i32>(), duplicates[0].0);
        assert_eq!(2, duplicates[0].1.len());
    }

    #[test]
    fn unique_keys_are_not_duplicates() {
        let cx = BuildContext::new();
        let mut registry = ServiceRegistry::default();
        registry.register(
            &cx,
            Key::of::<i32>(),
            ServiceProvider::Constant(Svc::new(1i32)),
            Location::caller(),
        );
        registry.register(
            &cx,
            Key::of::<u8>(),
            ServiceProvider::Constant(Svc::new(1u8)),
            Location::caller(),
        );

        assert_eq!(0, registry.duplicates().count());
        assert_eq!(2, registry.iter().count());
        assert_eq!(
            Some(ProviderKind::Constant),
            registry.lookup(&Key::of::<u8>()).map(ServiceProvider::kind)
        );
        assert!(registry.lookup(&Key::of::<u16>()).is_none());
    }
}
