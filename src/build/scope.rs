use derive_more::Display;

/// A place a dependency can be resolved from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum ProviderScope {
    /// Values that only exist while one operation is invoked, such as the
    /// [`DaemonContext`](crate::DaemonContext) of a daemon.
    #[display(fmt = "operation")]
    Operation,
    /// Constants bound to the consuming bean with
    /// [`BeanDefinition::bind_local`](crate::BeanDefinition::bind_local).
    #[display(fmt = "bean")]
    Bean,
    /// Services of the application itself, such as the
    /// [`ApplicationContext`](crate::ApplicationContext).
    #[display(fmt = "context")]
    Context,
    /// The container the consuming bean was installed in.
    #[display(fmt = "container")]
    Container,
    /// The shared namespace of the application, or the namespace of the
    /// extension that installed the consuming bean.
    #[display(fmt = "namespace")]
    Namespace,
}

/// The scopes searched for the dependencies of a bean, in order.
///
/// Every listed scope is searched. If more than one of them provides a key,
/// the dependency is ambiguous and the build fails.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ResolutionOrder {
    scopes: Vec<ProviderScope>,
}

impl ResolutionOrder {
    /// Searches the given scopes. Repeated scopes are only searched once.
    #[must_use]
    pub fn new(scopes: impl IntoIterator<Item = ProviderScope>) -> Self {
        let mut order = Vec::new();
        for scope in scopes {
            if !order.contains(&scope) {
                order.push(scope);
            }
        }
        ResolutionOrder { scopes: order }
    }

    /// The searched scopes.
    #[must_use]
    pub fn scopes(&self) -> &[ProviderScope] {
        &self.scopes
    }
}

impl Default for ResolutionOrder {
    fn default() -> Self {
        ResolutionOrder::new([
            ProviderScope::Operation,
            ProviderScope::Bean,
            ProviderScope::Context,
            ProviderScope::Container,
            ProviderScope::Namespace,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_scopes_are_searched_once() {
        let order = ResolutionOrder::new([
            ProviderScope::Container,
            ProviderScope::Bean,
            ProviderScope::Container,
        ]);
        assert_eq!(
            &[ProviderScope::Container, ProviderScope::Bean],
            order.scopes()
        );
        assert_eq!(5, ResolutionOrder::default().scopes().len());
    }
}
