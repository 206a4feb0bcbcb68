use crate::{BeanId, ContainerId, DynSvc, NamespaceId, NodeId};
use derive_more::Display;
use std::panic::Location;

/// The registry a provider lives in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum ProviderLocation {
    Container(ContainerId),
    Namespace(NamespaceId),
    Bean(BeanId),
}

/// Something able to supply a value for a key.
#[derive(Clone)]
pub(crate) enum ServiceProvider {
    /// An eagerly available value. Always resolvable.
    Constant(DynSvc),
    /// The instance of a bean: its pool slot for singletons, a fresh instance
    /// per request for prototypes.
    BeanInstance(BeanId),
    /// A producing member of another bean.
    BeanMember(NodeId),
    /// Forwards to the provider for the same key in another registry.
    Delegating(ProviderLocation),
}

impl ServiceProvider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ServiceProvider::Constant(_) => ProviderKind::Constant,
            ServiceProvider::BeanInstance(_) => ProviderKind::BeanInstance,
            ServiceProvider::BeanMember(_) => ProviderKind::BeanMember,
            ServiceProvider::Delegating(_) => ProviderKind::Delegating,
        }
    }
}

/// The kind of provider registered for a key, as seen from outside the build.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum ProviderKind {
    /// A constant value.
    #[display(fmt = "constant")]
    Constant,
    /// A bean instance.
    #[display(fmt = "bean instance")]
    BeanInstance,
    /// A producing member of a bean.
    #[display(fmt = "bean member")]
    BeanMember,
    /// An exported or imported service of another registry.
    #[display(fmt = "delegating")]
    Delegating,
}

/// A provider together with the place it was declared.
#[derive(Clone)]
pub(crate) struct Registration {
    pub provider: ServiceProvider,
    pub site: &'static Location<'static>,
}
