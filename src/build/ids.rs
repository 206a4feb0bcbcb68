macro_rules! define_id {
    ($($(#[$attr:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$attr])*
            #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
            pub struct $name(pub(crate) usize);

            impl $name {
                /// Gets the position of this entry in the order it was
                /// declared.
                #[inline]
                #[must_use]
                pub fn index(self) -> usize {
                    self.0
                }
            }
        )*
    };
}

define_id!(
    /// Identifies a container in the container tree of an assembly.
    ContainerId,
    /// Identifies a namespace registry (the application namespace or an
    /// extension namespace).
    NamespaceId,
    /// Identifies an installed bean.
    BeanId,
    /// Identifies a dependency node (a constructor or member operation).
    NodeId,
    /// Identifies an installed extension.
    ExtensionId,
);

/// The registry a bean or provider was declared in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum Home {
    Container(ContainerId),
    Namespace(NamespaceId),
}

/// The authority that owns a dependency node and resolves it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum Realm {
    Assembly,
    Extension(ExtensionId),
}
