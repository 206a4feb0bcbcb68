use crate::{
    beans::{Invoker, OperationKind},
    build::{DependencyNode, Producer, ProviderRef, Scopes},
    BuildError, DynSvc, Key, MemberSite, NodeId, ProviderLocation,
    ServiceProvider, SlotIndex,
};
use std::panic::Location;

/// Where the value of a dependency comes from once the application runs.
#[derive(Clone)]
pub(crate) enum Binding {
    Constant(DynSvc),
    Slot(SlotIndex),
    Prototype(NodeId),
    Operation(Key),
    Absent,
}

#[derive(Clone)]
pub(crate) struct CompiledArgument {
    pub key: Key,
    pub binding: Binding,
    pub optional: bool,
    pub deferred: bool,
}

/// A dependency node with every dependency bound, ready to be invoked.
pub(crate) struct CompiledNode {
    pub kind: OperationKind,
    pub site: MemberSite,
    pub declared_at: &'static Location<'static>,
    pub receiver: Option<SlotIndex>,
    pub arguments: Vec<CompiledArgument>,
    pub invoker: Invoker,
    pub slot: Option<SlotIndex>,
}

impl CompiledNode {
    /// Slots read before the node can be invoked, not counting slots read by
    /// prototypes it invokes.
    pub fn direct_reads(&self) -> impl Iterator<Item = SlotIndex> + '_ {
        self.receiver.into_iter().chain(
            self.arguments
                .iter()
                .filter(|argument| !argument.deferred)
                .filter_map(|argument| match argument.binding {
                    Binding::Slot(slot) => Some(slot),
                    _ => None,
                }),
        )
    }

    /// Prototypes invoked before the node can be invoked.
    pub fn eager_prototypes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.arguments
            .iter()
            .filter(|argument| !argument.deferred)
            .filter_map(|argument| match argument.binding {
                Binding::Prototype(node) => Some(node),
                _ => None,
            })
    }
}

/// Turns resolved producers into bindings by following delegating
/// providers to the registry that actually provides the key.
pub(crate) struct Linker<'a> {
    scopes: &'a Scopes<'a>,
    nodes: &'a [DependencyNode],
}

impl<'a> Linker<'a> {
    pub fn new(scopes: &'a Scopes<'a>, nodes: &'a [DependencyNode]) -> Self {
        Linker { scopes, nodes }
    }

    pub fn provider_binding(
        &self,
        provider: ProviderRef,
    ) -> Result<Binding, BuildError> {
        let key = provider.key;
        let mut location = provider.location;
        let mut visited: Vec<ProviderLocation> = Vec::new();
        let mut forwarded_from: Option<(ProviderLocation, &'static Location<'static>)> =
            None;

        loop {
            if visited.contains(&location) {
                let (from, site) = forwarded_from.unwrap_or((location, Location::caller()));
                return Err(BuildError::InvalidDelegation {
                    key,
                    scope: self.scopes.describe(from),
                    reason: "the forwarding providers form a loop",
                    site,
                });
            }
            visited.push(location);

            let registration = self
                .scopes
                .registry(location)
                .and_then(|registry| registry.registration(&key));
            let Some(registration) = registration else {
                let (from, site) = forwarded_from.unwrap_or((location, Location::caller()));
                return Err(BuildError::InvalidDelegation {
                    key,
                    scope: self.scopes.describe(from),
                    reason: "the target scope has no provider for the key",
                    site,
                });
            };

            let binding = match &registration.provider {
                ServiceProvider::Constant(value) => Binding::Constant(value.clone()),
                ServiceProvider::BeanInstance(bean) => {
                    let Some(entry) = self.scopes.beans.get(bean.index()) else {
                        return Err(self.dangling(key, location, registration.site));
                    };
                    match entry.slot {
                        Some(slot) => Binding::Slot(slot),
                        None => Binding::Prototype(entry.constructor),
                    }
                }
                ServiceProvider::BeanMember(node) => {
                    let Some(entry) = self.nodes.get(node.index()) else {
                        return Err(self.dangling(key, location, registration.site));
                    };
                    match entry.slot() {
                        Some(slot) => Binding::Slot(slot),
                        None => Binding::Prototype(*node),
                    }
                }
                ServiceProvider::Delegating(target) => {
                    forwarded_from = Some((location, registration.site));
                    location = *target;
                    continue;
                }
            };
            break Ok(binding);
        }
    }

    fn dangling(
        &self,
        key: Key,
        location: ProviderLocation,
        site: &'static Location<'static>,
    ) -> BuildError {
        BuildError::InvalidDelegation {
            key,
            scope: self.scopes.describe(location),
            reason: "the provider refers to an unknown bean",
            site,
        }
    }

    /// Binds every dependency of a resolved node.
    pub fn arguments(
        &self,
        node: &DependencyNode,
    ) -> Result<Vec<CompiledArgument>, BuildError> {
        node.dependencies()
            .iter()
            .zip(node.producers())
            .map(|(descriptor, producer)| {
                let binding = match producer {
                    Some(Producer::Provider(provider)) => {
                        self.provider_binding(provider)?
                    }
                    Some(Producer::Operation(key)) => Binding::Operation(key),
                    Some(Producer::Context(slot)) => Binding::Slot(slot),
                    Some(Producer::Absent) => Binding::Absent,
                    None => {
                        return Err(BuildError::UnresolvedDependency {
                            key: descriptor.key(),
                            bean: node.site().owner(),
                            consumer: node.signature(&[descriptor.index()]),
                            site: node.declared_at(),
                        })
                    }
                };
                Ok(CompiledArgument {
                    key: descriptor.key(),
                    binding,
                    optional: descriptor.is_optional(),
                    deferred: descriptor.dependency().is_deferred(),
                })
            })
            .collect()
    }

    /// The slot holding the bean that owns `node`, if the node needs it.
    pub fn receiver(&self, node: &DependencyNode) -> Option<SlotIndex> {
        if !node.has_receiver() {
            return None;
        }
        self.scopes
            .beans
            .get(node.bean().index())
            .and_then(|bean| bean.slot)
    }
}
