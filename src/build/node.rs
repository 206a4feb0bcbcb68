use crate::{
    beans::{Invoker, OperationDefinition, OperationKind},
    build::{CompiledArgument, CompiledNode},
    BeanId, DaemonContext, DependencyDescriptor, Key, MemberSite, NodeId,
    ProviderLocation, Realm, ScheduledContext, SlotIndex,
};
use std::panic::Location;

/// A provider found for one dependency, before delegation is followed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct ProviderRef {
    pub location: ProviderLocation,
    pub key: Key,
}

/// What a dependency was resolved to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum Producer {
    Provider(ProviderRef),
    Operation(Key),
    Context(SlotIndex),
    Absent,
}

/// A consumer (a bean constructor or a member operation) together with its
/// dependencies and whatever each of them has been resolved to so far.
pub(crate) struct DependencyNode {
    id: NodeId,
    bean: BeanId,
    realm: Realm,
    kind: OperationKind,
    site: MemberSite,
    descriptors: Vec<DependencyDescriptor>,
    producers: Vec<Option<Producer>>,
    invoker: Invoker,
    receiver: bool,
    slot: Option<SlotIndex>,
    declared_at: &'static Location<'static>,
    resolved: bool,
}

impl DependencyNode {
    pub fn new(
        id: NodeId,
        bean: BeanId,
        realm: Realm,
        operation: OperationDefinition,
        slot: Option<SlotIndex>,
    ) -> Self {
        let OperationDefinition {
            kind,
            site,
            dependencies,
            invoker,
            receiver,
            declared_at,
        } = operation;
        let descriptors: Vec<_> = dependencies
            .into_iter()
            .enumerate()
            .map(|(index, dependency)| {
                DependencyDescriptor::new(dependency, index, site.kind())
            })
            .collect();
        let producers = vec![None; descriptors.len()];

        DependencyNode {
            id,
            bean,
            realm,
            kind,
            site,
            descriptors,
            producers,
            invoker,
            receiver,
            slot,
            declared_at,
            resolved: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn bean(&self) -> BeanId {
        self.bean
    }

    pub fn realm(&self) -> Realm {
        self.realm
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    pub fn site(&self) -> &MemberSite {
        &self.site
    }

    pub fn declared_at(&self) -> &'static Location<'static> {
        self.declared_at
    }

    pub fn dependencies(&self) -> &[DependencyDescriptor] {
        &self.descriptors
    }

    pub fn producers(&self) -> impl Iterator<Item = Option<Producer>> + '_ {
        self.producers.iter().copied()
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Whether the invoker takes the owning bean as its first input.
    pub fn has_receiver(&self) -> bool {
        self.receiver
    }

    /// The arena slot the result of this node is stored in.
    pub fn slot(&self) -> Option<SlotIndex> {
        self.slot
    }

    /// Keys that only exist while this node's operation is invoked.
    pub fn operation_keys(&self) -> Vec<Key> {
        match self.kind {
            OperationKind::Daemon(_) => vec![Key::of::<DaemonContext>()],
            OperationKind::Scheduled(_) => vec![Key::of::<ScheduledContext>()],
            _ => Vec::new(),
        }
    }

    pub fn set_producer(&mut self, index: usize, producer: Producer) {
        if let Some(slot) = self.producers.get_mut(index) {
            *slot = Some(producer);
        }
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.producers.iter().all(Option::is_some)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Seals the node. Returns whether it writes to the arena while the
    /// application initializes.
    pub fn on_all_dependencies_resolved(&mut self) -> bool {
        self.resolved = true;
        self.is_writer()
    }

    /// Whether the node runs while the application initializes: singleton
    /// constructors, constant producers and field injectors.
    pub fn is_writer(&self) -> bool {
        self.slot.is_some() || matches!(self.kind, OperationKind::InjectField)
    }

    /// Renders the operation, marking the parameters at `marked`.
    pub fn signature(&self, marked: &[usize]) -> String {
        self.site.signature(&self.descriptors, marked)
    }

    pub fn compile(
        self,
        receiver: Option<SlotIndex>,
        arguments: Vec<CompiledArgument>,
    ) -> CompiledNode {
        CompiledNode {
            kind: self.kind,
            site: self.site,
            declared_at: self.declared_at,
            receiver,
            arguments,
            invoker: self.invoker,
            slot: self.slot,
        }
    }
}
