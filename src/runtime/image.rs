use crate::{
    build::{Binding, CompiledNode},
    Application, ApplicationConfig, ArenaLayout, ContainerId, Key,
    LifetimeError, MemberSite, NodeId, ProviderKind, SlotIndex, Svc,
};
use indexmap::IndexMap;
use log::debug;
use std::panic::Location;

/// The key of the slot holding the result of the entry point.
pub(crate) struct EntryPointResult;

/// The providers of one registry, with every delegation resolved.
pub(crate) struct ScopeView {
    pub name: String,
    pub providers: IndexMap<Key, (ProviderKind, Binding)>,
}

pub(crate) struct ImageData {
    pub name: String,
    pub config: ApplicationConfig,
    pub nodes: Vec<CompiledNode>,
    pub write_order: Vec<NodeId>,
    pub start_hooks: Vec<NodeId>,
    pub stop_hooks: Vec<NodeId>,
    pub entry_point: Option<NodeId>,
    pub tasks: Vec<NodeId>,
    pub layout: ArenaLayout,
    pub context_slot: SlotIndex,
    pub entry_slot: SlotIndex,
    pub containers: Vec<ScopeView>,
    pub shared: ScopeView,
}

impl ImageData {
    /// Finds the binding of `key` as seen from outside `container`: the
    /// container itself, then the shared namespace.
    pub fn binding(
        &self,
        container: ContainerId,
        key: &Key,
    ) -> Option<(ProviderKind, &Binding)> {
        self.containers
            .get(container.index())?
            .providers
            .get(key)
            .or_else(|| self.shared.providers.get(key))
            .map(|(kind, binding)| (*kind, binding))
    }
}

/// One operation that writes the arena while an application initializes.
#[derive(Clone, Debug)]
pub struct WriterInfo {
    site: MemberSite,
    slot: Option<SlotIndex>,
    key: Option<Key>,
    declared_at: &'static Location<'static>,
}

impl WriterInfo {
    /// The operation.
    #[must_use]
    pub fn site(&self) -> &MemberSite {
        &self.site
    }

    /// The slot the operation writes. Field injectors write no slot.
    #[must_use]
    pub fn slot(&self) -> Option<SlotIndex> {
        self.slot
    }

    /// The key of the written slot.
    #[must_use]
    pub fn key(&self) -> Option<Key> {
        self.key
    }

    /// Where the operation was declared.
    #[must_use]
    pub fn declared_at(&self) -> &'static Location<'static> {
        self.declared_at
    }
}

/// The immutable result of a successful build. An image can create any
/// number of independent applications.
#[derive(Clone)]
pub struct ApplicationImage {
    data: Svc<ImageData>,
}

impl ApplicationImage {
    pub(crate) fn new(data: ImageData) -> Self {
        ApplicationImage {
            data: Svc::new(data),
        }
    }

    /// The name of the application.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// The configuration the application was built with.
    #[must_use]
    pub fn config(&self) -> &ApplicationConfig {
        &self.data.config
    }

    /// Creates an application that has not been initialized yet.
    #[must_use]
    pub fn new_application(&self) -> Application {
        Application::new(self.data.clone())
    }

    /// Creates an application, initializes it and, if it declares an entry
    /// point, starts it.
    pub fn launch(&self) -> Result<Application, LifetimeError> {
        debug!("launching application {}", self.name());
        let application = self.new_application();
        application.initialize()?;
        if self.has_entry_point() {
            application.start()?;
        }
        Ok(application)
    }

    /// The number of slots in the arena of every application.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.data.layout.len()
    }

    /// The operations run while initializing, in the order they run.
    #[must_use]
    pub fn write_order(&self) -> Vec<WriterInfo> {
        self.data
            .write_order
            .iter()
            .filter_map(|node| self.data.nodes.get(node.index()))
            .map(|node| WriterInfo {
                site: node.site.clone(),
                slot: node.slot,
                key: node.slot.and_then(|slot| self.data.layout.key(slot)),
                declared_at: node.declared_at,
            })
            .collect()
    }

    /// The position of the writer of `key` in [`write_order`](Self::write_order).
    #[must_use]
    pub fn writer_position(&self, key: Key) -> Option<usize> {
        self.write_order()
            .iter()
            .position(|writer| writer.key() == Some(key))
    }

    /// The kind of provider registered for `key` in `container`, or else in
    /// the shared namespace.
    #[must_use]
    pub fn provider_kind(
        &self,
        container: ContainerId,
        key: Key,
    ) -> Option<ProviderKind> {
        self.data.binding(container, &key).map(|(kind, _)| kind)
    }

    /// Whether the application declares an entry point.
    #[must_use]
    pub fn has_entry_point(&self) -> bool {
        self.data.entry_point.is_some()
    }

    /// The number of daemons and scheduled operations.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.data.tasks.len()
    }

    /// The name of a container.
    #[must_use]
    pub fn container_name(&self, container: ContainerId) -> Option<&str> {
        self.data
            .containers
            .get(container.index())
            .map(|view| view.name.as_str())
    }
}
