use crate::{
    beans::{LocalConstant, OperationDefinition, OperationKind},
    build::{
        order_writers, Authority, DependencyNode, Linker, ProviderRef, Scopes,
    },
    ApplicationConfig, ApplicationContext, ApplicationImage, ArenaLayout,
    BeanDefinition, BeanId, BeanLifetime, BuildContext, BuildError,
    BuildFailure, ConstantProvider, ContainerId, ContainerSetup,
    EntryPointResult, Extension, ExtensionId, Home, ImageData, Key,
    NamespaceId, NamespaceSetup, NodeId, ProviderLocation,
    Realm, ResolutionOrder, ScopeView, Service, ServiceInfo, ServiceProvider,
    ServiceRegistry, SlotIndex, SlotKind, Svc,
};
use indexmap::IndexMap;
use log::debug;
use std::panic::Location;

pub(crate) struct ContainerEntry {
    pub name: String,
    pub parent: Option<ContainerId>,
    pub registry: ServiceRegistry,
}

pub(crate) struct NamespaceEntry {
    pub name: String,
    pub registry: ServiceRegistry,
}

pub(crate) struct BeanEntry {
    pub key: Key,
    pub home: Home,
    pub locals: ServiceRegistry,
    pub search: ResolutionOrder,
    pub constructor: NodeId,
    pub slot: Option<SlotIndex>,
}

struct ExtensionEntry {
    info: ServiceInfo,
    namespace: NamespaceId,
    extension: Svc<dyn Extension>,
    containers: Vec<ContainerId>,
}

/// Collects the beans, services and extensions of an application. Every
/// problem found along the way is collected, and reported all at once by
/// [`Assembly::build`].
///
/// An assembly is built on the thread that created it. Changing it from any
/// other thread panics.
pub struct Assembly {
    cx: BuildContext,
    name: String,
    config: ApplicationConfig,
    containers: Vec<ContainerEntry>,
    namespaces: Vec<NamespaceEntry>,
    beans: Vec<BeanEntry>,
    nodes: Vec<DependencyNode>,
    extensions: Vec<ExtensionEntry>,
    layout: ArenaLayout,
    context: IndexMap<Key, SlotIndex>,
    context_slot: SlotIndex,
    entry_point: Option<NodeId>,
    errors: Vec<BuildError>,
}

impl Assembly {
    /// Creates an empty assembly for the application `name`. The assembly
    /// starts with a root container and a shared namespace.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let cx = BuildContext::new();
        let mut layout = ArenaLayout::default();
        let context_key = Key::of::<ApplicationContext>();
        let context_slot = layout.reserve(&cx, context_key, SlotKind::Constant);
        let mut context = IndexMap::new();
        context.insert(context_key, context_slot);

        Assembly {
            cx,
            containers: vec![ContainerEntry {
                name: name.clone(),
                parent: None,
                registry: ServiceRegistry::default(),
            }],
            namespaces: vec![NamespaceEntry {
                name: name.clone(),
                registry: ServiceRegistry::default(),
            }],
            name,
            config: ApplicationConfig::default(),
            beans: Vec::new(),
            nodes: Vec::new(),
            extensions: Vec::new(),
            layout,
            context,
            context_slot,
            entry_point: None,
            errors: Vec::new(),
        }
    }

    /// The name of the application.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The build context of this assembly.
    #[must_use]
    pub fn context(&self) -> &BuildContext {
        &self.cx
    }

    /// Replaces the configuration of the application.
    pub fn set_config(&mut self, config: ApplicationConfig) {
        self.cx.assert_build_thread();
        self.config = config;
    }

    /// The root container.
    #[must_use]
    pub fn root(&self) -> ContainerId {
        ContainerId(0)
    }

    /// The namespace shared by every container of the application.
    #[must_use]
    pub fn shared_namespace(&self) -> NamespaceId {
        NamespaceId(0)
    }

    /// Adds a child container to `parent`.
    pub fn container(
        &mut self,
        name: impl Into<String>,
        parent: ContainerId,
    ) -> ContainerId {
        self.cx.assert_build_thread();
        self.containers.push(ContainerEntry {
            name: name.into(),
            parent: Some(parent),
            registry: ServiceRegistry::default(),
        });
        ContainerId(self.containers.len() - 1)
    }

    /// Installs a bean into the root container.
    #[track_caller]
    pub fn install<T: Service>(&mut self, bean: BeanDefinition<T>) -> BeanId {
        let root = self.root();
        self.install_bean(
            Home::Container(root),
            Realm::Assembly,
            bean,
            Location::caller(),
        )
    }

    /// Installs a bean into a container.
    #[track_caller]
    pub fn install_in<T: Service>(
        &mut self,
        container: ContainerId,
        bean: BeanDefinition<T>,
    ) -> BeanId {
        self.install_bean(
            Home::Container(container),
            Realm::Assembly,
            bean,
            Location::caller(),
        )
    }

    /// Installs a bean into the shared namespace, where beans of every
    /// container can see it.
    #[track_caller]
    pub fn install_shared<T: Service>(
        &mut self,
        bean: BeanDefinition<T>,
    ) -> BeanId {
        let shared = self.shared_namespace();
        self.install_bean(
            Home::Namespace(shared),
            Realm::Assembly,
            bean,
            Location::caller(),
        )
    }

    /// Registers a constant in the root container.
    #[track_caller]
    pub fn provide<T: Service>(
        &mut self,
        constant: ConstantProvider<T>,
    ) {
        let root = self.root();
        self.provide_constant(
            Home::Container(root),
            constant,
            Location::caller(),
        );
    }

    /// Registers a constant in a container.
    #[track_caller]
    pub fn provide_in<T: Service>(
        &mut self,
        container: ContainerId,
        constant: ConstantProvider<T>,
    ) {
        self.provide_constant(
            Home::Container(container),
            constant,
            Location::caller(),
        );
    }

    /// Registers a constant in the shared namespace.
    #[track_caller]
    pub fn provide_shared<T: Service>(
        &mut self,
        constant: ConstantProvider<T>,
    ) {
        let shared = self.shared_namespace();
        self.provide_constant(
            Home::Namespace(shared),
            constant,
            Location::caller(),
        );
    }

    /// Makes a service of `from` available in its parent container.
    #[track_caller]
    pub fn export<T: Service>(&mut self, from: ContainerId) {
        self.export_key(from, Key::of::<T>());
    }

    /// Makes the service registered under `key` in `from` available in its
    /// parent container.
    #[track_caller]
    pub fn export_key(&mut self, from: ContainerId, key: Key) {
        let site = Location::caller();
        if let Some(parent) = self.parent_of(from, key, site) {
            self.register(
                Home::Container(parent),
                key,
                ServiceProvider::Delegating(ProviderLocation::Container(from)),
                site,
            );
        }
    }

    /// Makes a service of the parent of `into` available in `into`.
    #[track_caller]
    pub fn import<T: Service>(&mut self, into: ContainerId) {
        self.import_key(into, Key::of::<T>());
    }

    /// Makes the service registered under `key` in the parent of `into`
    /// available in `into`.
    #[track_caller]
    pub fn import_key(&mut self, into: ContainerId, key: Key) {
        let site = Location::caller();
        if let Some(parent) = self.parent_of(into, key, site) {
            self.register(
                Home::Container(into),
                key,
                ServiceProvider::Delegating(ProviderLocation::Container(parent)),
                site,
            );
        }
    }

    fn parent_of(
        &mut self,
        container: ContainerId,
        key: Key,
        site: &'static Location<'static>,
    ) -> Option<ContainerId> {
        let entry = self.containers.get(container.index());
        let parent = entry.and_then(|entry| entry.parent);
        if parent.is_none() {
            self.errors.push(BuildError::InvalidDelegation {
                key,
                scope: entry.map_or_else(
                    || format!("container #{}", container.index()),
                    |entry| format!("container {}", entry.name),
                ),
                reason: "the container has no parent",
                site,
            });
        }
        parent
    }

    /// Uses an extension in a container. The first use of an extension type
    /// configures its namespace; later instances of the same type are
    /// dropped in favour of the first one. Using an extension twice in the
    /// same container attaches it once.
    pub fn use_extension<E: Extension>(
        &mut self,
        container: ContainerId,
        extension: E,
    ) -> ExtensionId {
        self.cx.assert_build_thread();
        let info = ServiceInfo::of::<E>();
        let id = match self.extensions.iter().position(|entry| entry.info == info) {
            Some(index) => ExtensionId(index),
            None => {
                let namespace = NamespaceId(self.namespaces.len());
                self.namespaces.push(NamespaceEntry {
                    name: info.to_string(),
                    registry: ServiceRegistry::default(),
                });
                let id = ExtensionId(self.extensions.len());
                let extension: Svc<dyn Extension> = Svc::new(extension);
                self.extensions.push(ExtensionEntry {
                    info,
                    namespace,
                    extension: extension.clone(),
                    containers: Vec::new(),
                });

                debug!("configuring extension {info} for application {}", self.name);
                extension.configure(&mut NamespaceSetup {
                    assembly: self,
                    extension: id,
                    namespace,
                });
                id
            }
        };

        let entry = &mut self.extensions[id.index()];
        if entry.containers.contains(&container) {
            return id;
        }
        entry.containers.push(container);
        let namespace = entry.namespace;
        let extension = entry.extension.clone();
        extension.attach(&mut ContainerSetup {
            assembly: self,
            extension: id,
            namespace,
            container,
        });
        id
    }

    pub(crate) fn register(
        &mut self,
        home: Home,
        key: Key,
        provider: ServiceProvider,
        site: &'static Location<'static>,
    ) {
        let registry = match home {
            Home::Container(id) => {
                self.containers.get_mut(id.index()).map(|entry| &mut entry.registry)
            }
            Home::Namespace(id) => {
                self.namespaces.get_mut(id.index()).map(|entry| &mut entry.registry)
            }
        };
        match registry {
            Some(registry) => registry.register(&self.cx, key, provider, site),
            None => self.errors.push(BuildError::InvalidDelegation {
                key,
                scope: format!("{home:?}"),
                reason: "the scope does not exist",
                site,
            }),
        }
    }

    pub(crate) fn provide_constant<T: Service>(
        &mut self,
        home: Home,
        constant: ConstantProvider<T>,
        site: &'static Location<'static>,
    ) {
        let (key, value) = constant.into_parts();
        self.register(home, key, ServiceProvider::Constant(value), site);
    }

    pub(crate) fn install_bean<T: Service>(
        &mut self,
        home: Home,
        realm: Realm,
        definition: BeanDefinition<T>,
        site: &'static Location<'static>,
    ) -> BeanId {
        self.cx.assert_build_thread();
        let BeanDefinition {
            key,
            lifetime,
            constructor,
            members,
            locals,
            search,
            ..
        } = definition;

        let bean = BeanId(self.beans.len());
        let slot = match lifetime {
            BeanLifetime::Singleton => {
                Some(self.layout.reserve(&self.cx, key, SlotKind::Constant))
            }
            BeanLifetime::Prototype => None,
        };
        let constructor = self.push_node(bean, realm, constructor, slot);

        let mut local_registry = ServiceRegistry::default();
        for LocalConstant {
            key,
            value,
            declared_at,
        } in locals
        {
            local_registry.register(
                &self.cx,
                key,
                ServiceProvider::Constant(value),
                declared_at,
            );
        }

        self.beans.push(BeanEntry {
            key,
            home,
            locals: local_registry,
            search,
            constructor,
            slot,
        });
        self.register(home, key, ServiceProvider::BeanInstance(bean), site);

        for member in members {
            if lifetime == BeanLifetime::Prototype {
                self.errors.push(BuildError::InvalidOperation {
                    bean: key.service(),
                    operation: member.site.to_string(),
                    reason: "prototype beans cannot declare operations",
                    site: member.declared_at,
                });
                continue;
            }

            match member.kind {
                OperationKind::Provides {
                    key: provided,
                    constant,
                } => {
                    let slot = constant.then(|| {
                        self.layout.reserve(&self.cx, provided, SlotKind::Constant)
                    });
                    let declared_at = member.declared_at;
                    let node = self.push_node(bean, realm, member, slot);
                    self.register(
                        home,
                        provided,
                        ServiceProvider::BeanMember(node),
                        declared_at,
                    );
                }
                OperationKind::EntryPoint if self.entry_point.is_some() => {
                    self.errors.push(BuildError::InvalidOperation {
                        bean: key.service(),
                        operation: member.site.to_string(),
                        reason: "an application has at most one entry point",
                        site: member.declared_at,
                    });
                }
                OperationKind::EntryPoint => {
                    let node = self.push_node(bean, realm, member, None);
                    self.entry_point = Some(node);
                }
                _ => {
                    self.push_node(bean, realm, member, None);
                }
            }
        }

        bean
    }

    fn push_node(
        &mut self,
        bean: BeanId,
        realm: Realm,
        operation: OperationDefinition,
        slot: Option<SlotIndex>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(DependencyNode::new(id, bean, realm, operation, slot));
        id
    }

    /// Resolves every dependency, lays out the arena and orders its writers.
    /// Fails with every problem found if any dependency is missing,
    /// ambiguous or cyclic, or if any key is provided twice in one scope.
    pub fn build(self) -> Result<ApplicationImage, BuildFailure> {
        let Assembly {
            cx,
            name,
            config,
            containers,
            namespaces,
            beans,
            mut nodes,
            extensions,
            mut layout,
            context,
            context_slot,
            entry_point,
            mut errors,
        } = self;

        if let Err(error) = cx.check_build_thread() {
            errors.push(error);
            return Err(BuildFailure::new(name, errors));
        }

        debug!(
            "building application {name}: {} containers, {} beans, {} operations",
            containers.len(),
            beans.len(),
            nodes.len()
        );
        let entry_slot = layout.reserve(
            &cx,
            Key::of::<EntryPointResult>(),
            SlotKind::Mutable,
        );

        for container in &containers {
            for (key, sites) in container.registry.duplicates() {
                errors.push(BuildError::DuplicateProvider {
                    key,
                    scope: format!("container {}", container.name),
                    sites,
                });
            }
        }
        for namespace in &namespaces {
            for (key, sites) in namespace.registry.duplicates() {
                errors.push(BuildError::DuplicateProvider {
                    key,
                    scope: format!("namespace {}", namespace.name),
                    sites,
                });
            }
        }
        for bean in &beans {
            for (key, sites) in bean.locals.duplicates() {
                errors.push(BuildError::DuplicateProvider {
                    key,
                    scope: format!("bean {}", bean.key),
                    sites,
                });
            }
        }

        let scopes = Scopes {
            containers: &containers,
            namespaces: &namespaces,
            beans: &beans,
            context: &context,
        };

        let authorities = std::iter::once(Authority::new(
            Realm::Assembly,
            NamespaceId(0),
        ))
        .chain(extensions.iter().enumerate().map(|(index, extension)| {
            Authority::new(Realm::Extension(ExtensionId(index)), extension.namespace)
        }));
        let mut writers = Vec::new();
        for authority in authorities {
            let requirements =
                authority.resolve(&scopes, &mut nodes, &mut writers, &mut errors);
            if !requirements.is_satisfied() {
                errors.extend(requirements.into_errors(&nodes));
            }
        }
        if !errors.is_empty() {
            return Err(BuildFailure::new(name, errors));
        }
        writers.sort_unstable();

        let linker = Linker::new(&scopes, &nodes);
        let mut linked = Vec::with_capacity(nodes.len());
        for node in &nodes {
            match linker.arguments(node) {
                Ok(arguments) => linked.push((linker.receiver(node), arguments)),
                Err(error) => errors.push(error),
            }
        }

        let mut view = |location: ProviderLocation, registry: &ServiceRegistry| {
            let mut providers = IndexMap::new();
            for (key, registration) in registry.iter() {
                let binding = linker.provider_binding(ProviderRef {
                    location,
                    key: *key,
                });
                match binding {
                    Ok(binding) => {
                        providers.insert(*key, (registration.provider.kind(), binding));
                    }
                    Err(error) => errors.push(error),
                }
            }
            providers
        };
        let container_views: Vec<ScopeView> = containers
            .iter()
            .enumerate()
            .map(|(index, container)| ScopeView {
                name: container.name.clone(),
                providers: view(
                    ProviderLocation::Container(ContainerId(index)),
                    &container.registry,
                ),
            })
            .collect();
        let shared_view = ScopeView {
            name: namespaces[0].name.clone(),
            providers: view(
                ProviderLocation::Namespace(NamespaceId(0)),
                &namespaces[0].registry,
            ),
        };
        if !errors.is_empty() {
            return Err(BuildFailure::new(name, errors));
        }

        let compiled: Vec<_> = nodes
            .into_iter()
            .zip(linked)
            .map(|(node, (receiver, arguments))| node.compile(receiver, arguments))
            .collect();
        let write_order = match order_writers(&compiled, &writers) {
            Ok(order) => order,
            Err(error) => {
                errors.push(error);
                return Err(BuildFailure::new(name, errors));
            }
        };

        let of_kind = |wanted: fn(&OperationKind) -> bool| -> Vec<NodeId> {
            compiled
                .iter()
                .enumerate()
                .filter(|(_, node)| wanted(&node.kind))
                .map(|(index, _)| NodeId(index))
                .collect()
        };
        let start_hooks = of_kind(|kind| matches!(kind, OperationKind::OnStart));
        let stop_hooks = of_kind(|kind| matches!(kind, OperationKind::OnStop));
        let tasks = of_kind(|kind| {
            matches!(kind, OperationKind::Daemon(_) | OperationKind::Scheduled(_))
        });

        debug!(
            "application {name} built: {} slots, {} writers, {} tasks",
            layout.len(),
            write_order.len(),
            tasks.len()
        );
        Ok(ApplicationImage::new(ImageData {
            name,
            config,
            nodes: compiled,
            write_order,
            start_hooks,
            stop_hooks,
            entry_point,
            tasks,
            layout,
            context_slot,
            entry_slot,
            containers: container_views,
            shared: shared_view,
        }))
    }
}
