use crate::{
    build::{
        BeanEntry, ContainerEntry, DependencyNode, NamespaceEntry, Producer,
        ProviderRef, RequirementSet,
    },
    BuildError, Home, Key, NamespaceId, NodeId, ProviderLocation,
    ProviderScope, Realm, ServiceRegistry, SlotIndex,
};
use indexmap::IndexMap;
use log::debug;

/// Read-only view of every registry of an assembly.
pub(crate) struct Scopes<'a> {
    pub containers: &'a [ContainerEntry],
    pub namespaces: &'a [NamespaceEntry],
    pub beans: &'a [BeanEntry],
    pub context: &'a IndexMap<Key, SlotIndex>,
}

impl Scopes<'_> {
    pub fn registry(&self, location: ProviderLocation) -> Option<&ServiceRegistry> {
        match location {
            ProviderLocation::Container(id) => {
                self.containers.get(id.index()).map(|entry| &entry.registry)
            }
            ProviderLocation::Namespace(id) => {
                self.namespaces.get(id.index()).map(|entry| &entry.registry)
            }
            ProviderLocation::Bean(id) => {
                self.beans.get(id.index()).map(|entry| &entry.locals)
            }
        }
    }

    pub fn describe(&self, location: ProviderLocation) -> String {
        match location {
            ProviderLocation::Container(id) => match self.containers.get(id.index()) {
                Some(entry) => format!("container {}", entry.name),
                None => format!("container #{}", id.index()),
            },
            ProviderLocation::Namespace(id) => match self.namespaces.get(id.index()) {
                Some(entry) => format!("namespace {}", entry.name),
                None => format!("namespace #{}", id.index()),
            },
            ProviderLocation::Bean(id) => match self.beans.get(id.index()) {
                Some(entry) => format!("bean {}", entry.key),
                None => format!("bean #{}", id.index()),
            },
        }
    }
}

/// Resolves the dependency nodes of one realm: the assembly itself or one
/// extension.
pub(crate) struct Authority {
    realm: Realm,
    namespace: NamespaceId,
}

impl Authority {
    pub fn new(realm: Realm, namespace: NamespaceId) -> Self {
        Authority { realm, namespace }
    }

    /// Resolves every node of this realm in declaration order. Nodes that
    /// become fully resolved and write to the arena are appended to
    /// `writers`. Ambiguous dependencies are reported to `errors`; missing
    /// ones are returned as requirements.
    pub fn resolve(
        &self,
        scopes: &Scopes<'_>,
        nodes: &mut [DependencyNode],
        writers: &mut Vec<NodeId>,
        errors: &mut Vec<BuildError>,
    ) -> RequirementSet {
        let mut requirements = RequirementSet::default();
        let mut resolved = 0;
        for node in nodes.iter_mut().filter(|node| node.realm() == self.realm) {
            let Some(bean) = scopes.beans.get(node.bean().index()) else {
                continue;
            };

            let descriptors = node.dependencies().to_vec();
            for descriptor in descriptors {
                let key = descriptor.key();
                let candidates = self.candidates(scopes, node, bean, key);
                match candidates.as_slice() {
                    [] => {
                        requirements.add(node.id(), descriptor);
                        if descriptor.is_optional() {
                            node.set_producer(descriptor.index(), Producer::Absent);
                        }
                    }
                    [(_, producer)] => {
                        node.set_producer(descriptor.index(), *producer);
                    }
                    _ => errors.push(BuildError::AmbiguousDependency {
                        key,
                        consumer: node.signature(&[descriptor.index()]),
                        scopes: candidates.iter().map(|(scope, _)| *scope).collect(),
                    }),
                }
            }

            if node.is_fully_resolved() {
                resolved += 1;
                if node.on_all_dependencies_resolved() {
                    writers.push(node.id());
                }
            }
        }

        debug!(
            "resolved {resolved} operations of {:?}, {} keys unresolved",
            self.realm,
            requirements.len()
        );
        requirements
    }

    /// Finds every searched scope able to provide `key` to `node`.
    fn candidates(
        &self,
        scopes: &Scopes<'_>,
        node: &DependencyNode,
        bean: &BeanEntry,
        key: Key,
    ) -> Vec<(ProviderScope, Producer)> {
        let provider = |location: ProviderLocation| {
            scopes
                .registry(location)
                .filter(|registry| registry.contains(&key))
                .map(|_| Producer::Provider(ProviderRef { location, key }))
        };

        let mut candidates = Vec::new();
        for &scope in bean.search.scopes() {
            let producer = match scope {
                ProviderScope::Operation => node
                    .operation_keys()
                    .contains(&key)
                    .then_some(Producer::Operation(key)),
                ProviderScope::Bean => {
                    provider(ProviderLocation::Bean(node.bean()))
                }
                ProviderScope::Context => {
                    scopes.context.get(&key).map(|slot| Producer::Context(*slot))
                }
                ProviderScope::Container => match bean.home {
                    Home::Container(container) => {
                        provider(ProviderLocation::Container(container))
                    }
                    Home::Namespace(_) => None,
                },
                ProviderScope::Namespace => {
                    provider(ProviderLocation::Namespace(self.namespace))
                }
            };
            if let Some(producer) = producer {
                candidates.push((scope, producer));
            }
        }
        candidates
    }
}
