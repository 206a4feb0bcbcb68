use crate::{
    build::DependencyNode, BuildError, DependencyDescriptor, Key, NodeId,
};
use indexmap::IndexMap;

/// Every dependency on one key that no searched scope could satisfy.
#[derive(Debug)]
pub(crate) struct Requirement {
    key: Key,
    optional: bool,
    failures: Vec<(NodeId, DependencyDescriptor)>,
}

impl Requirement {
    /// Whether every failed dependency may be absent.
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// Collects unresolved dependencies, keyed by the requested key. A
/// requirement is only created once a dependency actually fails.
#[derive(Debug, Default)]
pub(crate) struct RequirementSet {
    requirements: IndexMap<Key, Requirement>,
}

impl RequirementSet {
    pub fn add(&mut self, node: NodeId, descriptor: DependencyDescriptor) {
        let requirement = self
            .requirements
            .entry(descriptor.key())
            .or_insert_with(|| Requirement {
                key: descriptor.key(),
                optional: true,
                failures: Vec::new(),
            });
        requirement.optional &= descriptor.is_optional();
        requirement.failures.push((node, descriptor));
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn get(&self, key: &Key) -> Option<&Requirement> {
        self.requirements.get(key)
    }

    /// Whether the build can go on: every failed dependency was optional.
    pub fn is_satisfied(&self) -> bool {
        self.requirements.values().all(Requirement::is_optional)
    }

    /// Reports one error per consuming operation and required key, marking
    /// every parameter of that key that failed.
    pub fn into_errors(self, nodes: &[DependencyNode]) -> Vec<BuildError> {
        let mut errors = Vec::new();
        for requirement in self.requirements.into_values() {
            if requirement.optional {
                continue;
            }

            let mut consumers: IndexMap<NodeId, Vec<usize>> = IndexMap::new();
            for (node, descriptor) in &requirement.failures {
                if !descriptor.is_optional() {
                    consumers
                        .entry(*node)
                        .or_default()
                        .push(descriptor.index());
                }
            }

            for (node, marked) in consumers {
                let Some(node) = nodes.get(node.index()) else {
                    continue;
                };
                errors.push(BuildError::UnresolvedDependency {
                    key: requirement.key,
                    bean: node.site().owner(),
                    consumer: node.signature(&marked),
                    site: node.declared_at(),
                });
            }
        }
        errors
    }
}
