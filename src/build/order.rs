use crate::{
    beans::OperationKind, build::CompiledNode, BuildError, NodeId, SlotIndex,
};
use indexmap::{IndexMap, IndexSet};

/// Orders the arena writers so that every writer runs after the writers of
/// the slots it reads.
///
/// The sweep is stable: it always emits the earliest declared writer whose
/// prerequisites were all emitted, so a writer only moves ahead of an
/// earlier declared one when that one depends on it. Reads through a
/// prototype count as reads of the consumer; deferred dependencies are not
/// reads at all. A bean is only complete once its fields were injected, so
/// readers of a bean also wait for its field injectors.
pub(crate) fn order_writers(
    nodes: &[CompiledNode],
    writers: &[NodeId],
) -> Result<Vec<NodeId>, BuildError> {
    let mut slot_writers: IndexMap<SlotIndex, NodeId> = IndexMap::new();
    let mut field_writers: IndexMap<SlotIndex, Vec<NodeId>> = IndexMap::new();
    for &writer in writers {
        let Some(node) = nodes.get(writer.index()) else {
            continue;
        };
        if let Some(slot) = node.slot {
            slot_writers.insert(slot, writer);
        }
        if let (OperationKind::InjectField, Some(owner)) = (&node.kind, node.receiver) {
            field_writers.entry(owner).or_default().push(writer);
        }
    }

    let prerequisites: IndexMap<NodeId, IndexSet<NodeId>> = writers
        .iter()
        .map(|&writer| {
            let own_fields = match nodes.get(writer.index()) {
                Some(node) if matches!(node.kind, OperationKind::InjectField) => {
                    node.receiver
                }
                _ => None,
            };

            let mut prerequisites = IndexSet::new();
            for slot in eager_reads(nodes, writer) {
                if let Some(&producer) = slot_writers.get(&slot) {
                    prerequisites.insert(producer);
                }
                if own_fields != Some(slot) {
                    if let Some(fields) = field_writers.get(&slot) {
                        prerequisites.extend(fields.iter().copied());
                    }
                }
            }
            (writer, prerequisites)
        })
        .collect();

    let mut pending: Vec<NodeId> = writers.to_vec();
    pending.sort_unstable();
    let mut emitted: IndexSet<NodeId> = IndexSet::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready = pending.iter().position(|writer| {
            prerequisites
                .get(writer)
                .map_or(true, |required| required.iter().all(|r| emitted.contains(r)))
        });

        match ready {
            Some(position) => {
                emitted.insert(pending.remove(position));
            }
            None => {
                return Err(BuildError::DependencyCycle {
                    cycle: find_cycle(nodes, &prerequisites, &pending, &emitted),
                })
            }
        }
    }

    Ok(emitted.into_iter().collect())
}

/// Every slot `writer` reads before it can run, following eager prototype
/// dependencies.
fn eager_reads(nodes: &[CompiledNode], writer: NodeId) -> IndexSet<SlotIndex> {
    let mut reads = IndexSet::new();
    let mut visited = IndexSet::new();
    let mut stack = vec![writer];
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        let Some(node) = nodes.get(current.index()) else {
            continue;
        };
        reads.extend(node.direct_reads());
        stack.extend(node.eager_prototypes());
    }
    reads
}

/// Walks from the first stuck writer along unmet prerequisites until a
/// writer repeats.
fn find_cycle(
    nodes: &[CompiledNode],
    prerequisites: &IndexMap<NodeId, IndexSet<NodeId>>,
    pending: &[NodeId],
    emitted: &IndexSet<NodeId>,
) -> Vec<String> {
    let name = |node: NodeId| {
        nodes
            .get(node.index())
            .map_or_else(|| format!("#{}", node.index()), |node| node.site.to_string())
    };

    let mut path: Vec<NodeId> = Vec::new();
    let mut current = pending.first().copied();
    while let Some(node) = current {
        if let Some(start) = path.iter().position(|visited| *visited == node) {
            let mut cycle: Vec<String> = path[start..].iter().map(|n| name(*n)).collect();
            cycle.push(name(node));
            return cycle;
        }
        path.push(node);
        current = prerequisites
            .get(&node)
            .and_then(|required| required.iter().find(|r| !emitted.contains(*r)).copied());
    }

    path.into_iter().map(name).collect()
}
