use crate::{
    build::{Binding, CompiledArgument, CompiledNode},
    runtime::ImageData,
    Argument, Arguments, DeferredProvider, DynSvc, InjectError, InjectResult,
    Key, LifetimeArena, NodeId, Svc,
};
use std::cell::RefCell;

thread_local! {
    /// The nodes being invoked on this thread, innermost last. Suppliers
    /// resolve on whatever thread calls them, so a cycle through suppliers
    /// shows up here as the same node entered twice.
    static INVOKING: RefCell<Vec<(*const ImageData, NodeId)>> =
        RefCell::new(Vec::new());
}

struct Invoking;

impl Drop for Invoking {
    fn drop(&mut self) {
        INVOKING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Invokes compiled nodes against a live arena.
pub(crate) struct Evaluator<'a> {
    image: &'a Svc<ImageData>,
    arena: &'a Svc<LifetimeArena>,
    operation: &'a [(Key, DynSvc)],
}

impl<'a> Evaluator<'a> {
    pub fn new(
        image: &'a Svc<ImageData>,
        arena: &'a Svc<LifetimeArena>,
        operation: &'a [(Key, DynSvc)],
    ) -> Self {
        Evaluator {
            image,
            arena,
            operation,
        }
    }

    fn node(&self, node: NodeId) -> InjectResult<&'a CompiledNode> {
        let image: &'a ImageData = self.image;
        image.nodes.get(node.index()).ok_or_else(|| {
            InjectError::InternalError(format!("unknown node {}", node.index()))
        })
    }

    /// Invokes a node and returns what it produced.
    pub fn invoke(&self, node: NodeId) -> InjectResult<Option<DynSvc>> {
        let compiled = self.node(node)?;
        let entry = (Svc::as_ptr(self.image), node);
        let cycle = INVOKING.with(|stack| {
            let stack = stack.borrow();
            stack
                .iter()
                .position(|invoking| *invoking == entry)
                .map(|start| {
                    stack[start..].iter().map(|&(_, id)| id).collect::<Vec<_>>()
                })
        });
        if let Some(path) = cycle {
            let mut cycle: Vec<String> = path
                .into_iter()
                .filter_map(|id| self.node(id).ok())
                .map(|node| node.site.to_string())
                .collect();
            cycle.push(compiled.site.to_string());
            return Err(InjectError::CycleDetected { cycle });
        }

        INVOKING.with(|stack| stack.borrow_mut().push(entry));
        let _invoking = Invoking;
        self.invoke_compiled(compiled)
    }

    fn invoke_compiled(
        &self,
        compiled: &CompiledNode,
    ) -> InjectResult<Option<DynSvc>> {
        let receiver = compiled
            .receiver
            .map(|slot| self.arena.read(slot))
            .transpose()?;
        let arguments = compiled
            .arguments
            .iter()
            .map(|argument| self.argument(argument))
            .collect::<InjectResult<Vec<_>>>()?;

        (compiled.invoker)(receiver.as_ref(), &mut Arguments::new(arguments))
    }

    /// Invokes a node that writes the arena, storing what it produced.
    pub fn write(&self, node: NodeId) -> InjectResult<()> {
        let compiled = self.node(node)?;
        let output = self.invoke(node)?;
        match compiled.slot {
            Some(slot) => self.arena.store(slot, output),
            None => Ok(()),
        }
    }

    /// Resolves a binding. Absent bindings and prototypes that produced
    /// nothing resolve to `None`.
    pub fn resolve(&self, binding: &Binding) -> InjectResult<Option<DynSvc>> {
        match binding {
            Binding::Constant(value) => Ok(Some(value.clone())),
            Binding::Slot(slot) => self.arena.read(*slot).map(Some),
            Binding::Prototype(node) => self.invoke(*node),
            Binding::Operation(key) => Ok(self
                .operation
                .iter()
                .find(|(candidate, _)| candidate == key)
                .map(|(_, value)| value.clone())),
            Binding::Absent => Ok(None),
        }
    }

    /// Resolves a binding that must produce a value.
    pub fn require(&self, binding: &Binding, key: Key) -> InjectResult<DynSvc> {
        match self.resolve(binding)? {
            Some(value) => Ok(value),
            None => Err(self.missing(binding, key)),
        }
    }

    fn missing(&self, binding: &Binding, key: Key) -> InjectError {
        match binding {
            Binding::Prototype(node) => InjectError::NullInstance {
                site: self
                    .node(*node)
                    .map_or_else(|_| key.to_string(), |node| node.site.to_string()),
            },
            _ => InjectError::MissingService { key },
        }
    }

    fn argument(&self, argument: &CompiledArgument) -> InjectResult<Argument> {
        if argument.deferred {
            return Ok(Argument::Deferred(self.deferred(argument)));
        }

        match self.resolve(&argument.binding)? {
            Some(value) => Ok(Argument::Value(value)),
            None if argument.optional => Ok(Argument::Absent),
            None => Err(self.missing(&argument.binding, argument.key)),
        }
    }

    fn deferred(&self, argument: &CompiledArgument) -> DeferredProvider {
        let image = self.image.clone();
        let arena = Svc::downgrade(self.arena);
        let binding = argument.binding.clone();
        let key = argument.key;
        Svc::new(move || {
            let arena = arena.upgrade().ok_or(InjectError::NotInitialized)?;
            Evaluator::new(&image, &arena, &[]).require(&binding, key)
        })
    }
}
