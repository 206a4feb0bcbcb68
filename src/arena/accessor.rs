use crate::{
    DynSvc, InjectError, InjectResult, Key, LifetimeArena, Service,
    ServiceInfo, SlotIndex, Svc,
};
use std::{
    fmt::{Debug, Formatter},
    marker::PhantomData,
};

/// A typed handle to a reserved arena slot.
pub struct Accessor<T: Service> {
    slot: SlotIndex,
    key: Key,
    marker: PhantomData<fn() -> T>,
}

impl<T: Service> Accessor<T> {
    pub(crate) fn new(slot: SlotIndex, key: Key) -> Self {
        Accessor {
            slot,
            key,
            marker: PhantomData,
        }
    }

    /// The slot this accessor reads and writes.
    #[must_use]
    pub fn slot(&self) -> SlotIndex {
        self.slot
    }

    /// Reads the service stored in the slot.
    pub fn read(&self, arena: &LifetimeArena) -> InjectResult<Svc<T>> {
        arena
            .read(self.slot)?
            .downcast_arc::<T>()
            .map_err(|_| InjectError::TypeMismatch {
                key: self.key,
                expected: ServiceInfo::of::<T>(),
            })
    }

    /// Stores a service in the slot.
    pub fn store(
        &self,
        arena: &LifetimeArena,
        value: Svc<T>,
    ) -> InjectResult<()> {
        let value: DynSvc = value;
        arena.store(self.slot, Some(value))
    }
}

impl<T: Service> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        Accessor::new(self.slot, self.key)
    }
}

impl<T: Service> Copy for Accessor<T> {}

impl<T: Service> Debug for Accessor<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor")
            .field("slot", &self.slot)
            .field("key", &self.key)
            .finish()
    }
}
