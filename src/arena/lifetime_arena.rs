use crate::{DynSvc, InjectError, InjectResult, Key, SlotIndex, SlotKind};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::fmt::{Debug, Formatter};

enum Slot {
    Constant { key: Key, value: OnceCell<DynSvc> },
    Mutable { key: Key, value: RwLock<Option<DynSvc>> },
}

impl Slot {
    fn key(&self) -> Key {
        match self {
            Slot::Constant { key, .. } | Slot::Mutable { key, .. } => *key,
        }
    }
}

/// The storage of one application instance: a fixed number of slots, one per
/// singleton and per context service.
///
/// Constant slots are written once while the application initializes and can
/// then be read from any thread without locking.
pub struct LifetimeArena {
    slots: Box<[Slot]>,
}

impl LifetimeArena {
    pub(crate) fn new(layout: &[(Key, SlotKind)]) -> Self {
        let slots = layout
            .iter()
            .map(|&(key, kind)| match kind {
                SlotKind::Constant => Slot::Constant {
                    key,
                    value: OnceCell::new(),
                },
                SlotKind::Mutable => Slot::Mutable {
                    key,
                    value: RwLock::new(None),
                },
            })
            .collect();
        LifetimeArena { slots }
    }

    /// The number of slots in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the arena has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, slot: SlotIndex) -> InjectResult<&Slot> {
        self.slots.get(slot.0).ok_or_else(|| {
            InjectError::InternalError(format!(
                "slot {slot} is outside of an arena of {} slots",
                self.slots.len()
            ))
        })
    }

    /// Whether a value is stored in the slot.
    #[must_use]
    pub fn is_written(&self, slot: SlotIndex) -> bool {
        match self.slots.get(slot.0) {
            Some(Slot::Constant { value, .. }) => value.get().is_some(),
            Some(Slot::Mutable { value, .. }) => value.read().is_some(),
            None => false,
        }
    }

    /// Reads the value stored in the slot.
    pub fn read(&self, slot: SlotIndex) -> InjectResult<DynSvc> {
        let entry = self.slot(slot)?;
        let value = match entry {
            Slot::Constant { value, .. } => value.get().cloned(),
            Slot::Mutable { value, .. } => value.read().clone(),
        };
        value.ok_or(InjectError::SlotNotWritten {
            slot: slot.0,
            key: entry.key(),
        })
    }

    /// Stores a value in the slot. Constant slots reject a missing value and
    /// a second write.
    pub fn store(
        &self,
        slot: SlotIndex,
        value: Option<DynSvc>,
    ) -> InjectResult<()> {
        match self.slot(slot)? {
            Slot::Constant { key, value: cell } => {
                let value =
                    value.ok_or(InjectError::NullConstant { key: *key })?;
                cell.set(value).map_err(|_| InjectError::SlotAlreadyWritten {
                    slot: slot.0,
                    key: *key,
                })
            }
            Slot::Mutable { value: cell, .. } => {
                *cell.write() = value;
                Ok(())
            }
        }
    }

    /// Replaces the value of a mutable slot, returning the previous value.
    pub fn replace(
        &self,
        slot: SlotIndex,
        value: Option<DynSvc>,
    ) -> InjectResult<Option<DynSvc>> {
        match self.slot(slot)? {
            Slot::Constant { key, .. } => Err(InjectError::SlotNotMutable {
                slot: slot.0,
                key: *key,
            }),
            Slot::Mutable { value: cell, .. } => {
                Ok(std::mem::replace(&mut *cell.write(), value))
            }
        }
    }
}

impl Debug for LifetimeArena {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().enumerate().map(|(index, slot)| {
                let written = self.is_written(SlotIndex(index));
                format!(
                    "{} {}",
                    slot.key(),
                    if written { "(written)" } else { "(empty)" }
                )
            }))
            .finish()
    }
}
