use crate::{BuildContext, Key, LifetimeArena};
use derive_more::Display;

/// The position of a storage slot in a [`LifetimeArena`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display)]
#[display(fmt = "#{}", _0)]
pub struct SlotIndex(pub(crate) usize);

impl SlotIndex {
    /// Gets the position of the slot.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a slot may be written.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum SlotKind {
    /// Written exactly once, never cleared.
    #[display(fmt = "constant")]
    Constant,
    /// May be written and replaced any number of times.
    #[display(fmt = "mutable")]
    Mutable,
}

/// The slots reserved while an application is built. The layout is fixed once
/// the build completes, and every arena allocated from it has exactly these
/// slots.
#[derive(Clone, Debug, Default)]
pub(crate) struct ArenaLayout {
    slots: Vec<(Key, SlotKind)>,
}

impl ArenaLayout {
    pub fn reserve(
        &mut self,
        cx: &BuildContext,
        key: Key,
        kind: SlotKind,
    ) -> SlotIndex {
        cx.assert_build_thread();
        self.slots.push((key, kind));
        SlotIndex(self.slots.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn key(&self, slot: SlotIndex) -> Option<Key> {
        self.slots.get(slot.0).map(|(key, _)| *key)
    }

    pub fn allocate(&self) -> LifetimeArena {
        LifetimeArena::new(&self.slots)
    }
}
