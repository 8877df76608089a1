//! Dense, append-only storage keyed by opaque IDs.
//!
//! Signals and triggers are allocated once at elaboration time and never
//! removed, so an [`Arena`] gives them stable `u32` IDs that double as
//! indices into per-signal side tables (previous values, trace slots).

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait for opaque ID types used as arena keys.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;

    /// Returns the raw index as a `usize`, for side-table lookups.
    fn index(self) -> usize {
        self.as_raw() as usize
    }
}

/// An append-only container indexed by `I`.
///
/// IDs are handed out in allocation order starting at zero.
#[derive(Debug, Clone)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Appends an item and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.items.len() as u32);
        self.items.push(item);
        id
    }

    /// Returns the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID was not allocated by this arena.
    pub fn get(&self, id: I) -> &T {
        &self.items[id.index()]
    }

    /// Returns the item with the given ID mutably.
    ///
    /// # Panics
    ///
    /// Panics if the ID was not allocated by this arena.
    pub fn get_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.index()]
    }

    /// Returns the item with the given ID, or `None` if out of range.
    pub fn try_get(&self, id: I) -> Option<&T> {
        self.items.get(id.index())
    }

    /// Returns the number of items in the arena.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// Iterates over all allocated IDs in order.
    pub fn ids(&self) -> impl Iterator<Item = I> {
        (0..self.items.len() as u32).map(I::from_raw)
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        self.get(id)
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        self.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct TestId(u32);

    impl ArenaId for TestId {
        fn from_raw(index: u32) -> Self {
            Self(index)
        }

        fn as_raw(self) -> u32 {
            self.0
        }
    }

    #[test]
    fn alloc_returns_sequential_ids() {
        let mut arena: Arena<TestId, &str> = Arena::new();
        let a = arena.alloc("clk");
        let b = arena.alloc("rst");
        assert_eq!(a, TestId(0));
        assert_eq!(b, TestId(1));
        assert_eq!(arena[b], "rst");
    }

    #[test]
    fn get_mut_modifies() {
        let mut arena: Arena<TestId, u64> = Arena::new();
        let id = arena.alloc(0);
        arena[id] = 0x5a;
        assert_eq!(*arena.get(id), 0x5a);
    }

    #[test]
    fn try_get_out_of_range() {
        let arena: Arena<TestId, u64> = Arena::new();
        assert!(arena.try_get(TestId(3)).is_none());
        assert!(arena.is_empty());
    }

    #[test]
    fn ids_cover_all_items() {
        let mut arena: Arena<TestId, u8> = Arena::new();
        arena.alloc(1);
        arena.alloc(2);
        arena.alloc(3);
        let ids: Vec<u32> = arena.ids().map(|id| id.as_raw()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(arena.iter().count(), arena.len());
    }
}
