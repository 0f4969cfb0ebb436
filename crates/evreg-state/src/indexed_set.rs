//! # Indexed Ordered Set
//!
//! A duplicate-free sequence backed by an element → position map, giving
//! O(1) insert, membership and removal. Removal is swap-with-last: the last
//! element moves into the vacated slot and its position entry is rewritten,
//! so the backing vector never holds tombstones or stale entries.
//!
//! Enumeration order is insertion order up to the first removal; after a
//! removal the previously-last element occupies the removed slot.

use std::collections::HashMap;
use std::hash::Hash;

/// A duplicate-free sequence with O(1) removal.
#[derive(Debug, Clone)]
pub struct IndexedSet<T> {
    items: Vec<T>,
    positions: HashMap<T, usize>,
}

impl<T: Clone + Eq + Hash> IndexedSet<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Append `item` unless already present. Returns whether it was added.
    pub fn insert(&mut self, item: T) -> bool {
        if self.positions.contains_key(&item) {
            return false;
        }
        self.positions.insert(item.clone(), self.items.len());
        self.items.push(item);
        true
    }

    /// Remove `item` if present. Returns whether it was removed.
    pub fn remove(&mut self, item: &T) -> bool {
        let Some(index) = self.positions.remove(item) else {
            return false;
        };
        self.items.swap_remove(index);
        if let Some(moved) = self.items.get(index) {
            self.positions.insert(moved.clone(), index);
        }
        true
    }

    /// Whether `item` is a member.
    pub fn contains(&self, item: &T) -> bool {
        self.positions.contains_key(item)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Members in enumeration order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterate members in enumeration order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Clone + Eq + Hash> Default for IndexedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(items: &[&'static str]) -> IndexedSet<&'static str> {
        let mut set = IndexedSet::new();
        for item in items {
            set.insert(*item);
        }
        set
    }

    #[test]
    fn insert_rejects_duplicates() {
        let mut set = IndexedSet::new();
        assert!(set.insert("a"));
        assert!(!set.insert("a"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn insertion_order_is_preserved_without_removals() {
        let set = set_of(&["a", "b", "c"]);
        assert_eq!(set.as_slice(), &["a", "b", "c"]);
    }

    #[test]
    fn remove_middle_moves_last_into_slot() {
        let mut set = set_of(&["a", "b", "c", "d"]);
        assert!(set.remove(&"b"));
        assert_eq!(set.as_slice(), &["a", "d", "c"]);
        assert!(!set.contains(&"b"));
        // The moved element's position is tracked correctly.
        assert!(set.remove(&"d"));
        assert_eq!(set.as_slice(), &["a", "c"]);
    }

    #[test]
    fn remove_last_and_only() {
        let mut set = set_of(&["a", "b"]);
        assert!(set.remove(&"b"));
        assert_eq!(set.as_slice(), &["a"]);
        assert!(set.remove(&"a"));
        assert!(set.is_empty());
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut set = set_of(&["a"]);
        assert!(!set.remove(&"z"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn reinsert_after_remove_appends() {
        let mut set = set_of(&["a", "b", "c"]);
        set.remove(&"a");
        set.insert("a");
        assert_eq!(set.as_slice(), &["c", "b", "a"]);
        assert_eq!(set.iter().count(), 3);
    }
}
