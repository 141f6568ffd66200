//! Bookkeeping of every handle a pool has created.

use std::collections::HashSet;
use std::time::Instant;

use drover_core::{HandleId, PoolError};

/// An entry in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub id: HandleId,
    pub created_at: Instant,
}

/// Insertion-ordered set of created handles, bounded by capacity.
///
/// Entries are only removed when the pool tears down, so iteration order is
/// creation order.
#[derive(Debug)]
pub struct HandleRegistry {
    capacity: usize,
    entries: Vec<RegistryEntry>,
    index: HashSet<HandleId>,
}

impl HandleRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
            index: HashSet::with_capacity(capacity),
        }
    }

    /// Record a newly created handle.
    ///
    /// Fails if the registry is full or already holds `id`.
    pub fn register(&mut self, id: HandleId) -> Result<(), PoolError> {
        if self.index.contains(&id) {
            return Err(PoolError::DuplicateHandle(id));
        }
        if self.entries.len() >= self.capacity {
            return Err(PoolError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.index.insert(id);
        self.entries.push(RegistryEntry {
            id,
            created_at: Instant::now(),
        });
        Ok(())
    }

    pub fn contains(&self, id: &HandleId) -> bool {
        self.index.contains(id)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All registered handles in creation order.
    pub fn all(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Remove and return every entry in creation order.
    pub fn drain(&mut self) -> Vec<RegistryEntry> {
        self.index.clear();
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_until_full() {
        let mut registry = HandleRegistry::new(2);
        let a = HandleId::new();
        let b = HandleId::new();

        registry.register(a).unwrap();
        registry.register(b).unwrap();
        assert_eq!(registry.size(), 2);
        assert!(registry.contains(&a));

        match registry.register(HandleId::new()) {
            Err(PoolError::CapacityExceeded { capacity }) => assert_eq!(capacity, 2),
            other => panic!("expected CapacityExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_register_rejected() {
        let mut registry = HandleRegistry::new(3);
        let id = HandleId::new();
        registry.register(id).unwrap();

        match registry.register(id) {
            Err(PoolError::DuplicateHandle(dup)) => assert_eq!(dup, id),
            other => panic!("expected DuplicateHandle, got {:?}", other),
        }
        assert_eq!(registry.size(), 1);
        assert_eq!(registry.all().len(), 1);
    }

    #[test]
    fn test_drain_preserves_creation_order() {
        let mut registry = HandleRegistry::new(3);
        let ids: Vec<HandleId> = (0..3).map(|_| HandleId::new()).collect();
        for id in &ids {
            registry.register(*id).unwrap();
        }

        let listed: Vec<HandleId> = registry.all().iter().map(|e| e.id).collect();
        assert_eq!(listed, ids);

        let drained: Vec<HandleId> = registry.drain().into_iter().map(|e| e.id).collect();
        assert_eq!(drained, ids);
        assert_eq!(registry.size(), 0);
        assert!(!registry.contains(&ids[0]));
    }
}
