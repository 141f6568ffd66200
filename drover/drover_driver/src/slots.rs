//! Allocation of per-session profile directory indices.

use std::collections::BTreeSet;

use parking_lot::Mutex;

/// Hands out the lowest unused index and takes indices back.
///
/// There is no upper bound; the pool's capacity is what limits how many
/// indices are live at once.
#[derive(Debug, Default)]
pub struct SlotAllocator {
    in_use: Mutex<BTreeSet<usize>>,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the lowest free index.
    pub fn allocate(&self) -> usize {
        let mut in_use = self.in_use.lock();
        let slot = in_use
            .iter()
            .enumerate()
            .find(|(expected, actual)| expected != *actual)
            .map(|(expected, _)| expected)
            .unwrap_or(in_use.len());
        in_use.insert(slot);
        slot
    }

    /// Return an index. Returns false if it was not allocated.
    pub fn release(&self, slot: usize) -> bool {
        self.in_use.lock().remove(&slot)
    }

    pub fn in_use(&self) -> usize {
        self.in_use.lock().len()
    }
}
