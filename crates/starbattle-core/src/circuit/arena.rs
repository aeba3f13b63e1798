//! Ancilla allocation.
//!
//! Ancillas live in an arena of qubit indices starting at `base`. A released
//! index goes back to the zero-pool and is handed out again lowest-first; a
//! live index is never handed out twice.

use super::Qubit;
use std::collections::BTreeSet;
use std::ops::Range;

#[derive(Debug, Clone)]
pub struct AncillaArena {
    base: Qubit,
    /// Indices ever handed out (the arena's high-water mark)
    allocated: usize,
    free: BTreeSet<Qubit>,
    live: BTreeSet<Qubit>,
}

impl AncillaArena {
    pub fn new(base: Qubit) -> Self {
        Self {
            base,
            allocated: 0,
            free: BTreeSet::new(),
            live: BTreeSet::new(),
        }
    }

    /// Take a zeroed ancilla.
    pub fn alloc(&mut self) -> Qubit {
        let q = match self.free.pop_first() {
            Some(q) => q,
            None => {
                self.allocated += 1;
                self.base + self.allocated - 1
            }
        };
        self.live.insert(q);
        q
    }

    pub fn alloc_many(&mut self, n: usize) -> Vec<Qubit> {
        (0..n).map(|_| self.alloc()).collect()
    }

    /// Return an ancilla the caller has restored to zero.
    pub fn release(&mut self, q: Qubit) {
        let was_live = self.live.remove(&q);
        debug_assert!(was_live, "released ancilla {} that is not live", q);
        self.free.insert(q);
    }

    pub fn release_all(&mut self, qs: &[Qubit]) {
        for &q in qs {
            self.release(q);
        }
    }

    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Every index the arena has handed out.
    pub fn range(&self) -> Range<Qubit> {
        self.base..self.base + self.allocated
    }
}
