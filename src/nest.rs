//! The shared nest: a located, append-only chronological sequence of occupant
//! cells behind a per-nest lock. Two nests never contend with each other;
//! within one nest, mutation is single-writer-at-a-time.
//!
//! Batch mutations (stage transitions that also touch `is_open`, sealing plus
//! a final count) take the guard once via [`Nest::lock`] and operate on the
//! [`NestCells`] directly; single appends go through [`Nest::append_cell`]
//! which locks internally.

use std::sync::{Mutex, MutexGuard};

use slotmap::new_key_type;

use crate::bee::BeeId;

new_key_type! {
    pub struct NestId;
}

pub struct Nest {
    x_m: i32,
    y_m: i32,
    /// Site-specific emergence offset in days, fixed at construction. Creates
    /// inter-nest variation in spring emergence without per-agent state.
    microsite_delay: i32,
    cells: Mutex<NestCells>,
}

#[derive(Debug, Default)]
pub struct NestCells {
    occupants: Vec<BeeId>,
    is_open: bool,
}

impl NestCells {
    /// Swap the stored occupant handle for one cell without reordering.
    /// Contract violation if `old` is not present; the model state cannot be
    /// interpreted once a stale handle shows up here.
    pub fn replace_occupant(&mut self, old: BeeId, new: BeeId) {
        let slot = self
            .occupants
            .iter_mut()
            .find(|id| **id == old)
            .expect("replace_occupant: occupant not present in nest");
        *slot = new;
    }

    pub fn occupants(&self) -> &[BeeId] {
        &self.occupants
    }

    pub fn cell_count(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Sealing is one-directional in practice; reopening is permitted by the
    /// interface but unused by current behaviour.
    pub fn set_open(&mut self, open: bool) {
        self.is_open = open;
    }
}

impl Nest {
    pub fn new(x_m: i32, y_m: i32, microsite_delay: i32) -> Self {
        Self {
            x_m,
            y_m,
            microsite_delay,
            cells: Mutex::new(NestCells {
                occupants: Vec::new(),
                is_open: true,
            }),
        }
    }

    pub fn location(&self) -> (i32, i32) {
        (self.x_m, self.y_m)
    }

    pub fn microsite_delay(&self) -> i32 {
        self.microsite_delay
    }

    /// Exclusive access for batched mutations. A poisoned lock means a panic
    /// mid-mutation elsewhere; the nest sequence can no longer be trusted.
    pub fn lock(&self) -> MutexGuard<'_, NestCells> {
        self.cells.lock().expect("nest lock poisoned")
    }

    /// Append a new cell at the chronological end. Returns false without
    /// modifying the sequence when the nest is sealed.
    pub fn append_cell(&self, occupant: BeeId) -> bool {
        let mut cells = self.lock();
        if !cells.is_open {
            return false;
        }
        cells.occupants.push(occupant);
        true
    }

    pub fn cell_count(&self) -> usize {
        self.lock().cell_count()
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_open()
    }

    pub fn seal(&self) {
        self.lock().set_open(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(n: usize) -> Vec<BeeId> {
        let mut arena: SlotMap<BeeId, ()> = SlotMap::with_key();
        (0..n).map(|_| arena.insert(())).collect()
    }

    #[test]
    fn appends_preserve_chronological_order() {
        let nest = Nest::new(10, 20, 1);
        let ids = ids(3);
        for &id in &ids {
            assert!(nest.append_cell(id));
        }
        let cells = nest.lock();
        assert_eq!(cells.occupants(), &ids[..]);
    }

    #[test]
    fn sealed_nest_rejects_appends() {
        let nest = Nest::new(0, 0, 0);
        let ids = ids(2);
        assert!(nest.append_cell(ids[0]));
        nest.seal();
        assert!(!nest.is_open());
        assert!(!nest.append_cell(ids[1]));
        assert_eq!(nest.cell_count(), 1);
    }

    #[test]
    fn replace_keeps_position() {
        let nest = Nest::new(0, 0, 0);
        let ids = ids(4);
        for &id in &ids[..3] {
            nest.append_cell(id);
        }
        {
            let mut cells = nest.lock();
            cells.replace_occupant(ids[1], ids[3]);
        }
        let cells = nest.lock();
        assert_eq!(cells.occupants(), &[ids[0], ids[3], ids[2]]);
    }

    #[test]
    #[should_panic(expected = "occupant not present")]
    fn replacing_stale_handle_panics() {
        let nest = Nest::new(0, 0, 0);
        let ids = ids(2);
        nest.append_cell(ids[0]);
        nest.lock().replace_occupant(ids[1], ids[0]);
    }

    #[test]
    fn concurrent_appends_lose_nothing() {
        use std::sync::Arc;

        let nest = Arc::new(Nest::new(0, 0, 0));
        let all_ids = ids(400);
        let mut handles = Vec::new();
        for chunk in all_ids.chunks(100) {
            let nest = Arc::clone(&nest);
            let chunk: Vec<BeeId> = chunk.to_vec();
            handles.push(std::thread::spawn(move || {
                for id in chunk {
                    assert!(nest.append_cell(id));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(nest.cell_count(), 400);
        let cells = nest.lock();
        let mut seen: Vec<BeeId> = cells.occupants().to_vec();
        seen.sort();
        let mut expected = all_ids.clone();
        expected.sort();
        assert_eq!(seen, expected);
    }
}
