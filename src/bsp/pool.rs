//! Branch Pool - fixed-size arena of BSP branches
//!
//! Every branch the tree can ever need is allocated up front. Slots move
//! between a free stack and a used list; handles carry the slot generation
//! so a handle to a released branch can never reach the slot's next tenant.

use super::branch::BspBranch;

/// Generation-checked handle to a pooled branch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BranchId {
    index: u32,
    generation: u32,
}

impl BranchId {
    /// Slot index inside the pool
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// A slot in the branch pool
#[derive(Clone, Debug)]
struct PoolSlot {
    /// Bumped on every release
    generation: u32,
    /// Whether this slot is currently handed out
    in_use: bool,
    branch: BspBranch,
}

/// Pre-allocated branch storage with free/used bookkeeping
#[derive(Clone, Debug)]
pub struct BranchPool {
    slots: Vec<PoolSlot>,
    /// Stack of free slot indices
    free: Vec<u32>,
    /// Slot indices currently handed out, unordered
    used: Vec<u32>,
}

impl BranchPool {
    /// Create a pool of `capacity` branches of the given dimensionality
    pub fn new(capacity: usize, dimensions: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| PoolSlot {
                generation: 0,
                in_use: false,
                branch: BspBranch::new(dimensions),
            })
            .collect();
        // Reversed so slot 0 is handed out first
        let free: Vec<u32> = (0..capacity as u32).rev().collect();

        Self {
            slots,
            free,
            used: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    /// Take a branch from the free stack. `None` when the pool is exhausted.
    pub fn allocate(&mut self) -> Option<BranchId> {
        let index = self.free.pop()?;
        let slot = &mut self.slots[index as usize];
        slot.in_use = true;
        self.used.push(index);

        Some(BranchId {
            index,
            generation: slot.generation,
        })
    }

    /// Return a branch to the free stack
    ///
    /// The branch's per-run state is reset. Removal from the used list is a
    /// swap-remove, so the order of `used_ids()` is not stable.
    pub fn release(&mut self, id: BranchId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        let Some(pos) = self.used.iter().position(|&i| i == id.index) else {
            return false;
        };
        self.used.swap_remove(pos);

        let slot = &mut self.slots[id.index()];
        slot.in_use = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.branch.reset();
        self.free.push(id.index);
        true
    }

    /// Return every used branch to the free stack
    pub fn release_all(&mut self) -> usize {
        let released = self.used.len();
        for index in self.used.drain(..) {
            let slot = &mut self.slots[index as usize];
            slot.in_use = false;
            slot.generation = slot.generation.wrapping_add(1);
            slot.branch.reset();
            self.free.push(index);
        }
        released
    }

    /// True if `id` refers to a branch that is still handed out
    pub fn is_live(&self, id: BranchId) -> bool {
        self.slots
            .get(id.index())
            .is_some_and(|slot| slot.in_use && slot.generation == id.generation)
    }

    pub fn get(&self, id: BranchId) -> Option<&BspBranch> {
        if !self.is_live(id) {
            return None;
        }
        Some(&self.slots[id.index()].branch)
    }

    pub fn get_mut(&mut self, id: BranchId) -> Option<&mut BspBranch> {
        if !self.is_live(id) {
            return None;
        }
        Some(&mut self.slots[id.index()].branch)
    }

    /// Snapshot of the handles currently in use
    pub fn used_ids(&self) -> Vec<BranchId> {
        self.used
            .iter()
            .map(|&index| BranchId {
                index,
                generation: self.slots[index as usize].generation,
            })
            .collect()
    }
}
