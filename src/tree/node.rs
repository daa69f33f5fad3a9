//! Node handles with generational indices
//!
//! Tree nodes live in slots owned by the tree; a [`NodeId`] names a slot and
//! the generation of that slot when the node was created. Freeing a node
//! bumps the slot's generation, so a stale handle to a deleted node can never
//! resolve to whatever node later reuses the slot.

use std::fmt;

/// Handle to a node of a `ProjectTree`. Equality is identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    /// Which occupant of the slot this handle names
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Hands out tree slots. A deleted node's slot is recycled under a new
/// generation, so handles to the deleted node stop resolving.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeAllocator {
    /// Current occupant generation, per slot
    generations: Vec<u32>,
    /// Slots of deleted nodes, most recent last
    vacant: Vec<u32>,
    live: usize,
}

impl NodeAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for a new node, in a recycled slot when one is vacant
    pub fn allocate(&mut self) -> NodeId {
        self.live += 1;
        match self.vacant.pop() {
            Some(index) => NodeId::new(index, self.generations[index as usize]),
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                NodeId::new(index, 0)
            }
        }
    }

    /// Retire a node's handle and vacate its slot. False for stale handles.
    pub fn free(&mut self, id: NodeId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let generation = &mut self.generations[id.index as usize];
        *generation = generation.wrapping_add(1);
        self.vacant.push(id.index);
        self.live -= 1;
        true
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.generations.get(id.index as usize) == Some(&id.generation)
    }

    /// Number of nodes currently holding a slot
    pub fn live_count(&self) -> usize {
        self.live
    }
}
