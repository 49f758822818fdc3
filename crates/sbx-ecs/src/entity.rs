//! Entity identifiers with generational indices.
//!
//! An [`Entity`] is a slot index plus the generation that slot had when the
//! handle was produced. Destroying an entity bumps the slot's generation, so
//! every handle to the old occupant stops validating once the slot is reused.

use std::fmt;

use crate::error::{EcsError, EcsResult};

/// Generation counter to detect stale entity references.
/// Incremented each time an entity slot is recycled.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u32);

impl Generation {
    /// Reserved for [`Entity::NULL`]; never handed out by the allocator.
    pub const RESERVED: Self = Self(u32::MAX);

    /// Create a new generation (starts at 0).
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Create a generation from a raw value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The following generation, or `None` once the counter would reach
    /// [`Generation::RESERVED`].
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        if self.0 >= u32::MAX - 1 {
            None
        } else {
            Some(Self(self.0 + 1))
        }
    }

    /// Get the raw generation value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Raw slot index into the entity table.
pub type EntityIndex = u32;

/// A handle to an entity in a [`Registry`](crate::Registry).
///
/// Entities are represented as a combination of:
/// - `index`: slot in the registry's entity table
/// - `generation`: version of that slot when the handle was created
///
/// Handles carry no data. Two handles are equal iff both parts match.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    index: EntityIndex,
    generation: Generation,
}

impl Entity {
    /// The null entity. Never valid in any registry.
    pub const NULL: Entity = Entity {
        index: EntityIndex::MAX,
        generation: Generation::RESERVED,
    };

    /// Build a handle from raw parts.
    ///
    /// Only the registry hands out handles that validate; anything built here
    /// is checked against the slot table before use.
    #[must_use]
    pub const fn new(index: EntityIndex, generation: Generation) -> Self {
        Self { index, generation }
    }

    /// Get the entity's slot index.
    #[must_use]
    pub const fn index(self) -> EntityIndex {
        self.index
    }

    /// Get the entity's generation.
    #[must_use]
    pub const fn generation(self) -> Generation {
        self.generation
    }

    /// Check whether this is [`Entity::NULL`].
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.index == Self::NULL.index && self.generation.0 == Self::NULL.generation.0
    }

    /// Pack entity into a single u64 (generation in the high half).
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        ((self.generation.0 as u64) << 32) | (self.index as u64)
    }

    /// Unpack entity from a u64.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: Generation((bits >> 32) as u32),
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("Entity(null)")
        } else {
            write!(f, "Entity({}v{})", self.index, self.generation.0)
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("null")
        } else {
            write!(f, "{}v{}", self.index, self.generation.0)
        }
    }
}

/// One row of the slot table.
#[derive(Clone, Copy, Debug)]
struct Slot {
    generation: Generation,
    alive: bool,
}

/// Allocator for entity slots with generation tracking.
///
/// Maintains a LIFO free list of recycled slots. A slot whose generation is
/// exhausted is retired instead of recycled, so stale handles can never
/// validate again.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    slots: Vec<Slot>,
    free_list: Vec<EntityIndex>,
    alive_count: u32,
    retired: u32,
}

impl EntityAllocator {
    /// Create a new entity allocator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            alive_count: 0,
            retired: 0,
        }
    }

    /// Create an allocator with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::with_capacity(capacity / 4),
            alive_count: 0,
            retired: 0,
        }
    }

    /// Allocate a new entity.
    ///
    /// Reuses the most recently freed slot with its current generation,
    /// otherwise appends a fresh slot at generation 0.
    pub fn allocate(&mut self) -> Entity {
        self.alive_count += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.alive = true;
            return Entity::new(index, slot.generation);
        }

        let index = self.slots.len() as EntityIndex;
        debug_assert!(index != EntityIndex::MAX, "entity slot table exhausted");
        let generation = Generation::new();
        self.slots.push(Slot {
            generation,
            alive: true,
        });
        Entity::new(index, generation)
    }

    /// Release an entity's slot.
    ///
    /// The slot's generation is bumped so `entity` no longer validates. If
    /// the generation is exhausted the slot is retired and never reused.
    pub fn deallocate(&mut self, entity: Entity) -> EcsResult<()> {
        if !self.is_alive(entity) {
            return Err(EcsError::InvalidEntity(entity));
        }

        let index = entity.index();
        self.alive_count -= 1;
        if self.release(index) {
            self.free_list.push(index);
        }

        Ok(())
    }

    /// Mark a live slot dead and bump its generation. Returns `false` if the
    /// slot was retired instead and must not be recycled.
    fn release(&mut self, index: EntityIndex) -> bool {
        let slot = &mut self.slots[index as usize];
        slot.alive = false;

        match slot.generation.next() {
            Some(next) => {
                slot.generation = next;
                true
            }
            None => {
                let entity = Entity::new(index, slot.generation);
                slot.generation = Generation::RESERVED;
                self.retired += 1;
                tracing::warn!(%entity, "entity slot generation exhausted, retiring slot");
                false
            }
        }
    }

    /// Check if an entity is currently alive.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.index() as usize)
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation())
    }

    /// Get the number of currently alive entities.
    #[must_use]
    pub const fn alive_count(&self) -> u32 {
        self.alive_count
    }

    /// Number of slots that have been retired after generation exhaustion.
    #[must_use]
    pub const fn retired_count(&self) -> u32 {
        self.retired
    }

    /// Get the total number of slots ever allocated (alive, free and retired).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterate over every alive entity in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.alive)
            .map(|(index, slot)| Entity::new(index as EntityIndex, slot.generation))
    }

    /// Release every live slot at once.
    ///
    /// Each live slot gets its generation bumped (or is retired) exactly as
    /// in [`EntityAllocator::deallocate`], so no handle issued before the
    /// clear validates afterwards. The free list is rebuilt so the lowest
    /// index is reused first.
    pub fn clear(&mut self) {
        for index in 0..self.slots.len() as EntityIndex {
            if self.slots[index as usize].alive {
                self.release(index);
            }
        }

        self.free_list.clear();
        self.free_list.extend(
            self.slots
                .iter()
                .enumerate()
                .rev()
                .filter(|(_, slot)| slot.generation != Generation::RESERVED)
                .map(|(index, _)| index as EntityIndex),
        );
        self.alive_count = 0;
    }

    #[cfg(test)]
    fn force_generation(&mut self, index: EntityIndex, generation: Generation) {
        self.slots[index as usize].generation = generation;
    }
}
