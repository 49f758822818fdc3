//! Component storage - sparse sets of packed component values.
//!
//! Each component type gets one [`Storage`]: a dense array of values, a
//! parallel dense array of owning entities and a sparse table from entity
//! slot index to dense position.
//!
//! ```text
//! sparse   [ 2 | - | 0 | - | 1 ]     indexed by Entity::index()
//! entities [ e2  | e4  | e0  ]        dense, no gaps
//! values   [ v2  | v4  | v0  ]        same order as entities
//! ```
//!
//! Removal swaps the last element into the hole, so dense order changes
//! after every removal. References handed out by a storage are only valid
//! until its next structural mutation; the borrow checker enforces that.

use std::any::Any;

use crate::{
    entity::Entity,
    error::{EcsError, EcsResult},
};

/// Sparse entry meaning "not in this set".
const ABSENT: u32 = u32::MAX;

/// Entity index set with O(1) insert, remove and lookup.
///
/// Holds at most one generation per slot index; the registry guarantees
/// this by purging entities from every set before their slot is reused.
#[derive(Debug, Default, Clone)]
pub struct SparseSet {
    /// Entity slot index -> position in `dense`.
    sparse: Vec<u32>,
    /// Packed member entities.
    dense: Vec<Entity>,
}

impl SparseSet {
    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
        }
    }

    /// Create a set with room for `capacity` members.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sparse: Vec::with_capacity(capacity),
            dense: Vec::with_capacity(capacity),
        }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Check if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Dense position of `entity`, if it is a member.
    #[must_use]
    pub fn index_of(&self, entity: Entity) -> Option<usize> {
        let pos = *self.sparse.get(entity.index() as usize)?;
        if pos == ABSENT {
            return None;
        }
        let pos = pos as usize;
        (self.dense.get(pos) == Some(&entity)).then_some(pos)
    }

    /// Check membership. Stale generations are not members.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.index_of(entity).is_some()
    }

    /// Members in dense order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.dense
    }

    /// Whether the slot index of `entity` is taken by any generation.
    fn slot_taken(&self, entity: Entity) -> bool {
        self.sparse
            .get(entity.index() as usize)
            .is_some_and(|&pos| pos != ABSENT)
    }

    /// Append `entity`, returning its dense position.
    fn push(&mut self, entity: Entity) -> usize {
        debug_assert!(!self.slot_taken(entity), "slot already in sparse set");

        let slot = entity.index() as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, ABSENT);
        }

        let pos = self.dense.len();
        self.sparse[slot] = pos as u32;
        self.dense.push(entity);
        pos
    }

    /// Swap-remove the member at dense position `pos`.
    ///
    /// Returns the entity that moved into `pos`, if any.
    fn swap_remove(&mut self, pos: usize) -> Option<Entity> {
        let removed = self.dense.swap_remove(pos);
        self.sparse[removed.index() as usize] = ABSENT;

        let moved = self.dense.get(pos).copied()?;
        self.sparse[moved.index() as usize] = pos as u32;
        Some(moved)
    }

    fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
    }
}

/// Packed storage for all values of one component type.
#[derive(Debug, Clone)]
pub struct Storage<T> {
    set: SparseSet,
    values: Vec<T>,
}

impl<T> Default for Storage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Storage<T> {
    /// Create an empty storage.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            set: SparseSet::new(),
            values: Vec::new(),
        }
    }

    /// Create a storage with room for `capacity` components.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            set: SparseSet::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    fn component_type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn not_present(entity: Entity) -> EcsError {
        EcsError::ComponentNotPresent {
            entity,
            component: Self::component_type_name(),
        }
    }

    /// Number of stored components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check if `entity` has a component here.
    #[must_use]
    pub fn has(&self, entity: Entity) -> bool {
        self.set.contains(entity)
    }

    /// Dense position of `entity`'s component.
    #[must_use]
    pub fn index_of(&self, entity: Entity) -> Option<usize> {
        self.set.index_of(entity)
    }

    /// Add a component for `entity`.
    ///
    /// Fails with [`EcsError::DuplicateComponent`] if `entity` already has
    /// one; use [`Storage::replace`] or [`Storage::attach_or_replace`] to
    /// overwrite. Fails with [`EcsError::InvalidEntity`] if a different
    /// generation of the same slot is still stored.
    pub fn attach(&mut self, entity: Entity, value: T) -> EcsResult<&mut T> {
        if self.set.contains(entity) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: Self::component_type_name(),
            });
        }
        if self.set.slot_taken(entity) {
            return Err(EcsError::InvalidEntity(entity));
        }

        let pos = self.set.push(entity);
        self.values.push(value);
        debug_assert_eq!(pos + 1, self.values.len());
        Ok(&mut self.values[pos])
    }

    /// Overwrite `entity`'s component, returning the previous value.
    pub fn replace(&mut self, entity: Entity, value: T) -> EcsResult<T> {
        let pos = self
            .set
            .index_of(entity)
            .ok_or_else(|| Self::not_present(entity))?;
        Ok(std::mem::replace(&mut self.values[pos], value))
    }

    /// Add or overwrite `entity`'s component.
    pub fn attach_or_replace(&mut self, entity: Entity, value: T) -> EcsResult<&mut T> {
        match self.set.index_of(entity) {
            Some(pos) => {
                self.values[pos] = value;
                Ok(&mut self.values[pos])
            }
            None => self.attach(entity, value),
        }
    }

    /// Remove `entity`'s component and return it.
    ///
    /// O(1): the last component moves into the freed position.
    pub fn detach(&mut self, entity: Entity) -> EcsResult<T> {
        let pos = self
            .set
            .index_of(entity)
            .ok_or_else(|| Self::not_present(entity))?;
        self.set.swap_remove(pos);
        Ok(self.values.swap_remove(pos))
    }

    /// Get `entity`'s component.
    pub fn get(&self, entity: Entity) -> EcsResult<&T> {
        self.try_get(entity).ok_or_else(|| Self::not_present(entity))
    }

    /// Get `entity`'s component mutably.
    pub fn get_mut(&mut self, entity: Entity) -> EcsResult<&mut T> {
        match self.set.index_of(entity) {
            Some(pos) => Ok(&mut self.values[pos]),
            None => Err(Self::not_present(entity)),
        }
    }

    /// Get `entity`'s component, or `None` if absent.
    #[must_use]
    pub fn try_get(&self, entity: Entity) -> Option<&T> {
        self.set.index_of(entity).map(|pos| &self.values[pos])
    }

    /// Get `entity`'s component mutably, or `None` if absent.
    #[must_use]
    pub fn try_get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let pos = self.set.index_of(entity)?;
        Some(&mut self.values[pos])
    }

    /// Owning entities in dense order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        self.set.entities()
    }

    /// Component values in dense order.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Component values in dense order, mutably.
    #[must_use]
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Iterate `(entity, component)` pairs in dense order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (Entity, &T)> {
        self.set.entities().iter().copied().zip(self.values.iter())
    }

    /// Iterate `(entity, component)` pairs in dense order, mutably.
    pub fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (Entity, &mut T)> {
        self.set.entities().iter().copied().zip(self.values.iter_mut())
    }

    /// Drop every component.
    pub fn clear(&mut self) {
        self.set.clear();
        self.values.clear();
    }

    /// Split into the membership set and the mutable value slice.
    pub(crate) fn split_mut(&mut self) -> (&SparseSet, &mut [T]) {
        (&self.set, &mut self.values)
    }
}

/// Type-erased access to a [`Storage`].
///
/// The registry keeps one boxed storage per component id and uses this
/// interface for everything that does not need the concrete type: purging
/// destroyed entities, membership probes and sizes.
pub trait ComponentStorage: Any + Send + Sync {
    /// Type name of the stored component.
    fn component_name(&self) -> &'static str;

    /// Membership set of the storage.
    fn set(&self) -> &SparseSet;

    /// Check whether `entity` has a component in this storage.
    fn contains(&self, entity: Entity) -> bool {
        self.set().contains(entity)
    }

    /// Get the number of stored components.
    fn len(&self) -> usize {
        self.set().len()
    }

    /// Check if storage is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owning entities in dense order.
    fn entities(&self) -> &[Entity] {
        self.set().entities()
    }

    /// Drop `entity`'s component if present. Returns whether one was removed.
    fn remove_entity(&mut self, entity: Entity) -> bool;

    /// Drop every component.
    fn clear(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Send + Sync + 'static> ComponentStorage for Storage<T> {
    fn component_name(&self) -> &'static str {
        Self::component_type_name()
    }

    fn set(&self) -> &SparseSet {
        &self.set
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.detach(entity).is_ok()
    }

    fn clear(&mut self) {
        Storage::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Generation;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Name(String);

    fn entity(index: u32) -> Entity {
        Entity::new(index, Generation::new())
    }

    /// Every dense position must round-trip through the sparse table.
    fn assert_consistent<T>(storage: &Storage<T>) {
        assert_eq!(storage.entities().len(), storage.values().len());
        for (pos, &e) in storage.entities().iter().enumerate() {
            assert_eq!(storage.index_of(e), Some(pos));
        }
    }

    #[test]
    fn test_attach_get() {
        let mut storage = Storage::new();

        storage.attach(entity(0), Position { x: 1.0, y: 2.0 }).unwrap();
        storage.attach(entity(5), Position { x: 3.0, y: 4.0 }).unwrap();

        assert_eq!(storage.len(), 2);
        assert_eq!(storage.get(entity(0)), Ok(&Position { x: 1.0, y: 2.0 }));
        assert_eq!(storage.get(entity(5)), Ok(&Position { x: 3.0, y: 4.0 }));
        assert!(storage.try_get(entity(3)).is_none());
        assert_consistent(&storage);
    }

    #[test]
    fn test_attach_duplicate_is_rejected() {
        let mut storage = Storage::new();
        let e = entity(1);

        storage.attach(e, Name("a".into())).unwrap();
        let err = storage.attach(e, Name("b".into())).unwrap_err();

        assert!(matches!(err, EcsError::DuplicateComponent { entity, .. } if entity == e));
        assert_eq!(storage.get(e).unwrap().0, "a");
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_attach_stale_generation_is_rejected() {
        let mut storage = Storage::new();
        let old = entity(2);
        let new = Entity::new(2, Generation::from_raw(1));

        storage.attach(old, 1u32).unwrap();

        assert_eq!(storage.attach(new, 2), Err(EcsError::InvalidEntity(new)));
        assert!(!storage.has(new));
        assert_eq!(storage.get(old), Ok(&1));
    }

    #[test]
    fn test_detach_swaps_last_into_hole() {
        let mut storage = Storage::new();

        storage.attach(entity(0), Position { x: 1.0, y: 2.0 }).unwrap();
        storage.attach(entity(1), Position { x: 3.0, y: 4.0 }).unwrap();
        storage.attach(entity(2), Position { x: 5.0, y: 6.0 }).unwrap();

        let removed = storage.detach(entity(0)).unwrap();

        assert_eq!(removed, Position { x: 1.0, y: 2.0 });
        assert_eq!(storage.len(), 2);
        assert!(!storage.has(entity(0)));
        // Last element moved into position 0.
        assert_eq!(storage.entities(), &[entity(2), entity(1)]);
        assert_eq!(storage.get(entity(1)), Ok(&Position { x: 3.0, y: 4.0 }));
        assert_eq!(storage.get(entity(2)), Ok(&Position { x: 5.0, y: 6.0 }));
        assert_consistent(&storage);
    }

    #[test]
    fn test_detach_last_and_only() {
        let mut storage = Storage::new();

        storage.attach(entity(4), 7u8).unwrap();
        assert_eq!(storage.detach(entity(4)), Ok(7));
        assert!(storage.is_empty());

        let err = storage.detach(entity(4)).unwrap_err();
        assert!(matches!(err, EcsError::ComponentNotPresent { .. }));
    }

    #[test]
    fn test_replace_and_upsert() {
        let mut storage = Storage::new();
        let e = entity(0);

        assert!(storage.replace(e, 1i32).is_err());

        *storage.attach_or_replace(e, 1).unwrap() += 10;
        assert_eq!(storage.get(e), Ok(&11));

        assert_eq!(storage.replace(e, 5), Ok(11));
        storage.attach_or_replace(e, 6).unwrap();
        assert_eq!(storage.get(e), Ok(&6));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_get_mut() {
        let mut storage = Storage::new();
        let e = entity(3);

        storage.attach(e, Position { x: 0.0, y: 0.0 }).unwrap();
        storage.get_mut(e).unwrap().x = 9.0;
        if let Some(p) = storage.try_get_mut(e) {
            p.y = 8.0;
        }

        assert_eq!(storage.get(e), Ok(&Position { x: 9.0, y: 8.0 }));
        assert!(storage.get_mut(entity(1)).is_err());
    }

    #[test]
    fn test_iter_pairs_dense_order() {
        let mut storage = Storage::new();

        storage.attach(entity(7), 'a').unwrap();
        storage.attach(entity(2), 'b').unwrap();

        let pairs: Vec<_> = storage.iter().map(|(e, &c)| (e.index(), c)).collect();
        assert_eq!(pairs, vec![(7, 'a'), (2, 'b')]);

        for (_, c) in storage.iter_mut() {
            *c = c.to_ascii_uppercase();
        }
        assert_eq!(storage.values(), &['A', 'B']);
    }

    #[test]
    fn test_erased_interface() {
        let mut storage = Storage::new();
        storage.attach(entity(0), Name("x".into())).unwrap();
        storage.attach(entity(1), Name("y".into())).unwrap();

        let erased: &mut dyn ComponentStorage = &mut storage;
        assert!(erased.component_name().ends_with("Name"));
        assert!(erased.contains(entity(1)));
        assert!(erased.remove_entity(entity(1)));
        assert!(!erased.remove_entity(entity(1)));
        assert_eq!(erased.len(), 1);

        let typed = erased.as_any().downcast_ref::<Storage<Name>>().unwrap();
        assert_eq!(typed.get(entity(0)).unwrap().0, "x");

        erased.clear();
        assert!(erased.is_empty());
    }

    #[test]
    fn test_drops_values() {
        use std::sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        };

        struct DropCounter(Arc<AtomicUsize>);

        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        {
            let mut storage = Storage::new();
            for i in 0..3 {
                storage
                    .attach(entity(i), DropCounter(Arc::clone(&drops)))
                    .unwrap();
            }
            drop(storage.detach(entity(1)).unwrap());
            assert_eq!(drops.load(Ordering::SeqCst), 1);
        }
        assert_eq!(drops.load(Ordering::SeqCst), 3);
    }
}
