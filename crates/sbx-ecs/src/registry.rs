//! Registry - the owner of all entities and component storages.
//!
//! The registry allocates entity handles, owns one [`Storage`] per component
//! type, and is the entry point for building views. Storages are created
//! lazily the first time a component type is attached or registered.
//!
//! Every operation that takes an entity validates it against the slot table
//! first and reports stale or out-of-range handles as
//! [`EcsError::InvalidEntity`]. Failed operations leave the registry
//! untouched.

use std::fmt;

use smallvec::SmallVec;

use crate::{
    component::{Component, ComponentId, ComponentRegistry},
    entity::{Entity, EntityAllocator},
    error::{EcsError, EcsResult},
    storage::{ComponentStorage, SparseSet, Storage},
    view::{ComponentSet, RuntimeViewBuilder, View, ViewMut},
};

/// Include slots and exclude sets handed to a mutable view.
pub(crate) type SplitStorages<'r> = (
    SmallVec<[Option<&'r mut dyn ComponentStorage>; 4]>,
    SmallVec<[&'r SparseSet; 4]>,
);

/// The ECS registry - container for all entities and components.
///
/// # Example
///
/// ```
/// use sbx_ecs::Registry;
///
/// #[derive(Debug, PartialEq)]
/// struct Position { x: f32, y: f32 }
///
/// let mut registry = Registry::new();
/// let e = registry.create();
/// registry.attach(e, Position { x: 1.0, y: 2.0 }).unwrap();
///
/// assert_eq!(registry.get::<Position>(e), Ok(&Position { x: 1.0, y: 2.0 }));
///
/// registry.destroy(e).unwrap();
/// assert!(!registry.is_valid(e));
/// ```
#[derive(Default)]
pub struct Registry {
    /// Entity slot allocator.
    entities: EntityAllocator,
    /// Component type registry; ids index `storages`.
    components: ComponentRegistry,
    /// One storage per registered component, indexed by `ComponentId`.
    storages: Vec<Box<dyn ComponentStorage>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with room for `entity_capacity` entity slots.
    #[must_use]
    pub fn with_capacity(entity_capacity: usize) -> Self {
        Self {
            entities: EntityAllocator::with_capacity(entity_capacity),
            components: ComponentRegistry::new(),
            storages: Vec::new(),
        }
    }

    // ==================== Entity Operations ====================

    /// Create a new entity with no components.
    pub fn create(&mut self) -> Entity {
        let entity = self.entities.allocate();
        tracing::trace!(%entity, "created entity");
        entity
    }

    /// Destroy an entity and every component attached to it.
    ///
    /// The slot's generation is bumped, so `entity` (and any copy of it)
    /// never validates again.
    pub fn destroy(&mut self, entity: Entity) -> EcsResult<()> {
        self.ensure_valid(entity)?;

        for storage in &mut self.storages {
            storage.remove_entity(entity);
        }
        self.entities.deallocate(entity)?;

        tracing::trace!(%entity, "destroyed entity");
        Ok(())
    }

    /// Check if an entity handle is currently valid.
    #[must_use]
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Get the number of alive entities.
    #[must_use]
    pub fn alive_count(&self) -> u32 {
        self.entities.alive_count()
    }

    /// Number of entity slots ever allocated, alive or not.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entities.capacity()
    }

    /// Iterate over all alive entities in slot order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    /// Destroy every entity and component.
    ///
    /// Component registrations survive, so existing `ComponentId`s stay
    /// meaningful. Every handle alive before the clear becomes stale, just as
    /// if it had been destroyed.
    pub fn clear(&mut self) {
        for storage in &mut self.storages {
            storage.clear();
        }
        self.entities.clear();
        tracing::debug!(components = self.storages.len(), "cleared registry");
    }

    fn ensure_valid(&self, entity: Entity) -> EcsResult<()> {
        if self.is_valid(entity) {
            Ok(())
        } else {
            Err(EcsError::InvalidEntity(entity))
        }
    }

    // ==================== Component Operations ====================

    /// Register a component type, creating its storage.
    pub fn register_component<T: Component>(&mut self) -> ComponentId {
        let id = self.components.register::<T>();
        if id.index() == self.storages.len() {
            tracing::debug!(
                component = std::any::type_name::<T>(),
                id = id.as_raw(),
                "created component storage"
            );
            self.storages.push(Box::new(Storage::<T>::new()));
        }
        debug_assert_eq!(self.storages.len(), self.components.len());
        id
    }

    /// Get the component ID for a type, if it has been registered.
    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.components.get_id::<T>()
    }

    /// Component type metadata.
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Attach a component to an entity.
    ///
    /// Fails with [`EcsError::DuplicateComponent`] if the entity already has
    /// a `T`; there is no implicit overwrite.
    pub fn attach<T: Component>(&mut self, entity: Entity, component: T) -> EcsResult<&mut T> {
        self.ensure_valid(entity)?;
        self.storage_or_insert::<T>().attach(entity, component)
    }

    /// Attach a component, overwriting any existing `T` on the entity.
    pub fn attach_or_replace<T: Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> EcsResult<&mut T> {
        self.ensure_valid(entity)?;
        self.storage_or_insert::<T>()
            .attach_or_replace(entity, component)
    }

    /// Overwrite an existing component, returning the old value.
    pub fn replace<T: Component>(&mut self, entity: Entity, component: T) -> EcsResult<T> {
        self.ensure_valid(entity)?;
        self.typed_storage_mut::<T>(entity)?
            .replace(entity, component)
    }

    /// Detach a component from an entity and return it.
    pub fn detach<T: Component>(&mut self, entity: Entity) -> EcsResult<T> {
        self.ensure_valid(entity)?;
        self.typed_storage_mut::<T>(entity)?.detach(entity)
    }

    /// Get a reference to an entity's component.
    pub fn get<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        self.ensure_valid(entity)?;
        match self.storage::<T>() {
            Some(storage) => storage.get(entity),
            None => Err(not_present::<T>(entity)),
        }
    }

    /// Get a mutable reference to an entity's component.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        self.ensure_valid(entity)?;
        self.typed_storage_mut::<T>(entity)?.get_mut(entity)
    }

    /// Get an entity's component, or `None` if the entity is invalid or has
    /// no `T`.
    #[must_use]
    pub fn try_get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>()?.try_get(entity)
    }

    /// Mutable variant of [`Registry::try_get`].
    #[must_use]
    pub fn try_get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.storage_mut::<T>()?.try_get_mut(entity)
    }

    /// Check if an entity has a component. Invalid entities have nothing.
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.storage::<T>().is_some_and(|storage| storage.has(entity))
    }

    /// Number of entities with a `T`.
    #[must_use]
    pub fn count<T: Component>(&self) -> usize {
        self.storage::<T>().map_or(0, Storage::len)
    }

    /// Typed storage for `T`, if the type has been registered.
    #[must_use]
    pub fn storage<T: Component>(&self) -> Option<&Storage<T>> {
        let id = self.components.get_id::<T>()?;
        self.storages[id.index()].as_any().downcast_ref()
    }

    /// Type-erased storage for a component id.
    #[must_use]
    pub fn storage_by_id(&self, id: ComponentId) -> Option<&dyn ComponentStorage> {
        self.storages.get(id.index()).map(AsRef::as_ref)
    }

    /// Mutable typed storage. Crate-private: handing it out would allow
    /// attaching components to dead entities.
    pub(crate) fn storage_mut<T: Component>(&mut self) -> Option<&mut Storage<T>> {
        let id = self.components.get_id::<T>()?;
        self.storages[id.index()].as_any_mut().downcast_mut()
    }

    fn typed_storage_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut Storage<T>> {
        self.storage_mut::<T>()
            .ok_or_else(|| not_present::<T>(entity))
    }

    fn storage_or_insert<T: Component>(&mut self) -> &mut Storage<T> {
        let id = self.register_component::<T>();
        self.storages[id.index()]
            .as_any_mut()
            .downcast_mut()
            .expect("storage type matches its component id")
    }

    /// Borrow the include storages mutably and the exclude storages shared,
    /// all at once. Include slots come back in `include` order; a slot is
    /// `None` if its id has no storage.
    pub(crate) fn split_storages(
        &mut self,
        include: &[ComponentId],
        exclude: &[ComponentId],
    ) -> SplitStorages<'_> {
        let mut slots: SmallVec<[Option<&mut dyn ComponentStorage>; 4]> =
            include.iter().map(|_| None).collect();
        let mut excluded = SmallVec::new();

        for (index, storage) in self.storages.iter_mut().enumerate() {
            let id = ComponentId::from_raw(index as u32);
            if let Some(pos) = include.iter().position(|&wanted| wanted == id) {
                slots[pos] = Some(&mut **storage);
            } else if exclude.contains(&id) {
                excluded.push(storage.set());
            }
        }

        (slots, excluded)
    }

    // ==================== Views ====================

    /// Build a read-only view over every entity that has all components in
    /// `Q`.
    ///
    /// ```
    /// use sbx_ecs::Registry;
    ///
    /// struct Position(f32);
    /// struct Velocity(f32);
    ///
    /// let mut registry = Registry::new();
    /// let e = registry.create();
    /// registry.attach(e, Position(0.0)).unwrap();
    /// registry.attach(e, Velocity(1.0)).unwrap();
    ///
    /// for (entity, pos, vel) in registry.view::<(Position, Velocity)>() {
    ///     assert_eq!(entity, e);
    ///     assert_eq!(pos.0 + vel.0, 1.0);
    /// }
    /// ```
    #[must_use]
    pub fn view<Q: ComponentSet>(&self) -> View<'_, Q> {
        View::new(self)
    }

    /// Build a view yielding mutable references to the components in `Q`.
    ///
    /// # Panics
    ///
    /// Panics if `Q` names the same component type twice.
    #[must_use]
    pub fn view_mut<Q: ComponentSet>(&mut self) -> ViewMut<'_, Q> {
        ViewMut::new(self)
    }

    /// Start building an entity-only view from runtime component terms.
    #[must_use]
    pub fn runtime_view(&self) -> RuntimeViewBuilder<'_> {
        RuntimeViewBuilder::new(self)
    }
}

fn not_present<T>(entity: Entity) -> EcsError {
    EcsError::ComponentNotPresent {
        entity,
        component: std::any::type_name::<T>(),
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("alive", &self.entities.alive_count())
            .field("slots", &self.entities.capacity())
            .field("components", &self.components)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Name(String);

    #[test]
    fn test_create_and_destroy() {
        let mut registry = Registry::new();

        let e0 = registry.create();
        let e1 = registry.create();
        assert_eq!(e0.index(), 0);
        assert_eq!(e1.index(), 1);
        assert_eq!(registry.alive_count(), 2);

        registry.destroy(e0).unwrap();
        assert!(!registry.is_valid(e0));
        assert!(registry.is_valid(e1));
        assert_eq!(registry.alive_count(), 1);
    }

    #[test]
    fn test_destroy_invalid_entity() {
        let mut registry = Registry::new();

        let e = registry.create();
        registry.destroy(e).unwrap();

        assert_eq!(registry.destroy(e), Err(EcsError::InvalidEntity(e)));
        assert_eq!(
            registry.destroy(Entity::NULL),
            Err(EcsError::InvalidEntity(Entity::NULL))
        );
    }

    #[test]
    fn test_attach_get() {
        let mut registry = Registry::new();
        let e = registry.create();

        registry.attach(e, Position { x: 1.0, y: 2.0 }).unwrap();

        assert!(registry.has::<Position>(e));
        assert!(!registry.has::<Velocity>(e));
        assert_eq!(registry.get::<Position>(e), Ok(&Position { x: 1.0, y: 2.0 }));
        assert_eq!(registry.count::<Position>(), 1);
    }

    #[test]
    fn test_attach_to_invalid_entity_changes_nothing() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.destroy(e).unwrap();

        let err = registry.attach(e, Name("ghost".into())).unwrap_err();

        assert_eq!(err, EcsError::InvalidEntity(e));
        assert_eq!(registry.component_id::<Name>(), None);
    }

    #[test]
    fn test_attach_duplicate() {
        let mut registry = Registry::new();
        let e = registry.create();

        registry.attach(e, Name("first".into())).unwrap();
        let err = registry.attach(e, Name("second".into())).unwrap_err();

        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
        assert_eq!(registry.get::<Name>(e).unwrap().0, "first");
    }

    #[test]
    fn test_get_missing_component() {
        let mut registry = Registry::new();
        let e = registry.create();

        // Never registered.
        assert!(matches!(
            registry.get::<Velocity>(e),
            Err(EcsError::ComponentNotPresent { entity, .. }) if entity == e
        ));

        // Registered, but not on this entity.
        let other = registry.create();
        registry.attach(other, Velocity { x: 0.0, y: 0.0 }).unwrap();
        assert!(registry.get::<Velocity>(e).is_err());
        assert!(registry.try_get::<Velocity>(e).is_none());
    }

    #[test]
    fn test_detach() {
        let mut registry = Registry::new();
        let e = registry.create();

        registry.attach(e, Velocity { x: 0.5, y: 0.0 }).unwrap();

        assert_eq!(registry.detach::<Velocity>(e), Ok(Velocity { x: 0.5, y: 0.0 }));
        assert!(!registry.has::<Velocity>(e));
        assert!(matches!(
            registry.detach::<Velocity>(e),
            Err(EcsError::ComponentNotPresent { .. })
        ));
        assert!(registry.is_valid(e));
    }

    #[test]
    fn test_replace_and_upsert() {
        let mut registry = Registry::new();
        let e = registry.create();

        assert!(registry.replace(e, Name("x".into())).is_err());

        registry.attach_or_replace(e, Name("a".into())).unwrap();
        registry.attach_or_replace(e, Name("b".into())).unwrap();
        assert_eq!(registry.replace(e, Name("c".into())), Ok(Name("b".into())));
        assert_eq!(registry.get::<Name>(e).unwrap().0, "c");
        assert_eq!(registry.count::<Name>(), 1);
    }

    #[test]
    fn test_get_mut() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.attach(e, Position { x: 0.0, y: 0.0 }).unwrap();

        registry.get_mut::<Position>(e).unwrap().x = 4.0;
        if let Some(pos) = registry.try_get_mut::<Position>(e) {
            pos.y = 5.0;
        }

        assert_eq!(registry.get::<Position>(e), Ok(&Position { x: 4.0, y: 5.0 }));
    }

    #[test]
    fn test_destroy_purges_all_storages() {
        let mut registry = Registry::new();

        let e = registry.create();
        let keep = registry.create();
        registry.attach(e, Position { x: 1.0, y: 1.0 }).unwrap();
        registry.attach(e, Velocity { x: 1.0, y: 1.0 }).unwrap();
        registry.attach(keep, Position { x: 2.0, y: 2.0 }).unwrap();

        registry.destroy(e).unwrap();

        assert!(!registry.has::<Position>(e));
        assert!(!registry.has::<Velocity>(e));
        assert_eq!(registry.count::<Position>(), 1);
        assert_eq!(registry.count::<Velocity>(), 0);
        assert_eq!(registry.get::<Position>(keep), Ok(&Position { x: 2.0, y: 2.0 }));
    }

    #[test]
    fn test_slot_reuse_scenario() {
        let mut registry = Registry::new();

        let e0 = registry.create();
        assert_eq!((e0.index(), e0.generation().get()), (0, 0));
        registry.attach(e0, Position { x: 1.0, y: 2.0 }).unwrap();
        registry.attach(e0, Velocity { x: 0.0, y: 1.0 }).unwrap();

        registry.destroy(e0).unwrap();
        let e1 = registry.create();

        assert_eq!((e1.index(), e1.generation().get()), (0, 1));
        assert!(!registry.has::<Position>(e1));
        assert!(!registry.is_valid(e0));
        assert_eq!(registry.get::<Position>(e0), Err(EcsError::InvalidEntity(e0)));
    }

    #[test]
    fn test_storage_access() {
        let mut registry = Registry::new();
        assert!(registry.storage::<Position>().is_none());

        let id = registry.register_component::<Position>();
        let e = registry.create();
        registry.attach(e, Position { x: 3.0, y: 3.0 }).unwrap();

        let storage = registry.storage::<Position>().unwrap();
        assert_eq!(storage.entities(), &[e]);

        let erased = registry.storage_by_id(id).unwrap();
        assert_eq!(erased.len(), 1);
        assert!(erased.contains(e));
        assert_eq!(registry.components().get_info(id).unwrap().id(), id);
    }

    #[test]
    fn test_clear() {
        let mut registry = Registry::new();
        for _ in 0..4 {
            let e = registry.create();
            registry.attach(e, Position { x: 0.0, y: 0.0 }).unwrap();
        }

        registry.clear();

        assert_eq!(registry.alive_count(), 0);
        assert_eq!(registry.count::<Position>(), 0);
        assert!(registry.component_id::<Position>().is_some());
        let reused = registry.create();
        assert_eq!(reused.index(), 0);
        assert_eq!(reused.generation().get(), 1);
    }

    #[test]
    fn test_handles_stay_stale_after_clear() {
        let mut registry = Registry::new();
        let old = registry.create();
        registry.attach(old, Position { x: 1.0, y: 1.0 }).unwrap();

        registry.clear();
        let fresh = registry.create();
        registry.attach(fresh, Position { x: 2.0, y: 2.0 }).unwrap();

        assert_eq!(fresh.index(), old.index());
        assert_ne!(fresh, old);
        assert!(!registry.is_valid(old));
        assert!(!registry.has::<Position>(old));
        assert!(registry.try_get::<Position>(old).is_none());
        assert_eq!(registry.destroy(old), Err(EcsError::InvalidEntity(old)));
        assert!(registry.is_valid(fresh));
    }

    #[test]
    fn test_entities_iter() {
        let mut registry = Registry::new();
        let a = registry.create();
        let b = registry.create();
        let c = registry.create();
        registry.destroy(b).unwrap();

        assert_eq!(registry.entities().collect::<Vec<_>>(), vec![a, c]);
    }

    #[test]
    fn test_split_storages() {
        let mut registry = Registry::new();
        let e = registry.create();
        registry.attach(e, Position { x: 0.0, y: 0.0 }).unwrap();
        registry.attach(e, Velocity { x: 0.0, y: 0.0 }).unwrap();
        registry.attach(e, Name("n".into())).unwrap();

        let pos = registry.component_id::<Position>().unwrap();
        let vel = registry.component_id::<Velocity>().unwrap();
        let name = registry.component_id::<Name>().unwrap();

        let (slots, excluded) = registry.split_storages(&[vel, pos], &[name]);

        assert_eq!(slots.len(), 2);
        assert!(slots[0].as_ref().unwrap().component_name().ends_with("Velocity"));
        assert!(slots[1].as_ref().unwrap().component_name().ends_with("Position"));
        assert_eq!(excluded.len(), 1);
        assert!(excluded[0].contains(e));
    }
}
