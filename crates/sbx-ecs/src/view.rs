//! Views - iteration over entities that share a set of components.
//!
//! A view is built from an ordered list of include stores and an optional
//! list of exclude stores. The smallest include store becomes the *driver*:
//! iteration walks its dense entity array and probes the remaining stores for
//! each candidate.
//!
//! When a view has no exclusions and every include store holds exactly the
//! same entities in the same order, the probe is skipped entirely and the
//! dense arrays are zipped positionally (see [`crate::zip`]).
//!
//! Three flavours exist:
//!
//! - [`View`] yields `(Entity, &A, &B, ...)`
//! - [`ViewMut`] yields `(Entity, &mut A, &mut B, ...)`
//! - [`RuntimeView`] is built from component ids at runtime and yields
//!   entities only
//!
//! Views borrow the registry for their whole life, so the stores they walk
//! cannot change underneath them. Record structural changes in a
//! [`CommandBuffer`](crate::CommandBuffer) and apply them afterwards.

#![allow(unsafe_code)]

use std::{any::TypeId, iter::Copied, marker::PhantomData, ptr::NonNull, slice};

use smallvec::{SmallVec, smallvec};

use crate::{
    component::{Component, ComponentId, ComponentRegistry},
    entity::Entity,
    error::{EcsError, EcsResult},
    registry::Registry,
    storage::{ComponentStorage, SparseSet, Storage},
    zip::{Zip, zip},
};

type SetList<'r> = SmallVec<[&'r SparseSet; 4]>;

mod sealed {
    pub trait Sealed {}
}

/// A tuple of component types a view can iterate.
///
/// Implemented for tuples of one to six components and sealed against
/// outside impls. The associated types describe how a view borrows the
/// stores and what it yields; they are an implementation detail of the view
/// machinery.
///
/// ```compile_fail
/// struct Position;
///
/// impl sbx_ecs::ComponentSet for Position {}
/// ```
pub trait ComponentSet: sealed::Sealed + 'static {
    /// Shared borrows of the typed stores.
    type Refs<'r>: Copy;
    /// Item yielded by [`View`].
    type Item<'r>;
    /// Positional iterator used when all stores are aligned.
    type Aligned<'r>: Iterator<Item = Self::Item<'r>>;
    /// Exclusive borrows of the typed stores, split into set and values.
    type Columns<'r>;
    /// Raw value columns used by the probing mutable iterator.
    type Ptrs<'r>: Copy;
    /// Item yielded by [`ViewMut`].
    type ItemMut<'r>;
    /// Positional mutable iterator used when all stores are aligned.
    type AlignedMut<'r>: Iterator<Item = Self::ItemMut<'r>>;

    /// `TypeId`s in tuple order.
    fn type_ids() -> SmallVec<[TypeId; 4]>;

    /// Component ids in tuple order, or `None` if any type is unregistered.
    fn ids(components: &ComponentRegistry) -> Option<SmallVec<[ComponentId; 4]>>;

    /// Borrow every store, or `None` if any type has no store.
    fn refs(registry: &Registry) -> Option<Self::Refs<'_>>;

    /// Membership sets of the borrowed stores, in tuple order.
    fn sets<'r>(refs: Self::Refs<'r>) -> SetList<'r>;

    /// Fetch `entity`'s components, probing stores in tuple order.
    fn fetch<'r>(refs: Self::Refs<'r>, entity: Entity) -> Option<Self::Item<'r>>;

    /// Zip the dense arrays against `entities`.
    fn aligned<'r>(refs: Self::Refs<'r>, entities: &'r [Entity]) -> Option<Self::Aligned<'r>>;

    /// Downcast one exclusive store borrow per slot, in tuple order.
    fn columns<'r>(
        slots: &mut [Option<&'r mut dyn ComponentStorage>],
    ) -> Option<Self::Columns<'r>>;

    /// Membership sets of the exclusively borrowed stores.
    fn column_sets<'r>(columns: &Self::Columns<'r>) -> SetList<'r>;

    /// Zip the mutable dense arrays against `entities`.
    fn aligned_mut<'r>(
        columns: Self::Columns<'r>,
        entities: &'r [Entity],
    ) -> Option<Self::AlignedMut<'r>>;

    /// Convert exclusive borrows into raw columns for random access.
    fn ptrs<'r>(columns: Self::Columns<'r>) -> Self::Ptrs<'r>;

    /// Fetch `entity`'s components mutably.
    ///
    /// # Safety
    ///
    /// No reference previously returned for `entity` from the same `ptrs`
    /// may still be alive.
    unsafe fn fetch_mut<'r>(ptrs: Self::Ptrs<'r>, entity: Entity) -> Option<Self::ItemMut<'r>>;
}

/// Exclusive access to one value column, addressable by dense position.
///
/// Created from a `&'r mut [T]`; the borrow is held for `'r` by the marker.
pub struct RawColumn<'r, T> {
    ptr: NonNull<T>,
    len: usize,
    _marker: PhantomData<&'r mut [T]>,
}

impl<T> Clone for RawColumn<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RawColumn<'_, T> {}

impl<'r, T> RawColumn<'r, T> {
    fn new(values: &'r mut [T]) -> Self {
        Self {
            len: values.len(),
            ptr: NonNull::from(values).cast(),
            _marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// `index` must be in bounds and no other reference to that element may
    /// be alive.
    unsafe fn get(self, index: usize) -> &'r mut T {
        debug_assert!(index < self.len);
        // SAFETY: in bounds per the caller; the column was built from a
        // `&'r mut [T]`, so nothing outside this column aliases it.
        unsafe { &mut *self.ptr.as_ptr().add(index) }
    }
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> sealed::Sealed for ($($name,)+) {}

        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            type Refs<'r> = ($(&'r Storage<$name>,)+);
            type Item<'r> = (Entity, $(&'r $name,)+);
            type Aligned<'r> = Zip<(Copied<slice::Iter<'r, Entity>>, $(slice::Iter<'r, $name>,)+)>;
            type Columns<'r> = ($((&'r SparseSet, &'r mut [$name]),)+);
            type Ptrs<'r> = ($((&'r SparseSet, RawColumn<'r, $name>),)+);
            type ItemMut<'r> = (Entity, $(&'r mut $name,)+);
            type AlignedMut<'r> =
                Zip<(Copied<slice::Iter<'r, Entity>>, $(slice::IterMut<'r, $name>,)+)>;

            fn type_ids() -> SmallVec<[TypeId; 4]> {
                smallvec![$(TypeId::of::<$name>()),+]
            }

            fn ids(components: &ComponentRegistry) -> Option<SmallVec<[ComponentId; 4]>> {
                Some(smallvec![$(components.get_id::<$name>()?),+])
            }

            fn refs(registry: &Registry) -> Option<Self::Refs<'_>> {
                Some(($(registry.storage::<$name>()?,)+))
            }

            #[allow(non_snake_case)]
            fn sets<'r>(refs: Self::Refs<'r>) -> SetList<'r> {
                let ($($name,)+) = refs;
                smallvec![$($name.set()),+]
            }

            #[allow(non_snake_case)]
            fn fetch<'r>(refs: Self::Refs<'r>, entity: Entity) -> Option<Self::Item<'r>> {
                let ($($name,)+) = refs;
                Some((entity, $($name.try_get(entity)?,)+))
            }

            #[allow(non_snake_case)]
            fn aligned<'r>(
                refs: Self::Refs<'r>,
                entities: &'r [Entity],
            ) -> Option<Self::Aligned<'r>> {
                let ($($name,)+) = refs;
                zip((entities.iter().copied(), $($name.values().iter(),)+)).ok()
            }

            #[allow(non_snake_case)]
            fn columns<'r>(
                slots: &mut [Option<&'r mut dyn ComponentStorage>],
            ) -> Option<Self::Columns<'r>> {
                let mut slots = slots.iter_mut();
                $(
                    let $name = slots
                        .next()?
                        .take()?
                        .as_any_mut()
                        .downcast_mut::<Storage<$name>>()?
                        .split_mut();
                )+
                Some(($($name,)+))
            }

            #[allow(non_snake_case)]
            fn column_sets<'r>(columns: &Self::Columns<'r>) -> SetList<'r> {
                let ($($name,)+) = columns;
                smallvec![$($name.0),+]
            }

            #[allow(non_snake_case)]
            fn aligned_mut<'r>(
                columns: Self::Columns<'r>,
                entities: &'r [Entity],
            ) -> Option<Self::AlignedMut<'r>> {
                let ($($name,)+) = columns;
                zip((entities.iter().copied(), $($name.1.iter_mut(),)+)).ok()
            }

            #[allow(non_snake_case)]
            fn ptrs<'r>(columns: Self::Columns<'r>) -> Self::Ptrs<'r> {
                let ($($name,)+) = columns;
                ($(($name.0, RawColumn::new($name.1)),)+)
            }

            #[allow(non_snake_case)]
            unsafe fn fetch_mut<'r>(
                ptrs: Self::Ptrs<'r>,
                entity: Entity,
            ) -> Option<Self::ItemMut<'r>> {
                let ($($name,)+) = ptrs;
                // SAFETY: each column belongs to a distinct store and the
                // caller guarantees `entity` has not been handed out before.
                Some((entity, $(unsafe { $name.1.get($name.0.index_of(entity)?) },)+))
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);

/// Include/exclude membership test shared by every view flavour.
#[derive(Debug, Clone)]
pub(crate) struct Filter<'r> {
    include: SetList<'r>,
    exclude: SetList<'r>,
    /// Position of the driving store in `include`.
    driver: usize,
}

impl<'r> Filter<'r> {
    /// Pick the smallest include store as driver. Ties keep the earliest.
    pub(crate) fn new(include: SetList<'r>, exclude: SetList<'r>) -> EcsResult<Self> {
        let driver = include
            .iter()
            .enumerate()
            .min_by_key(|(_, set)| set.len())
            .map(|(pos, _)| pos)
            .ok_or(EcsError::EmptyView)?;

        Ok(Self {
            include,
            exclude,
            driver,
        })
    }

    pub(crate) fn driver(&self) -> &'r SparseSet {
        self.include[self.driver]
    }

    /// Candidates in driver dense order.
    pub(crate) fn candidates(&self) -> &'r [Entity] {
        self.driver().entities()
    }

    pub(crate) fn exclude(&mut self, set: &'r SparseSet) {
        self.exclude.push(set);
    }

    pub(crate) fn excluded(&self, entity: Entity) -> bool {
        self.exclude.iter().any(|set| set.contains(entity))
    }

    /// Full include/exclude test. Include stores are probed in order and the
    /// first miss short-circuits.
    pub(crate) fn contains(&self, entity: Entity) -> bool {
        self.include.iter().all(|set| set.contains(entity)) && !self.excluded(entity)
    }

    /// Whether every include store holds the driver's entities in the
    /// driver's order and nothing is excluded.
    pub(crate) fn is_aligned(&self) -> bool {
        if !self.exclude.is_empty() {
            return false;
        }
        let driver = self.candidates();
        self.include.iter().all(|set| set.len() == driver.len())
            && self.include.iter().all(|set| set.entities() == driver)
    }

    pub(crate) fn len_hint(&self) -> usize {
        self.driver().len()
    }
}

/// Read-only view over every entity that has all components in `Q`.
///
/// Built with [`Registry::view`].
pub struct View<'r, Q: ComponentSet> {
    registry: &'r Registry,
    /// `None` when some include type has no store: the view is empty.
    state: Option<(Q::Refs<'r>, Filter<'r>)>,
}

impl<'r, Q: ComponentSet> View<'r, Q> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        let state = Q::refs(registry).and_then(|refs| {
            let filter = Filter::new(Q::sets(refs), SmallVec::new()).ok()?;
            Some((refs, filter))
        });
        Self { registry, state }
    }

    /// Skip entities that have a `T`.
    ///
    /// A type that was never attached in this registry excludes nothing.
    pub fn without<T: Component>(mut self) -> Self {
        if let Some((_, filter)) = &mut self.state {
            if let Some(storage) = self.registry.storage::<T>() {
                filter.exclude(storage.set());
            }
        }
        self
    }

    /// Check whether `entity` would be yielded by this view.
    #[must_use]
    pub fn find(&self, entity: Entity) -> bool {
        self.state
            .as_ref()
            .is_some_and(|(_, filter)| filter.contains(entity))
    }

    /// Fetch `entity`'s item, if it matches the view.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<Q::Item<'r>> {
        let (refs, filter) = self.state.as_ref()?;
        if filter.excluded(entity) {
            return None;
        }
        Q::fetch(*refs, entity)
    }

    /// Upper bound on the number of items: the driver store's length.
    #[must_use]
    pub fn len_hint(&self) -> usize {
        self.state
            .as_ref()
            .map_or(0, |(_, filter)| filter.len_hint())
    }

    /// Whether iteration will zip the stores instead of probing.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|(_, filter)| filter.is_aligned())
    }

    /// Call `f` for every matching item.
    pub fn each(self, mut f: impl FnMut(Q::Item<'r>)) {
        for item in self {
            f(item);
        }
    }
}

impl<'r, Q: ComponentSet> IntoIterator for View<'r, Q> {
    type Item = Q::Item<'r>;
    type IntoIter = ViewIter<'r, Q>;

    fn into_iter(self) -> Self::IntoIter {
        let Some((refs, filter)) = self.state else {
            return ViewIter::new(Walk::Empty);
        };

        if filter.is_aligned() {
            if let Some(aligned) = Q::aligned(refs, filter.candidates()) {
                return ViewIter::new(Walk::Aligned(aligned));
            }
        }

        ViewIter::new(Walk::Probe {
            refs,
            cursor: filter.candidates().iter(),
            filter,
        })
    }
}

/// How a view iterator walks its stores.
enum Walk<'r, Aligned, State> {
    /// Some include store is missing.
    Empty,
    /// Every include store holds the driver's entities in the same order.
    Aligned(Aligned),
    /// Walk the driver and probe the other stores per entity.
    Probe {
        refs: State,
        filter: Filter<'r>,
        cursor: slice::Iter<'r, Entity>,
    },
}

impl<Aligned: Iterator, State> Walk<'_, Aligned, State> {
    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Empty => (0, Some(0)),
            Self::Aligned(iter) => iter.size_hint(),
            Self::Probe { cursor, .. } => (0, Some(cursor.len())),
        }
    }
}

/// Iterator over a [`View`].
pub struct ViewIter<'r, Q: ComponentSet> {
    walk: Walk<'r, Q::Aligned<'r>, Q::Refs<'r>>,
}

impl<'r, Q: ComponentSet> ViewIter<'r, Q> {
    fn new(walk: Walk<'r, Q::Aligned<'r>, Q::Refs<'r>>) -> Self {
        Self { walk }
    }
}

impl<'r, Q: ComponentSet> Iterator for ViewIter<'r, Q> {
    type Item = Q::Item<'r>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.walk {
            Walk::Empty => None,
            Walk::Aligned(iter) => iter.next(),
            Walk::Probe {
                refs,
                filter,
                cursor,
            } => {
                for &entity in cursor.by_ref() {
                    let Some(item) = Q::fetch(*refs, entity) else {
                        continue;
                    };
                    if !filter.excluded(entity) {
                        return Some(item);
                    }
                }
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.walk.size_hint()
    }
}

/// View yielding mutable references to every component in `Q`.
///
/// Built with [`Registry::view_mut`].
pub struct ViewMut<'r, Q: ComponentSet> {
    registry: &'r mut Registry,
    exclude: SmallVec<[ComponentId; 4]>,
    _marker: PhantomData<fn() -> Q>,
}

impl<'r, Q: ComponentSet> ViewMut<'r, Q> {
    /// # Panics
    ///
    /// Panics if `Q` names the same component type twice.
    pub(crate) fn new(registry: &'r mut Registry) -> Self {
        let types = Q::type_ids();
        for (pos, ty) in types.iter().enumerate() {
            assert!(
                !types[..pos].contains(ty),
                "mutable view names the same component type twice"
            );
        }

        Self {
            registry,
            exclude: SmallVec::new(),
            _marker: PhantomData,
        }
    }

    /// Skip entities that have a `T`.
    pub fn without<T: Component>(mut self) -> Self {
        if let Some(id) = self.registry.component_id::<T>() {
            self.exclude.push(id);
        }
        self
    }

    fn shared_filter(&self) -> Option<Filter<'_>> {
        let refs = Q::refs(self.registry)?;
        let mut filter = Filter::new(Q::sets(refs), SmallVec::new()).ok()?;
        for &id in &self.exclude {
            if let Some(storage) = self.registry.storage_by_id(id) {
                filter.exclude(storage.set());
            }
        }
        Some(filter)
    }

    /// Check whether `entity` would be yielded by this view.
    #[must_use]
    pub fn find(&self, entity: Entity) -> bool {
        self.shared_filter()
            .is_some_and(|filter| filter.contains(entity))
    }

    /// Upper bound on the number of items: the driver store's length.
    #[must_use]
    pub fn len_hint(&self) -> usize {
        self.shared_filter().map_or(0, |filter| filter.len_hint())
    }

    /// Call `f` for every matching item.
    pub fn each(self, mut f: impl FnMut(Q::ItemMut<'r>)) {
        for item in self {
            f(item);
        }
    }
}

impl<'r, Q: ComponentSet> IntoIterator for ViewMut<'r, Q> {
    type Item = Q::ItemMut<'r>;
    type IntoIter = ViewIterMut<'r, Q>;

    fn into_iter(self) -> Self::IntoIter {
        let Self {
            registry, exclude, ..
        } = self;

        let Some(include) = Q::ids(registry.components()) else {
            return ViewIterMut::new(Walk::Empty);
        };
        // Excluding an included type rejects every candidate.
        if exclude.iter().any(|id| include.contains(id)) {
            return ViewIterMut::new(Walk::Empty);
        }

        let (mut slots, exclude_sets) = registry.split_storages(&include, &exclude);
        let Some(columns) = Q::columns(&mut slots) else {
            return ViewIterMut::new(Walk::Empty);
        };
        let Ok(filter) = Filter::new(Q::column_sets(&columns), exclude_sets) else {
            return ViewIterMut::new(Walk::Empty);
        };

        if filter.is_aligned() {
            let walk = match Q::aligned_mut(columns, filter.candidates()) {
                Some(aligned) => Walk::Aligned(aligned),
                None => Walk::Empty,
            };
            return ViewIterMut::new(walk);
        }

        ViewIterMut::new(Walk::Probe {
            refs: Q::ptrs(columns),
            cursor: filter.candidates().iter(),
            filter,
        })
    }
}

/// Iterator over a [`ViewMut`].
pub struct ViewIterMut<'r, Q: ComponentSet> {
    walk: Walk<'r, Q::AlignedMut<'r>, Q::Ptrs<'r>>,
}

impl<'r, Q: ComponentSet> ViewIterMut<'r, Q> {
    fn new(walk: Walk<'r, Q::AlignedMut<'r>, Q::Ptrs<'r>>) -> Self {
        Self { walk }
    }
}

impl<'r, Q: ComponentSet> Iterator for ViewIterMut<'r, Q> {
    type Item = Q::ItemMut<'r>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.walk {
            Walk::Empty => None,
            Walk::Aligned(iter) => iter.next(),
            Walk::Probe {
                refs: ptrs,
                filter,
                cursor,
            } => {
                for &entity in cursor.by_ref() {
                    if filter.excluded(entity) {
                        continue;
                    }
                    // SAFETY: the cursor walks a sparse set's dense array, so
                    // every entity comes up exactly once.
                    if let Some(item) = unsafe { Q::fetch_mut(*ptrs, entity) } {
                        return Some(item);
                    }
                }
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.walk.size_hint()
    }
}

/// Builder for a [`RuntimeView`].
///
/// ```
/// use sbx_ecs::Registry;
///
/// struct Alive;
/// struct Frozen;
///
/// let mut registry = Registry::new();
/// let a = registry.create();
/// let b = registry.create();
/// registry.attach(a, Alive).unwrap();
/// registry.attach(b, Alive).unwrap();
/// registry.attach(b, Frozen).unwrap();
///
/// let view = registry
///     .runtime_view()
///     .with::<Alive>()
///     .without::<Frozen>()
///     .build()
///     .unwrap();
/// assert_eq!(view.into_iter().collect::<Vec<_>>(), vec![a]);
///
/// assert!(registry.runtime_view().build().is_err());
/// ```
pub struct RuntimeViewBuilder<'r> {
    registry: &'r Registry,
    /// `None` entries are include terms with no store.
    include: SmallVec<[Option<&'r SparseSet>; 4]>,
    exclude: SetList<'r>,
}

impl<'r> RuntimeViewBuilder<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            include: SmallVec::new(),
            exclude: SmallVec::new(),
        }
    }

    fn set_of(&self, id: Option<ComponentId>) -> Option<&'r SparseSet> {
        let registry = self.registry;
        registry.storage_by_id(id?).map(|storage| storage.set())
    }

    /// Require a `T`.
    pub fn with<T: Component>(self) -> Self {
        let id = self.registry.component_id::<T>();
        self.with_term(id)
    }

    /// Require the component with `id`.
    pub fn with_id(self, id: ComponentId) -> Self {
        self.with_term(Some(id))
    }

    fn with_term(mut self, id: Option<ComponentId>) -> Self {
        let set = self.set_of(id);
        self.include.push(set);
        self
    }

    /// Skip entities that have a `T`.
    pub fn without<T: Component>(self) -> Self {
        let id = self.registry.component_id::<T>();
        self.without_term(id)
    }

    /// Skip entities that have the component with `id`.
    pub fn without_id(self, id: ComponentId) -> Self {
        self.without_term(Some(id))
    }

    fn without_term(mut self, id: Option<ComponentId>) -> Self {
        if let Some(set) = self.set_of(id) {
            self.exclude.push(set);
        }
        self
    }

    /// Finish the view.
    ///
    /// Fails with [`EcsError::EmptyView`] if no include term was given.
    pub fn build(self) -> EcsResult<RuntimeView<'r>> {
        if self.include.is_empty() {
            return Err(EcsError::EmptyView);
        }

        let include: Option<SetList<'r>> = self.include.into_iter().collect();
        let filter = include
            .map(|include| Filter::new(include, self.exclude))
            .transpose()?;
        Ok(RuntimeView { filter })
    }
}

/// Entity-only view built from runtime component terms.
#[derive(Debug, Clone)]
pub struct RuntimeView<'r> {
    filter: Option<Filter<'r>>,
}

impl<'r> RuntimeView<'r> {
    /// Check whether `entity` would be yielded by this view.
    #[must_use]
    pub fn find(&self, entity: Entity) -> bool {
        self.filter
            .as_ref()
            .is_some_and(|filter| filter.contains(entity))
    }

    /// Upper bound on the number of entities: the driver store's length.
    #[must_use]
    pub fn len_hint(&self) -> usize {
        self.filter.as_ref().map_or(0, Filter::len_hint)
    }

    /// Call `f` for every matching entity.
    pub fn each(self, mut f: impl FnMut(Entity)) {
        for entity in self {
            f(entity);
        }
    }
}

impl<'r> IntoIterator for RuntimeView<'r> {
    type Item = Entity;
    type IntoIter = RuntimeViewIter<'r>;

    fn into_iter(self) -> Self::IntoIter {
        let cursor = self
            .filter
            .as_ref()
            .map_or(&[][..], Filter::candidates)
            .iter();
        RuntimeViewIter {
            filter: self.filter,
            cursor,
        }
    }
}

/// Iterator over a [`RuntimeView`].
#[derive(Debug, Clone)]
pub struct RuntimeViewIter<'r> {
    filter: Option<Filter<'r>>,
    cursor: slice::Iter<'r, Entity>,
}

impl Iterator for RuntimeViewIter<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let filter = self.filter.as_ref()?;
        self.cursor
            .by_ref()
            .copied()
            .find(|&entity| filter.contains(entity))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.cursor.len()))
    }
}
