#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::float_cmp)]

//! SBX ECS - sparse-set Entity Component System
//!
//! The registry behind the engine's scene graph: it hands out versioned
//! entity handles, stores one packed array per component type and iterates
//! entities that share a set of components.
//!
//! # Key Concepts
//!
//! - **Entity**: a `(index, generation)` handle; destroying an entity bumps
//!   the generation so stale copies never validate again
//! - **Component**: any `Send + Sync + 'static` value attached to an entity
//! - **Storage**: per-type sparse set with O(1) attach, detach and lookup
//! - **View**: iteration over entities having every included component and
//!   none of the excluded ones, driven by the smallest store
//! - **CommandBuffer**: structural changes recorded during iteration and
//!   applied afterwards
//!
//! # Example
//!
//! ```
//! use sbx_ecs::prelude::*;
//!
//! #[derive(Debug, PartialEq)]
//! struct Position { x: f32, y: f32 }
//! struct Velocity { x: f32, y: f32 }
//!
//! let mut registry = Registry::new();
//! let e = registry.create();
//! registry.attach(e, Position { x: 0.0, y: 0.0 }).unwrap();
//! registry.attach(e, Velocity { x: 1.0, y: 2.0 }).unwrap();
//!
//! for (_, pos, vel) in registry.view_mut::<(Position, Velocity)>() {
//!     pos.x += vel.x;
//!     pos.y += vel.y;
//! }
//!
//! assert_eq!(registry.get::<Position>(e), Ok(&Position { x: 1.0, y: 2.0 }));
//! ```

mod command;
mod component;
mod entity;
mod error;
mod registry;
mod storage;
mod view;
pub mod zip;

pub use command::CommandBuffer;
pub use component::{Component, ComponentId, ComponentInfo, ComponentRegistry};
pub use entity::{Entity, EntityIndex, Generation};
pub use error::{EcsError, EcsResult};
pub use registry::Registry;
pub use storage::{ComponentStorage, SparseSet, Storage};
pub use view::{
    ComponentSet, RuntimeView, RuntimeViewBuilder, RuntimeViewIter, View, ViewIter, ViewIterMut,
    ViewMut,
};
pub use zip::zip;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{CommandBuffer, Component, EcsError, EcsResult, Entity, Registry};
}
