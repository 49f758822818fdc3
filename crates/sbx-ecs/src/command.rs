//! Deferred structural changes.
//!
//! Views borrow the registry, so a system cannot create, destroy, attach or
//! detach while it iterates. It records those changes into a
//! [`CommandBuffer`] instead and applies the buffer once the view is gone.
//!
//! ```
//! use sbx_ecs::{CommandBuffer, Registry};
//!
//! struct Health(i32);
//! struct Dead;
//!
//! let mut registry = Registry::new();
//! let e = registry.create();
//! registry.attach(e, Health(0)).unwrap();
//!
//! let mut commands = CommandBuffer::new();
//! for (entity, health) in registry.view::<(Health,)>() {
//!     if health.0 <= 0 {
//!         commands.attach(entity, Dead);
//!     }
//! }
//!
//! assert_eq!(commands.apply(&mut registry), Ok(1));
//! assert!(registry.has::<Dead>(e));
//! ```

use std::{collections::VecDeque, fmt};

use crate::{
    component::Component,
    entity::Entity,
    error::EcsResult,
    registry::Registry,
};

type Command = Box<dyn FnOnce(&mut Registry) -> EcsResult<()> + Send>;

/// Queue of registry operations, applied in record order.
#[derive(Default)]
pub struct CommandBuffer {
    commands: VecDeque<Command>,
}

impl CommandBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an arbitrary operation.
    pub fn push<F>(&mut self, command: F)
    where
        F: FnOnce(&mut Registry) -> EcsResult<()> + Send + 'static,
    {
        self.commands.push_back(Box::new(command));
    }

    /// Record the creation of an entity; `init` receives the new handle.
    pub fn create_with<F>(&mut self, init: F)
    where
        F: FnOnce(&mut Registry, Entity) -> EcsResult<()> + Send + 'static,
    {
        self.push(move |registry| {
            let entity = registry.create();
            init(registry, entity)
        });
    }

    /// Record the destruction of `entity`.
    pub fn destroy(&mut self, entity: Entity) {
        self.push(move |registry| registry.destroy(entity));
    }

    /// Record attaching `component` to `entity`.
    pub fn attach<T: Component>(&mut self, entity: Entity, component: T) {
        self.push(move |registry| registry.attach(entity, component).map(|_| ()));
    }

    /// Record attaching or overwriting `component` on `entity`.
    pub fn attach_or_replace<T: Component>(&mut self, entity: Entity, component: T) {
        self.push(move |registry| registry.attach_or_replace(entity, component).map(|_| ()));
    }

    /// Record detaching `T` from `entity`. The detached value is dropped.
    pub fn detach<T: Component>(&mut self, entity: Entity) {
        self.push(move |registry| registry.detach::<T>(entity).map(drop));
    }

    /// Run every recorded command in order.
    ///
    /// Returns the number of commands applied. On the first failure the
    /// error is returned and the commands after the failing one stay queued;
    /// the failing command itself is discarded.
    pub fn apply(&mut self, registry: &mut Registry) -> EcsResult<usize> {
        let mut applied = 0;
        while let Some(command) = self.commands.pop_front() {
            if let Err(err) = command(registry) {
                tracing::warn!(
                    %err,
                    applied,
                    remaining = self.commands.len(),
                    "command failed, stopping"
                );
                return Err(err);
            }
            applied += 1;
        }

        tracing::trace!(applied, "applied command buffer");
        Ok(applied)
    }

    /// Number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop every queued command without running it.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("len", &self.commands.len())
            .finish()
    }
}
