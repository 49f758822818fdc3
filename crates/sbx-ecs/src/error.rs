//! ECS error types.

use thiserror::Error;

use crate::entity::Entity;

/// Errors reported by registry, storage, view and zip operations.
///
/// Every failing operation leaves the registry exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EcsError {
    /// The handle is stale (slot reused or destroyed) or out of range.
    #[error("invalid entity: {0}")]
    InvalidEntity(Entity),

    /// `attach` on an entity that already has the component.
    #[error("entity {entity} already has component {component}")]
    DuplicateComponent {
        entity: Entity,
        component: &'static str,
    },

    /// `get`, `detach` or `replace` on an entity without the component.
    #[error("entity {entity} has no component {component}")]
    ComponentNotPresent {
        entity: Entity,
        component: &'static str,
    },

    /// A view was built without any include terms.
    #[error("view requires at least one included component")]
    EmptyView,

    /// Zipped sequences differ in length.
    #[error("zip length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
