//! Errors reported by entity and component operations.

use crate::{component::ComponentID, entity::EntityID, mask::MaskID};
use thiserror::Error;

/// Shorthand for results of ECS operations.
pub type Result<T> = std::result::Result<T, EcsError>;

/// Everything that can go wrong when operating on entities and their
/// components.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EcsError {
    #[error("entity {0} does not exist")]
    EntityNotFound(EntityID),

    #[error("entity {entity} has no component {component}")]
    ComponentNotFound {
        entity: EntityID,
        component: ComponentID,
    },

    #[error("entity {0} is already present")]
    AlreadyPresent(EntityID),

    #[error("components {found} do not match archetype {expected}")]
    MaskMismatch { expected: MaskID, found: MaskID },

    #[error("component {0} was given more than once")]
    DuplicateComponent(ComponentID),

    #[error("operation failed: {0}")]
    OperationFailed(String),
}

/// What a successful component mutation did to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentChange {
    /// A component of a type the entity did not have was added, moving the
    /// entity to a new archetype.
    Added,
    /// An existing component was overwritten in place.
    Updated,
    /// A component was removed.
    Removed,
}
