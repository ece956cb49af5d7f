//! Archetype-based storage of entities and their components.
//!
//! Entities carrying the same set of component types live together in one
//! [`Archetype`](archetype::Archetype), where each component type is stored
//! in its own dense column. A [`Query`](query::Query) selects archetypes by
//! the component types they must and must not have.

pub mod archetype;
pub mod component;
pub mod entity;
pub mod error;
pub mod mask;
pub mod query;
pub mod storage;

pub use component::Component;
pub use error::{ComponentChange, EcsError, Result};

/// Derive macro generating an impl of the trait
/// [`Component`](component::Component).
///
/// The type must implement [`Pod`](bytemuck::Pod) and cannot be generic.
/// The derived component ID is a hash of the module path and name of the
/// type, and a [`ComponentDescriptor`](component::ComponentDescriptor) for
/// the type is registered with [`inventory`].
pub use arche_ecs_macros::Component;

/// Creates the [`ComponentMask`](mask::ComponentMask) containing the given
/// component types.
///
/// Providing no components gives the empty mask. All provided types must
/// implement the [`Component`](component::Component) trait, and no type can
/// be repeated. The order in which the component types are specified does
/// not affect the result.
///
/// ```ignore
/// mask_of!(Comp1, Comp2, ...)
/// ```
pub use arche_ecs_macros::mask_of;

#[doc(hidden)]
pub use inventory;
