//! In-memory entity store organizing entities by the exact set of component
//! types they carry.

pub mod config;
pub mod system;
pub mod world;

// Brings in both the `Component` trait and its derive macro
pub use arche_ecs::{
    Component, ComponentChange, EcsError, Result,
    component::ComponentSet,
    entity::{EntityID, EntityLedger, EntityManager},
    mask_of,
    query::Query,
};
pub use config::WorldConfig;
pub use system::{System, SystemID};
pub use world::World;
