//! The world: entities, their components and the systems acting on them.

use crate::{
    config::WorldConfig,
    system::{System, SystemID, SystemManager},
};
use arche_ecs::{
    ComponentChange, EcsError, Result,
    component::{Component, ComponentRegistry, ComponentSet},
    entity::{EntityID, EntityLedger, EntityManager},
    mask::ComponentMask,
    query::Query,
    storage::ComponentStorage,
};
use arche_utils::with_trace_logging;

/// Container for all entities, their components and the systems that
/// operate on them.
///
/// Component operations are only permitted on live entities. An entity is
/// alive from [`Self::create_entity`] until [`Self::destroy_entity`].
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    ledger: Box<dyn EntityLedger>,
    storage: ComponentStorage,
    component_registry: ComponentRegistry,
    system_manager: SystemManager,
}

impl World {
    /// Creates an empty world with the given configuration, tracking entity
    /// lifetimes with an [`EntityManager`].
    ///
    /// # Errors
    /// Returns an error if two registered component types have the same ID.
    pub fn new(config: WorldConfig) -> anyhow::Result<Self> {
        let ledger = match config.entity_id_seed {
            Some(seed) => EntityManager::with_seed(seed),
            None => EntityManager::new(),
        };
        Self::with_ledger(config, Box::new(ledger))
    }

    /// Creates an empty world with the given configuration, tracking entity
    /// lifetimes with the given ledger. The entity ID seed in the
    /// configuration is ignored.
    ///
    /// # Errors
    /// Returns an error if two registered component types have the same ID.
    pub fn with_ledger(config: WorldConfig, ledger: Box<dyn EntityLedger>) -> anyhow::Result<Self> {
        let component_registry = ComponentRegistry::from_registered_components()?;

        log::info!(
            "Created world with {} registered component types",
            component_registry.n_components()
        );

        Ok(Self {
            config,
            ledger,
            storage: ComponentStorage::new(),
            component_registry,
            system_manager: SystemManager::new(),
        })
    }

    /// Returns the configuration of the world.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Returns the storage holding the components of all entities.
    pub fn storage(&self) -> &ComponentStorage {
        &self.storage
    }

    /// Returns the registry of known component types.
    pub fn component_registry(&self) -> &ComponentRegistry {
        &self.component_registry
    }

    /// Returns the manager of the systems registered with the world.
    pub fn system_manager(&self) -> &SystemManager {
        &self.system_manager
    }

    /// Returns the number of entities that currently have a place in
    /// component storage.
    pub fn entity_count(&self) -> usize {
        self.storage.entity_count()
    }

    /// Creates a new live entity with no components.
    ///
    /// # Errors
    /// Returns [`EcsError::AlreadyPresent`] if the ledger hands out an ID
    /// that is already in use.
    pub fn create_entity(&mut self) -> Result<EntityID> {
        let entity_id = self.ledger.create();
        self.storage.register_entity(entity_id)?;
        log::trace!("Created entity {}", entity_id);
        Ok(entity_id)
    }

    /// Destroys the given entity along with all its components.
    ///
    /// # Errors
    /// Returns [`EcsError::EntityNotFound`] if the entity is not alive, in
    /// which case nothing is modified.
    pub fn destroy_entity(&mut self, entity_id: EntityID) -> Result<()> {
        self.ledger.destroy(entity_id)?;
        match self.storage.remove_entity(entity_id) {
            // The entity may already have left storage by losing its last
            // component
            Ok(()) | Err(EcsError::EntityNotFound(_)) => {}
            Err(err) => return Err(err),
        }
        log::trace!("Destroyed entity {}", entity_id);
        Ok(())
    }

    /// Whether the given entity is alive.
    pub fn is_alive(&self, entity_id: EntityID) -> bool {
        self.ledger.is_alive(entity_id)
    }

    /// Gives the entity the given component, overwriting any existing
    /// component of the same type.
    ///
    /// # Errors
    /// Returns [`EcsError::EntityNotFound`] if the entity is not alive or
    /// has left component storage.
    pub fn add_component<C: Component>(
        &mut self,
        entity_id: EntityID,
        component: &C,
    ) -> Result<ComponentChange> {
        self.verify_alive(entity_id)?;
        let archetype_count = self.storage.archetype_count();

        let change = self.storage.add_component(entity_id, component)?;

        self.log_new_archetypes(archetype_count);
        Ok(change)
    }

    /// Removes the component of type `C` from the entity. An entity losing
    /// its last component leaves component storage but stays alive.
    ///
    /// # Errors
    /// Returns an error if the entity is not alive or does not have the
    /// component.
    pub fn remove_component<C: Component>(&mut self, entity_id: EntityID) -> Result<ComponentChange> {
        self.verify_alive(entity_id)?;
        let archetype_count = self.storage.archetype_count();

        let change = self.storage.remove_component::<C>(entity_id)?;

        self.log_new_archetypes(archetype_count);
        Ok(change)
    }

    /// Returns a copy of the component of type `C` for the given entity.
    ///
    /// # Errors
    /// Returns an error if the entity is not alive or does not have the
    /// component.
    pub fn get_component<C: Component>(&self, entity_id: EntityID) -> Result<C> {
        self.verify_alive(entity_id)?;
        self.storage.get_component::<C>(entity_id)
    }

    /// Returns copies of all the components in the set `S` for the given
    /// entity, for example `world.get_components::<(Position, Velocity)>(entity)`.
    ///
    /// # Errors
    /// Returns an error if the entity is not alive or lacks any of the
    /// components.
    pub fn get_components<S: ComponentSet>(&self, entity_id: EntityID) -> Result<S> {
        self.verify_alive(entity_id)?;
        self.storage.get_components::<S>(entity_id)
    }

    /// Whether the given entity is alive and has a component of type `C`.
    pub fn has_component<C: Component>(&self, entity_id: EntityID) -> bool {
        self.is_alive(entity_id) && self.storage.has_component::<C>(entity_id)
    }

    /// Returns a copy of the component of type `C` for the given entity.
    ///
    /// # Panics
    /// If [`Self::get_component`] fails.
    pub fn component<C: Component>(&self, entity_id: EntityID) -> C {
        expect_component_operation("get_component", self.get_component::<C>(entity_id))
    }

    /// Returns copies of all the components in the set `S` for the given
    /// entity.
    ///
    /// # Panics
    /// If [`Self::get_components`] fails.
    pub fn components<S: ComponentSet>(&self, entity_id: EntityID) -> S {
        expect_component_operation("get_components", self.get_components::<S>(entity_id))
    }

    /// Older name for [`Self::component`]. Logs a warning when deprecation
    /// warnings are enabled in the configuration.
    ///
    /// # Panics
    /// If [`Self::get_component`] fails.
    #[deprecated(note = "use `World::component` instead")]
    pub fn get_component_unsafe<C: Component>(&self, entity_id: EntityID) -> C {
        if self.config.deprecation_warnings {
            log::warn!("`World::get_component_unsafe` is deprecated, use `World::component` instead");
        }
        self.component::<C>(entity_id)
    }

    /// Older name for [`Self::components`]. Logs a warning when deprecation
    /// warnings are enabled in the configuration.
    ///
    /// # Panics
    /// If [`Self::get_components`] fails.
    #[deprecated(note = "use `World::components` instead")]
    pub fn get_components_unsafe<S: ComponentSet>(&self, entity_id: EntityID) -> S {
        if self.config.deprecation_warnings {
            log::warn!("`World::get_components_unsafe` is deprecated, use `World::components` instead");
        }
        self.components::<S>(entity_id)
    }

    /// Returns every entity whose components satisfy the given query.
    pub fn query(&self, query: &Query) -> Vec<EntityID> {
        query.execute(&self.storage)
    }

    /// Returns a description of the given mask using the names of its
    /// component types.
    pub fn describe_mask(&self, mask: &ComponentMask) -> String {
        let names: Vec<_> = mask
            .component_ids()
            .iter()
            .map(|&component_id| self.component_registry.component_name(component_id))
            .collect();
        format!("{{{}}}", names.join(", "))
    }

    /// Calls [`System::init`] on the given system and registers it to be
    /// updated after all systems registered before it.
    pub fn register_system(&mut self, system: impl System + 'static) -> SystemID {
        let mut system: Box<dyn System> = Box::new(system);
        system.init(self);
        let name = system.name().to_string();
        let system_id = self.system_manager.register(system);
        log::debug!("Registered system {} with ID {}", name, system_id);
        system_id
    }

    /// Unregisters the system with the given ID and calls
    /// [`System::cleanup`] on it. When called during an update, the system
    /// is not updated again and is cleaned up as soon as the system
    /// currently being updated returns.
    ///
    /// # Errors
    /// Returns [`EcsError::OperationFailed`] if no system with the ID is
    /// registered.
    pub fn unregister_system(&mut self, system_id: SystemID) -> Result<()> {
        if let Some(mut registered) = self.system_manager.remove(system_id) {
            registered.system.cleanup(self);
            log::debug!(
                "Unregistered system {} with ID {}",
                registered.system.name(),
                system_id
            );
            return Ok(());
        }
        if self.system_manager.defer_removal(system_id) {
            log::debug!("Deferred unregistering system with ID {}", system_id);
            return Ok(());
        }
        Err(EcsError::OperationFailed(format!(
            "no system with ID {system_id} is registered"
        )))
    }

    /// Updates every registered system once, in registration order.
    ///
    /// Systems registered during the update are first updated on the next
    /// call. Calling this from within a system does nothing.
    pub fn update(&mut self, dt: f64) {
        if self.system_manager.is_ticking() {
            log::warn!("Ignoring world update requested during an ongoing update");
            return;
        }
        with_trace_logging!("Updating world with time step {}", dt; self.update_systems(dt));
    }

    fn update_systems(&mut self, dt: f64) {
        let mut systems = self.system_manager.begin_tick();

        for idx in 0..systems.len() {
            if let Some(registered) = systems[idx].as_mut() {
                registered.system.update(self, dt);
            }

            for system_id in self.system_manager.take_pending_removals() {
                let removed = systems
                    .iter_mut()
                    .find_map(|slot| slot.take_if(|registered| registered.id == system_id));
                if let Some(mut registered) = removed {
                    registered.system.cleanup(self);
                    log::debug!(
                        "Unregistered system {} with ID {}",
                        registered.system.name(),
                        system_id
                    );
                }
            }
        }

        self.system_manager.end_tick(systems.into_iter().flatten());
    }

    fn verify_alive(&self, entity_id: EntityID) -> Result<()> {
        if self.is_alive(entity_id) {
            Ok(())
        } else {
            Err(EcsError::EntityNotFound(entity_id))
        }
    }

    fn log_new_archetypes(&self, previous_archetype_count: usize) {
        if log::log_enabled!(log::Level::Debug) {
            for archetype in &self.storage.archetypes()[previous_archetype_count..] {
                log::debug!("Created archetype {}", self.describe_mask(archetype.mask()));
            }
        }
    }
}

fn expect_component_operation<T>(operation: &str, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("Component operation '{operation}' failed: {err}"),
    }
}
