//! Storage of the components of all entities, grouped by archetype.

use crate::{
    archetype::{Archetype, EntityComponents},
    component::{Component, ComponentByteView, ComponentID, ComponentSet},
    entity::EntityID,
    error::{ComponentChange, EcsError, Result},
    mask::{ComponentMask, MaskID},
};
use arche_utils::KeyIndexMapper;
use std::collections::HashMap;

/// Owner of every [`Archetype`] and of the record of which archetype each
/// entity currently belongs to.
///
/// Adding a component of a new type to an entity, or removing one, moves the
/// entity with all its components to the archetype for its new
/// [`ComponentMask`]. Archetypes are created the first time a mask is needed
/// and are kept even when they become empty.
#[derive(Debug, Default)]
pub struct ComponentStorage {
    archetype_index_mapper: KeyIndexMapper<MaskID>,
    archetypes: Vec<Archetype>,
    entity_masks: HashMap<EntityID, MaskID>,
}

impl ComponentStorage {
    /// Creates a new storage with no entities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entities in the storage.
    pub fn entity_count(&self) -> usize {
        self.entity_masks.len()
    }

    /// Returns the number of archetypes, including empty ones.
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Whether the given entity is in the storage.
    pub fn contains_entity(&self, entity_id: EntityID) -> bool {
        self.entity_masks.contains_key(&entity_id)
    }

    /// Returns all archetypes in the order they were created.
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    /// Returns the archetype for the given mask, if it has been created.
    pub fn archetype(&self, mask: &ComponentMask) -> Option<&Archetype> {
        self.archetype_index_mapper
            .get(mask.id())
            .map(|idx| &self.archetypes[idx])
    }

    /// Returns the mask of the component types the given entity currently
    /// has, or [`None`] if the entity is not in the storage.
    pub fn entity_mask(&self, entity_id: EntityID) -> Option<&ComponentMask> {
        self.entity_archetype_idx(entity_id)
            .ok()
            .map(|idx| self.archetypes[idx].mask())
    }

    /// Adds the given entity to the storage with no components.
    ///
    /// # Errors
    /// Returns [`EcsError::AlreadyPresent`] if the entity is already in the
    /// storage.
    pub fn register_entity(&mut self, entity_id: EntityID) -> Result<()> {
        if self.contains_entity(entity_id) {
            return Err(EcsError::AlreadyPresent(entity_id));
        }
        let mask = ComponentMask::empty();
        let mask_id = mask.id();
        let idx = self.archetype_idx_or_create(mask);
        self.archetypes[idx].add_entity(entity_id, &EntityComponents::new())?;
        self.entity_masks.insert(entity_id, mask_id);
        Ok(())
    }

    /// Removes the given entity and all its components from the storage.
    ///
    /// # Errors
    /// Returns [`EcsError::EntityNotFound`] if the entity is not in the
    /// storage.
    pub fn remove_entity(&mut self, entity_id: EntityID) -> Result<()> {
        let idx = self.entity_archetype_idx(entity_id)?;
        self.archetypes[idx].remove_entity(entity_id)?;
        self.entity_masks.remove(&entity_id);
        Ok(())
    }

    /// Gives the entity the given component. If the entity already has a
    /// component of the same type, it is overwritten in place. Otherwise the
    /// entity moves to the archetype that includes the new component type.
    ///
    /// # Errors
    /// Returns [`EcsError::EntityNotFound`] if the entity is not in the
    /// storage.
    pub fn add_component<C: Component>(
        &mut self,
        entity_id: EntityID,
        component: &C,
    ) -> Result<ComponentChange> {
        self.add_component_bytes(entity_id, component.component_bytes())
    }

    /// Type erased version of [`Self::add_component`].
    ///
    /// # Errors
    /// Returns an error if the entity is not in the storage or the size of
    /// the bytes does not match the registered size of the component type
    /// or earlier components of the same type.
    pub fn add_component_bytes(
        &mut self,
        entity_id: EntityID,
        component: ComponentByteView<'_>,
    ) -> Result<ComponentChange> {
        let old_idx = self.entity_archetype_idx(entity_id)?;
        let old_archetype = &mut self.archetypes[old_idx];

        if old_archetype
            .mask()
            .contains_component_id(component.component_id())
        {
            old_archetype.overwrite_component(entity_id, component)?;
            return Ok(ComponentChange::Updated);
        }

        let new_mask = old_archetype
            .mask()
            .with_component_id(component.component_id());

        let mut components = old_archetype.entity_components(entity_id)?;
        components.push(component.to_component_bytes());

        self.migrate_entity(entity_id, old_idx, new_mask, &components)?;

        Ok(ComponentChange::Added)
    }

    /// Removes the component of type `C` from the entity. The entity moves
    /// to the archetype without the component type, or leaves the storage
    /// entirely if this was its last component.
    ///
    /// # Errors
    /// Returns an error if the entity is not in the storage or does not have
    /// the component.
    pub fn remove_component<C: Component>(&mut self, entity_id: EntityID) -> Result<ComponentChange> {
        self.remove_component_with_id(entity_id, C::COMPONENT_ID)
    }

    /// Type erased version of [`Self::remove_component`].
    ///
    /// # Errors
    /// Returns an error if the entity is not in the storage or does not have
    /// the component.
    pub fn remove_component_with_id(
        &mut self,
        entity_id: EntityID,
        component_id: ComponentID,
    ) -> Result<ComponentChange> {
        let old_idx = self.entity_archetype_idx(entity_id)?;
        let old_archetype = &self.archetypes[old_idx];

        if !old_archetype.mask().contains_component_id(component_id) {
            return Err(EcsError::ComponentNotFound {
                entity: entity_id,
                component: component_id,
            });
        }

        let new_mask = old_archetype.mask().without_component_id(component_id);

        if new_mask.is_empty() {
            self.remove_entity(entity_id)?;
            return Ok(ComponentChange::Removed);
        }

        let mut components = old_archetype.entity_components(entity_id)?;
        components.remove(component_id);

        self.migrate_entity(entity_id, old_idx, new_mask, &components)?;

        Ok(ComponentChange::Removed)
    }

    /// Returns a copy of the component of type `C` for the given entity.
    ///
    /// # Errors
    /// Returns an error if the entity is not in the storage or does not have
    /// the component.
    pub fn get_component<C: Component>(&self, entity_id: EntityID) -> Result<C> {
        let idx = self.entity_archetype_idx(entity_id)?;
        self.archetypes[idx].get_component::<C>(entity_id)
    }

    /// Returns copies of all the components in the set `S` for the given
    /// entity.
    ///
    /// # Errors
    /// Returns an error if the entity is not in the storage or lacks any of
    /// the components.
    pub fn get_components<S: ComponentSet>(&self, entity_id: EntityID) -> Result<S> {
        S::fetch(self, entity_id)
    }

    /// Whether the given entity has a component of type `C`. Entities not in
    /// the storage have no components.
    pub fn has_component<C: Component>(&self, entity_id: EntityID) -> bool {
        self.has_component_id(entity_id, C::COMPONENT_ID)
    }

    /// Whether the given entity has a component with the given ID.
    pub fn has_component_id(&self, entity_id: EntityID, component_id: ComponentID) -> bool {
        self.entity_mask(entity_id)
            .is_some_and(|mask| mask.contains_component_id(component_id))
    }

    /// Returns copies of all the components of the given entity, ordered
    /// as the component IDs in its mask.
    ///
    /// # Errors
    /// Returns [`EcsError::EntityNotFound`] if the entity is not in the
    /// storage.
    pub fn get_entity_components(&self, entity_id: EntityID) -> Result<EntityComponents> {
        let idx = self.entity_archetype_idx(entity_id)?;
        self.archetypes[idx].entity_components(entity_id)
    }

    fn migrate_entity(
        &mut self,
        entity_id: EntityID,
        old_idx: usize,
        new_mask: ComponentMask,
        components: &EntityComponents,
    ) -> Result<()> {
        let new_mask_id = new_mask.id();
        let new_idx = self.archetype_idx_or_create(new_mask);

        // Check before touching the old archetype so failure leaves the
        // entity where it was
        self.archetypes[new_idx].verify_new_entity(entity_id, components)?;

        self.archetypes[old_idx].remove_entity(entity_id)?;
        self.archetypes[new_idx].add_entity(entity_id, components)?;
        self.entity_masks.insert(entity_id, new_mask_id);

        Ok(())
    }

    fn entity_archetype_idx(&self, entity_id: EntityID) -> Result<usize> {
        self.entity_masks
            .get(&entity_id)
            .and_then(|&mask_id| self.archetype_index_mapper.get(mask_id))
            .ok_or(EcsError::EntityNotFound(entity_id))
    }

    fn archetype_idx_or_create(&mut self, mask: ComponentMask) -> usize {
        if let Some(idx) = self.archetype_index_mapper.get(mask.id()) {
            return idx;
        }
        let idx = self.archetypes.len();
        self.archetype_index_mapper.try_push_key(mask.id());
        self.archetypes.push(Archetype::new(mask));
        idx
    }
}
