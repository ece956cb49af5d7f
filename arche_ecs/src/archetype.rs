//! Organization of ECS entities into archetypes.

use crate::{
    component::{
        Component, ComponentByteView, ComponentBytes, ComponentColumn, ComponentID,
        registered_component_size, verify_component_ids_unique,
    },
    entity::EntityID,
    error::{EcsError, Result},
    mask::ComponentMask,
};
use arche_utils::KeyIndexMapper;

/// Table holding every entity whose component types are exactly those of a
/// given [`ComponentMask`].
///
/// The components of each type are stored in a dedicated [`ComponentColumn`].
/// Entity `i` in the table owns the `i`th component of every column, which
/// keeps all columns aligned with the sequence of entity IDs.
#[derive(Debug)]
pub struct Archetype {
    mask: ComponentMask,
    entity_index_mapper: KeyIndexMapper<EntityID>,
    /// One column per component ID in the mask, in the same order. Empty
    /// until the first entity is added.
    columns: Vec<ComponentColumn>,
}

/// Copies of all the components of a single entity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityComponents {
    components: Vec<ComponentBytes>,
}

impl Archetype {
    /// Creates a new table for the given mask, holding no entities.
    pub fn new(mask: ComponentMask) -> Self {
        Self {
            mask,
            entity_index_mapper: KeyIndexMapper::new(),
            columns: Vec::new(),
        }
    }

    /// Returns the [`ComponentMask`] of the entities in the table.
    pub fn mask(&self) -> &ComponentMask {
        &self.mask
    }

    /// Returns the number of entities in the table.
    pub fn len(&self) -> usize {
        self.entity_index_mapper.len()
    }

    /// Whether no entities are present in the table.
    pub fn is_empty(&self) -> bool {
        self.entity_index_mapper.is_empty()
    }

    /// Whether the given entity is present in the table.
    pub fn has_entity(&self, entity_id: EntityID) -> bool {
        self.entity_index_mapper.contains_key(entity_id)
    }

    /// Returns the IDs of the entities in the table, in storage order.
    pub fn entity_ids(&self) -> &[EntityID] {
        self.entity_index_mapper.keys()
    }

    /// Returns an iterator over the IDs of the entities in the table, in
    /// storage order.
    pub fn iter_entities(&self) -> impl Iterator<Item = EntityID> + '_ {
        self.entity_index_mapper.key_at_each_idx()
    }

    /// Returns an iterator over copies of every component of type `C` in the
    /// table, in storage order. The iterator is empty if the table does not
    /// have the component type, or stores it with a size other than that of
    /// `C`.
    pub fn iter_components<C: Component>(&self) -> impl Iterator<Item = C> + '_ {
        self.column_idx(C::COMPONENT_ID)
            .map(|column_idx| &self.columns[column_idx])
            .filter(|column| column.component_size() == std::mem::size_of::<C>())
            .into_iter()
            .flat_map(|column| column.iter::<C>())
    }

    /// Checks whether the given entity with the given components could be
    /// added to the table, without modifying anything.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The entity is already present.
    /// - A component type occurs more than once.
    /// - The component types do not match the mask of the table.
    /// - The size of a component does not match its column.
    pub fn verify_new_entity(
        &self,
        entity_id: EntityID,
        components: &EntityComponents,
    ) -> Result<()> {
        if self.has_entity(entity_id) {
            return Err(EcsError::AlreadyPresent(entity_id));
        }

        verify_component_ids_unique(components.component_ids())?;

        let mask = components.mask();
        if mask != self.mask {
            return Err(EcsError::MaskMismatch {
                expected: self.mask.id(),
                found: mask.id(),
            });
        }

        for component in components.iter() {
            let expected_size = self
                .column_idx(component.component_id())
                .map(|column_idx| self.columns[column_idx].component_size())
                .or_else(|| registered_component_size(component.component_id()));

            if let Some(expected_size) = expected_size {
                verify_component_size(
                    component.component_id(),
                    component.bytes().len(),
                    expected_size,
                )?;
            }
        }

        Ok(())
    }

    /// Adds the given entity with the given components to the table.
    ///
    /// # Errors
    /// See [`Self::verify_new_entity`]. Nothing is modified on failure.
    pub fn add_entity(&mut self, entity_id: EntityID, components: &EntityComponents) -> Result<()> {
        self.verify_new_entity(entity_id, components)?;

        if self.columns.is_empty() {
            self.initialize_columns(components);
        }

        for component in components.iter() {
            let column_idx = self.column_idx(component.component_id()).ok_or(
                EcsError::ComponentNotFound {
                    entity: entity_id,
                    component: component.component_id(),
                },
            )?;
            self.columns[column_idx].push(component.as_view());
        }

        if self.entity_index_mapper.try_push_key(entity_id).is_none() {
            return Err(EcsError::AlreadyPresent(entity_id));
        }

        Ok(())
    }

    /// Removes the given entity and its components from the table. The last
    /// entity in the table takes the place of the removed one.
    ///
    /// # Errors
    /// Returns [`EcsError::EntityNotFound`] if the entity is not present.
    pub fn remove_entity(&mut self, entity_id: EntityID) -> Result<()> {
        let idx = self
            .entity_index_mapper
            .swap_remove_key(entity_id)
            .ok_or(EcsError::EntityNotFound(entity_id))?;

        for column in &mut self.columns {
            column.swap_remove(idx);
        }

        Ok(())
    }

    /// Returns a copy of the component of type `C` for the given entity.
    ///
    /// # Errors
    /// Returns an error if the entity is not present, the table does not
    /// have the component type, or the stored components do not have the
    /// size of `C`.
    pub fn get_component<C: Component>(&self, entity_id: EntityID) -> Result<C> {
        let (idx, column_idx) = self.locate(entity_id, C::COMPONENT_ID)?;
        let column = &self.columns[column_idx];
        verify_component_size(
            C::COMPONENT_ID,
            std::mem::size_of::<C>(),
            column.component_size(),
        )?;
        column
            .get::<C>(idx)
            .ok_or(EcsError::ComponentNotFound {
                entity: entity_id,
                component: C::COMPONENT_ID,
            })
    }

    /// Returns the raw bytes of the component with the given ID for the
    /// given entity.
    ///
    /// # Errors
    /// Returns an error if the entity is not present or the table does not
    /// have the component type.
    pub fn component_bytes(&self, entity_id: EntityID, component_id: ComponentID) -> Result<&[u8]> {
        let (idx, column_idx) = self.locate(entity_id, component_id)?;
        self.columns[column_idx]
            .bytes_at(idx)
            .ok_or(EcsError::ComponentNotFound {
                entity: entity_id,
                component: component_id,
            })
    }

    /// Overwrites the component of the given entity that has the same type
    /// as the given component bytes.
    ///
    /// # Errors
    /// Returns an error if the entity is not present, the table does not
    /// have the component type, or the size of the bytes is wrong.
    pub fn overwrite_component(
        &mut self,
        entity_id: EntityID,
        component: ComponentByteView<'_>,
    ) -> Result<()> {
        let (idx, column_idx) = self.locate(entity_id, component.component_id())?;
        let column = &mut self.columns[column_idx];
        verify_component_size(
            component.component_id(),
            component.bytes().len(),
            column.component_size(),
        )?;
        column.overwrite(idx, component);
        Ok(())
    }

    /// Returns copies of all the components of the given entity, ordered
    /// as the component IDs in the mask.
    ///
    /// # Errors
    /// Returns [`EcsError::EntityNotFound`] if the entity is not present.
    pub fn entity_components(&self, entity_id: EntityID) -> Result<EntityComponents> {
        let idx = self
            .entity_index_mapper
            .get(entity_id)
            .ok_or(EcsError::EntityNotFound(entity_id))?;

        let components = self
            .columns
            .iter()
            .map(|column| {
                column
                    .bytes_at(idx)
                    .map(|bytes| ComponentBytes::new(column.component_id(), bytes.to_vec()))
                    .ok_or(EcsError::ComponentNotFound {
                        entity: entity_id,
                        component: column.component_id(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(EntityComponents { components })
    }

    fn initialize_columns(&mut self, components: &EntityComponents) {
        self.columns = self
            .mask
            .component_ids()
            .iter()
            .map(|&component_id| {
                let size = components
                    .get(component_id)
                    .map_or(0, |component| component.bytes().len());
                ComponentColumn::new(component_id, size)
            })
            .collect();
    }

    fn column_idx(&self, component_id: ComponentID) -> Option<usize> {
        self.mask
            .component_ids()
            .binary_search(&component_id)
            .ok()
            .filter(|&column_idx| column_idx < self.columns.len())
    }

    fn locate(&self, entity_id: EntityID, component_id: ComponentID) -> Result<(usize, usize)> {
        let idx = self
            .entity_index_mapper
            .get(entity_id)
            .ok_or(EcsError::EntityNotFound(entity_id))?;
        let column_idx = self
            .column_idx(component_id)
            .ok_or(EcsError::ComponentNotFound {
                entity: entity_id,
                component: component_id,
            })?;
        Ok((idx, column_idx))
    }
}

fn verify_component_size(component_id: ComponentID, size: usize, expected_size: usize) -> Result<()> {
    if size == expected_size {
        Ok(())
    } else {
        Err(EcsError::OperationFailed(format!(
            "component {component_id} has {size} bytes but {expected_size} are expected"
        )))
    }
}

impl EntityComponents {
    /// Creates an empty set of components.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding the given components.
    pub fn from_components(components: Vec<ComponentBytes>) -> Self {
        Self { components }
    }

    /// Returns the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether there are no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Returns an iterator over the component IDs.
    pub fn component_ids(&self) -> impl Iterator<Item = ComponentID> + '_ {
        self.components.iter().map(ComponentBytes::component_id)
    }

    /// Returns the mask of the component types in the set.
    pub fn mask(&self) -> ComponentMask {
        ComponentMask::from_component_ids(self.component_ids())
    }

    /// Returns an iterator over the components.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentBytes> {
        self.components.iter()
    }

    /// Returns the component with the given ID, if present.
    pub fn get(&self, component_id: ComponentID) -> Option<&ComponentBytes> {
        self.components
            .iter()
            .find(|component| component.component_id() == component_id)
    }

    /// Returns a copy of the component of type `C`, if present.
    pub fn get_component<C: Component>(&self) -> Option<C> {
        self.get(C::COMPONENT_ID)
            .and_then(|component| bytemuck::try_pod_read_unaligned(component.bytes()).ok())
    }

    /// Appends the given component.
    pub fn push(&mut self, component: ComponentBytes) {
        self.components.push(component);
    }

    /// Removes and returns the component with the given ID, if present.
    pub fn remove(&mut self, component_id: ComponentID) -> Option<ComponentBytes> {
        let idx = self
            .components
            .iter()
            .position(|component| component.component_id() == component_id)?;
        Some(self.components.remove(idx))
    }
}
