//! Selection of archetypes by required and excluded component types.

use crate::{
    archetype::Archetype,
    component::{ComponentID, ComponentSet},
    entity::EntityID,
    mask::ComponentMask,
    storage::ComponentStorage,
};

/// Description of which entities to select, given as the component types an
/// entity must have and the component types it must not have.
///
/// A query is built by chaining [`Self::with`] and [`Self::without`], and
/// holds no reference to any storage, so it can be reused.
///
/// ```ignore
/// let moving = Query::new().with::<(Position, Velocity)>().without::<Frozen>();
/// let entities = moving.execute(&storage);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    required: ComponentMask,
    excluded: ComponentMask,
}

impl Query {
    /// Creates a query without constraints, which matches every archetype.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires every component type in the set `S`.
    pub fn with<S: ComponentSet>(self) -> Self {
        self.with_component_ids(S::component_ids())
    }

    /// Excludes every component type in the set `S`.
    pub fn without<S: ComponentSet>(self) -> Self {
        self.without_component_ids(S::component_ids())
    }

    /// Requires every component type with the given IDs.
    pub fn with_component_ids(self, component_ids: impl IntoIterator<Item = ComponentID>) -> Self {
        Self {
            required: union(&self.required, component_ids),
            excluded: self.excluded,
        }
    }

    /// Excludes every component type with the given IDs.
    pub fn without_component_ids(
        self,
        component_ids: impl IntoIterator<Item = ComponentID>,
    ) -> Self {
        Self {
            required: self.required,
            excluded: union(&self.excluded, component_ids),
        }
    }

    /// Returns the required component types.
    pub fn required(&self) -> &ComponentMask {
        &self.required
    }

    /// Returns the excluded component types.
    pub fn excluded(&self) -> &ComponentMask {
        &self.excluded
    }

    /// Whether entities with the given mask satisfy the query.
    pub fn matches(&self, mask: &ComponentMask) -> bool {
        mask.contains(&self.required) && mask.is_disjoint(&self.excluded)
    }

    /// Returns an iterator over the archetypes in the storage whose mask
    /// satisfies the query.
    pub fn matching_archetypes<'a>(
        &'a self,
        storage: &'a ComponentStorage,
    ) -> impl Iterator<Item = &'a Archetype> {
        storage
            .archetypes()
            .iter()
            .filter(|archetype| self.matches(archetype.mask()))
    }

    /// Returns every entity in the storage that satisfies the query, in
    /// archetype creation order and then storage order within each
    /// archetype.
    pub fn execute(&self, storage: &ComponentStorage) -> Vec<EntityID> {
        self.matching_archetypes(storage)
            .flat_map(Archetype::iter_entities)
            .collect()
    }
}

fn union(mask: &ComponentMask, component_ids: impl IntoIterator<Item = ComponentID>) -> ComponentMask {
    ComponentMask::from_component_ids(
        mask.component_ids()
            .iter()
            .copied()
            .chain(component_ids),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component::{
        Component,
        test::{Byte, Marked, Position, Rectangle},
    };
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn entity(value: u128) -> EntityID {
        EntityID::from_u128(value)
    }

    /// Entity 0: Byte
    /// Entity 1: Byte, Position
    /// Entity 2: Byte, Position, Marked
    /// Entity 3: Position
    /// Entity 4: no components
    fn populated_storage() -> ComponentStorage {
        let mut storage = ComponentStorage::new();
        for value in 0..5 {
            storage.register_entity(entity(value)).unwrap();
        }
        for value in 0..3 {
            storage.add_component(entity(value), &Byte(1)).unwrap();
        }
        for value in 1..4 {
            storage
                .add_component(entity(value), &Position(0.0, 0.0, 0.0))
                .unwrap();
        }
        storage.add_component(entity(2), &Marked).unwrap();
        storage
    }

    fn executed(query: &Query, storage: &ComponentStorage) -> HashSet<EntityID> {
        query.execute(storage).into_iter().collect()
    }

    fn entities(values: &[u128]) -> HashSet<EntityID> {
        values.iter().copied().map(entity).collect()
    }

    #[test]
    fn query_without_constraints_matches_everything() {
        let storage = populated_storage();
        assert_eq!(executed(&Query::new(), &storage), entities(&[0, 1, 2, 3, 4]));
        assert!(Query::new().matches(&ComponentMask::empty()));
    }

    #[test]
    fn query_with_required_components_works() {
        let storage = populated_storage();
        assert_eq!(
            executed(&Query::new().with::<Byte>(), &storage),
            entities(&[0, 1, 2])
        );
        assert_eq!(
            executed(&Query::new().with::<(Byte, Position)>(), &storage),
            entities(&[1, 2])
        );
        assert_eq!(
            executed(&Query::new().with::<Byte>().with::<Marked>(), &storage),
            entities(&[2])
        );
        assert!(executed(&Query::new().with::<Rectangle>(), &storage).is_empty());
    }

    #[test]
    fn query_with_excluded_components_works() {
        let storage = populated_storage();
        assert_eq!(
            executed(&Query::new().with::<Position>().without::<Marked>(), &storage),
            entities(&[1, 3])
        );
        assert_eq!(
            executed(&Query::new().without::<(Byte, Position)>(), &storage),
            entities(&[4])
        );
    }

    #[test]
    fn query_requiring_and_excluding_same_component_is_empty() {
        let storage = populated_storage();
        assert!(executed(&Query::new().with::<Byte>().without::<Byte>(), &storage).is_empty());
    }

    #[test]
    fn query_results_are_grouped_by_archetype() {
        let storage = populated_storage();
        let results = Query::new().with::<Position>().execute(&storage);
        let expected: Vec<_> = storage
            .archetypes()
            .iter()
            .filter(|archetype| archetype.mask().contains_component_id(Position::COMPONENT_ID))
            .flat_map(|archetype| archetype.entity_ids().to_vec())
            .collect();
        assert_eq!(results, expected);
    }

    #[test]
    fn query_is_reusable_after_storage_changes() {
        let mut storage = populated_storage();
        let query = Query::new().with::<(Byte, Position)>();
        assert_eq!(executed(&query, &storage), entities(&[1, 2]));

        storage.remove_component::<Position>(entity(1)).unwrap();
        assert_eq!(executed(&query, &storage), entities(&[2]));
    }

    #[test]
    fn matching_archetypes_skips_non_matching_masks() {
        let storage = populated_storage();
        let query = Query::new().with::<Marked>();
        let archetypes: Vec<_> = query.matching_archetypes(&storage).collect();
        assert_eq!(archetypes.len(), 1);
        assert_eq!(archetypes[0].entity_ids(), &[entity(2)]);
    }

    const COMPONENT_IDS: [ComponentID; 4] = [
        Byte::COMPONENT_ID,
        Position::COMPONENT_ID,
        Marked::COMPONENT_ID,
        Rectangle::COMPONENT_ID,
    ];

    fn mask_from_bits(bits: u8) -> ComponentMask {
        ComponentMask::from_component_ids(
            COMPONENT_IDS
                .iter()
                .enumerate()
                .filter(|(idx, _)| bits & (1 << idx) != 0)
                .map(|(_, &id)| id),
        )
    }

    proptest! {
        #[test]
        fn query_matches_exactly_supersets_disjoint_from_excluded(
            mask_bits in 0_u8..16,
            required_bits in 0_u8..16,
            excluded_bits in 0_u8..16,
        ) {
            let mask = mask_from_bits(mask_bits);
            let query = Query::new()
                .with_component_ids(mask_from_bits(required_bits).component_ids().to_vec())
                .without_component_ids(mask_from_bits(excluded_bits).component_ids().to_vec());
            let expected = (mask_bits & required_bits) == required_bits
                && (mask_bits & excluded_bits) == 0;
            prop_assert_eq!(query.matches(&mask), expected);
        }
    }
}
