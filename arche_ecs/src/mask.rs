//! Sets of component types identifying archetypes.

use crate::component::ComponentID;
use bytemuck::{Pod, Zeroable};
use std::{
    fmt,
    hash::{Hash, Hasher},
};

/// Unique identifier for a [`ComponentMask`], obtained by hashing its sorted
/// component IDs.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroable, Pod)]
pub struct MaskID(u64);

/// An unordered set of component types. Every entity has the mask of the
/// component types it currently carries, and every archetype stores the
/// entities with one specific mask.
///
/// Two masks are equal exactly when they contain the same component types.
#[derive(Clone, Debug)]
pub struct ComponentMask {
    id: MaskID,
    component_ids: Vec<ComponentID>,
}

impl MaskID {
    fn from_sorted_component_ids(component_ids: &[ComponentID]) -> Self {
        Self(const_fnv1a_hash::fnv1a_hash_64(
            bytemuck::cast_slice(component_ids),
            None,
        ))
    }

    /// Returns the `u64` value of the ID.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MaskID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl ComponentMask {
    /// Creates a mask containing the given component types. Duplicates are
    /// ignored and the order does not matter.
    pub fn from_component_ids(component_ids: impl IntoIterator<Item = ComponentID>) -> Self {
        let mut component_ids: Vec<_> = component_ids.into_iter().collect();
        component_ids.sort_unstable();
        component_ids.dedup();
        Self::from_sorted_deduped(component_ids)
    }

    /// Creates the mask with no component types.
    pub fn empty() -> Self {
        Self::from_sorted_deduped(Vec::new())
    }

    fn from_sorted_deduped(component_ids: Vec<ComponentID>) -> Self {
        Self {
            id: MaskID::from_sorted_component_ids(&component_ids),
            component_ids,
        }
    }

    /// Returns the ID of the mask.
    pub fn id(&self) -> MaskID {
        self.id
    }

    /// Returns the component IDs in the mask, sorted.
    pub fn component_ids(&self) -> &[ComponentID] {
        &self.component_ids
    }

    /// Returns the number of component types in the mask.
    pub fn n_components(&self) -> usize {
        self.component_ids.len()
    }

    /// Whether the mask has no component types.
    pub fn is_empty(&self) -> bool {
        self.component_ids.is_empty()
    }

    /// Whether the given component type is in the mask.
    pub fn contains_component_id(&self, component_id: ComponentID) -> bool {
        self.component_ids.binary_search(&component_id).is_ok()
    }

    /// Whether every component type in `other` is also in this mask.
    pub fn contains(&self, other: &Self) -> bool {
        other
            .component_ids
            .iter()
            .all(|&component_id| self.contains_component_id(component_id))
    }

    /// Whether this mask and `other` have no component types in common.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        !other
            .component_ids
            .iter()
            .any(|&component_id| self.contains_component_id(component_id))
    }

    /// Returns the mask with the given component type added.
    pub fn with_component_id(&self, component_id: ComponentID) -> Self {
        match self.component_ids.binary_search(&component_id) {
            Ok(_) => self.clone(),
            Err(idx) => {
                let mut component_ids = self.component_ids.clone();
                component_ids.insert(idx, component_id);
                Self::from_sorted_deduped(component_ids)
            }
        }
    }

    /// Returns the mask with the given component type removed.
    pub fn without_component_id(&self, component_id: ComponentID) -> Self {
        match self.component_ids.binary_search(&component_id) {
            Ok(idx) => {
                let mut component_ids = self.component_ids.clone();
                component_ids.remove(idx);
                Self::from_sorted_deduped(component_ids)
            }
            Err(_) => self.clone(),
        }
    }
}

impl PartialEq for ComponentMask {
    fn eq(&self, other: &Self) -> bool {
        self.component_ids == other.component_ids
    }
}

impl Eq for ComponentMask {}

impl Hash for ComponentMask {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Default for ComponentMask {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn id(name: &str) -> ComponentID {
        ComponentID::hashed_from_str(name)
    }

    #[test]
    fn mask_order_and_duplicates_do_not_matter() {
        let mask_1 = ComponentMask::from_component_ids([id("a"), id("b"), id("c")]);
        let mask_2 = ComponentMask::from_component_ids([id("c"), id("a"), id("b"), id("a")]);
        assert_eq!(mask_1, mask_2);
        assert_eq!(mask_1.id(), mask_2.id());
        assert_eq!(mask_2.n_components(), 3);
    }

    #[test]
    fn different_masks_have_different_ids() {
        let mask_1 = ComponentMask::from_component_ids([id("a")]);
        let mask_2 = ComponentMask::from_component_ids([id("a"), id("b")]);
        assert_ne!(mask_1, mask_2);
        assert_ne!(mask_1.id(), mask_2.id());
        assert_ne!(mask_1.id(), ComponentMask::empty().id());
    }

    #[test]
    fn empty_mask_works() {
        let mask = ComponentMask::empty();
        assert!(mask.is_empty());
        assert!(mask.component_ids().is_empty());
        assert_eq!(mask, ComponentMask::from_component_ids([]));
    }

    #[test]
    fn adding_and_removing_component_ids_works() {
        let mask = ComponentMask::from_component_ids([id("a")]);

        let extended = mask.with_component_id(id("b"));
        assert_eq!(extended, ComponentMask::from_component_ids([id("a"), id("b")]));
        assert_eq!(extended.with_component_id(id("b")), extended);

        let reduced = extended.without_component_id(id("a"));
        assert_eq!(reduced, ComponentMask::from_component_ids([id("b")]));
        assert_eq!(reduced.without_component_id(id("a")), reduced);
        assert!(reduced.without_component_id(id("b")).is_empty());
    }

    #[test]
    fn mask_of_macro_works() {
        use crate::{
            component::{
                Component,
                test::{Byte, Position},
            },
            mask_of,
        };

        assert_eq!(
            mask_of!(Position, Byte),
            ComponentMask::from_component_ids([Byte::COMPONENT_ID, Position::COMPONENT_ID])
        );
        assert!(mask_of!().is_empty());
    }

    #[test]
    fn mask_containment_works() {
        let ab = ComponentMask::from_component_ids([id("a"), id("b")]);
        let a = ComponentMask::from_component_ids([id("a")]);
        let c = ComponentMask::from_component_ids([id("c")]);

        assert!(ab.contains(&a));
        assert!(ab.contains(&ComponentMask::empty()));
        assert!(!a.contains(&ab));
        assert!(ab.contains_component_id(id("b")));
        assert!(!ab.contains_component_id(id("c")));

        assert!(ab.is_disjoint(&c));
        assert!(!ab.is_disjoint(&a));
        assert!(ab.is_disjoint(&ComponentMask::empty()));
    }
}
