//! Representation and storage of ECS components.

use crate::{
    entity::EntityID,
    error::{EcsError, Result},
    storage::ComponentStorage,
};
use anyhow::bail;
use bytemuck::{Pod, Zeroable};
use lazy_static::lazy_static;
use std::{
    collections::{HashMap, hash_map::Entry},
    fmt,
};

/// Represents a component.
///
/// Components are plain data structures representing
/// a potential attribute an entity can have. Examples
/// could be position, velocity or a marker tag.
///
/// Components can only contain "Plain Old Data", meaning
/// primitive types excluding references. The `Component`
/// trait can be derived for any non-generic type that
/// implements [`Pod`].
///
/// # Example
/// ```ignore
/// use arche_ecs::Component;
/// use bytemuck::{Pod, Zeroable};
///
/// #[repr(C)] // Required for `Pod`
/// #[derive(Clone, Copy, Zeroable, Pod, Component)]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
/// ```
pub trait Component: Pod {
    /// Unique ID representing the component type.
    const COMPONENT_ID: ComponentID;

    /// Returns the [`ComponentByteView`] containing a reference
    /// to the raw data of the component.
    fn component_bytes(&self) -> ComponentByteView<'_> {
        ComponentByteView::new(Self::COMPONENT_ID, bytemuck::bytes_of(self))
    }
}

/// A set of [`Component`] types that can be requested together, either for
/// matching archetypes or for fetching the components of one entity.
///
/// Implemented for every component type and for tuples of up to eight
/// component types.
pub trait ComponentSet: Sized {
    /// Returns the IDs of the component types in the set.
    fn component_ids() -> Vec<ComponentID>;

    /// Fetches a copy of every component in the set for the given entity.
    ///
    /// # Errors
    /// Returns an error if the entity is not in the storage or lacks any of
    /// the components.
    fn fetch(storage: &ComponentStorage, entity: EntityID) -> Result<Self>;
}

/// A unique ID identifying a type implementing [`Component`], obtained by
/// hashing the fully qualified name of the type.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroable, Pod)]
pub struct ComponentID(u64);

/// Compile-time description of a [`Component`] type. The derive macro
/// registers one for every component type.
#[derive(Clone, Copy, Debug)]
pub struct ComponentDescriptor {
    /// The ID of the component type.
    pub id: ComponentID,
    /// The name of the component type.
    pub name: &'static str,
    /// The size of one instance of the component, in bytes.
    pub size: usize,
}

inventory::collect!(ComponentDescriptor);

lazy_static! {
    static ref REGISTERED_COMPONENT_SIZES: HashMap<ComponentID, usize> =
        inventory::iter::<ComponentDescriptor>
            .into_iter()
            .map(|descriptor| (descriptor.id, descriptor.size))
            .collect();
}

/// Registry of the names and sizes of known [`Component`] types, used for
/// diagnostics.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: HashMap<ComponentID, ComponentMetadata>,
}

/// Metadata for a type implementing [`Component`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentMetadata {
    /// The name of the component type.
    pub name: &'static str,
    /// The size of one instance of the component, in bytes.
    pub size: usize,
}

/// Container that stores instances of one type of [`Component`]
/// contiguously in memory without exposing the underlying type
/// in the type signature.
///
/// Instances are read back with unaligned reads, so the byte buffer carries
/// no alignment requirement.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentColumn {
    component_id: ComponentID,
    component_size: usize,
    len: usize,
    bytes: Vec<u8>,
}

/// Container owning the bytes of a single component, along with the
/// component ID required to safely reconstruct it.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentBytes {
    component_id: ComponentID,
    bytes: Vec<u8>,
}

/// Reference to the bytes of a single component, which also includes the
/// component ID required to safely reconstruct it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComponentByteView<'a> {
    component_id: ComponentID,
    bytes: &'a [u8],
}

impl ComponentID {
    /// Hashes the given string into a component ID.
    pub const fn hashed_from_str(input: &str) -> Self {
        Self(const_fnv1a_hash::fnv1a_hash_str_64(input))
    }

    /// Returns the `u64` value corresponding to the component ID.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Returns the size in bytes of the component type with the given ID, if
/// the type was registered through the derive macro.
pub fn registered_component_size(component_id: ComponentID) -> Option<usize> {
    REGISTERED_COMPONENT_SIZES.get(&component_id).copied()
}

impl ComponentRegistry {
    /// Creates a new empty component registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every component type registered through
    /// the derive macro.
    ///
    /// # Errors
    /// Returns an error if two different component types hash to the same
    /// ID.
    pub fn from_registered_components() -> anyhow::Result<Self> {
        let mut registry = Self::new();
        for descriptor in inventory::iter::<ComponentDescriptor> {
            registry.add_component(descriptor)?;
        }
        Ok(registry)
    }

    /// Adds metadata for the component with the given descriptor to the
    /// registry. Adding an identical descriptor again has no effect.
    ///
    /// # Errors
    /// Returns an error if a different component with the same ID is
    /// already present.
    pub fn add_component(&mut self, descriptor: &ComponentDescriptor) -> anyhow::Result<()> {
        let metadata = ComponentMetadata {
            name: descriptor.name,
            size: descriptor.size,
        };
        match self.components.entry(descriptor.id) {
            Entry::Vacant(vacant_entry) => {
                vacant_entry.insert(metadata);
            }
            Entry::Occupied(occupied_entry) => {
                if *occupied_entry.get() != metadata {
                    bail!(
                        "Components `{}` and `{}` have the same ID {}",
                        occupied_entry.get().name,
                        descriptor.name,
                        descriptor.id
                    );
                }
            }
        }
        Ok(())
    }

    /// Returns the metadata for the component with the given ID, if
    /// registered.
    pub fn get(&self, component_id: ComponentID) -> Option<&ComponentMetadata> {
        self.components.get(&component_id)
    }

    /// Returns the name of the component with the given ID, or the
    /// formatted ID if the component is not registered.
    pub fn component_name(&self, component_id: ComponentID) -> String {
        self.get(component_id).map_or_else(
            || component_id.to_string(),
            |metadata| metadata.name.to_string(),
        )
    }

    /// Returns the number of registered components.
    pub fn n_components(&self) -> usize {
        self.components.len()
    }
}

impl ComponentColumn {
    /// Creates an empty column for components with the given ID and size.
    pub fn new(component_id: ComponentID, component_size: usize) -> Self {
        Self {
            component_id,
            component_size,
            len: 0,
            bytes: Vec::new(),
        }
    }

    /// Returns the ID of the component type stored in the column.
    pub fn component_id(&self) -> ComponentID {
        self.component_id
    }

    /// Returns the size of one stored component in bytes.
    pub fn component_size(&self) -> usize {
        self.component_size
    }

    /// Returns the number of stored components.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the column has no components.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends the given component bytes to the end of the column.
    ///
    /// # Panics
    /// If the bytes do not belong to the component type of the column.
    pub fn push(&mut self, component: ComponentByteView<'_>) {
        self.validate_view(&component);
        self.bytes.extend_from_slice(component.bytes);
        self.len += 1;
    }

    /// Returns the bytes of the component at the given index, or [`None`]
    /// if the index is out of bounds.
    pub fn bytes_at(&self, idx: usize) -> Option<&[u8]> {
        (idx < self.len).then(|| &self.bytes[self.byte_range(idx)])
    }

    /// Returns a copy of the component at the given index, or [`None`] if
    /// the index is out of bounds.
    ///
    /// # Panics
    /// If `C` is not the component type of the column or has a different
    /// size than the stored components.
    pub fn get<C: Component>(&self, idx: usize) -> Option<C> {
        self.validate_component::<C>();
        self.bytes_at(idx).map(bytemuck::pod_read_unaligned)
    }

    /// Returns an iterator over copies of all stored components.
    ///
    /// # Panics
    /// If `C` is not the component type of the column or has a different
    /// size than the stored components.
    pub fn iter<C: Component>(&self) -> impl Iterator<Item = C> + '_ {
        self.validate_component::<C>();
        (0..self.len).map(move |idx| bytemuck::pod_read_unaligned(&self.bytes[self.byte_range(idx)]))
    }

    /// Overwrites the component at the given index with the given bytes.
    ///
    /// # Panics
    /// - If the bytes do not belong to the component type of the column.
    /// - If `idx` is outside the bounds of the column.
    pub fn overwrite(&mut self, idx: usize, component: ComponentByteView<'_>) {
        self.validate_view(&component);
        assert!(idx < self.len, "Index for component out of bounds");
        let range = self.byte_range(idx);
        self.bytes[range].copy_from_slice(component.bytes);
    }

    /// Removes the component at the given index and makes the
    /// last component take its place (unless the one to remove
    /// is the last one).
    ///
    /// # Panics
    /// If `idx` is outside the bounds of the column.
    pub fn swap_remove(&mut self, idx: usize) {
        assert!(idx < self.len, "Index for component out of bounds");

        let last_idx = self.len - 1;
        if idx < last_idx {
            let last_range = self.byte_range(last_idx);
            self.bytes.copy_within(last_range, idx * self.component_size);
        }
        self.bytes.truncate(last_idx * self.component_size);
        self.len = last_idx;
    }

    fn byte_range(&self, idx: usize) -> std::ops::Range<usize> {
        let start = idx * self.component_size;
        start..start + self.component_size
    }

    fn validate_component<C: Component>(&self) {
        assert_eq!(
            C::COMPONENT_ID,
            self.component_id,
            "Tried to use column with wrong component type"
        );
        assert_eq!(
            std::mem::size_of::<C>(),
            self.component_size,
            "Component type has wrong size for column"
        );
    }

    fn validate_view(&self, component: &ComponentByteView<'_>) {
        assert_eq!(
            component.component_id, self.component_id,
            "Tried to use column with wrong component type"
        );
        assert_eq!(
            component.bytes.len(),
            self.component_size,
            "Component bytes have wrong size for column"
        );
    }
}

impl ComponentBytes {
    /// Creates a container for the given bytes of the component with the
    /// given ID.
    pub fn new(component_id: ComponentID, bytes: Vec<u8>) -> Self {
        Self {
            component_id,
            bytes,
        }
    }

    /// Copies the bytes of the given component.
    pub fn from_component<C: Component>(component: &C) -> Self {
        component.component_bytes().to_component_bytes()
    }

    /// Returns the ID of the component type.
    pub fn component_id(&self) -> ComponentID {
        self.component_id
    }

    /// Returns the raw bytes of the component.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns a [`ComponentByteView`] referencing the bytes.
    pub fn as_view(&self) -> ComponentByteView<'_> {
        ComponentByteView::new(self.component_id, &self.bytes)
    }
}

impl<'a> ComponentByteView<'a> {
    /// Creates a view of the given bytes of the component with the given ID.
    pub fn new(component_id: ComponentID, bytes: &'a [u8]) -> Self {
        Self {
            component_id,
            bytes,
        }
    }

    /// Returns the ID of the component type.
    pub fn component_id(&self) -> ComponentID {
        self.component_id
    }

    /// Returns the raw bytes of the component.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Copies the referenced bytes into a [`ComponentBytes`].
    pub fn to_component_bytes(&self) -> ComponentBytes {
        ComponentBytes::new(self.component_id, self.bytes.to_vec())
    }
}

impl<C: Component> ComponentSet for C {
    fn component_ids() -> Vec<ComponentID> {
        vec![C::COMPONENT_ID]
    }

    fn fetch(storage: &ComponentStorage, entity: EntityID) -> Result<Self> {
        storage.get_component::<C>(entity)
    }
}

macro_rules! impl_component_set_for_tuple {
    ($($comp:ident),+) => {
        impl<$($comp: Component),+> ComponentSet for ($($comp,)+) {
            fn component_ids() -> Vec<ComponentID> {
                vec![$($comp::COMPONENT_ID),+]
            }

            fn fetch(storage: &ComponentStorage, entity: EntityID) -> Result<Self> {
                Ok(($(storage.get_component::<$comp>(entity)?,)+))
            }
        }
    };
}

impl_component_set_for_tuple!(A);
impl_component_set_for_tuple!(A, B);
impl_component_set_for_tuple!(A, B, C);
impl_component_set_for_tuple!(A, B, C, D);
impl_component_set_for_tuple!(A, B, C, D, E);
impl_component_set_for_tuple!(A, B, C, D, E, F);
impl_component_set_for_tuple!(A, B, C, D, E, F, G);
impl_component_set_for_tuple!(A, B, C, D, E, F, G, H);

/// Checks that no component type occurs more than once in the given
/// sequence of IDs.
///
/// # Errors
/// Returns [`EcsError::DuplicateComponent`] for the first repeated ID.
pub(crate) fn verify_component_ids_unique(
    component_ids: impl IntoIterator<Item = ComponentID>,
) -> Result<()> {
    let mut seen = Vec::new();
    for component_id in component_ids {
        if seen.contains(&component_id) {
            return Err(EcsError::DuplicateComponent(component_id));
        }
        seen.push(component_id);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::Component;

    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod, Component)]
    pub(crate) struct Marked;

    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod, Component)]
    pub(crate) struct Byte(pub(crate) u8);

    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod, Component)]
    pub(crate) struct Position(pub(crate) f32, pub(crate) f32, pub(crate) f32);

    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod, Component)]
    pub(crate) struct Rectangle {
        pub(crate) center: [f32; 2],
        pub(crate) dimensions: [f32; 2],
    }

    fn column_with<C: Component>(components: &[C]) -> ComponentColumn {
        let mut column = ComponentColumn::new(C::COMPONENT_ID, std::mem::size_of::<C>());
        for component in components {
            column.push(component.component_bytes());
        }
        column
    }

    #[test]
    fn derived_component_ids_are_distinct() {
        assert_ne!(Byte::COMPONENT_ID, Position::COMPONENT_ID);
        assert_ne!(Marked::COMPONENT_ID, Rectangle::COMPONENT_ID);
        assert_eq!(
            Byte::COMPONENT_ID,
            ComponentID::hashed_from_str(concat!(module_path!(), "::Byte"))
        );
    }

    #[test]
    fn registry_contains_derived_components() {
        let registry = ComponentRegistry::from_registered_components().unwrap();
        assert_eq!(
            registry.get(Position::COMPONENT_ID),
            Some(&ComponentMetadata {
                name: "Position",
                size: 12
            })
        );
        assert_eq!(registry.component_name(Marked::COMPONENT_ID), "Marked");
        assert_eq!(
            registry.component_name(ComponentID::hashed_from_str("unknown")),
            ComponentID::hashed_from_str("unknown").to_string()
        );
    }

    #[test]
    fn registered_component_sizes_are_known() {
        assert_eq!(registered_component_size(Byte::COMPONENT_ID), Some(1));
        assert_eq!(registered_component_size(Marked::COMPONENT_ID), Some(0));
        assert_eq!(
            registered_component_size(ComponentID::hashed_from_str("unknown")),
            None
        );
    }

    #[test]
    #[should_panic]
    fn reading_column_with_wrongly_sized_type_fails() {
        let mut column = ComponentColumn::new(Byte::COMPONENT_ID, 4);
        column.push(ComponentByteView::new(Byte::COMPONENT_ID, &[0; 4]));
        column.get::<Byte>(0);
    }

    #[test]
    fn registry_rejects_colliding_component_ids() {
        let mut registry = ComponentRegistry::new();
        let id = ComponentID::hashed_from_str("a");
        registry
            .add_component(&ComponentDescriptor {
                id,
                name: "A",
                size: 4,
            })
            .unwrap();
        assert!(
            registry
                .add_component(&ComponentDescriptor {
                    id,
                    name: "A",
                    size: 4
                })
                .is_ok()
        );
        assert!(
            registry
                .add_component(&ComponentDescriptor {
                    id,
                    name: "B",
                    size: 4
                })
                .is_err()
        );
    }

    #[test]
    fn pushing_and_reading_components_works() {
        let column = column_with(&[Byte(7), Byte(42)]);
        assert_eq!(column.len(), 2);
        assert_eq!(column.get::<Byte>(0), Some(Byte(7)));
        assert_eq!(column.get::<Byte>(1), Some(Byte(42)));
        assert_eq!(column.get::<Byte>(2), None);
        assert_eq!(column.iter::<Byte>().collect::<Vec<_>>(), [Byte(7), Byte(42)]);
    }

    #[test]
    fn zero_sized_components_are_counted() {
        let mut column = column_with(&[Marked, Marked, Marked]);
        assert_eq!(column.len(), 3);
        assert_eq!(column.get::<Marked>(2), Some(Marked));
        column.swap_remove(0);
        assert_eq!(column.len(), 2);
        assert_eq!(column.iter::<Marked>().count(), 2);
    }

    #[test]
    fn overwriting_component_works() {
        let mut column = column_with(&[Position(0.0, 0.0, 0.0), Position(1.0, 1.0, 1.0)]);
        column.overwrite(0, Position(5.0, 6.0, 7.0).component_bytes());
        assert_eq!(column.get::<Position>(0), Some(Position(5.0, 6.0, 7.0)));
        assert_eq!(column.get::<Position>(1), Some(Position(1.0, 1.0, 1.0)));
    }

    #[test]
    fn swap_removing_components_works() {
        let mut column = column_with(&[Byte(0), Byte(1), Byte(2)]);

        column.swap_remove(0);
        assert_eq!(column.iter::<Byte>().collect::<Vec<_>>(), [Byte(2), Byte(1)]);

        column.swap_remove(1);
        assert_eq!(column.iter::<Byte>().collect::<Vec<_>>(), [Byte(2)]);

        column.swap_remove(0);
        assert!(column.is_empty());
    }

    #[test]
    #[should_panic]
    fn swap_removing_out_of_bounds_fails() {
        let mut column = column_with(&[Byte(0)]);
        column.swap_remove(1);
    }

    #[test]
    #[should_panic]
    fn reading_column_as_wrong_type_fails() {
        let column = column_with(&[Byte(0)]);
        column.get::<Position>(0);
    }

    #[test]
    #[should_panic]
    fn pushing_wrong_type_fails() {
        let mut column = column_with(&[Byte(0)]);
        column.push(Position(0.0, 0.0, 0.0).component_bytes());
    }

    #[test]
    fn component_set_ids_work() {
        assert_eq!(<Byte as ComponentSet>::component_ids(), [Byte::COMPONENT_ID]);
        assert_eq!(
            <(Byte, Position)>::component_ids(),
            [Byte::COMPONENT_ID, Position::COMPONENT_ID]
        );
    }

    #[test]
    fn duplicate_component_ids_are_detected() {
        assert!(verify_component_ids_unique([Byte::COMPONENT_ID, Position::COMPONENT_ID]).is_ok());
        assert_eq!(
            verify_component_ids_unique([Byte::COMPONENT_ID, Byte::COMPONENT_ID]),
            Err(EcsError::DuplicateComponent(Byte::COMPONENT_ID))
        );
    }
}
