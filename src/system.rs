//! Callbacks run by a [`World`] on every update.

use crate::world::World;
use std::{fmt, mem};

/// Behavior run by a [`World`] once per call to
/// [`World::update`](crate::world::World::update).
///
/// Only [`Self::update`] is required. Closures taking `(&mut World, f64)`
/// implement the trait directly.
pub trait System {
    /// Called once when the system is registered with a world.
    fn init(&mut self, _world: &mut World) {}

    /// Called once per world update with the elapsed time step.
    fn update(&mut self, world: &mut World, dt: f64);

    /// Called once when the system is unregistered from a world.
    fn cleanup(&mut self, _world: &mut World) {}

    /// Name used when logging.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Identifier of a system registered with a world. IDs are assigned
/// sequentially and never reused within a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemID(u64);

/// Ordered collection of the systems registered with a world.
///
/// During an update the systems are lent out to the world, so systems
/// registered or unregistered in the middle of an update are tracked
/// separately until the update is over.
#[derive(Default)]
pub struct SystemManager {
    systems: Vec<RegisteredSystem>,
    running_ids: Vec<SystemID>,
    pending_removals: Vec<SystemID>,
    ticking: bool,
    next_id: u64,
}

pub(crate) struct RegisteredSystem {
    pub(crate) id: SystemID,
    pub(crate) system: Box<dyn System>,
}

impl<F> System for F
where
    F: FnMut(&mut World, f64),
{
    fn update(&mut self, world: &mut World, dt: f64) {
        self(world, dt);
    }
}

impl SystemID {
    /// Returns the `u64` value of the ID.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SystemID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SystemManager {
    /// Creates a manager with no systems.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered systems.
    pub fn n_systems(&self) -> usize {
        self.systems.len() + self.running_ids.len()
    }

    /// Returns the IDs of the registered systems in the order they run.
    pub fn system_ids(&self) -> Vec<SystemID> {
        self.running_ids
            .iter()
            .copied()
            .chain(self.systems.iter().map(|registered| registered.id))
            .collect()
    }

    /// Whether a system with the given ID is registered.
    pub fn contains(&self, id: SystemID) -> bool {
        self.running_ids.contains(&id) || self.systems.iter().any(|registered| registered.id == id)
    }

    /// Whether the systems are currently lent out for an update.
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    pub(crate) fn register(&mut self, system: Box<dyn System>) -> SystemID {
        let id = SystemID(self.next_id);
        self.next_id += 1;
        self.systems.push(RegisteredSystem { id, system });
        id
    }

    /// Removes a system that is not currently lent out.
    pub(crate) fn remove(&mut self, id: SystemID) -> Option<RegisteredSystem> {
        let idx = self
            .systems
            .iter()
            .position(|registered| registered.id == id)?;
        Some(self.systems.remove(idx))
    }

    /// Marks a lent-out system for removal once it is handed back. Returns
    /// `false` if no such system is lent out.
    pub(crate) fn defer_removal(&mut self, id: SystemID) -> bool {
        match self.running_ids.iter().position(|&running| running == id) {
            Some(idx) => {
                self.running_ids.remove(idx);
                self.pending_removals.push(id);
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_pending_removals(&mut self) -> Vec<SystemID> {
        mem::take(&mut self.pending_removals)
    }

    /// Lends out all registered systems, in registration order.
    pub(crate) fn begin_tick(&mut self) -> Vec<Option<RegisteredSystem>> {
        self.ticking = true;
        let systems = mem::take(&mut self.systems);
        self.running_ids = systems.iter().map(|registered| registered.id).collect();
        systems.into_iter().map(Some).collect()
    }

    /// Takes back the systems lent out by [`Self::begin_tick`]. Systems
    /// registered in the meantime run after them.
    pub(crate) fn end_tick(&mut self, systems: impl IntoIterator<Item = RegisteredSystem>) {
        let registered_during_tick = mem::take(&mut self.systems);
        self.systems = systems.into_iter().collect();
        self.systems.extend(registered_during_tick);
        self.running_ids.clear();
        self.ticking = false;
    }
}

impl fmt::Debug for SystemManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemManager")
            .field("systems", &self.systems)
            .field("running_ids", &self.running_ids)
            .field("pending_removals", &self.pending_removals)
            .field("ticking", &self.ticking)
            .finish()
    }
}

impl fmt::Debug for RegisteredSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredSystem")
            .field("id", &self.id)
            .field("name", &self.system.name())
            .finish()
    }
}
