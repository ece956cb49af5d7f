//! Entity identifiers and the ledger of live entities.

use crate::error::{EcsError, Result};
use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;
use rand::{RngCore, SeedableRng, rngs::StdRng};
use std::{collections::HashSet, fmt, str::FromStr};
use thiserror::Error;

/// Identifier for an entity.
///
/// The identifier is a random (version 4) UUID. Its text form is the usual
/// lowercase, hyphenated 8-4-4-4-12 hex representation of the 16 bytes in
/// big-endian order.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroable, Pod)]
pub struct EntityID(u128);

/// Error returned when a string is not a valid [`EntityID`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseEntityIDError {
    #[error("expected 36 characters, got {0}")]
    InvalidLength(usize),
    #[error("expected `-` at position {0}")]
    MissingHyphen(usize),
    #[error("invalid hex digit at position {0}")]
    InvalidDigit(usize),
}

/// Tracks which entities are alive.
///
/// Implementations are shared between the world and any other owner of
/// entity lifetimes, so every method takes `&self`.
pub trait EntityLedger: Send + Sync + fmt::Debug {
    /// Generates a new identifier and registers it as alive.
    fn create(&self) -> EntityID;

    /// Removes the entity from the set of live entities.
    ///
    /// # Errors
    /// Returns [`EcsError::EntityNotFound`] if the entity is not alive.
    fn destroy(&self, entity: EntityID) -> Result<()>;

    /// Whether the entity is alive.
    fn is_alive(&self, entity: EntityID) -> bool;
}

/// Thread-safe [`EntityLedger`] generating random identifiers.
#[derive(Debug)]
pub struct EntityManager {
    state: Mutex<EntityManagerState>,
}

#[derive(Debug)]
struct EntityManagerState {
    alive: HashSet<EntityID>,
    rng: StdRng,
}

const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];
const TEXT_LEN: usize = 36;

impl EntityID {
    /// Creates a version 4 identifier from the given random bytes, forcing
    /// the version and variant bits.
    pub fn from_random_bytes(mut bytes: [u8; 16]) -> Self {
        bytes[6] = (bytes[6] & 0x0F) | 0x40;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        Self(u128::from_be_bytes(bytes))
    }

    /// Creates an identifier from its 128-bit value.
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    /// Returns the 16 bytes of the identifier in big-endian order.
    pub const fn to_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for EntityID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = format!("{:032x}", self.0);
        write!(
            f,
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }
}

impl FromStr for EntityID {
    type Err = ParseEntityIDError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let chars = s.as_bytes();
        if chars.len() != TEXT_LEN {
            return Err(ParseEntityIDError::InvalidLength(s.chars().count()));
        }

        let mut value: u128 = 0;
        for (position, &c) in chars.iter().enumerate() {
            if HYPHEN_POSITIONS.contains(&position) {
                if c != b'-' {
                    return Err(ParseEntityIDError::MissingHyphen(position));
                }
                continue;
            }
            let digit = (c as char)
                .to_digit(16)
                .ok_or(ParseEntityIDError::InvalidDigit(position))?;
            value = (value << 4) | u128::from(digit);
        }
        Ok(Self(value))
    }
}

impl EntityManager {
    /// Creates a manager with no live entities, drawing identifiers from an
    /// entropy-seeded generator.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Creates a manager whose sequence of identifiers is fully determined
    /// by the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: Mutex::new(EntityManagerState {
                alive: HashSet::new(),
                rng,
            }),
        }
    }

    /// Returns the number of live entities.
    pub fn alive_count(&self) -> usize {
        self.state.lock().alive.len()
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityLedger for EntityManager {
    fn create(&self) -> EntityID {
        let mut state = self.state.lock();
        let mut bytes = [0; 16];
        state.rng.fill_bytes(&mut bytes);
        let entity = EntityID::from_random_bytes(bytes);
        state.alive.insert(entity);
        entity
    }

    fn destroy(&self, entity: EntityID) -> Result<()> {
        if self.state.lock().alive.remove(&entity) {
            Ok(())
        } else {
            Err(EcsError::EntityNotFound(entity))
        }
    }

    fn is_alive(&self, entity: EntityID) -> bool {
        self.state.lock().alive.contains(&entity)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn creating_entity_makes_it_alive() {
        let manager = EntityManager::with_seed(0);
        let entity = manager.create();
        assert!(manager.is_alive(entity));
        assert_eq!(manager.alive_count(), 1);
    }

    #[test]
    fn destroying_entity_works() {
        let manager = EntityManager::with_seed(0);
        let entity = manager.create();
        manager.destroy(entity).unwrap();
        assert!(!manager.is_alive(entity));
        assert_eq!(manager.alive_count(), 0);
    }

    #[test]
    fn destroying_entity_twice_fails() {
        let manager = EntityManager::with_seed(0);
        let entity = manager.create();
        manager.destroy(entity).unwrap();
        assert_eq!(
            manager.destroy(entity),
            Err(EcsError::EntityNotFound(entity))
        );
        assert_eq!(
            manager.destroy(entity),
            Err(EcsError::EntityNotFound(entity))
        );
    }

    #[test]
    fn destroying_unknown_entity_leaves_others_alive() {
        let manager = EntityManager::with_seed(0);
        let entity = manager.create();
        assert!(manager.destroy(EntityID::from_u128(7)).is_err());
        assert!(manager.is_alive(entity));
    }

    #[test]
    fn seeded_managers_generate_identical_ids() {
        let manager_1 = EntityManager::with_seed(42);
        let manager_2 = EntityManager::with_seed(42);
        for _ in 0..10 {
            assert_eq!(manager_1.create(), manager_2.create());
        }
    }

    #[test]
    fn generated_ids_have_version_and_variant_bits() {
        let manager = EntityManager::with_seed(3);
        for _ in 0..100 {
            let bytes = manager.create().to_bytes();
            assert_eq!(bytes[6] >> 4, 0b0100);
            assert_eq!(bytes[8] >> 6, 0b10);
        }
    }

    #[test]
    fn entity_id_text_form_works() {
        let entity = EntityID::from_u128(0x0123_4567_89ab_4def_8123_4567_89ab_cdef);
        let text = entity.to_string();
        assert_eq!(text, "01234567-89ab-4def-8123-456789abcdef");
        assert_eq!(text.parse::<EntityID>().unwrap(), entity);
    }

    #[test]
    fn parsing_uppercase_entity_id_works() {
        let entity: EntityID = "01234567-89AB-4DEF-8123-456789ABCDEF".parse().unwrap();
        assert_eq!(entity.to_string(), "01234567-89ab-4def-8123-456789abcdef");
    }

    #[test]
    fn parsing_malformed_entity_ids_fails() {
        assert_eq!(
            "0123".parse::<EntityID>(),
            Err(ParseEntityIDError::InvalidLength(4))
        );
        assert_eq!(
            "01234567x89ab-4def-8123-456789abcdef".parse::<EntityID>(),
            Err(ParseEntityIDError::MissingHyphen(8))
        );
        assert_eq!(
            "g1234567-89ab-4def-8123-456789abcdef".parse::<EntityID>(),
            Err(ParseEntityIDError::InvalidDigit(0))
        );
    }

    #[test]
    fn concurrent_creation_gives_unique_live_entities() {
        let manager = Arc::new(EntityManager::with_seed(1));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || (0..250).map(|_| manager.create()).collect::<Vec<_>>())
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for entity in handle.join().unwrap() {
                assert!(manager.is_alive(entity));
                all.insert(entity);
            }
        }
        assert_eq!(all.len(), 1000);
        assert_eq!(manager.alive_count(), 1000);
    }
}
