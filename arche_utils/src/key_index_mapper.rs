//! Map for keeping track of which [`HashMap`] key
//! corresponds to which index in an underlying [`Vec`].

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Map for keeping track of which [`HashMap`] key
/// corresponds to which index in an underlying [`Vec`].
///
/// The mapper lets data be addressed by key while the data itself stays
/// packed in a `Vec`. Items can be reordered in the `Vec` (like doing a
/// swap remove) without invalidating the keys used to access them, as
/// long as the same operation is mirrored on the mapper.
#[derive(Clone, Debug)]
pub struct KeyIndexMapper<K> {
    indices_for_keys: HashMap<K, usize>,
    keys_at_indices: Vec<K>,
}

impl<K> KeyIndexMapper<K>
where
    K: Copy + Hash + Eq + Debug,
{
    /// Creates a new mapper with no keys.
    pub fn new() -> Self {
        Self {
            indices_for_keys: HashMap::new(),
            keys_at_indices: Vec::new(),
        }
    }

    /// Returns a slice with all keys in the order in which their entries
    /// in the underlying [`Vec`] are stored.
    pub fn keys(&self) -> &[K] {
        &self.keys_at_indices
    }

    /// Returns an iterator over all keys in the order in which their
    /// entries in the underlying [`Vec`] are stored.
    pub fn key_at_each_idx(&self) -> impl Iterator<Item = K> + '_ {
        self.keys_at_indices.iter().copied()
    }

    /// Whether the mapper has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys_at_indices.is_empty()
    }

    /// Whether an index exists for the given key.
    pub fn contains_key(&self, key: K) -> bool {
        self.indices_for_keys.contains_key(&key)
    }

    /// The number of keys/indices in the mapper.
    pub fn len(&self) -> usize {
        self.keys_at_indices.len()
    }

    /// Returns the index corresponding to the given key
    /// if the key exists, otherwise returns [`None`].
    pub fn get(&self, key: K) -> Option<usize> {
        self.indices_for_keys.get(&key).copied()
    }

    /// Adds the given key and maps it to the next index.
    ///
    /// # Returns
    /// The index of the new key, or [`None`] (leaving the mapper untouched)
    /// if the key already exists.
    pub fn try_push_key(&mut self, key: K) -> Option<usize> {
        if self.indices_for_keys.contains_key(&key) {
            return None;
        }
        let idx_of_new_key = self.keys_at_indices.len();
        self.keys_at_indices.push(key);
        self.indices_for_keys.insert(key, idx_of_new_key);
        Some(idx_of_new_key)
    }

    /// Removes the given key and assigns the key at the last
    /// index to the index of the removed key (unless the key
    /// to remove was at the last index) before popping the end
    /// of the [`Vec`].
    ///
    /// # Returns
    /// The index of the removed key, or [`None`] if the key does not exist.
    pub fn swap_remove_key(&mut self, key: K) -> Option<usize> {
        let idx_of_removed_key = self.indices_for_keys.remove(&key)?;
        self.keys_at_indices.swap_remove(idx_of_removed_key);
        if let Some(&moved_key) = self.keys_at_indices.get(idx_of_removed_key) {
            self.indices_for_keys.insert(moved_key, idx_of_removed_key);
        }
        Some(idx_of_removed_key)
    }
}

impl<K> Default for KeyIndexMapper<K>
where
    K: Copy + Hash + Eq + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
