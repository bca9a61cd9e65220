use std::{
    collections::{hash_map::Entry, HashMap},
    fmt::Debug,
    hash::{BuildHasher, Hash},
};

/// Inserting into a map where the key is known to be vacant.
pub trait HashMapInsertNew<K, V> {
    /// Inserts a new key-value pair into the map.
    ///
    /// # Panics
    /// Panics if the key is already present in the map.
    fn insert_new(&mut self, key: K, value: V);
}

impl<K, V, H> HashMapInsertNew<K, V> for HashMap<K, V, H>
where
    K: Eq + Hash + Debug,
    V: Debug,
    H: BuildHasher,
{
    #[inline]
    fn insert_new(&mut self, key: K, value: V) {
        match self.entry(key) {
            Entry::Occupied(entry) => panic!(
                "Key {:?} is already taken by {:?}",
                entry.key(),
                entry.get()
            ),
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
        }
    }
}
