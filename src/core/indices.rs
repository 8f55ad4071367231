use hashbrown::HashMap;

/// One-to-many index from a key to the ids filed under it.
pub type VecIndex<K, V> = HashMap<K, Vec<V>>;
