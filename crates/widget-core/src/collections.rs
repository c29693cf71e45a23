//! Map and set aliases used throughout the tree.
//!
//! `hashbrown` + `ahash` by default; the `std-hash` feature swaps both for the
//! standard library versions.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::hash_map::RandomState;
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use ahash::RandomState;
    pub use hashbrown::{HashMap, HashSet};
}

/// Insertion-ordered set, for work lists whose revisit order must be stable
/// from one tick to the next.
pub type OrderedSet<T> = indexmap::IndexSet<T, map::RandomState>;

/// Hash map using the active hasher.
pub type FastMap<K, V> = map::HashMap<K, V, map::RandomState>;

pub type FastSet<T> = map::HashSet<T, map::RandomState>;

/// Insertion-ordered map; iteration follows first insertion.
pub type OrderedMap<K, V> = indexmap::IndexMap<K, V, map::RandomState>;
