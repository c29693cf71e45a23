//! Identity tokens used to match a declared child against the child produced
//! for the same declaration on the previous refresh.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::Hash;

use crate::hash::{fold_to_id, hash_one};

/// Identity of a declared child within one parent's child collection.
///
/// Two keys are equal when their id, type and uniqueness flag match and they
/// refer to the same object (or neither refers to one). The reference is only
/// ever compared by address; it is never dereferenced.
///
/// A unique key permits at most one live child; declaring a second child
/// under it in the same session is refused. Non-unique keys match children
/// positionally in declaration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContextKey {
    id: i64,
    type_id: Option<TypeId>,
    type_name: Option<&'static str>,
    is_unique: bool,
    reference: Option<usize>,
}

impl ContextKey {
    /// The key used when a declaration names no context: id 0, no type,
    /// non-unique.
    pub const fn none() -> Self {
        Self {
            id: 0,
            type_id: None,
            type_name: None,
            is_unique: false,
            reference: None,
        }
    }

    /// A unique key from a plain integer id.
    pub const fn id(id: i64) -> Self {
        Self {
            id,
            type_id: None,
            type_name: None,
            is_unique: true,
            reference: None,
        }
    }

    /// A unique key derived from the hash of a value. Values of different
    /// types never collide, even if their hashes do.
    pub fn value<T: Hash + 'static>(value: &T) -> Self {
        Self {
            id: fold_to_id(hash_one(value)),
            type_id: Some(TypeId::of::<T>()),
            type_name: Some(type_name::<T>()),
            is_unique: true,
            reference: None,
        }
    }

    /// A unique key bound to the identity (address) of `target`.
    pub fn reference<T: ?Sized + 'static>(target: &T) -> Self {
        let address = target as *const T as *const () as usize;
        Self {
            id: address as i64,
            type_id: Some(TypeId::of::<T>()),
            type_name: Some(type_name::<T>()),
            is_unique: true,
            reference: Some(address),
        }
    }

    /// Returns a copy of this key that permits several children.
    #[must_use]
    pub const fn shared(mut self) -> Self {
        self.is_unique = false;
        self
    }

    /// Returns a copy of this key that permits a single child.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn raw_id(&self) -> i64 {
        self.id
    }

    pub fn type_id(&self) -> Option<TypeId> {
        self.type_id
    }

    pub fn is_unique(&self) -> bool {
        self.is_unique
    }

    pub fn reference_address(&self) -> Option<usize> {
        self.reference
    }
}

impl fmt::Debug for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextKey({}", self.id)?;
        if let Some(name) = self.type_name {
            write!(f, ":{name}")?;
        }
        if let Some(address) = self.reference {
            write!(f, "@{address:#x}")?;
        }
        if self.is_unique {
            f.write_str(" unique")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
#[path = "tests/context_tests.rs"]
mod tests;
