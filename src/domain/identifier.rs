//! Phantom-typed entity identifiers.
//!
//! An `Identifier<Board>` and an `Identifier<Task>` are distinct types even
//! though both are plain strings on the wire, so a call site cannot pass a
//! task id where a board id is expected. The marker parameter exists only at
//! compile time; serialization is transparent.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique key for one entity kind.
///
/// `Identifier::new()` generates a fresh UUID v4. Equality and hashing go by
/// the raw string value. Two identifiers of different kinds may carry
/// colliding raw strings; the type system keeps them apart at the API
/// surface, not at the wire boundary.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier<T> {
    raw: String,
    #[serde(skip)]
    _kind: PhantomData<fn() -> T>,
}

impl<T> Identifier<T> {
    /// Fresh globally unique identifier.
    pub fn new() -> Self {
        Self::from_raw(Uuid::new_v4().to_string())
    }

    /// Wrap an existing raw value, e.g. one received from a backend.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            _kind: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn into_raw(self) -> String {
        self.raw
    }
}

impl<T> Default for Identifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Manual impls so marker types need no trait bounds of their own.

impl<T> Clone for Identifier<T> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T> PartialEq for Identifier<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Identifier<T> {}

impl<T> Hash for Identifier<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Identifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.raw)
    }
}

impl<T> fmt::Display for Identifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<T> From<&str> for Identifier<T> {
    fn from(raw: &str) -> Self {
        Self::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    #[test]
    fn generated_identifiers_are_unique() {
        let a: Identifier<Marker> = Identifier::new();
        let b: Identifier<Marker> = Identifier::new();
        assert_ne!(a, b);
    }

    #[test]
    fn equality_goes_by_raw_value() {
        let a: Identifier<Marker> = Identifier::from_raw("b1");
        let b: Identifier<Marker> = Identifier::from_raw("b1");
        assert_eq!(a, b);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id: Identifier<Marker> = Identifier::from_raw("team-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"team-1\"");

        let back: Identifier<Marker> = serde_json::from_str("\"team-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn usable_as_hash_map_key() {
        use std::collections::HashMap;
        let mut map: HashMap<Identifier<Marker>, u32> = HashMap::new();
        map.insert(Identifier::from_raw("x"), 1);
        assert_eq!(map.get(&Identifier::from_raw("x")), Some(&1));
    }
}
