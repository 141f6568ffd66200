//! Strongly-typed identifiers.
//!
//! Each identifier is a thin wrapper around a UUID with a phantom type
//! parameter, so a handle id can never be confused with a pool id even
//! though both share the same representation.
//!
//! # Examples
//!
//! ```
//! use drover_core::id::{HandleId, PoolId};
//! use std::str::FromStr;
//!
//! let handle_id = HandleId::new();
//! let pool_id = PoolId::new();
//! assert_ne!(handle_id.to_string(), pool_id.to_string());
//!
//! let id_str = "550e8400-e29b-41d4-a716-446655440000";
//! let handle_id = HandleId::from_str(id_str).unwrap();
//! assert_eq!(handle_id.to_string(), id_str);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

/// A type-safe identifier based on UUID.
#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T> {
    uuid: Uuid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Create an identifier from a specific UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _marker: PhantomData,
        }
    }

    /// Get the underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Create a nil (all zeros) identifier.
    pub fn nil() -> Self {
        Self::from_uuid(Uuid::nil())
    }

    /// Check if this is a nil identifier.
    pub fn is_nil(&self) -> bool {
        self.uuid.is_nil()
    }
}

// Manual impls so the marker type does not need to implement these traits.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl<T> Eq for Id<T> {}

impl<T> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl<T> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_uuid(Uuid::parse_str(s)?))
    }
}

/// Marker type for pooled handles.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleMarker;
/// Identifier for a pooled handle, assigned by the pool at creation.
pub type HandleId = Id<HandleMarker>;

/// Marker type for pools.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolMarker;
/// Identifier for a pool instance.
pub type PoolId = Id<PoolMarker>;

/// Marker type for automation sessions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionMarker;
/// Identifier for an automation session, assigned by its factory.
pub type SessionId = Id<SessionMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_new() {
        let id1 = HandleId::new();
        let id2 = HandleId::new();
        assert_ne!(id1, id2, "Generated IDs should be unique");
    }

    #[test]
    fn test_id_display() {
        let id = HandleId::new();
        assert_eq!(id.to_string().len(), 36, "UUID string should be 36 characters");
    }

    #[test]
    fn test_id_nil() {
        let nil_id = PoolId::nil();
        assert_eq!(nil_id.to_string(), "00000000-0000-0000-0000-000000000000");
        assert!(nil_id.is_nil());
        assert!(!PoolId::new().is_nil());
    }

    #[test]
    fn test_type_safety() {
        let same_uuid = Uuid::new_v4();
        let handle_id = HandleId::from_uuid(same_uuid);
        let pool_id = PoolId::from_uuid(same_uuid);

        // Same UUID, different types
        assert_eq!(handle_id.uuid(), pool_id.uuid());
    }

    #[test]
    fn test_id_serde() {
        let id = SessionId::new();
        let serialized = serde_json::to_string(&id).unwrap();
        assert_eq!(serialized, format!("\"{}\"", id));
        let deserialized: SessionId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(id, deserialized);
    }
}
