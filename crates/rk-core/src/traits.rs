//! Core entity traits
//!
//! Entities are plain domain objects that carry a primary key. How they map
//! to table columns is the business of the database crate.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary key value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Uuid(Uuid),
    Text(String),
}

impl EntityId {
    /// An identifier that cannot address a row: zero, empty string, "0"
    /// or the nil UUID.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Int(id) => *id == 0,
            Self::Text(id) => id.is_empty() || id == "0",
            Self::Uuid(id) => id.is_nil(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{}", id),
            Self::Uuid(id) => write!(f, "{}", id),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<i32> for EntityId {
    fn from(id: i32) -> Self {
        Self::Int(id.into())
    }
}

impl From<Uuid> for EntityId {
    fn from(id: Uuid) -> Self {
        Self::Uuid(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

/// Trait for entities that have a primary key
pub trait Identifiable {
    fn id(&self) -> Option<EntityId>;

    /// Store the key assigned by the database after an insert
    fn set_id(&mut self, id: EntityId);

    fn is_persisted(&self) -> bool {
        self.id().map(|id| !id.is_empty()).unwrap_or(false)
    }

    fn is_new_record(&self) -> bool {
        !self.is_persisted()
    }
}

/// Base trait for all domain entities
pub trait Entity: Identifiable + Send + Sync {
    /// The database table name
    const TABLE_NAME: &'static str;

    /// Human-readable type name for error messages
    const TYPE_NAME: &'static str;
}
