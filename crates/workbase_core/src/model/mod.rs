//! Entity model: descriptors, typed records and reference values.
//!
//! # Responsibility
//! - Describe every persisted entity declaratively (`EntityDescriptor`).
//! - Provide typed read models and create/patch inputs for callers.
//!
//! # Invariants
//! - Every entity is identified by a stable `EntityId`.
//! - Deletion is represented by the `deletedAt` tombstone.
//! - Relation inputs are canonicalized to ids at the API boundary.

pub mod activity_log;
pub mod customer_payment;
pub mod descriptor;
pub mod process_tracking;
pub mod user;
pub mod user_agent;
pub mod workspace;

use descriptor::EntityDescriptor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier of every entity.
pub type EntityId = Uuid;

/// Typed entity bound to a static descriptor.
pub trait Entity: Serialize + DeserializeOwned {
    /// Create input. Serializes to the document submitted to `create`.
    type Create: Serialize;
    /// Partial update input. Absent fields must be skipped when serialized.
    type Patch: Serialize;

    fn descriptor() -> &'static EntityDescriptor;

    fn id(&self) -> EntityId;
}

/// Relation value: a bare id, or an embedded (populated) entity.
///
/// Reads produce `Entity` for one-hop populated relations; writes accept both
/// and only ever persist the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference<T> {
    Id(EntityId),
    Entity(Box<T>),
}

impl<T: Entity> Reference<T> {
    pub fn id(&self) -> EntityId {
        match self {
            Self::Id(id) => *id,
            Self::Entity(entity) => entity.id(),
        }
    }

    /// Populated entity, when this reference was resolved at read time.
    pub fn entity(&self) -> Option<&T> {
        match self {
            Self::Id(_) => None,
            Self::Entity(entity) => Some(entity),
        }
    }
}

impl<T> From<EntityId> for Reference<T> {
    fn from(value: EntityId) -> Self {
        Self::Id(value)
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
