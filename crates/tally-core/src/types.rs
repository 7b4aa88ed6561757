//! Core identifier types shared across the engine

use serde::{Deserialize, Serialize};

/// Stable integer identity of a persisted entity
///
/// Ids are assigned by the owning [`DocumentStore`](crate::store::DocumentStore)
/// as a monotonically increasing sequence and never reused within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Raw integer value, as stored in the persistence layer.
    pub fn raw(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}
