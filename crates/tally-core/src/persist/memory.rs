//! In-memory persistence backend

use std::collections::BTreeMap;

use crate::types::EntityId;

use super::{Persistence, PersistBatch};

/// Keyed in-memory storage; nothing survives the process.
///
/// Used for tests and for documents that do not need durability.
#[derive(Debug, Default)]
pub struct MemoryPersistence<A> {
    rows: BTreeMap<EntityId, A>,
}

impl<A> MemoryPersistence<A> {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows are stored.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<A: Clone + Send + 'static> Persistence<A> for MemoryPersistence<A> {
    fn load_all(&mut self) -> anyhow::Result<Vec<(EntityId, A)>> {
        Ok(self.rows.iter().map(|(id, v)| (*id, v.clone())).collect())
    }

    fn apply(&mut self, batch: PersistBatch<A>) -> anyhow::Result<()> {
        for (id, value) in batch.upserts {
            self.rows.insert(id, value);
        }
        for id in batch.removals {
            self.rows.remove(&id);
        }
        Ok(())
    }
}
