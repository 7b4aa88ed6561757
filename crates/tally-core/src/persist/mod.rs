//! Persistence collaborators backing the document store
//!
//! The store talks to durable storage through the [`Persistence`] trait so
//! the engine works against any keyed backend. Two implementations ship with
//! the crate: [`MemoryPersistence`] for tests and ephemeral documents, and
//! [`SqlitePersistence`] for durable local storage.

mod memory;
mod sqlite;

pub use memory::MemoryPersistence;
pub use sqlite::SqlitePersistence;

use crate::types::EntityId;

/// One atomic unit of persisted change: upserts plus removals.
#[derive(Debug)]
pub struct PersistBatch<A> {
    /// Rows to write (insert or replace).
    pub upserts: Vec<(EntityId, A)>,

    /// Rows to delete.
    pub removals: Vec<EntityId>,
}

impl<A> Default for PersistBatch<A> {
    fn default() -> Self {
        Self {
            upserts: Vec::new(),
            removals: Vec::new(),
        }
    }
}

impl<A> PersistBatch<A> {
    /// Batch containing a single upsert.
    pub fn upsert(id: EntityId, value: A) -> Self {
        Self {
            upserts: vec![(id, value)],
            removals: Vec::new(),
        }
    }

    /// Batch containing a single removal.
    pub fn removal(id: EntityId) -> Self {
        Self {
            upserts: Vec::new(),
            removals: vec![id],
        }
    }

    /// True when the batch carries no work.
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }
}

/// Durable keyed storage behind a document store.
///
/// Implementations must apply [`Persistence::apply`] atomically: either every
/// row in the batch is committed or none are. Errors are reported through
/// `anyhow` and surface to callers as
/// [`CoreError::Persistence`](crate::error::CoreError::Persistence).
pub trait Persistence<A>: Send + 'static {
    /// Load every persisted row, used once when the store opens.
    fn load_all(&mut self) -> anyhow::Result<Vec<(EntityId, A)>>;

    /// Apply a batch of upserts and removals as one atomic unit.
    fn apply(&mut self, batch: PersistBatch<A>) -> anyhow::Result<()>;
}
