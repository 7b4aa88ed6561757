//! Document store: per-entity persisted state plus live observation
//!
//! A [`DocumentStore`] owns the canonical committed value of every entity,
//! republishes each committed value to observers, and funnels all writes
//! through the modification queue worker so that same-store writes apply in
//! strict submission order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};

use crate::config::EngineConfig;
use crate::error::{CoreError, Result};
use crate::persist::{MemoryPersistence, Persistence};
use crate::queue::{run_worker, Commit, Job, LiveEntry, LiveMap, Mutator, TxOp, WriteOrigin};
use crate::topic::{Topic, TopicSubscriber};
use crate::types::EntityId;

/// Handle to one logical document graph.
///
/// Cheap to clone; all clones share the same committed state and the same
/// modification queue. The queue worker exits once every handle is dropped.
pub struct DocumentStore<A> {
    live: LiveMap<A>,
    jobs: mpsc::UnboundedSender<Job<A>>,
    next_id: Arc<AtomicI64>,
    capacity: usize,
}

impl<A> Clone for DocumentStore<A> {
    fn clone(&self) -> Self {
        Self {
            live: Arc::clone(&self.live),
            jobs: self.jobs.clone(),
            next_id: Arc::clone(&self.next_id),
            capacity: self.capacity,
        }
    }
}

impl<A> std::fmt::Debug for DocumentStore<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("entities", &self.live.read().len())
            .finish_non_exhaustive()
    }
}

impl<A> DocumentStore<A>
where
    A: Clone + PartialEq + Send + Sync + 'static,
{
    /// Open a store over a persistence backend, reloading every persisted
    /// document.
    ///
    /// Must be called from within a tokio runtime: the modification queue
    /// worker is spawned here.
    pub fn open<P: Persistence<A>>(mut persistence: P, config: &EngineConfig) -> Result<Self> {
        let rows = persistence.load_all().map_err(CoreError::Persistence)?;
        tracing::info!(entities = rows.len(), "document store opened");
        Ok(Self::from_parts(rows, persistence, config))
    }

    /// Open an empty store with in-memory persistence, for tests and
    /// ephemeral documents.
    pub fn in_memory(config: &EngineConfig) -> Self {
        Self::from_parts(Vec::new(), MemoryPersistence::new(), config)
    }

    fn from_parts<P: Persistence<A>>(
        rows: Vec<(EntityId, A)>,
        persistence: P,
        config: &EngineConfig,
    ) -> Self {
        let capacity = config.channel_capacity.max(1);
        let mut max_id = 0;
        let mut map = HashMap::new();
        for (id, value) in rows {
            max_id = max_id.max(id.raw());
            map.insert(
                id,
                LiveEntry {
                    committed: value.clone(),
                    seq: 1,
                    topic: Topic::with_initial(Commit { seq: 1, value }, capacity),
                },
            );
        }

        let live: LiveMap<A> = Arc::new(RwLock::new(map));
        let (jobs, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(rx, Arc::clone(&live), persistence, capacity));

        Self {
            live,
            jobs,
            next_id: Arc::new(AtomicI64::new(max_id + 1)),
            capacity,
        }
    }

    /// Reserve a fresh entity id ahead of an insert or transaction.
    pub fn allocate_id(&self) -> EntityId {
        EntityId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Topic capacity used for observer streams.
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert a new entity, returning its assigned id.
    pub async fn insert(&self, value: A) -> Result<EntityId> {
        let id = self.allocate_id();
        self.insert_with_id(id, value).await?;
        Ok(id)
    }

    /// Insert under an id previously reserved with [`Self::allocate_id`].
    pub async fn insert_with_id(&self, id: EntityId, value: A) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(Job::Insert { id, value, reply })
            .map_err(|_| CoreError::Closed)?;
        rx.await.map_err(|_| CoreError::Closed)?
    }

    /// Apply `mutator` to the latest committed value of `id` and persist the
    /// result, awaiting the commit.
    ///
    /// Calls for the same store apply in strict submission order.
    pub async fn modify(
        &self,
        id: EntityId,
        mutator: impl FnOnce(A) -> A + Send + 'static,
    ) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(Job::Modify {
                id,
                mutator: Box::new(mutator),
                reply: Some(reply),
                origin: None,
            })
            .map_err(|_| CoreError::Closed)?;
        rx.await.map_err(|_| CoreError::Closed)?
    }

    /// Enqueue a modification without awaiting its commit.
    ///
    /// Submission order is still preserved. Failures are warn-logged by the
    /// queue worker instead of surfacing here; callers that need the error
    /// use [`Self::modify`].
    pub fn enqueue_modify(
        &self,
        id: EntityId,
        mutator: impl FnOnce(A) -> A + Send + 'static,
    ) -> Result<()> {
        self.send_modify(id, Box::new(mutator), None)
    }

    /// Fire-and-forget modification carrying the submitting binder's
    /// bookkeeping handles.
    pub(crate) fn enqueue_binder_modify(
        &self,
        id: EntityId,
        mutator: Mutator<A>,
        origin: WriteOrigin,
    ) -> Result<()> {
        self.send_modify(id, mutator, Some(origin))
    }

    fn send_modify(
        &self,
        id: EntityId,
        mutator: Mutator<A>,
        origin: Option<WriteOrigin>,
    ) -> Result<()> {
        self.jobs
            .send(Job::Modify {
                id,
                mutator,
                reply: None,
                origin,
            })
            .map_err(|_| CoreError::Closed)
    }

    /// Apply a group of operations as one atomic unit.
    ///
    /// Either every operation is committed and becomes visible together, or
    /// (on failure) none are, leaving prior state intact.
    pub async fn transact(&self, ops: Vec<TxOp<A>>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(Job::Transact { ops, reply })
            .map_err(|_| CoreError::Closed)?;
        rx.await.map_err(|_| CoreError::Closed)?
    }

    /// Remove an entity; its observer streams end.
    pub async fn delete(&self, id: EntityId) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(Job::Delete { id, reply })
            .map_err(|_| CoreError::Closed)?;
        rx.await.map_err(|_| CoreError::Closed)?
    }

    /// Wait until every previously submitted write has been applied.
    pub async fn settle(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(Job::Barrier { reply })
            .map_err(|_| CoreError::Closed)?;
        rx.await.map_err(|_| CoreError::Closed)
    }

    /// Observe the entity at `id`: the latest commit is replayed
    /// immediately, then every subsequent commit follows in sequence order.
    pub fn observe(&self, id: EntityId) -> Result<TopicSubscriber<Commit<A>>> {
        let map = self.live.read();
        map.get(&id)
            .map(|entry| entry.topic.subscribe())
            .ok_or(CoreError::NotFound(id))
    }

    /// Atomically snapshot the latest commit and subscribe to subsequent
    /// ones.
    ///
    /// Both sides come from the same lock acquisition, so the snapshot is
    /// exactly the commit the subscription replays first — binders rely on
    /// this to seed their cache without ever reordering a commit.
    pub fn observe_with_current(&self, id: EntityId) -> Result<(Commit<A>, TopicSubscriber<Commit<A>>)> {
        let map = self.live.read();
        map.get(&id)
            .map(|entry| {
                (
                    Commit {
                        seq: entry.seq,
                        value: entry.committed.clone(),
                    },
                    entry.topic.subscribe(),
                )
            })
            .ok_or(CoreError::NotFound(id))
    }

    /// Snapshot of the committed value at `id`.
    pub fn get(&self, id: EntityId) -> Result<A> {
        let map = self.live.read();
        map.get(&id)
            .map(|entry| entry.committed.clone())
            .ok_or(CoreError::NotFound(id))
    }

    /// True when `id` is a live entity.
    pub fn contains(&self, id: EntityId) -> bool {
        self.live.read().contains_key(&id)
    }

    /// Ids of every live entity, ascending.
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.live.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.live.read().len()
    }

    /// True when the store holds no entities.
    pub fn is_empty(&self) -> bool {
        self.live.read().is_empty()
    }
}
