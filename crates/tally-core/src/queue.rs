//! Modification queue: ordered application of document writes
//!
//! Every write to a store funnels through one worker task draining an
//! unbounded job channel, so all applied modifications form a single total
//! order: each mutator receives the output of the previous one and no two
//! mutators ever apply to the same base value. Grouped jobs persist as one
//! atomic batch and become visible together, or not at all.
//!
//! Each applied commit carries a per-entity sequence number. Field binders
//! use it to tell fresh commits from stale echoes of state that predates
//! their own queued writes.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};

use crate::error::{CoreError, Result};
use crate::persist::{PersistBatch, Persistence};
use crate::topic::Topic;
use crate::types::EntityId;

/// Boxed single-entity mutation applied by the queue worker.
pub type Mutator<A> = Box<dyn FnOnce(A) -> A + Send>;

/// One committed value together with its per-entity sequence number.
///
/// Sequence numbers start at 1 for the value an entity is created with and
/// increase by 1 with every republished commit of that entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit<A> {
    /// Position of this commit in the entity's total order
    pub seq: u64,
    /// The committed document value
    pub value: A,
}

/// One operation inside a grouped transaction.
pub enum TxOp<A> {
    /// Create an entity under a pre-allocated id.
    Insert {
        /// Id reserved via `DocumentStore::allocate_id`
        id: EntityId,
        /// Initial document value
        value: A,
    },
    /// Rewrite an existing entity's document.
    Modify {
        /// Target entity
        id: EntityId,
        /// Pure rewrite of the committed value
        mutator: Mutator<A>,
    },
    /// Remove an entity.
    Delete {
        /// Target entity
        id: EntityId,
    },
}

impl<A> TxOp<A> {
    /// Insert `value` under a pre-allocated `id`.
    pub fn insert(id: EntityId, value: A) -> Self {
        TxOp::Insert { id, value }
    }

    /// Rewrite the entity at `id`.
    pub fn modify(id: EntityId, mutator: impl FnOnce(A) -> A + Send + 'static) -> Self {
        TxOp::Modify {
            id,
            mutator: Box::new(mutator),
        }
    }

    /// Remove the entity at `id`.
    pub fn delete(id: EntityId) -> Self {
        TxOp::Delete { id }
    }
}

impl<A> std::fmt::Debug for TxOp<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxOp::Insert { id, .. } => write!(f, "Insert({id})"),
            TxOp::Modify { id, .. } => write!(f, "Modify({id})"),
            TxOp::Delete { id } => write!(f, "Delete({id})"),
        }
    }
}

/// Bookkeeping handles of the binder that submitted a write.
///
/// When the write applies, the worker advances `barrier` past the entity's
/// current sequence and then decrements `in_flight`, in that order, so the
/// binder can suppress every commit that predates its write.
pub(crate) struct WriteOrigin {
    pub in_flight: Arc<AtomicU64>,
    pub barrier: Arc<AtomicU64>,
}

impl WriteOrigin {
    /// Mark the originating write as applied up to `entity_seq`.
    fn applied(&self, entity_seq: u64) {
        self.barrier.store(entity_seq + 1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Mark the originating write as finished without a seq to anchor on.
    fn finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Jobs accepted by the queue worker.
pub(crate) enum Job<A> {
    Insert {
        id: EntityId,
        value: A,
        reply: oneshot::Sender<Result<()>>,
    },
    Modify {
        id: EntityId,
        mutator: Mutator<A>,
        /// `None` for fire-and-forget submissions; failures are warn-logged.
        reply: Option<oneshot::Sender<Result<()>>>,
        /// Present when a field binder submitted the write.
        origin: Option<WriteOrigin>,
    },
    Transact {
        ops: Vec<TxOp<A>>,
        reply: oneshot::Sender<Result<()>>,
    },
    Delete {
        id: EntityId,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Resolves once every previously enqueued job has been applied.
    Barrier { reply: oneshot::Sender<()> },
}

/// Live per-entity state shared between the store handles and the worker.
pub(crate) struct LiveEntry<A> {
    pub committed: A,
    /// Sequence of the latest commit; starts at 1 on insert.
    pub seq: u64,
    pub topic: Topic<Commit<A>>,
}

pub(crate) type LiveMap<A> = Arc<RwLock<HashMap<EntityId, LiveEntry<A>>>>;

/// Drain jobs until every store handle is dropped.
pub(crate) async fn run_worker<A, P>(
    mut jobs: mpsc::UnboundedReceiver<Job<A>>,
    live: LiveMap<A>,
    mut persistence: P,
    capacity: usize,
) where
    A: Clone + PartialEq + Send + Sync + 'static,
    P: Persistence<A>,
{
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Insert { id, value, reply } => {
                let result = apply_insert(&live, &mut persistence, capacity, id, value);
                let _ = reply.send(result);
            }
            Job::Modify {
                id,
                mutator,
                reply,
                origin,
            } => {
                let result = apply_modify(&live, &mut persistence, id, mutator, origin);
                match reply {
                    Some(tx) => {
                        let _ = tx.send(result);
                    }
                    None => {
                        if let Err(err) = result {
                            tracing::warn!(entity = %id, %err, "dropping failed fire-and-forget modification");
                        }
                    }
                }
            }
            Job::Transact { ops, reply } => {
                let result = apply_transact(&live, &mut persistence, capacity, ops);
                let _ = reply.send(result);
            }
            Job::Delete { id, reply } => {
                let result = apply_delete(&live, &mut persistence, id);
                let _ = reply.send(result);
            }
            Job::Barrier { reply } => {
                let _ = reply.send(());
            }
        }
    }
    tracing::debug!("modification queue drained, worker exiting");
}

fn apply_insert<A, P>(
    live: &LiveMap<A>,
    persistence: &mut P,
    capacity: usize,
    id: EntityId,
    value: A,
) -> Result<()>
where
    A: Clone + PartialEq + Send + Sync + 'static,
    P: Persistence<A>,
{
    persistence
        .apply(PersistBatch::upsert(id, value.clone()))
        .map_err(CoreError::Persistence)?;

    let mut map = live.write();
    match map.entry(id) {
        std::collections::hash_map::Entry::Occupied(mut occupied) => {
            let entry = occupied.get_mut();
            entry.committed = value.clone();
            entry.seq += 1;
            entry.topic.publish(Commit {
                seq: entry.seq,
                value,
            });
        }
        std::collections::hash_map::Entry::Vacant(slot) => {
            slot.insert(LiveEntry {
                committed: value.clone(),
                seq: 1,
                topic: Topic::with_initial(Commit { seq: 1, value }, capacity),
            });
        }
    }
    tracing::debug!(entity = %id, "entity inserted");
    Ok(())
}

fn apply_modify<A, P>(
    live: &LiveMap<A>,
    persistence: &mut P,
    id: EntityId,
    mutator: Mutator<A>,
    origin: Option<WriteOrigin>,
) -> Result<()>
where
    A: Clone + PartialEq + Send + Sync + 'static,
    P: Persistence<A>,
{
    let current = {
        let map = live.read();
        match map.get(&id) {
            Some(entry) => entry.committed.clone(),
            None => {
                if let Some(origin) = &origin {
                    origin.finished();
                }
                return Err(CoreError::NotFound(id));
            }
        }
    };

    let next = mutator(current.clone());
    if next == current {
        // A mismatched prism write lands here: nothing to persist, nothing
        // to republish.
        let map = live.read();
        if let (Some(origin), Some(entry)) = (&origin, map.get(&id)) {
            origin.applied(entry.seq);
        }
        tracing::debug!(entity = %id, "modification left the document unchanged");
        return Ok(());
    }

    if let Err(err) = persistence.apply(PersistBatch::upsert(id, next.clone())) {
        let map = live.read();
        if let (Some(origin), Some(entry)) = (&origin, map.get(&id)) {
            origin.applied(entry.seq);
        }
        return Err(CoreError::Persistence(err));
    }

    let mut map = live.write();
    if let Some(entry) = map.get_mut(&id) {
        entry.committed = next.clone();
        entry.seq += 1;
        if let Some(origin) = &origin {
            origin.applied(entry.seq);
        }
        entry.topic.publish(Commit {
            seq: entry.seq,
            value: next,
        });
    }
    Ok(())
}

fn apply_delete<A, P>(live: &LiveMap<A>, persistence: &mut P, id: EntityId) -> Result<()>
where
    A: Clone + PartialEq + Send + Sync + 'static,
    P: Persistence<A>,
{
    if !live.read().contains_key(&id) {
        return Err(CoreError::NotFound(id));
    }

    persistence
        .apply(PersistBatch::removal(id))
        .map_err(CoreError::Persistence)?;

    // Dropping the entry drops its topic, ending every observer stream.
    live.write().remove(&id);
    tracing::debug!(entity = %id, "entity deleted");
    Ok(())
}

fn apply_transact<A, P>(
    live: &LiveMap<A>,
    persistence: &mut P,
    capacity: usize,
    ops: Vec<TxOp<A>>,
) -> Result<()>
where
    A: Clone + PartialEq + Send + Sync + 'static,
    P: Persistence<A>,
{
    // Stage every op against a private working set first; the live map and
    // the persistence layer see either the whole group or nothing.
    let mut working: BTreeMap<EntityId, Option<A>> = BTreeMap::new();

    for op in ops {
        match op {
            TxOp::Insert { id, value } => {
                working.insert(id, Some(value));
            }
            TxOp::Modify { id, mutator } => {
                let current = match working.get(&id) {
                    Some(Some(value)) => value.clone(),
                    Some(None) => return Err(CoreError::NotFound(id)),
                    None => match live.read().get(&id) {
                        Some(entry) => entry.committed.clone(),
                        None => return Err(CoreError::NotFound(id)),
                    },
                };
                working.insert(id, Some(mutator(current)));
            }
            TxOp::Delete { id } => {
                let exists = match working.get(&id) {
                    Some(staged) => staged.is_some(),
                    None => live.read().contains_key(&id),
                };
                if !exists {
                    return Err(CoreError::NotFound(id));
                }
                working.insert(id, None);
            }
        }
    }

    let mut batch = PersistBatch::default();
    for (id, staged) in &working {
        match staged {
            Some(value) => batch.upserts.push((*id, value.clone())),
            None => batch.removals.push(*id),
        }
    }
    persistence.apply(batch).map_err(CoreError::Persistence)?;

    let mut map = live.write();
    for (id, staged) in working {
        match staged {
            Some(value) => match map.entry(id) {
                std::collections::hash_map::Entry::Occupied(mut occupied) => {
                    let entry = occupied.get_mut();
                    if entry.committed != value {
                        entry.committed = value.clone();
                        entry.seq += 1;
                        entry.topic.publish(Commit {
                            seq: entry.seq,
                            value,
                        });
                    }
                }
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(LiveEntry {
                        committed: value.clone(),
                        seq: 1,
                        topic: Topic::with_initial(Commit { seq: 1, value }, capacity),
                    });
                }
            },
            None => {
                map.remove(&id);
            }
        }
    }
    Ok(())
}
