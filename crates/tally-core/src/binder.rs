//! Field binder: one UI-visible field bound to one (entity, optic) pair
//!
//! A [`FieldBinder`] merges two sources into a single field-value stream:
//! committed document values projected through its optic (deduplicated with
//! distinct-until-changed), and values passed to [`FieldBinder::set`],
//! published optimistically ahead of persistence. `current()` therefore
//! always reflects the most recent `set`, even before the corresponding
//! commit round-trips through the store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::error::Result;
use crate::optic::{Lens, Prism};
use crate::queue::WriteOrigin;
use crate::store::DocumentStore;
use crate::topic::{Topic, TopicSubscriber};
use crate::types::EntityId;

/// Live binding between one field and one entity path.
///
/// Dropping the binder (or calling [`FieldBinder::detach`]) stops the
/// upstream merge task; subscribers of [`FieldBinder::value`] see their
/// stream end.
pub struct FieldBinder<A, B> {
    store: DocumentStore<A>,
    id: EntityId,
    optic: Prism<A, B>,
    topic: Topic<B>,
    /// Number of this binder's writes still queued. While non-zero, every
    /// upstream commit predates them and must not revert the optimistic
    /// value.
    in_flight: Arc<AtomicU64>,
    /// Entity sequence below which commits are stale echoes of state older
    /// than this binder's last applied write. Advanced by the queue worker.
    barrier: Arc<AtomicU64>,
    upstream: JoinHandle<()>,
}

impl<A, B> FieldBinder<A, B>
where
    A: Clone + PartialEq + Send + Sync + 'static,
    B: Clone + PartialEq + Send + Sync + 'static,
{
    /// Bind a field to `id` through a partial path.
    ///
    /// Fails with `NotFound` when `id` is not a live entity. The binder's
    /// cache is seeded synchronously from the committed value, so
    /// [`FieldBinder::current`] is ready as soon as `bind` returns (it stays
    /// `None` while the prism's guard does not match).
    pub fn bind(store: &DocumentStore<A>, id: EntityId, optic: Prism<A, B>) -> Result<Self> {
        let (committed, mut upstream_sub) = store.observe_with_current(id)?;

        let topic = Topic::new(store.capacity());
        if let Some(initial) = optic.get(&committed.value) {
            topic.publish(initial);
        }

        let in_flight = Arc::new(AtomicU64::new(0));
        let barrier = Arc::new(AtomicU64::new(0));
        let merge_topic = topic.clone();
        let merge_optic = optic.clone();
        let merge_in_flight = Arc::clone(&in_flight);
        let merge_barrier = Arc::clone(&barrier);
        let upstream = tokio::spawn(async move {
            while let Some(commit) = upstream_sub.recv().await {
                // While our own writes are still queued, every upstream
                // commit predates them; publishing one would revert the
                // optimistic value. Once a write applies, the worker has
                // advanced the barrier past everything it superseded.
                if merge_in_flight.load(Ordering::SeqCst) > 0
                    || commit.seq < merge_barrier.load(Ordering::SeqCst)
                {
                    tracing::debug!(entity = %id, seq = commit.seq, "suppressing superseded commit");
                    continue;
                }
                match merge_optic.get(&commit.value) {
                    Some(projected) => {
                        // Distinct-until-changed on the projected value:
                        // sibling-field commits that leave this field
                        // untouched are filtered out here.
                        if merge_topic.latest().as_ref() != Some(&projected) {
                            merge_topic.publish(projected);
                        }
                    }
                    None => {
                        tracing::debug!(entity = %id, "field path absent in committed document");
                    }
                }
            }
            tracing::debug!(entity = %id, "field binder upstream ended");
        });

        Ok(Self {
            store: store.clone(),
            id,
            optic,
            topic,
            in_flight,
            barrier,
            upstream,
        })
    }

    /// Bind a field to `id` through a total path.
    pub fn bind_lens(store: &DocumentStore<A>, id: EntityId, lens: Lens<A, B>) -> Result<Self> {
        Self::bind(store, id, Prism::from_lens(lens))
    }

    /// Entity this field is bound to.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Publish `value` to local subscribers immediately, then enqueue the
    /// document write.
    ///
    /// The write applies to the latest committed value in submission order.
    /// If the optic's guard no longer matches by the time the write applies
    /// (the variant tag changed concurrently), the write is dropped without
    /// touching the document. A persistence failure is warn-logged by the
    /// queue worker; the optimistic value is intentionally not rolled back.
    pub fn set(&self, value: B) {
        self.topic.publish(value.clone());

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let origin = WriteOrigin {
            in_flight: Arc::clone(&self.in_flight),
            barrier: Arc::clone(&self.barrier),
        };
        let optic = self.optic.clone();
        let result = self.store.enqueue_binder_modify(
            self.id,
            Box::new(move |doc| optic.set(&doc, value)),
            origin,
        );
        if let Err(err) = result {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!(entity = %self.id, %err, "field write dropped, store is closed");
        }
    }

    /// Latest field value known to this binder, reflecting the most recent
    /// [`FieldBinder::set`] even before persistence confirms.
    ///
    /// `None` only while a partial path has never matched.
    pub fn current(&self) -> Option<B> {
        self.topic.latest()
    }

    /// Subscribe to the merged field-value stream; the latest value is
    /// replayed first.
    pub fn value(&self) -> TopicSubscriber<B> {
        self.topic.subscribe()
    }

    /// Stop merging upstream commits into this binder.
    pub fn detach(&self) {
        self.upstream.abort();
    }
}

impl<A, B> Drop for FieldBinder<A, B> {
    fn drop(&mut self) {
        self.upstream.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::optic::Lens;

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        costs: Vec<String>,
        kind: Kind,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Kind {
        Simple { rate: f64 },
        Detailed,
    }

    fn costs_lens() -> Lens<Doc, Vec<String>> {
        Lens::new(
            |d: &Doc| d.costs.clone(),
            |d, costs| Doc { costs, ..d.clone() },
        )
    }

    fn simple_rate() -> Prism<Doc, f64> {
        Lens::new(|d: &Doc| d.kind.clone(), |d, kind| Doc { kind, ..d.clone() }).then_prism(
            Prism::new(
                |k: &Kind| match k {
                    Kind::Simple { rate } => Some(*rate),
                    Kind::Detailed => None,
                },
                |k, rate| match k {
                    Kind::Simple { .. } => Kind::Simple { rate },
                    Kind::Detailed => k.clone(),
                },
            ),
        )
    }

    fn doc() -> Doc {
        Doc {
            costs: Vec::new(),
            kind: Kind::Simple { rate: 0.03 },
        }
    }

    /// Poll until `check` holds, giving binder tasks time to drain.
    async fn eventually(check: impl Fn() -> bool) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        panic!("condition never reached");
    }

    #[tokio::test]
    async fn test_read_your_writes_before_persistence() {
        let store = DocumentStore::in_memory(&EngineConfig::default());
        let id = store.insert(doc()).await.unwrap();
        let binder = FieldBinder::bind_lens(&store, id, costs_lens()).unwrap();

        binder.set(vec!["c1".to_string()]);
        // Optimistic value visible before the queue settles.
        assert_eq!(binder.current(), Some(vec!["c1".to_string()]));

        store.settle().await.unwrap();
        assert_eq!(store.get(id).unwrap().costs, vec!["c1".to_string()]);
    }

    #[tokio::test]
    async fn test_sequential_sets_from_two_binders() {
        let store = DocumentStore::in_memory(&EngineConfig::default());
        let id = store.insert(doc()).await.unwrap();
        let x = FieldBinder::bind_lens(&store, id, costs_lens()).unwrap();
        let y = FieldBinder::bind_lens(&store, id, costs_lens()).unwrap();

        x.set(vec!["c1".to_string()]);
        y.set(vec!["c1".to_string(), "c2".to_string()]);
        store.settle().await.unwrap();

        let expected = vec!["c1".to_string(), "c2".to_string()];
        assert_eq!(store.get(id).unwrap().costs, expected);
        eventually(|| x.current() == Some(expected.clone())).await;
        eventually(|| y.current() == Some(expected.clone())).await;
    }

    #[tokio::test]
    async fn test_sibling_binder_sees_committed_change() {
        let store = DocumentStore::in_memory(&EngineConfig::default());
        let id = store.insert(doc()).await.unwrap();
        let writer = FieldBinder::bind_lens(&store, id, costs_lens()).unwrap();
        let reader = FieldBinder::bind_lens(&store, id, costs_lens()).unwrap();

        let mut values = reader.value();
        assert_eq!(values.recv().await, Some(Vec::new()));

        writer.set(vec!["c1".to_string()]);
        assert_eq!(values.recv().await, Some(vec!["c1".to_string()]));
    }

    #[tokio::test]
    async fn test_mismatched_prism_write_is_dropped() {
        let store = DocumentStore::in_memory(&EngineConfig::default());
        let id = store.insert(doc()).await.unwrap();
        let rate = FieldBinder::bind(&store, id, simple_rate()).unwrap();
        assert_eq!(rate.current(), Some(0.03));

        // The variant tag changes concurrently...
        store
            .modify(id, |d| Doc {
                kind: Kind::Detailed,
                ..d
            })
            .await
            .unwrap();

        // ...so this write must be silently dropped, not corrupt the doc.
        rate.set(0.99);
        store.settle().await.unwrap();

        let committed = store.get(id).unwrap();
        assert_eq!(committed.kind, Kind::Detailed);
        assert!(committed.costs.is_empty());
    }

    #[tokio::test]
    async fn test_binder_on_missing_entity_fails() {
        let store: DocumentStore<Doc> = DocumentStore::in_memory(&EngineConfig::default());
        assert!(FieldBinder::bind_lens(&store, EntityId(1), costs_lens()).is_err());
    }
}
