//! End-to-end engine tests: store, queue and binders working together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tally_core::{
    CoreError, DocumentStore, EngineConfig, EntityId, FieldBinder, Lens, MemoryPersistence,
    PersistBatch, Persistence, SqlitePersistence, TxOp,
};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Record {
    name: String,
    refs: Vec<EntityId>,
}

impl Record {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            refs: Vec::new(),
        }
    }

    fn with_refs(name: &str, refs: Vec<EntityId>) -> Self {
        Self {
            name: name.to_string(),
            refs,
        }
    }
}

fn name_lens() -> Lens<Record, String> {
    Lens::new(
        |r: &Record| r.name.clone(),
        |r, name| Record { name, ..r.clone() },
    )
}

/// Persistence wrapper that fails exactly one armed apply call.
struct FlakyPersistence<A> {
    inner: MemoryPersistence<A>,
    fail_next: Arc<AtomicBool>,
}

impl<A: Clone + Send + 'static> Persistence<A> for FlakyPersistence<A> {
    fn load_all(&mut self) -> anyhow::Result<Vec<(EntityId, A)>> {
        self.inner.load_all()
    }

    fn apply(&mut self, batch: PersistBatch<A>) -> anyhow::Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            anyhow::bail!("simulated disk failure");
        }
        self.inner.apply(batch)
    }
}

#[tokio::test]
async fn cascade_delete_is_all_or_nothing() {
    let fail_next = Arc::new(AtomicBool::new(false));
    let backend = FlakyPersistence {
        inner: MemoryPersistence::new(),
        fail_next: Arc::clone(&fail_next),
    };
    let store = DocumentStore::open(backend, &EngineConfig::default()).unwrap();

    let cost = store.insert(Record::new("pump")).await.unwrap();
    let alt_a = store
        .insert(Record::with_refs("alt-a", vec![cost]))
        .await
        .unwrap();
    let alt_b = store
        .insert(Record::with_refs("alt-b", vec![cost]))
        .await
        .unwrap();

    let cascade = |cost: EntityId, alt_a: EntityId, alt_b: EntityId| {
        vec![
            TxOp::modify(alt_a, move |mut r: Record| {
                r.refs.retain(|id| *id != cost);
                r
            }),
            TxOp::modify(alt_b, move |mut r: Record| {
                r.refs.retain(|id| *id != cost);
                r
            }),
            TxOp::delete(cost),
        ]
    };

    // Simulated failure: the whole group must roll back.
    fail_next.store(true, Ordering::SeqCst);
    let result = store.transact(cascade(cost, alt_a, alt_b)).await;
    assert!(matches!(result, Err(CoreError::Persistence(_))));

    assert!(store.contains(cost));
    assert_eq!(store.get(alt_a).unwrap().refs, vec![cost]);
    assert_eq!(store.get(alt_b).unwrap().refs, vec![cost]);

    // Retry without the fault: id removed from both arrays, entity gone.
    store.transact(cascade(cost, alt_a, alt_b)).await.unwrap();
    assert!(!store.contains(cost));
    assert!(store.get(alt_a).unwrap().refs.is_empty());
    assert!(store.get(alt_b).unwrap().refs.is_empty());
}

#[tokio::test]
async fn persistence_failure_does_not_corrupt_other_entities() {
    let fail_next = Arc::new(AtomicBool::new(false));
    let backend = FlakyPersistence {
        inner: MemoryPersistence::new(),
        fail_next: Arc::clone(&fail_next),
    };
    let store = DocumentStore::open(backend, &EngineConfig::default()).unwrap();

    let a = store.insert(Record::new("a")).await.unwrap();
    let b = store.insert(Record::new("b")).await.unwrap();

    fail_next.store(true, Ordering::SeqCst);
    let failed = store
        .modify(a, |mut r| {
            r.name = "a2".to_string();
            r
        })
        .await;
    assert!(matches!(failed, Err(CoreError::Persistence(_))));

    // The failed write left both entities at their committed values.
    assert_eq!(store.get(a).unwrap().name, "a");
    assert_eq!(store.get(b).unwrap().name, "b");

    // Later writes to the other entity proceed normally.
    store
        .modify(b, |mut r| {
            r.name = "b2".to_string();
            r
        })
        .await
        .unwrap();
    assert_eq!(store.get(b).unwrap().name, "b2");
}

#[tokio::test]
async fn sibling_binders_observe_the_same_committed_sequence() {
    let store = DocumentStore::in_memory(&EngineConfig::default());
    let id = store.insert(Record::new("v0")).await.unwrap();

    let first = FieldBinder::bind_lens(&store, id, name_lens()).unwrap();
    let second = FieldBinder::bind_lens(&store, id, name_lens()).unwrap();
    let mut sub_first = first.value();
    let mut sub_second = second.value();

    for next in ["v1", "v2", "v3"] {
        store
            .modify(id, move |mut r| {
                r.name = next.to_string();
                r
            })
            .await
            .unwrap();
    }

    let mut seen_first = Vec::new();
    let mut seen_second = Vec::new();
    for _ in 0..4 {
        seen_first.push(sub_first.recv().await.unwrap());
        seen_second.push(sub_second.recv().await.unwrap());
    }

    assert_eq!(seen_first, vec!["v0", "v1", "v2", "v3"]);
    assert_eq!(seen_first, seen_second);
}

#[tokio::test]
async fn create_and_link_commit_as_one_unit() {
    let store = DocumentStore::in_memory(&EngineConfig::default());
    let alt = store.insert(Record::new("alt")).await.unwrap();

    // Reserve the id first so the linking mutator can close over it.
    let cost = store.allocate_id();
    store
        .transact(vec![
            TxOp::insert(cost, Record::new("new cost")),
            TxOp::modify(alt, move |mut r: Record| {
                r.refs.push(cost);
                r
            }),
        ])
        .await
        .unwrap();

    assert_eq!(store.get(cost).unwrap().name, "new cost");
    assert_eq!(store.get(alt).unwrap().refs, vec![cost]);
}

#[tokio::test]
async fn sqlite_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tally.db");
    let config = EngineConfig::default();

    let id = {
        let backend: SqlitePersistence<Record> = SqlitePersistence::open(&path).unwrap();
        let store = DocumentStore::open(backend, &config).unwrap();
        let id = store.insert(Record::new("boiler")).await.unwrap();

        let field = FieldBinder::bind_lens(&store, id, name_lens()).unwrap();
        field.set("boiler (revised)".to_string());
        store.settle().await.unwrap();
        id
    };

    let backend: SqlitePersistence<Record> = SqlitePersistence::open(&path).unwrap();
    let store = DocumentStore::open(backend, &config).unwrap();
    assert_eq!(store.get(id).unwrap().name, "boiler (revised)");

    // Ids keep ascending across restarts.
    assert!(store.allocate_id().raw() > id.raw());
}
