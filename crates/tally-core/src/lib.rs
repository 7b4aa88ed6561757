//! Tally Core - reactive document binding and validation engine
//!
//! Tally Core is the editing backbone of a multi-entity financial-model
//! document: many independent fields read and write into one shared,
//! hierarchically-variant document while staying mutually consistent, with
//! synchronous and asynchronous validation running free of races.
//!
//! # Architecture
//!
//! ```text
//! UI field ──set()──► FieldBinder ──► ModificationQueue ──► DocumentStore
//!    ▲                    │ optimistic publish                  │ commit
//!    │                    ▼                                     ▼
//!  errors() ◄── Validator ◄── value() stream ◄── projected + deduplicated
//! ```
//!
//! - [`optic`]: composable pure accessors (lens/prism) describing a path
//!   into a nested, tagged-union document
//! - [`store`]: per-entity committed state, live observation, atomic
//!   multi-entity transactions
//! - [`queue`]: strict submission-order application of writes, grouped
//!   all-or-nothing commits
//! - [`binder`]: one field bound to one (entity, optic) pair, optimistic
//!   writes merged with committed upstream values
//! - [`validate`]: per-value aggregate validation with cancellable
//!   switch-to-latest async rules
//! - [`topic`]: multicast streams with last-value replay and
//!   distinct-until-changed filtering
//! - [`persist`]: durable keyed storage collaborators (memory, SQLite)
//!
//! # Quick Start
//!
//! ```
//! use tally_core::{DocumentStore, EngineConfig, FieldBinder, Lens};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Note { text: String }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tally_core::Result<()> {
//! let store = DocumentStore::in_memory(&EngineConfig::default());
//! let id = store.insert(Note { text: "draft".into() }).await?;
//!
//! let text = Lens::new(
//!     |n: &Note| n.text.clone(),
//!     |n, text| Note { text, ..n.clone() },
//! );
//! let field = FieldBinder::bind_lens(&store, id, text)?;
//!
//! field.set("final".to_string());
//! assert_eq!(field.current().as_deref(), Some("final"));
//!
//! store.settle().await?;
//! assert_eq!(store.get(id)?.text, "final");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod binder;
pub mod config;
pub mod error;
pub mod optic;
pub mod persist;
pub mod queue;
pub mod store;
pub mod topic;
pub mod types;
pub mod validate;

// Re-export commonly used types for convenience
pub use binder::FieldBinder;
pub use config::EngineConfig;
pub use error::{CoreError, Result};
pub use optic::{Lens, Prism};
pub use persist::{MemoryPersistence, PersistBatch, Persistence, SqlitePersistence};
pub use queue::{Commit, Mutator, TxOp};
pub use store::DocumentStore;
pub use topic::{Topic, TopicSubscriber};
pub use types::EntityId;
pub use validate::{AsyncRule, RuleSet, SyncRule, ValidationResult, Validator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
