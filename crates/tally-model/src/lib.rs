//! Tally Model - the financial-model document layer
//!
//! A study compares design [`Alternative`]s, each carrying [`Cost`] items,
//! under one [`Project`]'s settings. This crate defines those document
//! types, the optics the editor navigates them with, the atomic structural
//! operations (create-and-link, delete-with-cascade), and the canned field
//! bindings with their validation rules.
//!
//! The engine underneath comes from `tally-core`; everything here is the
//! domain instantiation of it.
//!
//! # Quick Start
//!
//! ```
//! use tally_core::EngineConfig;
//! use tally_model::{fields, ops, Alternative, Cost, CostKind};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tally_core::Result<()> {
//! let config = EngineConfig::default();
//! let store = ops::ModelStore::in_memory(&config);
//!
//! let project = ops::new_project(&store, "HVAC retrofit").await?;
//! let alt = ops::add_alternative(&store, project, Alternative::new("Replace chiller")).await?;
//! let cost = ops::add_cost(
//!     &store,
//!     &[alt],
//!     Cost::new("Chiller", CostKind::NonRecurring { amount: 85_000.0, occurs_in_year: 1 }),
//! )
//! .await?;
//!
//! let name = fields::cost_name_field(&store, cost)?;
//! name.set("Chiller (high-efficiency)".to_string());
//! store.settle().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod fields;
pub mod model;
pub mod ops;
pub mod optics;

pub use model::{Alternative, Cost, CostKind, Entity, FuelType, Project};
pub use ops::ModelStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
