//! Error types for the Tally core engine
//!
//! This module defines all error types used throughout the core engine.
//! We use `thiserror` for ergonomic error definitions with automatic Display/Error implementations.

use thiserror::Error;

use crate::types::EntityId;

/// Result type alias for core engine operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Main error type for core engine operations
///
/// A mismatched prism write is deliberately not represented here: it is
/// expected control flow and is dropped silently (debug-logged) rather than
/// surfaced as an error.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The referenced entity id is not known to the store
    #[error("Entity not found: {0}")]
    NotFound(EntityId),

    /// The underlying persistence collaborator failed
    #[error("Persistence failure: {0}")]
    Persistence(#[source] anyhow::Error),

    /// The store's modification queue has shut down
    #[error("Document store is closed")]
    Closed,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    /// Wrap a persistence collaborator error.
    pub fn persistence(err: impl Into<anyhow::Error>) -> Self {
        CoreError::Persistence(err.into())
    }
}
