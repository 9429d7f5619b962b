//! Common library for the stash keeper services
//!
//! This crate provides the storage-facing pieces shared by the services:
//! the document store contract with its in-memory and PostgreSQL
//! implementations, atomic write batches, the Redis cache, and the error
//! types raised by all of them.

pub mod batch;
pub mod cache;
pub mod database;
pub mod document;
pub mod error;
pub mod memory;
pub mod store;

pub use batch::{BatchOp, WriteBatch};
pub use document::{Document, Filter, FilterOp};
pub use error::{StoreError, StoreErrorKind, StoreResult};
pub use memory::MemoryStore;
pub use store::DocumentStore;

/// Example usage of the document store
///
/// ```rust,no_run
/// use common::database::{DatabaseConfig, PgDocumentStore, ensure_schema, init_pool};
/// use common::{DocumentStore, Filter};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = init_pool(&DatabaseConfig::default()).await?;
///     ensure_schema(&pool).await?;
///     let store = PgDocumentStore::new(pool);
///     let storages = store
///         .query("storages", &[Filter::eq("stash_id", "home")], None)
///         .await?;
///     println!("{} storages", storages.len());
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
