//! Document store adapter contract
//!
//! Everything above this trait talks to storage through it, so the backend
//! (in-memory for tests, PostgreSQL in production) is injected at startup.

use async_trait::async_trait;

use crate::{
    batch::WriteBatch,
    document::{Document, Filter},
    error::StoreResult,
};

/// Collection-oriented document storage with atomic write batches.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name used in logs
    fn backend(&self) -> &'static str;

    /// Fetch a document; `Ok(None)` when it does not exist
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Write a new document; fails with `AlreadyExists` on an ID collision
    async fn create(&self, collection: &str, id: &str, document: Document) -> StoreResult<()>;

    /// Merge `fields` into an existing document; fails with `NotFound` when missing
    async fn update(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()>;

    /// Delete a document; deleting a missing document succeeds
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Documents matching every filter, ordered by ID, capped at `limit`
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>>;

    /// Start an empty batch
    fn new_batch(&self) -> WriteBatch {
        WriteBatch::new()
    }

    /// Apply every staged write or none of them
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}
