//! In-process document store
//!
//! Backs the test suites and local runs without a database. Collections are
//! ordered maps, so query results come back sorted by document ID.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    batch::{BatchOp, WriteBatch},
    document::{Document, Filter, matches_all},
    error::{StoreError, StoreResult},
    store::DocumentStore,
};

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// Document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored in `collection`
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn apply(collections: &mut Collections, op: BatchOp) -> StoreResult<()> {
        match op {
            BatchOp::Create {
                collection,
                id,
                document,
            } => {
                let docs = collections.entry(collection.clone()).or_default();
                if docs.contains_key(&id) {
                    return Err(StoreError::already_exists(&collection, &id));
                }
                docs.insert(id, document);
            }
            BatchOp::Set {
                collection,
                id,
                document,
            } => {
                collections.entry(collection).or_default().insert(id, document);
            }
            BatchOp::Update {
                collection,
                id,
                fields,
            } => {
                let existing = collections
                    .get_mut(&collection)
                    .and_then(|docs| docs.get_mut(&id))
                    .ok_or_else(|| StoreError::not_found(&collection, &id))?;
                existing.extend(fields);
            }
            BatchOp::Delete { collection, id } => {
                if let Some(docs) = collections.get_mut(&collection) {
                    docs.remove(&id);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn create(&self, collection: &str, id: &str, document: Document) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        Self::apply(
            &mut collections,
            BatchOp::Create {
                collection: collection.to_string(),
                id: id.to_string(),
                document,
            },
        )
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        Self::apply(
            &mut collections,
            BatchOp::Update {
                collection: collection.to_string(),
                id: id.to_string(),
                fields,
            },
        )
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        Self::apply(
            &mut collections,
            BatchOp::Delete {
                collection: collection.to_string(),
                id: id.to_string(),
            },
        )
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .values()
            .filter(|doc| matches_all(filters, doc))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let size = batch.len();

        // Apply to a copy and publish only if every op succeeded.
        let mut staged = collections.clone();
        for op in batch.into_ops() {
            if let Err(err) = Self::apply(&mut staged, op) {
                warn!("Batch of {} ops rejected: {}", size, err);
                return Err(err);
            }
        }
        *collections = staged;

        debug!("Committed batch of {} ops", size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test documents are objects"),
        }
    }

    #[tokio::test]
    async fn create_refuses_existing_id() {
        let store = MemoryStore::new();
        store
            .create("labels", "l1", doc(json!({"name": "Milk"})))
            .await
            .unwrap();

        let err = store
            .create("labels", "l1", doc(json!({"name": "Eggs"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));

        let stored = store.get("labels", "l1").await.unwrap().unwrap();
        assert_eq!(stored["name"], "Milk");
    }

    #[tokio::test]
    async fn update_merges_fields_and_requires_document() {
        let store = MemoryStore::new();
        store
            .create("storages", "s1", doc(json!({"name": "Fridge", "type": "fridge"})))
            .await
            .unwrap();
        store
            .update("storages", "s1", doc(json!({"name": "Big fridge"})))
            .await
            .unwrap();

        let stored = store.get("storages", "s1").await.unwrap().unwrap();
        assert_eq!(stored["name"], "Big fridge");
        assert_eq!(stored["type"], "fridge");

        let err = store
            .update("storages", "missing", Document::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn failed_commit_changes_nothing() {
        let store = MemoryStore::new();
        store
            .create("items", "i1", doc(json!({"name": "Milk"})))
            .await
            .unwrap();

        let mut batch = store.new_batch();
        batch.delete("items", "i1");
        batch.create("items", "i2", doc(json!({"name": "Eggs"})));
        batch.update("labels", "missing", doc(json!({"name": "x"})));

        assert!(store.commit(batch).await.is_err());
        assert!(store.get("items", "i1").await.unwrap().is_some());
        assert!(store.get("items", "i2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn query_applies_filters_and_limit() {
        let store = MemoryStore::new();
        for (id, stash) in [("a", "s1"), ("b", "s1"), ("c", "s2")] {
            store
                .create("events", id, doc(json!({"id": id, "stash_id": stash})))
                .await
                .unwrap();
        }

        let in_s1 = store
            .query("events", &[Filter::eq("stash_id", "s1")], None)
            .await
            .unwrap();
        assert_eq!(in_s1.len(), 2);

        let capped = store.query("events", &[], Some(1)).await.unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0]["id"], "a");

        let none = store.query("orders", &[], None).await.unwrap();
        assert!(none.is_empty());
    }
}
