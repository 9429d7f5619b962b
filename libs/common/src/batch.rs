//! Atomic write batches
//!
//! A batch collects writes against any number of collections. Nothing is
//! written until a [`DocumentStore`](crate::store::DocumentStore) commits it,
//! and the commit applies either every operation or none. Committing takes
//! the batch by value, so a batch is committed at most once.

use crate::document::Document;

/// One staged write.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Create-only write; the commit fails if the document exists
    Create {
        collection: String,
        id: String,
        document: Document,
    },
    /// Full overwrite, creating the document when missing
    Set {
        collection: String,
        id: String,
        document: Document,
    },
    /// Field merge into an existing document; the commit fails if it is missing
    Update {
        collection: String,
        id: String,
        fields: Document,
    },
    /// Delete; succeeds whether or not the document exists
    Delete { collection: String, id: String },
}

impl BatchOp {
    pub fn collection(&self) -> &str {
        match self {
            Self::Create { collection, .. }
            | Self::Set { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Create { id, .. }
            | Self::Set { id, .. }
            | Self::Update { id, .. }
            | Self::Delete { id, .. } => id,
        }
    }
}

/// Ordered set of staged writes.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, collection: &str, id: &str, document: Document) {
        self.ops.push(BatchOp::Create {
            collection: collection.to_string(),
            id: id.to_string(),
            document,
        });
    }

    pub fn set(&mut self, collection: &str, id: &str, document: Document) {
        self.ops.push(BatchOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            document,
        });
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Document) {
        self.ops.push(BatchOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
    }

    pub fn delete(&mut self, collection: &str, id: &str) {
        self.ops.push(BatchOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Whether a delete of `collection/id` has been staged.
    pub fn deletes(&self, collection: &str, id: &str) -> bool {
        self.ops.iter().any(|op| {
            matches!(op, BatchOp::Delete { .. }) && op.collection() == collection && op.id() == id
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_keep_staging_order() {
        let mut batch = WriteBatch::new();
        batch.create("stashes", "s1", Document::new());
        batch.update("users", "u1", Document::new());
        batch.delete("events", "e1");

        assert_eq!(batch.len(), 3);
        let ids: Vec<&str> = batch.ops().iter().map(BatchOp::id).collect();
        assert_eq!(ids, ["s1", "u1", "e1"]);
        assert!(batch.deletes("events", "e1"));
        assert!(!batch.deletes("users", "u1"));
    }
}
