//! Conformance tests for the document store adapters
//!
//! The same scenarios run against the in-memory store and, when a database
//! is available, against PostgreSQL.

use common::{
    DocumentStore, Filter, MemoryStore, StoreError,
    database::{DatabaseConfig, PgDocumentStore, ensure_schema, init_pool},
};
use serde_json::{Value, json};

fn doc(value: Value) -> common::Document {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("test documents are objects"),
    }
}

async fn seed(store: &dyn DocumentStore, prefix: &str) -> Result<(), StoreError> {
    let mut batch = store.new_batch();
    batch.create(
        "orders",
        &format!("{prefix}-o1"),
        doc(json!({"id": format!("{prefix}-o1"), "stash_id": prefix, "item_ids": ["a", "b"]})),
    );
    batch.create(
        "orders",
        &format!("{prefix}-o2"),
        doc(json!({"id": format!("{prefix}-o2"), "stash_id": prefix, "item_ids": ["c"]})),
    );
    store.commit(batch).await
}

async fn run_conformance(store: &dyn DocumentStore, prefix: &str) -> Result<(), StoreError> {
    seed(store, prefix).await?;

    let by_stash = store
        .query("orders", &[Filter::eq("stash_id", prefix)], None)
        .await?;
    assert_eq!(by_stash.len(), 2);

    let containing_b = store
        .query(
            "orders",
            &[
                Filter::eq("stash_id", prefix),
                Filter::array_contains("item_ids", "b"),
            ],
            None,
        )
        .await?;
    assert_eq!(containing_b.len(), 1);
    assert_eq!(containing_b[0]["id"], json!(format!("{prefix}-o1")));

    let picked = store
        .query(
            "orders",
            &[Filter::is_in("id", [format!("{prefix}-o2"), "nope".to_string()])],
            None,
        )
        .await?;
    assert_eq!(picked.len(), 1);

    let others = store
        .query(
            "orders",
            &[
                Filter::eq("stash_id", prefix),
                Filter::not_eq("id", format!("{prefix}-o1")),
            ],
            Some(5),
        )
        .await?;
    assert_eq!(others.len(), 1);

    // A rejected batch leaves both documents in place.
    let mut batch = store.new_batch();
    batch.delete("orders", &format!("{prefix}-o1"));
    batch.create("orders", &format!("{prefix}-o2"), doc(json!({})));
    let err = store.commit(batch).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }));
    assert!(store.get("orders", &format!("{prefix}-o1")).await?.is_some());

    store.delete("orders", &format!("{prefix}-o1")).await?;
    store.delete("orders", &format!("{prefix}-o1")).await?;
    assert!(store.get("orders", &format!("{prefix}-o1")).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn memory_store_conformance() -> Result<(), StoreError> {
    let store = MemoryStore::new();
    run_conformance(&store, "mem").await
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL"]
async fn postgres_store_conformance() -> Result<(), Box<dyn std::error::Error>> {
    let pool = init_pool(&DatabaseConfig::default()).await?;
    ensure_schema(&pool).await?;
    sqlx::query("DELETE FROM documents WHERE collection = 'orders' AND id LIKE 'pg-%'")
        .execute(&pool)
        .await?;

    let store = PgDocumentStore::new(pool);
    run_conformance(&store, "pg").await?;
    Ok(())
}
