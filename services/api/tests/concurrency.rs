//! Concurrent workflows touching the same documents

use std::{collections::BTreeSet, sync::Arc};

use api::{
    locks::StashLocks,
    models::{Entity, JoinStashRequest, RegisterRequest, Stash, StashPayload, User},
    repositories::Repositories,
    service::{ServiceError, StashService},
};
use async_trait::async_trait;
use common::{Document, DocumentStore, Filter, MemoryStore, StoreResult, WriteBatch};

/// Memory store that yields to the scheduler before every call, so
/// concurrent workflows interleave between their reads and their commit
#[derive(Default)]
struct YieldingStore {
    inner: MemoryStore,
}

#[async_trait]
impl DocumentStore for YieldingStore {
    fn backend(&self) -> &'static str {
        "yielding"
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        tokio::task::yield_now().await;
        self.inner.get(collection, id).await
    }

    async fn create(&self, collection: &str, id: &str, document: Document) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.inner.create(collection, id, document).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.inner.delete(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>> {
        tokio::task::yield_now().await;
        self.inner.query(collection, filters, limit).await
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        tokio::task::yield_now().await;
        self.inner.commit(batch).await
    }
}

fn service() -> StashService {
    let store = Arc::new(YieldingStore::default());
    StashService::new(Repositories::new(store), StashLocks::new())
}

async fn user(service: &StashService, name: &str) -> User {
    service
        .repos()
        .users
        .add(User::new(name, &format!("{name}@example.com"), "hash".into()))
        .await
        .unwrap()
}

fn named(name: &str) -> StashPayload {
    StashPayload {
        name: Some(name.into()),
        ..StashPayload::default()
    }
}

async fn owned_member_ids(service: &StashService, user: &User) -> BTreeSet<String> {
    service
        .repos()
        .members_of_user(user.id())
        .await
        .unwrap()
        .into_iter()
        .map(|member| member.meta.id)
        .collect()
}

#[tokio::test]
async fn user_member_list_survives_parallel_stash_creation() {
    let service = service();
    let ana = user(&service, "ana").await;
    let bo = user(&service, "bo").await;
    let shared: Stash = service.create_stash(&bo, named("Shared")).await.unwrap();

    let (home, cabin, joined) = tokio::join!(
        service.create_stash(&ana, named("Home")),
        service.create_stash(&ana, named("Cabin")),
        service.join_stash(
            &ana,
            JoinStashRequest {
                join_code: shared.join_code.clone(),
            }
        ),
    );
    home.unwrap();
    cabin.unwrap();
    joined.unwrap();

    let owned = owned_member_ids(&service, &ana).await;
    assert_eq!(owned.len(), 3);
    let ana = service.get_user(ana.id()).await.unwrap();
    let listed: BTreeSet<String> = ana.member_ids.iter().cloned().collect();
    assert_eq!(listed, owned);
    assert_eq!(ana.member_ids.len(), 3);
}

#[tokio::test]
async fn rename_and_join_both_land_on_the_stash() {
    let service = service();
    let ana = user(&service, "ana").await;
    let bo = user(&service, "bo").await;
    let stash = service.create_stash(&ana, named("Home")).await.unwrap();

    let (renamed, joined) = tokio::join!(
        service.update_stash(
            &ana,
            StashPayload {
                id: stash.meta.id.clone(),
                name: Some("Cabin".into()),
                ..StashPayload::default()
            }
        ),
        service.join_stash(
            &bo,
            JoinStashRequest {
                join_code: stash.join_code.clone(),
            }
        ),
    );
    renamed.unwrap();
    let guest = joined.unwrap();

    let stored = service.get_stash(&ana, stash.id()).await.unwrap();
    assert_eq!(stored.name, "Cabin");
    assert_eq!(stored.member_ids.len(), 2);
    assert!(stored.member_ids.contains(&guest.meta.id));
}

#[tokio::test]
async fn parallel_registrations_claim_an_email_once() {
    let service = service();
    let request = |username: &str| RegisterRequest {
        username: username.into(),
        email: "Shared@Example.com".into(),
        password: "pantry123".into(),
    };

    let (first, second) = tokio::join!(
        service.register(request("Ana")),
        service.register(request("Bo")),
    );
    let outcomes = [first.is_ok(), second.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    for result in [first, second] {
        if let Err(err) = result {
            assert!(matches!(err, ServiceError::Conflict(_)));
        }
    }

    let users = service
        .repos()
        .users
        .query(&[Filter::eq("email", "shared@example.com")], None)
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
}
