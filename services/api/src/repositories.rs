//! Repositories for document store operations
//!
//! `Repository<T>` maps one entity type onto its collection. `Repositories`
//! bundles one repository per collection with the shared store handle and
//! the relation lookups the workflows need. Lookups are always by foreign
//! key; entities never hold each other.

use std::{marker::PhantomData, sync::Arc};

use chrono::Utc;
use common::{Document, DocumentStore, Filter, StoreError, StoreErrorKind, StoreResult, WriteBatch};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::models::{
    Entity, Event, Item, Label, Member, Order, Stash, Storage, User, new_id, user::normalize_email,
};

/// Fields the repository owns and never overwrites on update
const IMMUTABLE_FIELDS: [&str; 2] = ["id", "created_at"];

/// Fields managed by the repository rather than by callers
const MANAGED_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Claims on user emails, keyed by the normalized email
pub const EMAIL_CLAIMS: &str = "user_emails";
/// Claims on stash join codes, keyed by the code
pub const JOIN_CODE_CLAIMS: &str = "join_codes";

fn log_failure(kind: &str, operation: &str, err: &StoreError) {
    match err.kind() {
        StoreErrorKind::Malformed => warn!("{} {} failed: {}", kind, operation, err),
        _ => error!("{} {} failed: {}", kind, operation, err),
    }
}

/// Typed access to the collection of `T`
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    /// Create a new repository over `store`
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    fn encode(entity: &T) -> StoreResult<Document> {
        match serde_json::to_value(entity) {
            Ok(Value::Object(document)) => Ok(document),
            Ok(other) => Err(StoreError::Encode {
                collection: T::COLLECTION.to_string(),
                message: format!("expected an object, found {}", other),
            }),
            Err(e) => Err(StoreError::Encode {
                collection: T::COLLECTION.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn decode(id: &str, mut document: Document) -> StoreResult<T> {
        // The document key is authoritative for the identity.
        document.insert("id".to_string(), Value::String(id.to_string()));
        serde_json::from_value(Value::Object(document))
            .map_err(|e| StoreError::malformed(T::COLLECTION, id, e))
    }

    fn decode_any(document: Document) -> StoreResult<T> {
        let id = document
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self::decode(&id, document)
    }

    fn stamp_new(entity: &mut T) {
        let now = Utc::now();
        let meta = entity.meta_mut();
        if meta.id.trim().is_empty() {
            meta.id = new_id();
        }
        meta.created_at = now;
        meta.updated_at = now;
    }

    /// Fields of `after` that differ from `before`, plus a fresh `updated_at`.
    /// Empty when nothing changed, in which case `after` is left untouched.
    fn changed_fields(before: &T, after: &mut T) -> StoreResult<Document> {
        let old = Self::encode(before)?;
        let new = Self::encode(after)?;

        let mut fields = Document::new();
        for (field, value) in &new {
            if !MANAGED_FIELDS.contains(&field.as_str()) && old.get(field) != Some(value) {
                fields.insert(field.clone(), value.clone());
            }
        }
        for field in old.keys() {
            if !MANAGED_FIELDS.contains(&field.as_str()) && !new.contains_key(field) {
                fields.insert(field.clone(), Value::Null);
            }
        }
        if fields.is_empty() {
            return Ok(fields);
        }

        let now = Utc::now();
        after.meta_mut().updated_at = now;
        fields.insert("updated_at".to_string(), serde_json::json!(now));
        Ok(fields)
    }

    async fn reread(&self, id: &str) -> StoreResult<T> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found(T::COLLECTION, id))
    }

    /// Get an entity by ID
    pub async fn get(&self, id: &str) -> StoreResult<Option<T>> {
        let result = match self.store.get(T::COLLECTION, id).await {
            Ok(Some(document)) => Self::decode(id, document).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        result.inspect_err(|e| log_failure(T::KIND, "get", e))
    }

    /// Store a new entity and return it as stored
    pub async fn add(&self, mut entity: T) -> StoreResult<T> {
        Self::stamp_new(&mut entity);
        let id = entity.id().to_string();
        let result = async {
            let document = Self::encode(&entity)?;
            self.store.create(T::COLLECTION, &id, document).await?;
            self.reread(&id).await
        }
        .await;
        result.inspect_err(|e| log_failure(T::KIND, "add", e))
    }

    /// Write the fields `after` changed relative to `before` and return the
    /// stored result; fields the caller left alone are never written
    pub async fn update(&self, before: &T, mut after: T) -> StoreResult<T> {
        let id = after.id().to_string();
        let result = async {
            let fields = Self::changed_fields(before, &mut after)?;
            if !fields.is_empty() {
                self.store.update(T::COLLECTION, &id, fields).await?;
            }
            self.reread(&id).await
        }
        .await;
        result.inspect_err(|e| log_failure(T::KIND, "update", e))
    }

    /// Merge only the given fields, refreshing `updated_at`
    pub async fn update_fields(&self, id: &str, mut fields: Document) -> StoreResult<T> {
        for field in IMMUTABLE_FIELDS {
            fields.remove(field);
        }
        fields.insert("updated_at".to_string(), serde_json::json!(Utc::now()));
        let result = async {
            self.store.update(T::COLLECTION, id, fields).await?;
            self.reread(id).await
        }
        .await;
        result.inspect_err(|e| log_failure(T::KIND, "update_fields", e))
    }

    /// Delete by ID; `true` when no such document remains
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        let result = async {
            self.store.delete(T::COLLECTION, id).await?;
            Ok::<_, StoreError>(self.store.get(T::COLLECTION, id).await?.is_none())
        }
        .await;
        result.inspect_err(|e| log_failure(T::KIND, "delete", e))
    }

    /// Every entity in the collection, capped at `limit`
    pub async fn list(&self, limit: Option<usize>) -> StoreResult<Vec<T>> {
        self.query(&[], limit).await
    }

    /// Entities matching all `filters`
    pub async fn query(&self, filters: &[Filter], limit: Option<usize>) -> StoreResult<Vec<T>> {
        let result = async {
            let documents = self.store.query(T::COLLECTION, filters, limit).await?;
            debug!("{} query returned {} documents", T::KIND, documents.len());
            documents
                .into_iter()
                .map(Self::decode_any)
                .collect::<StoreResult<Vec<T>>>()
        }
        .await;
        result.inspect_err(|e| log_failure(T::KIND, "query", e))
    }

    /// First entity matching all `filters`
    pub async fn find_one(&self, filters: &[Filter]) -> StoreResult<Option<T>> {
        Ok(self.query(filters, Some(1)).await?.into_iter().next())
    }

    /// Stage a create-only write; returns the entity as it will be stored
    pub fn batch_add(&self, batch: &mut WriteBatch, mut entity: T) -> StoreResult<T> {
        Self::stamp_new(&mut entity);
        let document = Self::encode(&entity)?;
        batch.create(T::COLLECTION, entity.id(), document);
        Ok(entity)
    }

    /// Stage the fields `after` changed relative to `before`; nothing is
    /// staged when they are equal. Returns `after` as it will be stored.
    pub fn batch_update(&self, batch: &mut WriteBatch, before: &T, mut after: T) -> StoreResult<T> {
        let fields = Self::changed_fields(before, &mut after)?;
        if !fields.is_empty() {
            batch.update(T::COLLECTION, after.id(), fields);
        }
        Ok(after)
    }

    /// Stage a delete
    pub fn batch_delete(&self, batch: &mut WriteBatch, id: &str) {
        batch.delete(T::COLLECTION, id);
    }
}

/// One repository per collection over a shared store
#[derive(Clone)]
pub struct Repositories {
    store: Arc<dyn DocumentStore>,
    pub users: Repository<User>,
    pub members: Repository<Member>,
    pub stashes: Repository<Stash>,
    pub storages: Repository<Storage>,
    pub labels: Repository<Label>,
    pub items: Repository<Item>,
    pub orders: Repository<Order>,
    pub events: Repository<Event>,
}

impl Repositories {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: Repository::new(Arc::clone(&store)),
            members: Repository::new(Arc::clone(&store)),
            stashes: Repository::new(Arc::clone(&store)),
            storages: Repository::new(Arc::clone(&store)),
            labels: Repository::new(Arc::clone(&store)),
            items: Repository::new(Arc::clone(&store)),
            orders: Repository::new(Arc::clone(&store)),
            events: Repository::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn new_batch(&self) -> WriteBatch {
        self.store.new_batch()
    }

    /// Commit `batch`; nothing is written when this fails
    pub async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let size = batch.len();
        if size == 0 {
            return Ok(());
        }
        match self.store.commit(batch).await {
            Ok(()) => {
                debug!("Committed {} writes to {}", size, self.store.backend());
                Ok(())
            }
            Err(e) => {
                error!("Commit of {} writes failed: {}", size, e);
                Err(e)
            }
        }
    }

    /// Stage a create-only claim of `key` in `collection` for `owner_id`.
    /// The commit fails with a conflict when the key is already claimed.
    pub fn claim(&self, batch: &mut WriteBatch, collection: &str, key: &str, owner_id: &str) {
        let mut document = Document::new();
        document.insert("owner_id".to_string(), Value::String(owner_id.to_string()));
        document.insert("created_at".to_string(), serde_json::json!(Utc::now()));
        batch.create(collection, key, document);
    }

    /// Stage the release of a claim; releasing an unclaimed key is a no-op
    pub fn release(&self, batch: &mut WriteBatch, collection: &str, key: &str) {
        batch.delete(collection, key);
    }

    pub async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.users
            .find_one(&[Filter::eq("email", normalize_email(email))])
            .await
    }

    pub async fn stash_by_join_code(&self, join_code: &str) -> StoreResult<Option<Stash>> {
        self.stashes
            .find_one(&[Filter::eq("join_code", join_code.trim().to_uppercase())])
            .await
    }

    pub async fn members_of_user(&self, user_id: &str) -> StoreResult<Vec<Member>> {
        self.members
            .query(&[Filter::eq("owner_user_id", user_id)], None)
            .await
    }

    pub async fn members_of_stash(&self, stash_id: &str) -> StoreResult<Vec<Member>> {
        self.members
            .query(&[Filter::eq("stash_id", stash_id)], None)
            .await
    }

    /// Active member owned by `user_id` in `stash_id`
    pub async fn member_of_user_in_stash(
        &self,
        user_id: &str,
        stash_id: &str,
    ) -> StoreResult<Option<Member>> {
        self.members
            .find_one(&[
                Filter::eq("owner_user_id", user_id),
                Filter::eq("stash_id", stash_id),
                Filter::eq("is_active", true),
            ])
            .await
    }

    pub async fn storages_of_stash(&self, stash_id: &str) -> StoreResult<Vec<Storage>> {
        self.storages
            .query(&[Filter::eq("stash_id", stash_id)], None)
            .await
    }

    pub async fn labels_of_stash(&self, stash_id: &str) -> StoreResult<Vec<Label>> {
        self.labels
            .query(&[Filter::eq("stash_id", stash_id)], None)
            .await
    }

    /// Labels using `storage_id` as their default storage
    pub async fn labels_defaulting_to(&self, storage_id: &str) -> StoreResult<Vec<Label>> {
        self.labels
            .query(&[Filter::eq("default_storage_id", storage_id)], None)
            .await
    }

    pub async fn items_of_label(&self, label_id: &str) -> StoreResult<Vec<Item>> {
        self.items
            .query(&[Filter::eq("label_id", label_id)], None)
            .await
    }

    pub async fn items_in_storage(&self, storage_id: &str) -> StoreResult<Vec<Item>> {
        self.items
            .query(&[Filter::eq("storage_id", storage_id)], None)
            .await
    }

    pub async fn items_bought_by(&self, member_id: &str) -> StoreResult<Vec<Item>> {
        self.items
            .query(&[Filter::eq("buyer_member_id", member_id)], None)
            .await
    }

    pub async fn items_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Item>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.items
            .query(&[Filter::is_in("id", ids.iter().cloned())], None)
            .await
    }

    /// Items whose label belongs to `stash_id`
    pub async fn items_of_stash(&self, stash_id: &str) -> StoreResult<Vec<Item>> {
        let label_ids: Vec<String> = self
            .labels_of_stash(stash_id)
            .await?
            .into_iter()
            .map(|label| label.meta.id)
            .collect();
        if label_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.items
            .query(&[Filter::is_in("label_id", label_ids)], None)
            .await
    }

    pub async fn orders_of_stash(&self, stash_id: &str) -> StoreResult<Vec<Order>> {
        self.orders
            .query(&[Filter::eq("stash_id", stash_id)], None)
            .await
    }

    pub async fn orders_placed_by(&self, member_id: &str) -> StoreResult<Vec<Order>> {
        self.orders
            .query(&[Filter::eq("buyer_member_id", member_id)], None)
            .await
    }

    pub async fn orders_containing(&self, item_id: &str) -> StoreResult<Vec<Order>> {
        self.orders
            .query(&[Filter::array_contains("item_ids", item_id)], None)
            .await
    }

    pub async fn events_of_stash(&self, stash_id: &str) -> StoreResult<Vec<Event>> {
        self.events
            .query(&[Filter::eq("stash_id", stash_id)], None)
            .await
    }

    /// Stash an item belongs to, resolved through its label
    pub async fn stash_id_of_item(&self, item: &Item) -> StoreResult<Option<String>> {
        Ok(self
            .labels
            .get(&item.label_id)
            .await?
            .map(|label| label.stash_id))
    }
}
