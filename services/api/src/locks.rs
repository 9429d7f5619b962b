//! Per-stash serialization of read-modify-commit sequences
//!
//! A workflow that reads documents of a stash, edits them and commits a
//! batch holds that stash's lock for the whole sequence, so two requests
//! cannot interleave their reads and writes on the same stash. Workflows
//! that rewrite a user document also hold the key from [`user_key`].

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

type Registry = HashMap<String, Arc<AsyncMutex<()>>>;

/// Lock key of a user document; never equal to a stash ID
pub fn user_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

/// Registry of one async lock per stash ID
#[derive(Clone, Default)]
pub struct StashLocks {
    registry: Arc<Mutex<Registry>>,
}

/// Held locks; released and pruned on drop
pub struct StashGuard {
    guards: Vec<OwnedMutexGuard<()>>,
    stash_ids: Vec<String>,
    registry: Arc<Mutex<Registry>>,
}

impl StashLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, stash_id: &str) -> Arc<AsyncMutex<()>> {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            registry
                .entry(stash_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    /// Wait for exclusive access to one stash
    pub async fn lock(&self, stash_id: &str) -> StashGuard {
        self.lock_many([stash_id]).await
    }

    /// Wait for exclusive access to several keys, acquired in sorted order.
    /// Keys needed together must be taken in one call.
    pub async fn lock_many<I, S>(&self, stash_ids: I) -> StashGuard
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ordered: BTreeSet<String> = stash_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        let mut guards = Vec::with_capacity(ordered.len());
        for stash_id in &ordered {
            guards.push(self.entry(stash_id).lock_owned().await);
        }
        debug!("Locked stashes {:?}", ordered);

        StashGuard {
            guards,
            stash_ids: ordered.into_iter().collect(),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Number of stashes with a live lock entry
    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for StashGuard {
    fn drop(&mut self) {
        self.guards.clear();
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        for stash_id in &self.stash_ids {
            // Only the registry itself still points at an unused lock.
            if registry
                .get(stash_id)
                .is_some_and(|lock| Arc::strong_count(lock) == 1)
            {
                registry.remove(stash_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn same_stash_is_exclusive() {
        let locks = StashLocks::new();
        let guard = locks.lock("s1").await;

        let blocked = timeout(Duration::from_millis(50), locks.lock("s1")).await;
        assert!(blocked.is_err());

        drop(guard);
        let reacquired = timeout(Duration::from_millis(50), locks.lock("s1")).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn different_stashes_do_not_block() {
        let locks = StashLocks::new();
        let _first = locks.lock("s1").await;
        let second = timeout(Duration::from_millis(50), locks.lock("s2")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn user_keys_are_separate_from_stash_keys() {
        let locks = StashLocks::new();
        let _stash = locks.lock("u1").await;
        let user = timeout(Duration::from_millis(50), locks.lock(&user_key("u1"))).await;
        assert!(user.is_ok());

        let guard = user.unwrap();
        let again = timeout(Duration::from_millis(50), locks.lock_many([user_key("u1")])).await;
        assert!(again.is_err());
        drop(guard);
    }

    #[tokio::test]
    async fn lock_many_dedups_and_prunes() {
        let locks = StashLocks::new();
        let guard = locks.lock_many(["b", "a", "b", ""]).await;
        assert_eq!(guard.stash_ids, ["a", "b"]);
        assert_eq!(locks.len(), 2);

        drop(guard);
        assert!(locks.is_empty());
    }
}
