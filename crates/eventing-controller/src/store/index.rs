use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_lock::RwLock;
use thiserror::Error;
use tracing::{debug, trace};

use eventing_metadata::core::{MetadataStoreObject, ObjectKey, Spec, WatchEvent};
use eventing_types::Uid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("{0} not found")]
    NotFound(ObjectKey),
    #[error("index has not completed its initial sync")]
    NotSynced,
}

#[derive(Debug)]
struct IndexState<S: Spec> {
    items: HashMap<ObjectKey, Arc<MetadataStoreObject<S>>>,
    // controller uid -> keys of the objects it controls
    owners: HashMap<Uid, BTreeSet<ObjectKey>>,
}

impl<S: Spec> Default for IndexState<S> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            owners: HashMap::new(),
        }
    }
}

impl<S: Spec> IndexState<S> {
    fn insert(&mut self, item: MetadataStoreObject<S>) {
        let key = item.key();
        self.remove(&key);
        if let Some(owner) = item.metadata.controller() {
            self.owners
                .entry(owner.uid.clone())
                .or_default()
                .insert(key.clone());
        }
        self.items.insert(key, Arc::new(item));
    }

    fn remove(&mut self, key: &ObjectKey) -> Option<Arc<MetadataStoreObject<S>>> {
        let old = self.items.remove(key)?;
        if let Some(owner) = old.metadata.controller() {
            if let Some(keys) = self.owners.get_mut(&owner.uid) {
                keys.remove(key);
                if keys.is_empty() {
                    self.owners.remove(&owner.uid);
                }
            }
        }
        Some(old)
    }
}

/// Read-only cache of one resource kind, by key and by controlling owner.
///
/// Values are shared as `Arc` and must be cloned before being modified.
/// Only the dispatcher writes to the index.
#[derive(Debug)]
pub struct IdentityIndex<S: Spec> {
    state: Arc<RwLock<IndexState<S>>>,
    synced: Arc<AtomicBool>,
}

impl<S: Spec> Clone for IdentityIndex<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            synced: self.synced.clone(),
        }
    }
}

impl<S: Spec> Default for IdentityIndex<S> {
    fn default() -> Self {
        Self {
            state: Arc::new(RwLock::new(IndexState::default())),
            synced: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<S: Spec> IdentityIndex<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    fn check_synced(&self) -> Result<(), IndexError> {
        if self.is_synced() {
            Ok(())
        } else {
            Err(IndexError::NotSynced)
        }
    }

    /// replace the whole content with a full listing
    pub async fn sync_all(&self, items: Vec<MetadataStoreObject<S>>) {
        let mut state = IndexState::default();
        for item in items {
            state.insert(item);
        }
        debug!(kind = S::KIND, count = state.items.len(), "index synced");
        *self.state.write().await = state;
        self.synced.store(true, Ordering::SeqCst);
    }

    /// apply a watch event, returns false if the event was older than the cached value
    pub async fn apply(&self, event: WatchEvent<S>) -> bool {
        let mut state = self.state.write().await;
        match event {
            WatchEvent::Added(item) | WatchEvent::Modified(item) => {
                if let Some(cached) = state.items.get(&item.key()) {
                    if cached.metadata.resource_version >= item.metadata.resource_version {
                        trace!(key = %item.key(), "ignoring stale event");
                        return false;
                    }
                }
                state.insert(item);
                true
            }
            WatchEvent::Deleted(item) => state.remove(&item.key()).is_some(),
        }
    }

    pub async fn get(&self, key: &ObjectKey) -> Result<Arc<MetadataStoreObject<S>>, IndexError> {
        self.check_synced()?;
        self.state
            .read()
            .await
            .items
            .get(key)
            .cloned()
            .ok_or_else(|| IndexError::NotFound(key.clone()))
    }

    /// objects whose controller owner reference carries `owner_uid`
    pub async fn controlled_by(
        &self,
        owner_uid: &str,
    ) -> Result<Vec<Arc<MetadataStoreObject<S>>>, IndexError> {
        self.check_synced()?;
        let state = self.state.read().await;
        let Some(keys) = state.owners.get(owner_uid) else {
            return Ok(vec![]);
        };
        Ok(keys
            .iter()
            .filter_map(|key| state.items.get(key).cloned())
            .collect())
    }

    pub async fn keys(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<ObjectKey> = self.state.read().await.items.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
