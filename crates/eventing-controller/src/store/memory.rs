use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_channel::{Sender, unbounded};
use async_lock::{Mutex, RwLock};
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde_yaml::Value;
use tracing::{debug, trace};
use uuid::Uuid;

use eventing_metadata::core::{LabelSelector, MetadataStoreObject, ObjectKey, Spec, WatchEvent};
use eventing_types::ResourceVersion;

use crate::core::{SharedClock, SystemClock};

use super::{MetadataClient, StoreError};

/// objects of a single kind, serialized as yaml values
#[derive(Debug, Default)]
struct SpecStore {
    data: RwLock<BTreeMap<ObjectKey, Value>>,
    watchers: Mutex<Vec<Sender<Value>>>,
    version: AtomicU64,
}

impl SpecStore {
    fn next_version(&self) -> ResourceVersion {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// fan out to every live watcher, closed watchers are dropped
    async fn notify<S: Spec>(&self, event: WatchEvent<S>) -> Result<(), StoreError> {
        let value = serde_yaml::to_value(event)?;
        let mut watchers = self.watchers.lock().await;
        watchers.retain(|watcher| watcher.try_send(value.clone()).is_ok());
        trace!(watchers = watchers.len(), "notified");
        Ok(())
    }

    async fn subscribe(&self) -> async_channel::Receiver<Value> {
        let (sender, receiver) = unbounded();
        self.watchers.lock().await.push(sender);
        receiver
    }
}

/// In-memory store with the same consistency rules as the real one:
/// uid assignment, monotonic resource versions, generation bump on spec change
/// and conflict detection on stale writes.
#[derive(Debug)]
pub struct MemoryClient {
    stores: Mutex<HashMap<&'static str, Arc<SpecStore>>>,
    clock: SharedClock,
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::with_clock(SystemClock::shared())
    }
}

impl MemoryClient {
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
            clock,
        }
    }

    async fn get_store<S: Spec>(&self) -> Arc<SpecStore> {
        let mut stores = self.stores.lock().await;
        stores.entry(S::KIND).or_default().clone()
    }

    /// apply a write to the current object if `value` carries its resource version
    async fn update_with<S, F>(
        &self,
        value: MetadataStoreObject<S>,
        apply: F,
    ) -> Result<MetadataStoreObject<S>, StoreError>
    where
        S: Spec,
        F: FnOnce(&mut MetadataStoreObject<S>, MetadataStoreObject<S>),
    {
        let store = self.get_store::<S>().await;
        let key = value.key();

        let mut data = store.data.write().await;
        let Some(current) = data.get(&key) else {
            return Err(StoreError::not_found::<S>(&key));
        };
        let mut current: MetadataStoreObject<S> = serde_yaml::from_value(current.clone())?;

        if current.metadata.resource_version != value.metadata.resource_version {
            debug!(
                %key,
                submitted = value.metadata.resource_version,
                current = current.metadata.resource_version,
                "stale write"
            );
            return Err(StoreError::Conflict {
                kind: S::KIND,
                key,
                submitted: value.metadata.resource_version,
                current: current.metadata.resource_version,
            });
        }

        apply(&mut current, value);
        current.metadata.resource_version = store.next_version();

        data.insert(key, serde_yaml::to_value(&current)?);
        store.notify(WatchEvent::Modified(current.clone())).await?;

        Ok(current)
    }
}

#[async_trait]
impl MetadataClient for MemoryClient {
    async fn retrieve_item<S>(&self, key: &ObjectKey) -> Result<MetadataStoreObject<S>, StoreError>
    where
        S: Spec,
    {
        let store = self.get_store::<S>().await;
        let data = store.data.read().await;
        let Some(value) = data.get(key) else {
            return Err(StoreError::not_found::<S>(key));
        };
        let value = value.clone();
        drop(data);

        Ok(serde_yaml::from_value(value)?)
    }

    async fn retrieve_items<S>(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<MetadataStoreObject<S>>, StoreError>
    where
        S: Spec,
    {
        let store = self.get_store::<S>().await;
        let data = store.data.read().await;
        let values: Vec<Value> = data
            .iter()
            .filter(|(key, _)| namespace.is_empty() || key.namespace == namespace)
            .map(|(_, value)| value.clone())
            .collect();
        drop(data);

        let mut items = vec![];
        for value in values {
            let item: MetadataStoreObject<S> = serde_yaml::from_value(value)?;
            if selector.matches(&item.metadata.labels) {
                items.push(item);
            }
        }
        Ok(items)
    }

    async fn create_item<S>(
        &self,
        mut value: MetadataStoreObject<S>,
    ) -> Result<MetadataStoreObject<S>, StoreError>
    where
        S: Spec,
    {
        if value.metadata.name.is_empty() {
            return Err(StoreError::InvalidObject(format!(
                "{} without a name",
                S::KIND
            )));
        }

        let store = self.get_store::<S>().await;
        let key = value.key();

        let mut data = store.data.write().await;
        if data.contains_key(&key) {
            return Err(StoreError::AlreadyExists { kind: S::KIND, key });
        }

        let meta = &mut value.metadata;
        if meta.uid.is_empty() {
            meta.uid = Uuid::new_v4().to_string();
        }
        if meta.generation == 0 {
            meta.generation = 1;
        }
        if meta.creation_timestamp.is_none() {
            meta.creation_timestamp = Some(self.clock.now());
        }
        meta.resource_version = store.next_version();

        debug!(%key, kind = S::KIND, uid = %value.metadata.uid, "created");
        data.insert(key, serde_yaml::to_value(&value)?);
        store.notify(WatchEvent::Added(value.clone())).await?;

        Ok(value)
    }

    async fn update_status<S>(
        &self,
        value: MetadataStoreObject<S>,
    ) -> Result<MetadataStoreObject<S>, StoreError>
    where
        S: Spec,
    {
        debug!(key = %value.key(), status = ?value.status, "updating status");
        self.update_with(value, |current, value| current.status = value.status)
            .await
    }

    async fn update_spec<S>(
        &self,
        value: MetadataStoreObject<S>,
    ) -> Result<MetadataStoreObject<S>, StoreError>
    where
        S: Spec,
    {
        self.update_with(value, |current, value| {
            if current.spec != value.spec {
                current.metadata.generation += 1;
            }
            current.spec = value.spec;
            current.metadata.labels = value.metadata.labels;
            current.metadata.annotations = value.metadata.annotations;
            current.metadata.owner_references = value.metadata.owner_references;
            current.metadata.deletion_timestamp = value.metadata.deletion_timestamp;
        })
        .await
    }

    async fn delete_item<S>(&self, key: &ObjectKey) -> Result<(), StoreError>
    where
        S: Spec,
    {
        let store = self.get_store::<S>().await;
        let mut data = store.data.write().await;
        let Some(value) = data.remove(key) else {
            return Err(StoreError::not_found::<S>(key));
        };

        let item: MetadataStoreObject<S> = serde_yaml::from_value(value)?;
        debug!(%key, kind = S::KIND, "deleted");
        store.notify(WatchEvent::Deleted(item)).await
    }

    async fn watch_stream<S>(&self) -> BoxStream<'static, Result<WatchEvent<S>, StoreError>>
    where
        S: Spec,
    {
        let store = self.get_store::<S>().await;
        store
            .subscribe()
            .await
            .map(|value| serde_yaml::from_value::<WatchEvent<S>>(value))
            .map(|event| event.map_err(StoreError::from))
            .boxed()
    }
}

#[cfg(test)]
mod test {
    use futures_util::StreamExt;

    use eventing_metadata::channel::{ChannelObj, ChannelSpec, ChannelStatus};
    use eventing_metadata::core::{LabelSelector, ObjectKey, WatchEvent};

    use crate::store::MetadataClient;

    use super::MemoryClient;

    fn channel(namespace: &str, name: &str) -> ChannelObj {
        ChannelObj::with_spec(namespace, name, ChannelSpec::new("my-project"))
    }

    #[fluvio_future::test]
    async fn test_metadata_client_impl() {
        let client = MemoryClient::new_shared();
        let mut stream = client.watch_stream::<ChannelSpec>().await;

        // create
        let created = client
            .create_item(channel("default", "chan"))
            .await
            .expect("created");
        assert!(!created.metadata.uid.is_empty());
        assert_eq!(created.metadata.generation, 1);
        assert!(created.metadata.creation_timestamp.is_some());

        let WatchEvent::Added(added) = stream.next().await.expect("event").expect("ok") else {
            panic!("expected added");
        };
        assert_eq!(added, created);

        // status
        let mut with_status = created.clone();
        with_status.status = ChannelStatus {
            topic_id: Some("cre-chan-chan".to_owned()),
            ..Default::default()
        };
        let updated = client
            .update_status(with_status)
            .await
            .expect("status updated");
        let previous = created.metadata.resource_version;
        assert!(updated.metadata.resource_version > previous);
        assert_eq!(updated.metadata.generation, 1);

        let WatchEvent::Modified(modified) = stream.next().await.expect("event").expect("ok")
        else {
            panic!("expected modified");
        };
        assert_eq!(modified.status.topic_id.as_deref(), Some("cre-chan-chan"));

        // delete
        client
            .delete_item::<ChannelSpec>(&created.key())
            .await
            .expect("deleted");
        let WatchEvent::Deleted(deleted) = stream.next().await.expect("event").expect("ok")
        else {
            panic!("expected deleted");
        };
        assert_eq!(deleted.key(), created.key());

        let err = client
            .retrieve_item::<ChannelSpec>(&created.key())
            .await
            .expect_err("gone");
        assert!(err.is_not_found());
    }

    #[fluvio_future::test]
    async fn test_create_twice() {
        let client = MemoryClient::new_shared();
        client
            .create_item(channel("default", "chan"))
            .await
            .expect("created");
        let err = client
            .create_item(channel("default", "chan"))
            .await
            .expect_err("duplicate");
        assert!(err.is_already_exists());
    }

    #[fluvio_future::test]
    async fn test_stale_write_conflicts() {
        let client = MemoryClient::new_shared();
        let created = client
            .create_item(channel("default", "chan"))
            .await
            .expect("created");

        client
            .update_status(created.clone())
            .await
            .expect("first write");

        let err = client
            .update_status(created)
            .await
            .expect_err("stale write");
        assert!(err.is_conflict());
    }

    #[fluvio_future::test]
    async fn test_generation_follows_spec() {
        let client = MemoryClient::new_shared();
        let created = client
            .create_item(channel("default", "chan"))
            .await
            .expect("created");

        let same = client
            .update_spec(created.clone())
            .await
            .expect("same spec");
        assert_eq!(same.metadata.generation, 1);

        let mut changed = same.clone();
        changed.spec.project = "other".to_owned();
        let changed = client.update_spec(changed).await.expect("new spec");
        assert_eq!(changed.metadata.generation, 2);
    }

    #[fluvio_future::test]
    async fn test_list_by_namespace_and_labels() {
        let client = MemoryClient::new_shared();

        let mut labeled = channel("ns1", "a");
        labeled.metadata.labels.insert("app".to_owned(), "x".to_owned());
        client.create_item(labeled).await.expect("a");
        client.create_item(channel("ns1", "b")).await.expect("b");
        client.create_item(channel("ns2", "c")).await.expect("c");

        let all = client
            .retrieve_items::<ChannelSpec>("", &LabelSelector::default())
            .await
            .expect("all");
        assert_eq!(all.len(), 3);

        let ns1 = client
            .retrieve_items::<ChannelSpec>("ns1", &LabelSelector::default())
            .await
            .expect("ns1");
        assert_eq!(ns1.len(), 2);

        let selected = client
            .retrieve_items::<ChannelSpec>("ns1", &LabelSelector::new_labels(vec![("app", "x")]))
            .await
            .expect("selected");
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].key(), ObjectKey::new("ns1", "a"));
    }

    #[fluvio_future::test]
    async fn test_every_watcher_sees_changes() {
        let client = MemoryClient::new_shared();
        let mut first = client.watch_stream::<ChannelSpec>().await;
        let mut second = client.watch_stream::<ChannelSpec>().await;

        client
            .create_item(channel("default", "chan"))
            .await
            .expect("created");

        for stream in [&mut first, &mut second] {
            let event = stream.next().await.expect("event").expect("ok");
            assert_eq!(event.object().name(), "chan");
        }
    }
}
