//!
//! # Resource dispatcher
//!
//! Feeds the identity indexes from the store watch and turns changes into
//! channel keys on the work queue.
//!
use std::sync::Arc;
use std::time::Duration;

use fluvio_future::task::spawn;
use fluvio_future::timer::sleep;
use futures_util::StreamExt;
use tracing::{debug, error, info, instrument, trace};

use eventing_metadata::channel::ChannelSpec;
use eventing_metadata::core::{LabelSelector, MetadataStoreObject, ObjectKey, Spec, WatchEvent};
use eventing_metadata::topic::TopicSpec;
use eventing_types::event::StickyEvent;

use crate::queue::SharedWorkQueue;
use crate::store::{IdentityIndex, MetadataClient, SharedClient, StoreError};

const WATCH_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Channel to reconcile when an object of this kind changes
pub trait ChannelKeys: Spec {
    fn channel_key(obj: &MetadataStoreObject<Self>) -> Option<ObjectKey>;
}

impl ChannelKeys for ChannelSpec {
    fn channel_key(obj: &MetadataStoreObject<Self>) -> Option<ObjectKey> {
        Some(obj.key())
    }
}

impl ChannelKeys for TopicSpec {
    /// the controlling channel, topics without one are ignored
    fn channel_key(obj: &MetadataStoreObject<Self>) -> Option<ObjectKey> {
        obj.metadata
            .controller()
            .filter(|owner| owner.kind == ChannelSpec::KIND)
            .map(|owner| ObjectKey::new(obj.namespace(), owner.name.clone()))
    }
}

#[derive(Debug)]
pub struct ResourceDispatcher<S: Spec, C> {
    client: SharedClient<C>,
    index: IdentityIndex<S>,
    queue: SharedWorkQueue,
    namespace: String,
    shutdown: Arc<StickyEvent>,
}

impl<S, C> ResourceDispatcher<S, C>
where
    S: ChannelKeys,
    C: MetadataClient + 'static,
{
    /// `namespace` limits the objects indexed, empty for all
    pub fn start(
        client: SharedClient<C>,
        index: IdentityIndex<S>,
        queue: SharedWorkQueue,
        namespace: String,
        shutdown: Arc<StickyEvent>,
    ) {
        let dispatcher = Self {
            client,
            index,
            queue,
            namespace,
            shutdown,
        };

        spawn(dispatcher.dispatch_loop());
    }

    #[instrument(skip(self), fields(kind = S::KIND), name = "ResourceDispatcher")]
    async fn dispatch_loop(self) {
        info!("started");
        loop {
            match self.inner_loop().await {
                Ok(()) => break,
                Err(err) => {
                    error!("error with inner loop: {:#?}", err);
                    debug!(delay = ?WATCH_RETRY_DELAY, "restarting watch");
                    sleep(WATCH_RETRY_DELAY).await;
                }
            }
        }
        info!("terminated");
    }

    /// runs until shutdown, an error restarts it from a fresh listing
    async fn inner_loop(&self) -> Result<(), StoreError> {
        use tokio::select;

        // watch before listing so nothing falls between the two
        let mut stream = self.client.watch_stream::<S>().await;
        let items = self
            .client
            .retrieve_items::<S>(&self.namespace, &LabelSelector::default())
            .await?;

        let keys: Vec<ObjectKey> = items.iter().filter_map(S::channel_key).collect();
        self.index.sync_all(items).await;
        debug!(count = keys.len(), "initial sync");
        for key in keys {
            self.queue.add(key.to_string()).await;
        }

        loop {
            select! {
                next = stream.next() => {
                    match next {
                        Some(Ok(event)) => self.process_event(event).await,
                        Some(Err(err)) => return Err(err),
                        None => {
                            return Err(StoreError::Unavailable(
                                "watch stream closed".to_owned(),
                            ));
                        }
                    }
                },
                _ = self.shutdown.listen() => {
                    debug!("shutdown signal");
                    return Ok(());
                }
            }
        }
    }

    async fn process_event(&self, event: WatchEvent<S>) {
        let obj = event.object();
        if !self.namespace.is_empty() && obj.namespace() != self.namespace {
            trace!(key = %obj.key(), "outside watched namespace");
            return;
        }

        let key = S::channel_key(obj);
        if !self.index.apply(event).await {
            return;
        }

        if let Some(key) = key {
            trace!(%key, "enqueue");
            self.queue.add(key.to_string()).await;
        }
    }
}

/// Re-enqueues every cached channel at a fixed interval
#[derive(Debug)]
pub struct ResyncTimer {
    channels: IdentityIndex<ChannelSpec>,
    queue: SharedWorkQueue,
    interval: Duration,
    shutdown: Arc<StickyEvent>,
}

impl ResyncTimer {
    pub fn start(
        channels: IdentityIndex<ChannelSpec>,
        queue: SharedWorkQueue,
        interval: Duration,
        shutdown: Arc<StickyEvent>,
    ) {
        let timer = Self {
            channels,
            queue,
            interval,
            shutdown,
        };
        spawn(timer.dispatch_loop());
    }

    #[instrument(skip(self), name = "ResyncTimer")]
    async fn dispatch_loop(self) {
        use tokio::select;

        info!(interval = ?self.interval, "started");
        loop {
            select! {
                _ = sleep(self.interval) => {
                    let keys = self.channels.keys().await;
                    debug!(count = keys.len(), "resync");
                    for key in keys {
                        self.queue.add(key.to_string()).await;
                    }
                },
                _ = self.shutdown.listen() => {
                    break;
                }
            }
        }
        info!("terminated");
    }
}
