use std::sync::Arc;

use fluvio_future::task::spawn;
use tracing::{debug, info, instrument, trace, warn};

use eventing_types::event::StickyEvent;

use crate::core::SharedContext;
use crate::queue::SharedWorkQueue;
use crate::store::MetadataClient;

use super::ChannelReconciler;

/// Pool of workers reconciling channel keys from the work queue
#[derive(Debug)]
pub struct ChannelController<C> {
    id: usize,
    reconciler: ChannelReconciler<C>,
    queue: SharedWorkQueue,
    shutdown: Arc<StickyEvent>,
}

impl<C> ChannelController<C>
where
    C: MetadataClient + 'static,
{
    /// spawn `config.workers` workers, at least one
    pub fn start(ctx: SharedContext<C>, queue: SharedWorkQueue, shutdown: Arc<StickyEvent>) {
        let workers = ctx.config().workers.max(1);
        let reconciler = ChannelReconciler::new(ctx);

        info!(workers, "starting channel workers");
        for id in 0..workers {
            let controller = Self {
                id,
                reconciler: reconciler.clone(),
                queue: queue.clone(),
                shutdown: shutdown.clone(),
            };
            spawn(controller.dispatch_loop());
        }
    }

    #[instrument(skip(self), fields(worker = self.id), name = "ChannelController")]
    async fn dispatch_loop(self) {
        use tokio::select;

        debug!("started");
        loop {
            select! {
                next = self.queue.get() => {
                    match next {
                        Some(key) => self.process(key).await,
                        None => {
                            debug!("queue shut down");
                            break;
                        }
                    }
                },
                _ = self.shutdown.listen() => {
                    debug!("shutdown signal");
                    break;
                }
            }
        }
        info!("terminated");
    }

    async fn process(&self, key: String) {
        trace!(%key, "processing");
        match self.reconciler.reconcile(&key).await {
            Ok(()) => self.queue.forget(&key).await,
            Err(err) => {
                let requeues = self.queue.num_requeues(&key).await;
                let delay = self.queue.add_rate_limited(key.clone()).await;
                warn!(%key, %err, requeues, ?delay, "reconcile failed, requeued");
            }
        }
        self.queue.done(&key).await;
    }
}
