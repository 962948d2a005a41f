//!
//! # Initialization routines for the channel controller
//!
//! Dispatchers, resync and workers are hooked up here around one work queue.
//!
use std::sync::Arc;

use anyhow::Result;
use fluvio_future::task::spawn;
use tracing::info;

use eventing_metadata::channel::ChannelSpec;
use eventing_metadata::topic::TopicSpec;
use eventing_types::event::StickyEvent;
use eventing_types::whitelist;

use crate::controllers::channel::ChannelController;
use crate::core::SharedContext;
use crate::dispatcher::{ResourceDispatcher, ResyncTimer};
use crate::queue::{SharedWorkQueue, WorkQueue};
use crate::store::MetadataClient;

/// start the main loop, runs until `shutdown` is notified
pub async fn start_main_loop<C>(
    ctx: SharedContext<C>,
    shutdown: Arc<StickyEvent>,
) -> Result<SharedWorkQueue>
where
    C: MetadataClient + 'static,
{
    let config = ctx.config();
    let queue = WorkQueue::shared(config.requeue.backoff()?);
    let white_list = &config.white_list;

    whitelist!(white_list, "channel", {
        ResourceDispatcher::<ChannelSpec, C>::start(
            ctx.client().clone(),
            ctx.channels().clone(),
            queue.clone(),
            config.namespace.clone(),
            shutdown.clone(),
        );
        ResourceDispatcher::<TopicSpec, C>::start(
            ctx.client().clone(),
            ctx.topics().clone(),
            queue.clone(),
            config.namespace.clone(),
            shutdown.clone(),
        );
        ChannelController::start(ctx.clone(), queue.clone(), shutdown.clone());
    });

    whitelist!(
        white_list,
        "resync",
        ResyncTimer::start(
            ctx.channels().clone(),
            queue.clone(),
            config.resync_interval,
            shutdown.clone(),
        )
    );

    let stop_queue = queue.clone();
    spawn(async move {
        shutdown.listen().await;
        info!("shutting down work queue");
        stop_queue.shutdown().await;
    });

    Ok(queue)
}
