use tracing::{debug, warn};

use eventing_metadata::channel::{ChannelObj, ChannelSpec};
use eventing_types::defaults::CHANNEL_KIND;

use crate::core::Context;
use crate::error::ReconcileError;
use crate::store::MetadataClient;

/// Persist the status of `desired`.
///
/// The channel is fetched from the store rather than the cache and only its
/// status is replaced, so the write carries the latest resource version. No
/// write happens if the stored status already matches.
pub async fn update_status<C>(
    ctx: &Context<C>,
    desired: &ChannelObj,
) -> Result<ChannelObj, ReconcileError>
where
    C: MetadataClient + 'static,
{
    let fresh = ctx
        .client()
        .retrieve_item::<ChannelSpec>(&desired.key())
        .await?;

    if fresh.status == desired.status {
        debug!(key = %desired.key(), "status unchanged");
        return Ok(fresh);
    }

    let becomes_ready = !fresh.status.is_ready() && desired.status.is_ready();

    let mut existing = fresh;
    existing.status = desired.status.clone();
    let updated = ctx.client().update_status(existing).await?;

    if becomes_ready {
        report_ready_latency(ctx, &updated);
    }

    Ok(updated)
}

/// time from creation to first ready, failures are only logged
fn report_ready_latency<C>(ctx: &Context<C>, channel: &ChannelObj)
where
    C: MetadataClient + 'static,
{
    let Some(created) = channel.metadata.creation_timestamp else {
        return;
    };

    let elapsed = ctx.clock().now().signed_duration_since(created);
    let duration = elapsed.to_std().unwrap_or_default();
    debug!(key = %channel.key(), ?duration, "channel became ready");

    if let Err(err) =
        ctx.stats()
            .report_ready(CHANNEL_KIND, channel.namespace(), channel.name(), duration)
    {
        warn!(key = %channel.key(), %err, "failed to record ready for Channel");
    }
}
