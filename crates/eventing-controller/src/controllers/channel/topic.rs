use tracing::{debug, instrument};

use eventing_metadata::channel::ChannelObj;
use eventing_metadata::core::is_controlled_by;
use eventing_metadata::topic::{TopicObj, TopicSpec};

use crate::core::Context;
use crate::error::ReconcileError;
use crate::monitoring::{EventType, reasons};
use crate::resources::{TopicArgs, get_label_selector, get_labels, make_topic};
use crate::store::MetadataClient;

/// Topic controlled by `channel`, if one exists
async fn find_owned_topic<C>(
    ctx: &Context<C>,
    channel: &ChannelObj,
) -> Result<Option<TopicObj>, ReconcileError>
where
    C: MetadataClient + 'static,
{
    let selector = get_label_selector(&ctx.config().agent_name, channel.name());
    let topics = ctx
        .client()
        .retrieve_items::<TopicSpec>(channel.namespace(), &selector)
        .await?;

    Ok(topics
        .into_iter()
        .find(|topic| is_controlled_by(&topic.metadata, channel.uid())))
}

/// Get or create the topic owned by `channel`.
///
/// The channel's `status.topic_id` must be populated. An existing topic is
/// returned unchanged.
#[instrument(skip(ctx, channel), fields(channel = %channel.key()))]
pub async fn ensure_topic<C>(
    ctx: &Context<C>,
    channel: &ChannelObj,
) -> Result<TopicObj, ReconcileError>
where
    C: MetadataClient + 'static,
{
    if let Some(topic) = find_owned_topic(ctx, channel).await? {
        debug!(topic = %topic.key(), "reusing existing topic");
        return Ok(topic);
    }

    let config = ctx.config();
    let desired = make_topic(TopicArgs {
        owner: channel,
        project: channel.spec.project.clone(),
        secret: channel
            .spec
            .secret
            .clone()
            .unwrap_or_else(|| config.default_secret.clone()),
        topic: channel.status.topic_id.clone().unwrap_or_default(),
        labels: get_labels(&config.agent_name, channel.name()),
    });
    let topic_key = desired.key();

    match ctx.client().create_item(desired).await {
        Ok(topic) => {
            debug!(topic = %topic.key(), "created topic");
            ctx.recorder().record(
                &channel.object_ref(),
                EventType::Normal,
                reasons::TOPIC_CREATED,
                &format!("Created Topic {:?}", topic.name()),
            );
            Ok(topic)
        }
        Err(err) if err.is_already_exists() => {
            // created by an earlier attempt, possibly under other labels
            let existing = ctx.client().retrieve_item::<TopicSpec>(&topic_key).await?;
            if is_controlled_by(&existing.metadata, channel.uid()) {
                debug!(topic = %existing.key(), "adopting existing topic");
                Ok(existing)
            } else {
                Err(ReconcileError::TopicNotOwned {
                    channel: channel.key(),
                    topic: topic_key,
                })
            }
        }
        Err(err) => Err(err.into()),
    }
}
