//!
//! # Owned resource builders
//!
//! Deterministic names, labels and manifests for the resources a channel owns.
//!
use std::collections::BTreeMap;

use eventing_metadata::channel::{ChannelObj, SubscriberSpec};
use eventing_metadata::core::{LabelSelector, ObjectMeta, OwnerReference, SecretKeySelector};
use eventing_metadata::subscription::{PullSubscriptionObj, PullSubscriptionSpec};
use eventing_metadata::topic::{TopicObj, TopicSpec};
use eventing_types::TopicId;
use eventing_types::defaults::{
    LABEL_CHANNEL, LABEL_CONTROLLER, SUBSCRIPTION_NAME_PREFIX, TOPIC_NAME_PREFIX,
};

/// stable for the lifetime of the channel
pub fn generate_topic_id(channel_name: &str, channel_uid: &str) -> TopicId {
    format!("{TOPIC_NAME_PREFIX}-{channel_name}-{channel_uid}")
}

pub fn generate_subscription_name(channel_name: &str, subscriber_uid: &str) -> String {
    format!("{SUBSCRIPTION_NAME_PREFIX}-{channel_name}-{subscriber_uid}")
}

pub fn get_labels(agent_name: &str, channel_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_CONTROLLER.to_owned(), agent_name.to_owned()),
        (LABEL_CHANNEL.to_owned(), channel_name.to_owned()),
    ])
}

pub fn get_label_selector(agent_name: &str, channel_name: &str) -> LabelSelector {
    LabelSelector {
        match_labels: get_labels(agent_name, channel_name),
    }
}

fn owned_meta(owner: &ChannelObj, name: String, labels: BTreeMap<String, String>) -> ObjectMeta {
    ObjectMeta {
        name,
        namespace: owner.metadata.namespace.clone(),
        labels,
        owner_references: vec![OwnerReference::controller_of(owner)],
        ..Default::default()
    }
}

#[derive(Debug)]
pub struct TopicArgs<'a> {
    pub owner: &'a ChannelObj,
    pub project: String,
    pub secret: SecretKeySelector,
    pub topic: TopicId,
    pub labels: BTreeMap<String, String>,
}

/// Topic named after its channel
pub fn make_topic(args: TopicArgs<'_>) -> TopicObj {
    let spec = TopicSpec {
        project: args.project,
        secret: Some(args.secret),
        topic: args.topic,
    };
    let meta = owned_meta(args.owner, args.owner.metadata.name.clone(), args.labels);
    TopicObj::new(meta, spec, Default::default())
}

#[derive(Debug)]
pub struct SubscriptionArgs<'a> {
    pub owner: &'a ChannelObj,
    pub project: String,
    pub secret: SecretKeySelector,
    pub topic: TopicId,
    pub subscriber: &'a SubscriberSpec,
    pub labels: BTreeMap<String, String>,
}

pub fn make_subscription(args: SubscriptionArgs<'_>) -> PullSubscriptionObj {
    let name = generate_subscription_name(&args.owner.metadata.name, &args.subscriber.uid);
    let mut meta = owned_meta(args.owner, name, args.labels);
    PullSubscriptionSpec::set_defaults(&mut meta);

    let spec = PullSubscriptionSpec {
        project: args.project,
        secret: Some(args.secret),
        topic: args.topic,
        sink: args.subscriber.subscriber_uri.clone(),
        reply: args.subscriber.reply_uri.clone(),
        subscriber_generation: args.subscriber.generation,
    };
    PullSubscriptionObj::new(meta, spec, Default::default())
}
