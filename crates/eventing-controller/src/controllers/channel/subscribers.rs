use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use eventing_metadata::channel::{ChannelObj, SubscriberSpec, SubscriberStatus};
use eventing_types::{Generation, Uid};

use crate::error::ReconcileError;
use crate::store::StoreError;

use super::SubscriberActions;

/// Subscribers to create, update and delete, keyed by uid
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubscriberDiff {
    pub create: Vec<SubscriberSpec>,
    pub update: Vec<SubscriberSpec>,
    pub delete: Vec<SubscriberStatus>,
}

impl SubscriberDiff {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Partition `desired` against `observed`.
///
/// Subscribers missing from `observed` are created, those whose observed
/// generation differs are updated and observed entries no longer desired
/// are deleted. A uid listed more than once only counts the first time.
pub fn diff_subscribers(
    desired: &[SubscriberSpec],
    observed: &[SubscriberStatus],
) -> SubscriberDiff {
    let exists: HashMap<&str, &SubscriberStatus> = observed
        .iter()
        .map(|status| (status.uid.as_str(), status))
        .collect();
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut diff = SubscriberDiff::default();

    for want in desired {
        if !claimed.insert(want.uid.as_str()) {
            continue;
        }
        match exists.get(want.uid.as_str()) {
            None => diff.create.push(want.clone()),
            Some(got) if got.observed_generation != want.generation => {
                diff.update.push(want.clone())
            }
            Some(_) => {}
        }
    }

    for got in observed {
        if claimed.insert(got.uid.as_str()) {
            diff.delete.push(got.clone());
        }
    }

    diff
}

/// Apply the subscriber diff of `channel` and record the outcome in its status.
///
/// Every action is attempted. Successful creates and updates record the synced
/// generation, successful deletes drop the entry. The first failure is returned.
pub async fn sync_subscribers(
    actions: &dyn SubscriberActions,
    channel: &mut ChannelObj,
) -> Result<(), ReconcileError> {
    let diff = diff_subscribers(&channel.spec.subscribers, &channel.status.subscribers);
    if diff.is_empty() {
        return Ok(());
    }
    debug!(
        create = diff.create.len(),
        update = diff.update.len(),
        delete = diff.delete.len(),
        "syncing subscribers"
    );

    let mut synced: HashMap<Uid, Generation> = channel
        .status
        .subscribers
        .iter()
        .map(|status| (status.uid.clone(), status.observed_generation))
        .collect();
    let mut first_err: Option<(Uid, StoreError)> = None;

    for want in diff.create.iter() {
        match actions.create(channel, want).await {
            Ok(()) => {
                synced.insert(want.uid.clone(), want.generation);
            }
            Err(err) => {
                warn!(uid = %want.uid, %err, "unable to create subscription");
                first_err.get_or_insert((want.uid.clone(), err));
            }
        }
    }

    for want in diff.update.iter() {
        match actions.update(channel, want).await {
            Ok(()) => {
                synced.insert(want.uid.clone(), want.generation);
            }
            Err(err) => {
                warn!(uid = %want.uid, %err, "unable to update subscription");
                first_err.get_or_insert((want.uid.clone(), err));
            }
        }
    }

    for got in diff.delete.iter() {
        match actions.delete(channel, got).await {
            Ok(()) => {
                synced.remove(&got.uid);
            }
            Err(err) => {
                warn!(uid = %got.uid, %err, "unable to delete subscription");
                first_err.get_or_insert((got.uid.clone(), err));
            }
        }
    }

    // desired order first, then entries whose delete failed
    let mut subscribers = vec![];
    for want in channel.spec.subscribers.iter() {
        if let Some(generation) = synced.remove(&want.uid) {
            subscribers.push(SubscriberStatus::new(want.uid.clone(), generation));
        }
    }
    for got in channel.status.subscribers.iter() {
        if let Some(generation) = synced.remove(&got.uid) {
            subscribers.push(SubscriberStatus::new(got.uid.clone(), generation));
        }
    }
    channel.status.subscribers = subscribers;

    match first_err {
        Some((uid, source)) => Err(ReconcileError::Subscriber { uid, source }),
        None => Ok(()),
    }
}
