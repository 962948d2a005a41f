//!
//! # Work queue of reconcile keys
//!
//! A key is handed to at most one worker at a time. Adding a key that is
//! being processed marks it dirty and it is queued again once the worker
//! calls `done`. Adding a key that is already queued is a no-op.
//!
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use adaptive_backoff::prelude::{Backoff, ExponentialBackoff};
use async_lock::Mutex;
use event_listener::Event;
use fluvio_future::task::spawn;
use fluvio_future::timer::sleep;
use tracing::{debug, trace};

pub type SharedWorkQueue = Arc<WorkQueue>;

struct QueueState {
    queue: VecDeque<String>,
    dirty: HashSet<String>,
    processing: HashSet<String>,
    failures: HashMap<String, (usize, ExponentialBackoff)>,
    // cloned for every key that starts failing
    backoff: ExponentialBackoff,
    shutting_down: bool,
}

pub struct WorkQueue {
    state: Mutex<QueueState>,
    event: Event,
}

impl fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue").finish_non_exhaustive()
    }
}

impl WorkQueue {
    /// `backoff` is the template for per-key requeue delays
    pub fn new(backoff: ExponentialBackoff) -> Self {
        Self {
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                failures: HashMap::new(),
                backoff,
                shutting_down: false,
            }),
            event: Event::new(),
        }
    }

    pub fn shared(backoff: ExponentialBackoff) -> SharedWorkQueue {
        Arc::new(Self::new(backoff))
    }

    pub async fn add(&self, key: impl Into<String>) {
        let key = key.into();
        let mut state = self.state.lock().await;
        if state.shutting_down || state.dirty.contains(&key) {
            return;
        }

        state.dirty.insert(key.clone());
        if state.processing.contains(&key) {
            trace!(%key, "processing, will requeue on done");
            return;
        }

        state.queue.push_back(key);
        drop(state);
        self.event.notify(1);
    }

    /// next key to process, `None` once the queue is shut down
    pub async fn get(&self) -> Option<String> {
        loop {
            let mut state = self.state.lock().await;
            if let Some(key) = state.queue.pop_front() {
                state.dirty.remove(&key);
                state.processing.insert(key.clone());
                return Some(key);
            }
            if state.shutting_down {
                return None;
            }

            // registered before the lock is released so an add in between isn't missed
            let listener = self.event.listen();
            drop(state);
            listener.await;
        }
    }

    /// mark processing of `key` finished
    pub async fn done(&self, key: &str) {
        let mut state = self.state.lock().await;
        state.processing.remove(key);
        if state.dirty.contains(key) && !state.shutting_down {
            state.queue.push_back(key.to_owned());
            drop(state);
            self.event.notify(1);
        }
    }

    pub fn add_after(self: &Arc<Self>, key: String, delay: Duration) {
        let queue = self.clone();
        spawn(async move {
            sleep(delay).await;
            queue.add(key).await;
        });
    }

    /// requeue after this key's next backoff delay
    pub async fn add_rate_limited(self: &Arc<Self>, key: String) -> Duration {
        let mut state = self.state.lock().await;
        let template = state.backoff.clone();
        let (requeues, backoff) = state
            .failures
            .entry(key.clone())
            .or_insert_with(|| (0, template));
        *requeues += 1;
        let delay = backoff.wait();
        drop(state);

        debug!(%key, ?delay, "rate limited requeue");
        self.add_after(key, delay);
        delay
    }

    /// stop tracking failures for `key`
    pub async fn forget(&self, key: &str) {
        self.state.lock().await.failures.remove(key);
    }

    pub async fn num_requeues(&self, key: &str) -> usize {
        self.state
            .lock()
            .await
            .failures
            .get(key)
            .map(|(requeues, _)| *requeues)
            .unwrap_or(0)
    }

    /// keys waiting to be processed
    pub async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn shutdown(&self) {
        self.state.lock().await.shutting_down = true;
        self.event.notify(usize::MAX);
    }

    pub async fn is_shutting_down(&self) -> bool {
        self.state.lock().await.shutting_down
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use fluvio_future::timer::sleep;

    use crate::config::RequeueConfig;

    use super::WorkQueue;

    fn queue() -> std::sync::Arc<WorkQueue> {
        let requeue = RequeueConfig {
            min: Duration::from_millis(5),
            max: Duration::from_millis(50),
            factor: 2.0,
        };
        WorkQueue::shared(requeue.backoff().expect("backoff"))
    }

    #[fluvio_future::test]
    async fn test_duplicate_adds_collapse() {
        let queue = queue();
        queue.add("default/a").await;
        queue.add("default/a").await;
        queue.add("default/b").await;
        assert_eq!(queue.len().await, 2);

        assert_eq!(queue.get().await.as_deref(), Some("default/a"));
        assert_eq!(queue.get().await.as_deref(), Some("default/b"));
        assert!(queue.is_empty().await);
    }

    #[fluvio_future::test]
    async fn test_key_not_handed_out_twice() {
        let queue = queue();
        queue.add("default/a").await;
        let key = queue.get().await.expect("key");

        // re-added while processing: held back until done
        queue.add("default/a").await;
        assert!(queue.is_empty().await);

        queue.done(&key).await;
        assert_eq!(queue.len().await, 1);
        assert_eq!(queue.get().await.as_deref(), Some("default/a"));
        queue.done("default/a").await;
        assert!(queue.is_empty().await);
    }

    #[fluvio_future::test]
    async fn test_rate_limited_requeue() {
        let queue = queue();
        let first = queue.add_rate_limited("default/a".to_owned()).await;
        let second = queue.add_rate_limited("default/a".to_owned()).await;
        assert!(second >= first);
        assert_eq!(queue.num_requeues("default/a").await, 2);

        sleep(Duration::from_millis(100)).await;
        assert_eq!(queue.len().await, 1);

        queue.forget("default/a").await;
        assert_eq!(queue.num_requeues("default/a").await, 0);
    }

    #[fluvio_future::test]
    async fn test_shutdown_releases_getters() {
        let queue = queue();
        let getter = queue.clone();
        let handle = fluvio_future::task::spawn(async move { getter.get().await });

        sleep(Duration::from_millis(10)).await;
        queue.shutdown().await;
        sleep(Duration::from_millis(10)).await;

        // adds after shutdown are dropped
        queue.add("default/a").await;
        assert!(queue.is_empty().await);
        assert!(queue.is_shutting_down().await);
        drop(handle);
    }
}
