use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use sitesmith_common::Job;

/// Per-subscriber channel capacity. A subscriber that cannot keep up is
/// treated the same as a disconnected one.
const CHANNEL_CAPACITY: usize = 32;

/// Process-wide registry of live job-update subscribers, keyed by job id.
/// Entries appear on first subscribe and are pruned once the last
/// subscriber leaves. Injected wherever snapshots need to be pushed, so a
/// distributed pub/sub can replace it without touching the pipeline.
pub struct UpdateHub {
    subscribers: Mutex<HashMap<Uuid, HashMap<u64, mpsc::Sender<Job>>>>,
    next_id: AtomicU64,
}

impl Default for UpdateHub {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateHub {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a subscriber for one job's updates. Returns the
    /// subscription id (for unsubscribe) and the receiving end.
    pub async fn subscribe(&self, job_id: Uuid) -> (u64, mpsc::Receiver<Job>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut subscribers = self.subscribers.lock().await;
        subscribers.entry(job_id).or_default().insert(id, tx);

        debug!(%job_id, subscription = id, "Subscriber registered");
        (id, rx)
    }

    /// Drop one subscriber, pruning the job entry when it empties.
    pub async fn unsubscribe(&self, job_id: Uuid, subscription_id: u64) {
        let mut subscribers = self.subscribers.lock().await;
        if let Some(entry) = subscribers.get_mut(&job_id) {
            entry.remove(&subscription_id);
            if entry.is_empty() {
                subscribers.remove(&job_id);
            }
        }
        debug!(%job_id, subscription = subscription_id, "Subscriber removed");
    }

    /// Push a job snapshot to every live subscriber. A subscriber whose
    /// channel is closed or full is dropped without affecting the others;
    /// delivery failures never propagate to the pipeline.
    pub async fn publish(&self, job: &Job) {
        let mut subscribers = self.subscribers.lock().await;
        let Some(entry) = subscribers.get_mut(&job.id) else {
            return;
        };

        let mut dead = Vec::new();
        for (id, tx) in entry.iter() {
            if let Err(e) = tx.try_send(job.clone()) {
                warn!(job_id = %job.id, subscription = id, error = %e, "Dropping subscriber");
                dead.push(*id);
            }
        }
        for id in dead {
            entry.remove(&id);
        }
        if entry.is_empty() {
            subscribers.remove(&job.id);
        }
    }

    /// Number of live subscribers for a job.
    pub async fn subscriber_count(&self, job_id: Uuid) -> usize {
        self.subscribers
            .lock()
            .await
            .get(&job_id)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitesmith_common::JobCreateRequest;

    fn job() -> Job {
        Job::new(
            Uuid::new_v4(),
            JobCreateRequest {
                business_name: "Acme".to_string(),
                location: None,
                website_url: None,
                facebook_url: None,
                instagram_url: None,
                client_email: None,
                template_preference: None,
            },
        )
    }

    #[tokio::test]
    async fn test_subscribe_publish_receive() {
        let hub = UpdateHub::new();
        let job = job();

        let (_, mut rx) = hub.subscribe(job.id).await;
        hub.publish(&job).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, job.id);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let hub = UpdateHub::new();
        hub.publish(&job()).await;
    }

    #[tokio::test]
    async fn test_unsubscribe_prunes_entry() {
        let hub = UpdateHub::new();
        let job = job();

        let (first, _rx1) = hub.subscribe(job.id).await;
        let (_, _rx2) = hub.subscribe(job.id).await;
        assert_eq!(hub.subscriber_count(job.id).await, 2);

        hub.unsubscribe(job.id, first).await;
        assert_eq!(hub.subscriber_count(job.id).await, 1);
    }

    #[tokio::test]
    async fn test_dead_subscriber_dropped_silently() {
        let hub = UpdateHub::new();
        let job = job();

        let (_, rx) = hub.subscribe(job.id).await;
        let (_, mut live_rx) = hub.subscribe(job.id).await;
        drop(rx);

        hub.publish(&job).await;

        // The closed channel was pruned, the live one still delivers.
        assert_eq!(hub.subscriber_count(job.id).await, 1);
        assert_eq!(live_rx.recv().await.unwrap().id, job.id);
    }
}
