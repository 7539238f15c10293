//! In-process pub/sub of generation progress, one channel per course.
//!
//! Producers (workers) publish fire-and-forget: with nobody subscribed the
//! event is dropped, and a slow subscriber only ever loses its own backlog.
//!
//! Consumers (SSE endpoint):
//!   let rx = hub.subscribe(course_id).await;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::warn;

/// Per-course broadcast hub. Payloads are JSON; domains serialize their own types.
#[derive(Clone)]
pub struct ProgressHub {
    channels: Arc<RwLock<HashMap<i64, broadcast::Sender<serde_json::Value>>>>,
    capacity: usize,
}

impl ProgressHub {
    /// Create a hub with the default capacity (256 events per course).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Send `event` to every subscriber of `course_id`. Never fails.
    pub async fn publish(&self, course_id: i64, event: &impl Serialize) {
        let value = match serde_json::to_value(event) {
            Ok(value) => value,
            Err(e) => {
                warn!(course_id, error = %e, "Dropping unserializable progress event");
                return;
            }
        };

        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(&course_id) {
            // No active receivers is fine
            let _ = tx.send(value);
        }
    }

    /// Subscribe to `course_id`, creating its channel if needed.
    pub async fn subscribe(&self, course_id: i64) -> broadcast::Receiver<serde_json::Value> {
        let mut channels = self.channels.write().await;
        channels
            .entry(course_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drop channels nobody listens to.
    pub async fn cleanup(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, tx| tx.receiver_count() > 0);
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_events_reach_only_their_course() {
        let hub = ProgressHub::new();
        let mut course_1 = hub.subscribe(1).await;
        let mut course_2 = hub.subscribe(2).await;

        hub.publish(1, &json!({"event": "module_created"})).await;

        assert_eq!(course_1.recv().await.unwrap()["event"], "module_created");
        assert!(course_2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let hub = ProgressHub::new();
        hub.publish(99, &json!({"event": "dropped"})).await;
        assert!(hub.channels.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_lagging_subscriber_does_not_block_publisher() {
        let hub = ProgressHub::with_capacity(2);
        let mut rx = hub.subscribe(5).await;

        for i in 0..10 {
            hub.publish(5, &json!({"n": i})).await;
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        assert_eq!(rx.recv().await.unwrap()["n"], 8);
    }

    #[tokio::test]
    async fn test_cleanup_removes_empty_channels() {
        let hub = ProgressHub::new();
        let rx = hub.subscribe(3).await;
        drop(rx);

        hub.cleanup().await;
        assert!(hub.channels.read().await.is_empty());
    }
}
