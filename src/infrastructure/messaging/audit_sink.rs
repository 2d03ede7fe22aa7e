use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::domain::entities::AuditEvent;
use crate::domain::ports::MessageBusPublisher;
use crate::domain::value_objects::ClusterId;

const CHANNEL_CAPACITY: usize = 20;

/// Success/failure/drop counters for one cluster's audit sink (§4.H:
/// "success and failure counters are incremented per cluster").
#[derive(Default)]
pub struct ClusterCounters {
    pub published: AtomicU64,
    pub failed_attempts: AtomicU64,
    pub dropped: AtomicU64,
}

struct ClusterHandle {
    sender: mpsc::Sender<AuditEvent>,
    counters: Arc<ClusterCounters>,
}

/// One bounded FIFO per cluster (capacity 20), single consumer task per
/// cluster, publishing to a durable message-bus queue with exponential
/// back-off retry (§4.H). `try_send` never blocks the quota-change
/// pipeline: on overflow the newest event is dropped and the drop is
/// logged.
#[derive(Default)]
pub struct AuditSink {
    clusters: DashMap<ClusterId, ClusterHandle>,
}

impl AuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a cluster and spawns its consumer task. `shutdown`
    /// resolving to `true` interrupts an in-progress back-off wait
    /// (§5: "audit-sink back-off waits are interruptible by process
    /// shutdown"); any events still queued at that point are lost, per
    /// design notes open question 2.
    pub fn register_cluster(
        &self,
        cluster: ClusterId,
        queue_name: String,
        publisher: Arc<dyn MessageBusPublisher>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let (tx, mut rx) = mpsc::channel::<AuditEvent>(CHANNEL_CAPACITY);
        let counters = Arc::new(ClusterCounters::default());
        let consumer_counters = counters.clone();
        let consumer_cluster = cluster.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    event = rx.recv() => match event {
                        Some(e) => e,
                        None => break,
                    },
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                };

                info!(target: "audit", cluster = %consumer_cluster, event_id = %event.id(), outcome = event.outcome(), "audit event emitted");

                let mut backoff = ExponentialBackoff {
                    initial_interval: Duration::from_secs(1),
                    multiplier: 2.0,
                    max_interval: Duration::from_secs(300),
                    max_elapsed_time: None,
                    randomization_factor: 0.0,
                    ..ExponentialBackoff::default()
                };

                loop {
                    match publisher.publish(&queue_name, event.to_json_bytes()).await {
                        Ok(()) => {
                            consumer_counters.published.fetch_add(1, Ordering::Relaxed);
                            break;
                        }
                        Err(e) => {
                            consumer_counters.failed_attempts.fetch_add(1, Ordering::Relaxed);
                            warn!(target: "audit", cluster = %consumer_cluster, error = %e, "audit publish failed, retrying");
                            let wait = backoff.next_backoff().unwrap_or(Duration::from_secs(300));
                            tokio::select! {
                                _ = tokio::time::sleep(wait) => {}
                                _ = shutdown.changed() => {
                                    if *shutdown.borrow() {
                                        return;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        });

        self.clusters.insert(cluster, ClusterHandle { sender: tx, counters });
    }

    /// Hands an event to the bounded channel without blocking the
    /// caller. Drops the newest event and logs the drop when the
    /// channel is full or the cluster was never registered.
    pub fn try_send(&self, cluster: &ClusterId, event: AuditEvent) {
        match self.clusters.get(cluster) {
            Some(handle) => {
                if let Err(mpsc::error::TrySendError::Full(_)) = handle.sender.try_send(event) {
                    handle.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(target: "audit", cluster = %cluster, "audit channel full, dropping event");
                }
            }
            None => {
                warn!(target: "audit", cluster = %cluster, "no audit sink registered for cluster, dropping event");
            }
        }
    }

    pub fn counters(&self, cluster: &ClusterId) -> Option<Arc<ClusterCounters>> {
        self.clusters.get(cluster).map(|h| h.counters.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{AuditPayload, EventTarget};
    use crate::domain::ports::TokenContext;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use uuid::Uuid;

    struct CountingPublisher {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MessageBusPublisher for CountingPublisher {
        async fn publish(&self, _queue: &str, _payload: Vec<u8>) -> crate::error::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn sample_event() -> AuditEvent {
        let token = TokenContext {
            user_id: "u".into(),
            user_name: "alice".into(),
            domain_id: "d".into(),
            domain_name: "eng".into(),
            project_id: None,
            is_privileged: false,
        };
        AuditEvent::new(
            &token,
            "/v1/x",
            "127.0.0.1",
            "curl",
            200,
            EventTarget::Quota {
                service_type: "compute".into(),
                resource_name: "cores".into(),
                domain_id: Uuid::nil(),
                project_id: None,
            },
            AuditPayload::default(),
            Uuid::nil(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn published_event_increments_counter() {
        let sink = AuditSink::new();
        let cluster = ClusterId::new("eu-west-1").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = watch::channel(false);
        sink.register_cluster(
            cluster.clone(),
            "audit-events".into(),
            Arc::new(CountingPublisher { calls: calls.clone() }),
            rx,
        );

        sink.try_send(&cluster, sample_event());
        // allow the spawned consumer to run
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.counters(&cluster).unwrap().published.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sending_to_unregistered_cluster_does_not_panic() {
        let sink = AuditSink::new();
        let cluster = ClusterId::new("unregistered").unwrap();
        sink.try_send(&cluster, sample_event());
    }
}
