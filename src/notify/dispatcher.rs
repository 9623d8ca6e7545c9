//! Bounded, fire-and-forget notification dispatch.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::notify::Notifier;
use crate::observability::metrics;

/// Result of handing a payload to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Accepted for delivery by a worker. Delivery itself may still fail.
    Queued,
    /// Discarded because the queue was full or the workers are gone.
    Dropped,
}

/// Queue plus fixed worker pool that delivers payloads off the relay path.
///
/// [`Dispatcher::dispatch`] never waits: there is no backpressure towards the
/// caller, no retry and no ordering guarantee between payloads.
pub struct Dispatcher {
    tx: mpsc::Sender<Value>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start `workers` delivery tasks sharing a queue of `queue_capacity` payloads.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(notifier: Arc<dyn Notifier>, workers: usize, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let queue = Arc::new(Mutex::new(rx));

        let workers = (0..workers.max(1))
            .map(|worker| tokio::spawn(run_worker(worker, Arc::clone(&queue), Arc::clone(&notifier))))
            .collect();

        Self { tx, workers }
    }

    /// Submit `events` as one JSON array payload.
    pub fn dispatch(&self, events: Vec<Value>) -> DispatchOutcome {
        let count = events.len();
        match self.tx.try_send(Value::Array(events)) {
            Ok(()) => DispatchOutcome::Queued,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(events = count, "Notification queue full, dropping payload");
                metrics::record_notification("dropped");
                DispatchOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(events = count, "Notification workers stopped, dropping payload");
                metrics::record_notification("dropped");
                DispatchOutcome::Dropped
            }
        }
    }

    /// Stop accepting payloads and wait for queued ones to be attempted.
    pub async fn close(self) {
        drop(self.tx);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

async fn run_worker(worker: usize, queue: Arc<Mutex<mpsc::Receiver<Value>>>, notifier: Arc<dyn Notifier>) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(payload) = next else {
            break;
        };

        match notifier.notify(&payload).await {
            Ok(()) => metrics::record_notification("delivered"),
            Err(error) => {
                tracing::warn!(worker, error = %error, "Notification delivery failed");
                metrics::record_notification("failed");
            }
        }
    }

    tracing::debug!(worker, "Notification worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct Capture(mpsc::UnboundedSender<Value>);

    #[async_trait]
    impl Notifier for Capture {
        async fn notify(&self, payload: &Value) -> Result<(), NotifyError> {
            let _ = self.0.send(payload.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn notify(&self, _payload: &Value) -> Result<(), NotifyError> {
            Err(NotifyError::Sink("unreachable".into()))
        }
    }

    struct Blocked(Arc<Notify>);

    #[async_trait]
    impl Notifier for Blocked {
        async fn notify(&self, _payload: &Value) -> Result<(), NotifyError> {
            self.0.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn delivers_events_as_array() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::spawn(Arc::new(Capture(tx)), 2, 8);

        let outcome = dispatcher.dispatch(vec![json!({"a": 1}), json!({"b": 2})]);
        assert_eq!(outcome, DispatchOutcome::Queued);

        let payload = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload, json!([{"a": 1}, {"b": 2}]));

        dispatcher.close().await;
    }

    #[tokio::test]
    async fn failures_stay_inside_the_worker() {
        let dispatcher = Dispatcher::spawn(Arc::new(Failing), 1, 4);
        assert_eq!(dispatcher.dispatch(vec![json!(1)]), DispatchOutcome::Queued);
        assert_eq!(dispatcher.dispatch(vec![json!(2)]), DispatchOutcome::Queued);

        tokio::time::timeout(Duration::from_secs(1), dispatcher.close())
            .await
            .expect("workers drain after failures");
    }

    #[tokio::test]
    async fn full_queue_drops_without_waiting() {
        let gate = Arc::new(Notify::new());
        let dispatcher = Dispatcher::spawn(Arc::new(Blocked(gate.clone())), 1, 1);

        // The worker has not run yet on this single-threaded runtime.
        assert_eq!(dispatcher.dispatch(vec![json!(1)]), DispatchOutcome::Queued);
        assert_eq!(dispatcher.dispatch(vec![json!(2)]), DispatchOutcome::Dropped);

        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(1), dispatcher.close())
            .await
            .unwrap();
    }
}
