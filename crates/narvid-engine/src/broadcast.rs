//! Per-job progress pub/sub.
//!
//! The executor publishes a progress snapshot after each step; zero or
//! more live subscribers receive every event in order for the
//! duration of their subscription. A late subscriber gets a single
//! catch-up event built from the current job record; there is no
//! durable event log. Publishing never blocks on subscribers.

use std::collections::HashMap;

use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use narvid_models::{ProgressUpdate, RenderJob};

/// Fan-out of progress events to live subscribers, one channel per job.
#[derive(Debug)]
pub struct ProgressBroadcaster {
    channels: Mutex<HashMap<String, broadcast::Sender<ProgressUpdate>>>,
    capacity: usize,
}

impl ProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Subscribe to a job's progress.
    ///
    /// Returns the catch-up event (the job's current state) and a live
    /// receiver for subsequent events.
    pub async fn subscribe(
        &self,
        job: &RenderJob,
    ) -> (ProgressUpdate, broadcast::Receiver<ProgressUpdate>) {
        let mut channels = self.channels.lock().await;
        let sender = channels
            .entry(job.job_id.as_str().to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);

        (ProgressUpdate::snapshot_of(job), sender.subscribe())
    }

    /// Publish an event to the job's subscribers, if any.
    pub async fn publish(&self, update: &ProgressUpdate) {
        let channels = self.channels.lock().await;
        if let Some(sender) = channels.get(update.job_id.as_str()) {
            // Send fails only when no receiver is listening; the
            // pipeline never depends on subscriber presence.
            let _ = sender.send(update.clone());
        }
    }

    /// Publish a terminal event and drop the job's channel.
    ///
    /// Receivers observe the event, then the stream closes.
    pub async fn finish(&self, update: &ProgressUpdate) {
        let mut channels = self.channels.lock().await;
        if let Some(sender) = channels.remove(update.job_id.as_str()) {
            let _ = sender.send(update.clone());
            debug!(job_id = %update.job_id, "progress channel closed");
        }
    }

    /// Number of live channels, for diagnostics.
    pub async fn channel_count(&self) -> usize {
        self.channels.lock().await.len()
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}
