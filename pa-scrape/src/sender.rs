use std::sync::Arc;
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use std::time::Duration;

use metrics::counter;
use pa_core::metrics::{
    BATCHES_DROPPED_TOTAL,
    SAMPLES_FORWARDED_TOTAL,
};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::*;

use crate::sample::ScrapeBatch;

// The hand-off point to the external transport: a bounded channel of
// processed batches.  This is the only queue between the pipeline and the
// sender, and the only place where backpressure is resolved -- by waiting a
// bounded amount of time and then dropping the whole batch.
#[derive(Clone)]
pub struct BatchSender {
    tx: mpsc::Sender<ScrapeBatch>,
    dropped: Arc<AtomicU64>,
}

impl BatchSender {
    pub fn new(capacity: usize) -> (BatchSender, mpsc::Receiver<ScrapeBatch>) {
        let (tx, rx) = mpsc::channel(capacity);
        (BatchSender { tx, dropped: Arc::new(AtomicU64::new(0)) }, rx)
    }

    pub async fn enqueue(&self, batch: ScrapeBatch, max_wait: Duration) {
        let samples = batch.samples.len() as u64;
        let url = batch.target_url.clone();

        match self.tx.send_timeout(batch, max_wait).await {
            Ok(()) => {
                counter!(SAMPLES_FORWARDED_TOTAL).increment(samples);
            },
            Err(SendTimeoutError::Timeout(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                counter!(BATCHES_DROPPED_TOTAL).increment(1);
                warn!(target_url = %url, "sender channel full, dropping batch of {samples} samples");
            },
            Err(SendTimeoutError::Closed(_)) => {
                debug!("sender channel closed, discarding batch");
            },
        }
    }

    pub fn dropped_batches(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
