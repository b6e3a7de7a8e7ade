use metrics::Key;
use pa_core::metrics::{
    BATCHES_DROPPED_TOTAL,
    MemoryRecorder,
};

use super::*;

#[rstest(tokio::test)]
async fn test_drop_counter_is_recorded() {
    // the one place in this binary that installs the global recorder
    let recorder = MemoryRecorder::new().unwrap();

    let (sender, _rx) = BatchSender::new(1);
    sender.enqueue(empty_batch(), Duration::from_millis(10)).await;
    sender.enqueue(empty_batch(), Duration::from_millis(10)).await;

    // other tests may race their own drops in, so only a lower bound is safe
    assert!(recorder.get_counter(&Key::from_name(BATCHES_DROPPED_TOTAL)).unwrap() >= 1);
}

#[rstest(tokio::test)]
async fn test_enqueue_and_receive() {
    let (sender, mut rx) = BatchSender::new(4);

    sender.enqueue(empty_batch(), Duration::from_millis(50)).await;

    let batch = rx.recv().await.unwrap();
    assert_eq!(batch.collected_at_ms, TEST_COLLECTED_AT_MS);
    assert_eq!(sender.dropped_batches(), 0);
}

#[rstest(tokio::test)]
async fn test_full_channel_drops_after_bounded_wait() {
    let (sender, mut rx) = BatchSender::new(1);

    sender.enqueue(empty_batch(), Duration::from_millis(10)).await;
    // nobody is draining, so this one times out and is dropped
    sender.enqueue(empty_batch(), Duration::from_millis(10)).await;

    assert_eq!(sender.dropped_batches(), 1);

    // exactly one batch made it through
    assert!(rx.recv().await.is_some());
    assert!(rx.try_recv().is_err());
}

#[rstest(tokio::test)]
async fn test_closed_channel_discards_quietly() {
    let (sender, rx) = BatchSender::new(1);
    drop(rx);

    sender.enqueue(empty_batch(), Duration::from_millis(10)).await;
    // a closed channel is shutdown, not backpressure
    assert_eq!(sender.dropped_batches(), 0);
}
