use clockabilly::mock::MockUtcClock;
use httpmock::prelude::*;
use pa_core::config::{
    ConfigStore,
    OpenAgentConfig,
};
use pa_discovery::MockTargetSource;

use super::*;

const START_TS: i64 = 1000;

fn fixed_config() -> Arc<ConfigStore> {
    Arc::new(ConfigStore::fixed(OpenAgentConfig::default()))
}

async fn wait_for_idle(scheduler: &ScrapeScheduler) {
    for _ in 0..100 {
        if scheduler.in_flight_count() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("scrape workers did not finish in time");
}

#[rstest(tokio::test)]
async fn test_scheduler_scrapes_and_honors_intervals() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/metrics");
            then.status(200).body(SIMPLE_GAUGE_BODY);
        })
        .await;

    let target = make_target("t1", &server.url("/metrics"));
    let mut source = MockTargetSource::new();
    source.expect_ready_targets().returning(move || vec![target.clone()]);
    source.expect_note_scrape_success().returning(|_| ());

    let (sender, mut rx) = BatchSender::new(8);
    let mut clock = MockUtcClock::boxed(START_TS);
    let scheduler = Arc::new(ScrapeScheduler::new_with_clock(
        fixed_config(),
        Arc::new(source),
        sender,
        clock.clone(),
    ));

    scheduler.clone().run_cycle().await;
    let batch = rx.recv().await.unwrap();
    assert_eq!(batch.samples.len(), 1);
    assert_eq!(batch.samples[0].metric, "x");

    wait_for_idle(&scheduler).await;
    assert_eq!(scheduler.last_scraped_at("t1"), Some(START_TS));
    assert_eq!(mock.hits_async().await, 1);

    // the 30s target interval has not elapsed, so the next cycle is a no-op
    scheduler.clone().run_cycle().await;
    wait_for_idle(&scheduler).await;
    assert_eq!(mock.hits_async().await, 1);
    assert!(rx.try_recv().is_err());

    // once it has elapsed, the target is due again
    clock.advance(31);
    scheduler.clone().run_cycle().await;
    let batch = rx.recv().await.unwrap();
    assert_eq!(batch.samples.len(), 1);

    wait_for_idle(&scheduler).await;
    assert_eq!(mock.hits_async().await, 2);
}

#[rstest(tokio::test)]
async fn test_failed_scrape_reports_and_leaves_no_timestamp() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/metrics");
            then.status(500).body("boom");
        })
        .await;

    let target = make_target("t1", &server.url("/metrics"));
    let mut source = MockTargetSource::new();
    source.expect_ready_targets().returning(move || vec![target.clone()]);
    source.expect_note_scrape_failure().times(1).returning(|_| ());

    let (sender, mut rx) = BatchSender::new(8);
    let scheduler = Arc::new(ScrapeScheduler::new_with_clock(
        fixed_config(),
        Arc::new(source),
        sender,
        MockUtcClock::boxed(START_TS),
    ));

    scheduler.clone().run_cycle().await;
    wait_for_idle(&scheduler).await;

    assert_eq!(mock.hits_async().await, 1);
    // a failed scrape is retried on the next tick: no timestamp, no batch
    assert_eq!(scheduler.last_scraped_at("t1"), None);
    assert!(rx.try_recv().is_err());
}

#[rstest(tokio::test)]
async fn test_stale_bookkeeping_is_pruned() {
    let target = make_target("gone", "http://127.0.0.1:1/metrics");
    let mut source = MockTargetSource::new();
    // first cycle sees the target, later ones see nothing
    source.expect_ready_targets().times(1).returning(move || vec![target.clone()]);
    source.expect_ready_targets().returning(Vec::new);
    source.expect_note_scrape_failure().returning(|_| ());

    let (sender, _rx) = BatchSender::new(8);
    let scheduler = Arc::new(ScrapeScheduler::new_with_clock(
        fixed_config(),
        Arc::new(source),
        sender,
        MockUtcClock::boxed(START_TS),
    ));

    scheduler.clone().run_cycle().await;
    wait_for_idle(&scheduler).await;

    scheduler.clone().run_cycle().await;
    assert_eq!(scheduler.last_scraped_at("gone"), None);
}

#[rstest]
fn test_worker_pool_follows_concurrency_setting() {
    let (sender, _rx) = BatchSender::new(8);
    let scheduler = ScrapeScheduler::new_with_clock(
        fixed_config(),
        Arc::new(MockTargetSource::new()),
        sender,
        MockUtcClock::boxed(START_TS),
    );

    let first = scheduler.pool_semaphore_for(4);
    let second = scheduler.pool_semaphore_for(4);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.available_permits(), 4);

    let resized = scheduler.pool_semaphore_for(2);
    assert!(!Arc::ptr_eq(&first, &resized));
    assert_eq!(scheduler.pool_size(), 2);
    assert_eq!(resized.available_permits(), 2);
}
