use std::collections::{
    HashMap,
    HashSet,
};
use std::sync::{
    Arc,
    Mutex,
};
use std::time::Duration;

use clockabilly::{
    Clockable,
    UtcClock,
};
use metrics::counter;
use pa_core::config::ConfigStore;
use pa_core::metrics::{
    SCRAPE_FAILURES_TOTAL,
    SCRAPES_TOTAL,
};
use pa_discovery::{
    Target,
    TargetSource,
};
use tokio::sync::{
    Semaphore,
    watch,
};
use tracing::*;

use crate::processor::process_batch;
use crate::scraper::HttpScraper;
use crate::sender::BatchSender;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

// Drives periodic scraping of whatever discovery currently considers
// scrapable.  Work is dispatched over a semaphore-bounded pool so the number
// of simultaneous outbound connections (and parsed bodies in memory) has a
// hard cap, re-read from configuration every cycle.
pub struct ScrapeScheduler {
    config: Arc<ConfigStore>,
    targets: Arc<dyn TargetSource>,
    scraper: Arc<HttpScraper>,
    sender: BatchSender,
    clock: Box<dyn Clockable + Send + Sync>,
    last_scraped: Mutex<HashMap<String, i64>>,
    in_flight: Mutex<HashSet<String>>,
    pool: Mutex<WorkerPool>,
}

struct WorkerPool {
    size: usize,
    semaphore: Arc<Semaphore>,
}

impl ScrapeScheduler {
    pub fn new(config: Arc<ConfigStore>, targets: Arc<dyn TargetSource>, sender: BatchSender) -> ScrapeScheduler {
        Self::new_with_clock(config, targets, sender, UtcClock::boxed())
    }

    pub fn new_with_clock(
        config: Arc<ConfigStore>,
        targets: Arc<dyn TargetSource>,
        sender: BatchSender,
        clock: Box<dyn Clockable + Send + Sync>,
    ) -> ScrapeScheduler {
        let size = config.max_concurrency();
        ScrapeScheduler {
            config,
            targets,
            scraper: Arc::new(HttpScraper::new()),
            sender,
            clock,
            last_scraped: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
            pool: Mutex::new(WorkerPool { size, semaphore: Arc::new(Semaphore::new(size)) }),
        }
    }

    // The tick interval is re-read from configuration on every pass, so a
    // reload takes effect one cycle later at the latest.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            let tick = self.config.scraping_interval();
            tokio::select! {
                _ = tokio::time::sleep(tick) => self.clone().run_cycle().await,
                _ = shutdown.changed() => break,
            }
        }
        self.drain().await;
    }

    // One scheduling pass: snapshot the scrapable set, then dispatch a worker
    // for every target whose interval has elapsed.  Dispatch blocks on the
    // semaphore, so a slow fleet of targets backs the cycle up instead of
    // piling up tasks.
    pub async fn run_cycle(self: Arc<Self>) {
        let targets = self.targets.ready_targets();
        let semaphore = self.pool_semaphore(self.config.max_concurrency());
        let now = self.clock.now_ts();

        self.prune_bookkeeping(&targets);

        for target in targets {
            if !self.is_due(&target, now) {
                continue;
            }
            // at most one scrape in flight per target
            if !self.in_flight.lock().unwrap().insert(target.id.clone()) {
                continue;
            }

            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let this = self.clone();
            tokio::spawn(async move {
                this.scrape_one(target).await;
                drop(permit);
            });
        }
    }

    async fn scrape_one(self: Arc<Self>, target: Target) {
        let _guard = InFlightGuard { scheduler: self.clone(), id: target.id.clone() };

        counter!(SCRAPES_TOTAL).increment(1);
        match self.scraper.fetch(&target).await {
            Ok(response) => {
                let batch = process_batch(&target, &response.body, response.collected_at_ms);
                debug!(target = %target.id, samples = batch.samples.len(), "scraped target");

                self.last_scraped
                    .lock()
                    .unwrap()
                    .insert(target.id.clone(), self.clock.now_ts());
                self.targets.note_scrape_success(&target.id);

                // bounded wait, then the batch is dropped; see BatchSender
                self.sender.enqueue(batch, self.config.scraping_interval()).await;
            },
            Err(err) => {
                counter!(SCRAPE_FAILURES_TOTAL).increment(1);
                warn!(target = %target.id, url = %target.url, "scrape failed: {err:#}");
                self.targets.note_scrape_failure(&target.id);
            },
        }
    }

    fn is_due(&self, target: &Target, now: i64) -> bool {
        match self.last_scraped.lock().unwrap().get(&target.id) {
            None => true,
            Some(last) => now - last >= target.metadata.interval.as_secs() as i64,
        }
    }

    // Rebuilds the pool when maxConcurrency changes; permits already handed
    // out on the old semaphore just run to completion.
    fn pool_semaphore(&self, size: usize) -> Arc<Semaphore> {
        let mut pool = self.pool.lock().unwrap();
        if pool.size != size {
            debug!("scrape concurrency changed from {} to {}", pool.size, size);
            *pool = WorkerPool { size, semaphore: Arc::new(Semaphore::new(size)) };
        }
        pool.semaphore.clone()
    }

    // Timestamps for targets that discovery evicted would otherwise pile up
    // forever
    fn prune_bookkeeping(&self, targets: &[Target]) {
        let ids: HashSet<&str> = targets.iter().map(|t| t.id.as_str()).collect();
        self.last_scraped.lock().unwrap().retain(|id, _| ids.contains(id.as_str()));
    }

    // In-flight scrapes finish within their own HTTP timeouts; give them that
    // long and no longer.
    async fn drain(&self) {
        let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
        while !self.in_flight.lock().unwrap().is_empty() {
            if tokio::time::Instant::now() >= deadline {
                warn!("shutdown drain timed out with scrapes still in flight");
                return;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
        debug!("scrape scheduler stopped");
    }
}

struct InFlightGuard {
    scheduler: Arc<ScrapeScheduler>,
    id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.scheduler.in_flight.lock().unwrap().remove(&self.id);
    }
}

#[cfg(test)]
impl ScrapeScheduler {
    pub(crate) fn last_scraped_at(&self, id: &str) -> Option<i64> {
        self.last_scraped.lock().unwrap().get(id).copied()
    }

    pub(crate) fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }

    pub(crate) fn pool_size(&self) -> usize {
        self.pool.lock().unwrap().size
    }

    pub(crate) fn pool_semaphore_for(&self, size: usize) -> Arc<Semaphore> {
        self.pool_semaphore(size)
    }
}
