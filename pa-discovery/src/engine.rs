use std::collections::HashMap;
use std::sync::{
    Arc,
    Mutex,
};
use std::time::Duration;

use clockabilly::{
    Clockable,
    UtcClock,
};
use metrics::gauge;
use pa_core::config::{
    ConfigStore,
    TargetKind,
};
use pa_core::k8s::ClusterView;
use pa_core::metrics::TARGETS_DISCOVERED;
use tokio::sync::watch;
use tracing::*;

use crate::reconcilers::{
    DiscoveryContext,
    PodMonitorReconciler,
    Reconciler,
    ServiceMonitorReconciler,
    StaticEndpointsReconciler,
};
use crate::target::{
    Target,
    TargetState,
};

// The scheduler's view of discovery: a snapshot of everything currently in
// the scrape rotation, plus the two scrape-outcome notifications that drive
// the Ready <-> Error transitions.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait TargetSource: Send + Sync {
    fn ready_targets(&self) -> Vec<Target>;
    fn note_scrape_success(&self, id: &str);
    fn note_scrape_failure(&self, id: &str);
}

pub struct DiscoveryEngine {
    config: Arc<ConfigStore>,
    cluster: Arc<dyn ClusterView>,
    clock: Box<dyn Clockable + Send + Sync>,
    reconcilers: Vec<Box<dyn Reconciler + Send + Sync>>,
    targets: Mutex<HashMap<String, Target>>,
}

impl DiscoveryEngine {
    pub fn new(config: Arc<ConfigStore>, cluster: Arc<dyn ClusterView>) -> DiscoveryEngine {
        Self::new_with_clock(config, cluster, UtcClock::boxed())
    }

    pub fn new_with_clock(
        config: Arc<ConfigStore>,
        cluster: Arc<dyn ClusterView>,
        clock: Box<dyn Clockable + Send + Sync>,
    ) -> DiscoveryEngine {
        DiscoveryEngine {
            config,
            cluster,
            clock,
            reconcilers: vec![
                Box::new(StaticEndpointsReconciler),
                Box::new(PodMonitorReconciler),
                Box::new(ServiceMonitorReconciler),
            ],
            targets: Mutex::new(HashMap::new()),
        }
    }

    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.reconcile(),
                _ = shutdown.changed() => break,
            }
        }
        debug!("discovery engine stopped");
    }

    // One full discovery cycle: expand every enabled declaration into
    // concrete targets and replace the live set wholesale.  Holding the lock
    // for the swap only; expansion runs entirely on local informer caches.
    pub fn reconcile(&self) {
        let decls = self.config.scrape_configs();
        let now = self.clock.now_ts();
        let ctx = DiscoveryContext { cluster: &*self.cluster, config: &*self.config, now };

        if !self.cluster.is_initialized()
            && decls.iter().any(|d| d.enabled && d.kind != TargetKind::StaticEndpoints)
        {
            warn!("kubernetes client not initialized; dynamic targets resolve to nothing this cycle");
        }

        let mut next: HashMap<String, Target> = HashMap::new();
        for decl in &decls {
            if !decl.enabled {
                continue;
            }
            let Some(reconciler) = self.reconcilers.iter().find(|r| r.handles(decl)) else {
                continue;
            };

            for target in reconciler.expand(decl, &ctx) {
                if next.contains_key(&target.id) {
                    warn!("duplicate target id {} produced this cycle, keeping the first", target.id);
                    continue;
                }
                next.insert(target.id.clone(), target);
            }
        }

        let mut targets = self.targets.lock().unwrap();

        // Scrape bookkeeping survives rediscovery as long as the id is stable
        for (id, target) in next.iter_mut() {
            if let Some(prev) = targets.get(id) {
                target.retry_count = prev.retry_count;
                if prev.state == TargetState::Error && target.state == TargetState::Ready {
                    target.state = TargetState::Error;
                }
            }
        }

        // Tombstone whatever the new cycle no longer produces; the wholesale
        // swap below then evicts it.
        for (id, old) in targets.iter_mut() {
            if !next.contains_key(id) {
                old.state = TargetState::Removed;
                debug!("target {id} removed");
            }
        }

        gauge!(TARGETS_DISCOVERED).set(next.len() as f64);
        *targets = next;
    }
}

impl TargetSource for DiscoveryEngine {
    fn ready_targets(&self) -> Vec<Target> {
        self.targets
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.scrapable())
            .cloned()
            .collect()
    }

    fn note_scrape_success(&self, id: &str) {
        if let Some(target) = self.targets.lock().unwrap().get_mut(id) {
            target.retry_count = 0;
            target.state = TargetState::Ready;
        }
    }

    fn note_scrape_failure(&self, id: &str) {
        if let Some(target) = self.targets.lock().unwrap().get_mut(id) {
            target.retry_count += 1;
            target.state = TargetState::Error;
        }
    }
}

#[cfg(test)]
impl DiscoveryEngine {
    pub(crate) fn get_target(&self, id: &str) -> Option<Target> {
        self.targets.lock().unwrap().get(id).cloned()
    }

    pub(crate) fn target_count(&self) -> usize {
        self.targets.lock().unwrap().len()
    }
}
