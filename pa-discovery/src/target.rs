use std::collections::{
    BTreeMap,
    HashMap,
};
use std::sync::Arc;
use std::time::Duration;

use pa_core::config::TlsConfig;
use pa_core::relabel::RelabelRule;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TargetState {
    Ready,
    Pending,
    Error,
    Removed,
}

// One concrete scrape endpoint, produced by the discovery engine from a
// target declaration.  Distinct from the declaration that spawned it: a
// single PodMonitor declaration typically fans out into many of these.
//
// Targets are owned by the discovery engine; everything downstream works on
// by-value snapshots, so the whole struct stays cheaply cloneable (the relabel
// rules are behind an Arc).
#[derive(Clone, Debug)]
pub struct Target {
    pub id: String,
    pub url: String,
    pub state: TargetState,
    pub labels: BTreeMap<String, String>,
    pub metadata: ScrapeMeta,

    // timestamp of the most recent discovery cycle that produced this target
    pub last_seen: i64,

    // consecutive failed scrapes; reset on the first success
    pub retry_count: u32,
}

// Per-target attributes consumed only by the scheduler and the scraper
#[derive(Clone, Debug)]
pub struct ScrapeMeta {
    pub scheme: String,
    pub tls: Option<TlsConfig>,
    pub path: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub relabel_rules: Arc<Vec<RelabelRule>>,
    pub params: HashMap<String, Vec<String>>,
    pub add_node_label: bool,
    pub node_name: Option<String>,
    pub port: Option<String>,
}

impl Target {
    // Error targets stay in the scrape rotation; the next successful scrape
    // flips them back to Ready.
    pub fn scrapable(&self) -> bool {
        matches!(self.state, TargetState::Ready | TargetState::Error)
    }
}
