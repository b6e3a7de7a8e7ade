mod scheduler_test;
mod scraper_test;
mod sender_test;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pa_core::relabel::{
    RelabelRule,
    compile_rules,
    no_rules,
};
use pa_discovery::{
    ScrapeMeta,
    Target,
    TargetState,
};
use pa_testutils::*;

use super::*;

const TEST_COLLECTED_AT_MS: i64 = 1_700_000_000_000;

fn make_target(id: &str, url: &str) -> Target {
    Target {
        id: id.into(),
        url: url.into(),
        state: TargetState::Ready,
        labels: Default::default(),
        metadata: ScrapeMeta {
            scheme: "http".into(),
            tls: None,
            path: "/metrics".into(),
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            relabel_rules: no_rules(),
            params: HashMap::new(),
            add_node_label: false,
            node_name: None,
            port: None,
        },
        last_seen: 0,
        retry_count: 0,
    }
}

fn rules_from_yaml(yaml: &str) -> Arc<Vec<RelabelRule>> {
    compile_rules(serde_yaml::from_str(yaml).unwrap())
}

fn empty_batch() -> ScrapeBatch {
    ScrapeBatch {
        target_url: "http://10.0.0.1:9100/metrics".into(),
        collected_at_ms: TEST_COLLECTED_AT_MS,
        samples: vec![],
        metadata: HashMap::new(),
    }
}
