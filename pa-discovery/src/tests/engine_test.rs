use assert_fs::TempDir;
use assert_fs::prelude::*;
use assertables::*;
use clockabilly::mock::MockUtcClock;

use super::*;
use crate::TargetSource;

fn engine_with(yaml: &str, cluster: MockClusterView) -> DiscoveryEngine {
    DiscoveryEngine::new_with_clock(
        Arc::new(store_from(yaml)),
        Arc::new(cluster),
        MockUtcClock::boxed(TEST_NOW),
    )
}

fn initialized(mut cluster: MockClusterView) -> MockClusterView {
    cluster.expect_is_initialized().returning(|| true);
    cluster
}

#[rstest]
fn test_reconcile_produces_stable_ids() {
    let engine = engine_with(STATIC_TARGETS_YAML, initialized(MockClusterView::new()));

    engine.reconcile();
    let first: Vec<_> = {
        let mut ids: Vec<_> = engine.ready_targets().iter().map(|t| t.id.clone()).collect();
        ids.sort();
        ids
    };

    engine.reconcile();
    let mut second: Vec<_> = engine.ready_targets().iter().map(|t| t.id.clone()).collect();
    second.sort();

    assert_eq!(first, vec!["api-static-0", "api-static-1"]);
    assert_eq!(first, second);
}

#[rstest]
fn test_reconcile_drops_duplicate_ids() {
    // two identical declarations collapse onto the same ids; the engine keeps
    // the first of each
    let yaml = "
features:
  openAgent:
    targets:
      - targetName: api
        type: StaticEndpoints
        addresses: ['10.0.0.1:9100']
      - targetName: api
        type: StaticEndpoints
        addresses: ['10.0.0.9:9100']
";
    let engine = engine_with(yaml, initialized(MockClusterView::new()));
    engine.reconcile();

    assert_eq!(engine.target_count(), 1);
    assert_eq!(engine.ready_targets()[0].url, "http://10.0.0.1:9100/metrics");
}

#[rstest]
fn test_scrape_outcomes_drive_state(test_pod: corev1::Pod) {
    let mut cluster = MockClusterView::new();
    cluster
        .expect_namespaces_by_names()
        .returning(|_| vec![test_namespace(TEST_NAMESPACE.into())]);
    cluster.expect_pods_by_labels().returning(move |_, _| vec![test_pod.clone()]);
    cluster.expect_node_for_pod().returning(|_, _| TEST_NODE.into());

    let engine = engine_with(POD_MONITOR_YAML, initialized(cluster));
    engine.reconcile();

    let id = engine.ready_targets()[0].id.clone();

    engine.note_scrape_failure(&id);
    engine.note_scrape_failure(&id);
    let target = engine.get_target(&id).unwrap();
    assert_eq!(target.state, TargetState::Error);
    assert_eq!(target.retry_count, 2);

    // Error targets stay in the rotation and survive rediscovery
    engine.reconcile();
    let target = engine.get_target(&id).unwrap();
    assert_eq!(target.state, TargetState::Error);
    assert_eq!(target.retry_count, 2);
    assert!(engine.ready_targets().iter().any(|t| t.id == id));

    engine.note_scrape_success(&id);
    let target = engine.get_target(&id).unwrap();
    assert_eq!(target.state, TargetState::Ready);
    assert_eq!(target.retry_count, 0);
}

#[rstest]
fn test_vanished_pod_evicts_target(test_pod: corev1::Pod) {
    let mut cluster = MockClusterView::new();
    cluster
        .expect_namespaces_by_names()
        .returning(|_| vec![test_namespace(TEST_NAMESPACE.into())]);
    cluster
        .expect_pods_by_labels()
        .times(1)
        .returning(move |_, _| vec![test_pod.clone()]);
    cluster.expect_pods_by_labels().returning(|_, _| vec![]);
    cluster.expect_node_for_pod().returning(|_, _| TEST_NODE.into());

    let engine = engine_with(POD_MONITOR_YAML, initialized(cluster));
    engine.reconcile();
    assert_eq!(engine.target_count(), 1);

    // next cycle the pod is gone
    engine.reconcile();
    assert_eq!(engine.target_count(), 0);
    assert!(engine.ready_targets().is_empty());
}

#[rstest]
fn test_not_ready_address_becomes_ready(test_endpoints: corev1::Endpoints) {
    let mut first = test_endpoints.clone();
    let subset = &mut first.subsets.as_mut().unwrap()[0];
    subset.not_ready_addresses = subset.addresses.take();

    let ready_eps = {
        let mut eps = test_endpoints.clone();
        eps.subsets.as_mut().unwrap()[0].not_ready_addresses = None;
        eps
    };

    let mut cluster = MockClusterView::new();
    cluster
        .expect_namespaces_by_names()
        .returning(|_| vec![test_namespace(TEST_NAMESPACE.into())]);
    cluster
        .expect_services_by_labels()
        .returning(|_, _| vec![test_service(TEST_SERVICE.into())]);
    cluster
        .expect_endpoints_for_service()
        .times(1)
        .returning(move |_, _| Some(first.clone()));
    cluster
        .expect_endpoints_for_service()
        .returning(move |_, _| Some(ready_eps.clone()));

    let engine = engine_with(SERVICE_MONITOR_YAML, initialized(cluster));
    engine.reconcile();

    let nr_id = format!("svcs-{TEST_NAMESPACE}-{TEST_SERVICE}-{TEST_PORT_NAME}-0-nr-0");
    assert_eq!(engine.get_target(&nr_id).unwrap().state, TargetState::Pending);
    // Pending targets are not handed to the scheduler
    assert!(engine.ready_targets().is_empty());

    // the address moves to the ready list: the -nr- id disappears and the
    // ready-form id takes its place
    engine.reconcile();

    let ready_id = format!("svcs-{TEST_NAMESPACE}-{TEST_SERVICE}-{TEST_PORT_NAME}-0-0");
    assert_none!(engine.get_target(&nr_id));
    assert_eq!(engine.get_target(&ready_id).unwrap().state, TargetState::Ready);
}

#[rstest]
fn test_config_change_updates_interval() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.child(SCRAPE_CONFIG_FILE_NAME);
    file.write_str(POD_MONITOR_YAML).unwrap();

    let store = Arc::new(ConfigStore::from_file(file.path()).unwrap());
    let mut cluster = MockClusterView::new();
    cluster.expect_is_initialized().returning(|| true);
    cluster
        .expect_namespaces_by_names()
        .returning(|_| vec![test_namespace(TEST_NAMESPACE.into())]);
    cluster.expect_pods_by_labels().returning(|_, _| vec![test_pod(TEST_POD.into())]);
    cluster.expect_node_for_pod().returning(|_, _| TEST_NODE.into());

    let engine = DiscoveryEngine::new_with_clock(store, Arc::new(cluster), MockUtcClock::boxed(TEST_NOW));
    engine.reconcile();

    let id = engine.ready_targets()[0].id.clone();
    assert_eq!(
        engine.get_target(&id).unwrap().metadata.interval,
        std::time::Duration::from_secs(15)
    );

    // shrink the endpoint interval and re-discover: same id, new interval
    file.write_str(&POD_MONITOR_YAML.replace("interval: 15s", "interval: 5s")).unwrap();
    engine.reconcile();

    let target = engine.get_target(&id).unwrap();
    assert_eq!(target.metadata.interval, std::time::Duration::from_secs(5));
}
