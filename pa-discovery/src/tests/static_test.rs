use url::Url;

use super::*;

#[rstest]
fn test_static_expansion() {
    let store = store_from(STATIC_TARGETS_YAML);
    let decl = decl_from(STATIC_TARGETS_YAML);
    let cluster = MockClusterView::new();
    let ctx = DiscoveryContext { cluster: &cluster, config: &store, now: TEST_NOW };

    let targets = StaticEndpointsReconciler.expand(&decl, &ctx);

    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0].id, "api-static-0");
    assert_eq!(targets[1].id, "api-static-1");
    assert_eq!(targets[0].url, "http://10.0.0.1:9100/metrics");
    assert_eq!(targets[1].url, "http://10.0.0.2:9100/metrics");

    for target in &targets {
        assert_eq!(target.state, TargetState::Ready);
        assert_eq!(target.labels.get(JOB_LABEL_KEY).map(String::as_str), Some("api"));
        assert_eq!(target.labels.get(INSTANCE_LABEL_KEY), Some(&target.url));
        assert_eq!(target.last_seen, TEST_NOW);
    }
}

#[rstest]
fn test_static_urls_are_complete() {
    let store = store_from(STATIC_TARGETS_YAML);
    let decl = decl_from(STATIC_TARGETS_YAML);
    let cluster = MockClusterView::new();
    let ctx = DiscoveryContext { cluster: &cluster, config: &store, now: TEST_NOW };

    for target in StaticEndpointsReconciler.expand(&decl, &ctx) {
        let url = Url::parse(&target.url).unwrap();
        assert!(!url.path().is_empty());
        assert!(!url.path().contains("/metrics/metrics"));
    }
}

#[rstest]
fn test_static_scheme_defaults_to_https_with_tls() {
    let decl = decl_from(
        "
features:
  openAgent:
    targets:
      - targetName: secure
        type: StaticEndpoints
        addresses:
          - 10.0.0.1:9100
        tlsConfig:
          insecureSkipVerify: true
",
    );
    let store = store_from(STATIC_TARGETS_YAML);
    let cluster = MockClusterView::new();
    let ctx = DiscoveryContext { cluster: &cluster, config: &store, now: TEST_NOW };

    let targets = StaticEndpointsReconciler.expand(&decl, &ctx);
    assert_eq!(targets[0].metadata.scheme, "https");
    assert!(targets[0].url.starts_with("https://"));
}

#[rstest]
fn test_static_path_falls_back_to_global() {
    let decl = decl_from(
        "
features:
  openAgent:
    targets:
      - targetName: bare
        type: StaticEndpoints
        addresses:
          - 10.0.0.1:9100
",
    );
    // globalPath comes from the surrounding document
    let store = store_from(STATIC_TARGETS_YAML);
    let cluster = MockClusterView::new();
    let ctx = DiscoveryContext { cluster: &cluster, config: &store, now: TEST_NOW };

    let targets = StaticEndpointsReconciler.expand(&decl, &ctx);
    assert_eq!(targets[0].url, "http://10.0.0.1:9100/metrics");
}
