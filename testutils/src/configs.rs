// Canonical configuration documents used across the crates' tests.

pub const STATIC_TARGETS_YAML: &str = r#"
features:
  openAgent:
    enabled: true
    globalInterval: 60s
    globalPath: /metrics
    scrapingInterval: 30s
    maxConcurrency: 4
    targets:
      - targetName: api
        type: StaticEndpoints
        addresses:
          - 10.0.0.1:9100
          - 10.0.0.2:9100
        path: /metrics
        scheme: http
"#;

pub const POD_MONITOR_YAML: &str = r#"
features:
  openAgent:
    enabled: true
    targets:
      - targetName: pods
        type: PodMonitor
        namespaceSelector:
          matchNames:
            - test-namespace
        selector:
          matchLabels:
            app: nginx
        endpoints:
          - port: metrics
            path: /metrics
            interval: 15s
            addNodeLabel: true
"#;

pub const SERVICE_MONITOR_YAML: &str = r#"
features:
  openAgent:
    enabled: true
    targets:
      - targetName: svcs
        type: ServiceMonitor
        namespaceSelector:
          matchNames:
            - test-namespace
        selector:
          matchLabels:
            app: nginx
        endpoints:
          - port: metrics
            path: /metrics
"#;

pub const RELABEL_YAML: &str = r#"
features:
  openAgent:
    targets:
      - targetName: api
        type: StaticEndpoints
        addresses:
          - 10.0.0.1:9100
        path: /metrics
        metric_relabel_configs:
          - source_labels: [__name__]
            regex: apiserver_request_total
            action: keep
"#;
