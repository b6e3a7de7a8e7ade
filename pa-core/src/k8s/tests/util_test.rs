use std::collections::BTreeMap;

use super::*;

#[rstest]
fn test_namespaced_name(test_pod: corev1::Pod) {
    assert_eq!(test_pod.namespaced_name(), format!("{TEST_NAMESPACE}/{TEST_POD}"));
}

#[rstest]
fn test_labels_match(test_pod: corev1::Pod) {
    assert!(test_pod.labels_match(&BTreeMap::new()));
    assert!(test_pod.labels_match(&app_labels()));

    let mismatched = BTreeMap::from([("app".to_string(), "apache".to_string())]);
    assert!(!test_pod.labels_match(&mismatched));

    let extra = BTreeMap::from([
        ("app".to_string(), "nginx".to_string()),
        ("tier".to_string(), "web".to_string()),
    ]);
    assert!(!test_pod.labels_match(&extra));
}

#[rstest]
#[case::with_port("10.0.0.1:9100", "10.0.0.1", Some(9100))]
#[case::no_port("10.0.0.1", "10.0.0.1", None)]
#[case::hostname("node-exporter.monitoring:9100", "node-exporter.monitoring", Some(9100))]
#[case::bad_port("10.0.0.1:http", "10.0.0.1:http", None)]
fn test_split_host_port(#[case] input: &str, #[case] host: &str, #[case] port: Option<u16>) {
    assert_eq!(split_host_port(input), (host.to_string(), port));
}
