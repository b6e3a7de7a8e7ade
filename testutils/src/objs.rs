use std::collections::BTreeMap;

use pa_core::prelude::*;
use rstest::fixture;

use crate::constants::*;

pub fn app_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(TEST_APP_LABEL.0.into(), TEST_APP_LABEL.1.into())])
}

#[fixture]
pub fn test_pod(#[default(TEST_POD.into())] name: String) -> corev1::Pod {
    corev1::Pod {
        metadata: metav1::ObjectMeta {
            namespace: Some(TEST_NAMESPACE.into()),
            name: Some(name),
            labels: Some(app_labels()),
            ..Default::default()
        },
        spec: Some(corev1::PodSpec {
            node_name: Some(TEST_NODE.into()),
            containers: vec![corev1::Container {
                name: "main".into(),
                ports: Some(vec![
                    corev1::ContainerPort {
                        name: Some(TEST_PORT_NAME.into()),
                        container_port: TEST_PORT,
                        ..Default::default()
                    },
                    corev1::ContainerPort { container_port: 8080, ..Default::default() },
                ]),
                ..Default::default()
            }],
            ..Default::default()
        }),
        status: Some(corev1::PodStatus { pod_ip: Some(TEST_POD_IP.into()), ..Default::default() }),
    }
}

#[fixture]
pub fn test_service(#[default(TEST_SERVICE.into())] name: String) -> corev1::Service {
    corev1::Service {
        metadata: metav1::ObjectMeta {
            namespace: Some(TEST_NAMESPACE.into()),
            name: Some(name),
            labels: Some(app_labels()),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[fixture]
pub fn test_endpoints(#[default(TEST_SERVICE.into())] name: String) -> corev1::Endpoints {
    corev1::Endpoints {
        metadata: metav1::ObjectMeta {
            namespace: Some(TEST_NAMESPACE.into()),
            name: Some(name),
            ..Default::default()
        },
        subsets: Some(vec![corev1::EndpointSubset {
            addresses: Some(vec![corev1::EndpointAddress {
                ip: TEST_POD_IP.into(),
                node_name: Some(TEST_NODE.into()),
                ..Default::default()
            }]),
            not_ready_addresses: Some(vec![corev1::EndpointAddress {
                ip: TEST_NOT_READY_IP.into(),
                ..Default::default()
            }]),
            ports: Some(vec![corev1::EndpointPort {
                name: Some(TEST_PORT_NAME.into()),
                port: TEST_PORT,
                ..Default::default()
            }]),
        }]),
    }
}

#[fixture]
pub fn test_namespace(#[default(TEST_NAMESPACE.into())] name: String) -> corev1::Namespace {
    corev1::Namespace {
        metadata: metav1::ObjectMeta { name: Some(name), ..Default::default() },
        ..Default::default()
    }
}

pub fn test_config_map(namespace: &str, name: &str, key: &str, body: &str) -> corev1::ConfigMap {
    corev1::ConfigMap {
        metadata: metav1::ObjectMeta {
            namespace: Some(namespace.into()),
            name: Some(name.into()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(key.into(), body.into())])),
        ..Default::default()
    }
}
