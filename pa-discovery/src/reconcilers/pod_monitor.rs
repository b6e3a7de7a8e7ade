use pa_core::config::{
    PortSpec,
    TargetDecl,
    TargetKind,
};
use pa_core::prelude::*;
use tracing::*;

use super::*;
use crate::{
    ScrapeMeta,
    Target,
    TargetState,
};

// Expands a PodMonitor declaration: resolve namespaces by name, select pods
// by label, then match each declared endpoint port against the pods'
// container ports (names first, numbers second).
pub(crate) struct PodMonitorReconciler;

impl Reconciler for PodMonitorReconciler {
    fn handles(&self, decl: &TargetDecl) -> bool {
        decl.kind == TargetKind::PodMonitor
    }

    fn expand(&self, decl: &TargetDecl, ctx: &DiscoveryContext) -> Vec<Target> {
        let mut targets = vec![];

        for namespace in ctx.cluster.namespaces_by_names(&decl.namespace_selector.match_names) {
            let ns_name = namespace.name_any();

            for pod in ctx.cluster.pods_by_labels(&ns_name, &decl.selector.match_labels) {
                // A pod with no IP is not scrapable yet; it will show up in a
                // later cycle once the kubelet has reported one.
                let Some(pod_ip) = pod
                    .status
                    .as_ref()
                    .and_then(|s| s.pod_ip.clone())
                    .filter(|ip| !ip.is_empty())
                else {
                    debug!("pod {}/{} has no IP yet, skipping", ns_name, pod.name_any());
                    continue;
                };

                let pod_name = pod.name_any();
                let node_name = Some(ctx.cluster.node_for_pod(&pod_name, &ns_name)).filter(|n| !n.is_empty());

                for (endpoint_idx, endpoint) in decl.endpoints.iter().enumerate() {
                    let Some(port_spec) = endpoint.port.as_ref() else {
                        continue;
                    };
                    let Some(port) = match_container_port(&pod, port_spec) else {
                        continue;
                    };

                    let tls = endpoint.tls_config.clone().or_else(|| decl.tls_config.clone());
                    let scheme = resolve_scheme(
                        endpoint.scheme.as_deref().or(decl.scheme.as_deref()),
                        tls.as_ref(),
                        None,
                    );
                    let path = resolve_path(endpoint.path.as_deref().or(decl.path.as_deref()), ctx.config);
                    let url = format!("{scheme}://{pod_ip}:{port}{path}");

                    let mut labels = decl.labels.clone();
                    labels.insert(JOB_LABEL_KEY.into(), decl.target_name.clone());
                    labels.insert(NAMESPACE_LABEL_KEY.into(), ns_name.clone());
                    labels.insert(POD_LABEL_KEY.into(), pod_name.clone());
                    labels.insert(INSTANCE_LABEL_KEY.into(), url.clone());

                    targets.push(Target {
                        id: format!(
                            "{}-{}-{}-{}-{}",
                            decl.target_name,
                            ns_name,
                            pod_name,
                            port_spec.descriptor(),
                            endpoint_idx
                        ),
                        url,
                        state: TargetState::Ready,
                        labels,
                        metadata: ScrapeMeta {
                            scheme,
                            tls,
                            path,
                            interval: resolve_interval(Some(endpoint), decl, ctx.config),
                            timeout: resolve_timeout(Some(endpoint), decl),
                            relabel_rules: resolve_relabel_rules(Some(endpoint), decl),
                            params: endpoint.params.clone(),
                            add_node_label: endpoint.add_node_label,
                            node_name: node_name.clone(),
                            port: Some(port_spec.descriptor()),
                        },
                        last_seen: ctx.now,
                        retry_count: 0,
                    });
                }
            }
        }

        targets
    }
}

// Port names take precedence over numeric values so that a declaration like
// port: 9100 can't shadow a same-named container port elsewhere in the pod.
fn match_container_port(pod: &corev1::Pod, spec: &PortSpec) -> Option<i32> {
    let containers = &pod.spec.as_ref()?.containers;

    if let PortSpec::Name(name) = spec {
        for container in containers {
            for port in container.ports.iter().flatten() {
                if port.name.as_deref() == Some(name) {
                    return Some(port.container_port);
                }
            }
        }
    }

    if let PortSpec::Number(number) = spec {
        for container in containers {
            for port in container.ports.iter().flatten() {
                if port.container_port == i32::from(*number) {
                    return Some(port.container_port);
                }
            }
        }
    }

    None
}
