use pa_core::config::{
    EndpointDecl,
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

// Expands a ServiceMonitor declaration by walking the Endpoints objects
// backing each selected service.  Ready subset addresses become Ready
// targets; notReadyAddresses become Pending ones, with the `-nr-` infix in
// the id so the two generations never collide.
pub(crate) struct ServiceMonitorReconciler;

impl Reconciler for ServiceMonitorReconciler {
    fn handles(&self, decl: &TargetDecl) -> bool {
        decl.kind == TargetKind::ServiceMonitor
    }

    fn expand(&self, decl: &TargetDecl, ctx: &DiscoveryContext) -> Vec<Target> {
        let mut targets = vec![];

        for namespace in ctx.cluster.namespaces_by_names(&decl.namespace_selector.match_names) {
            let ns_name = namespace.name_any();

            for service in ctx.cluster.services_by_labels(&ns_name, &decl.selector.match_labels) {
                let svc_name = service.name_any();
                let Some(endpoints) = ctx.cluster.endpoints_for_service(&ns_name, &svc_name) else {
                    debug!("no endpoints object for service {ns_name}/{svc_name} yet");
                    continue;
                };

                for (subset_idx, subset) in endpoints.subsets.iter().flatten().enumerate() {
                    for endpoint in &decl.endpoints {
                        let Some(port_spec) = endpoint.port.as_ref() else {
                            continue;
                        };
                        let Some(subset_port) = subset
                            .ports
                            .iter()
                            .flatten()
                            .find(|p| port_spec.matches(p.name.as_deref(), p.port))
                        else {
                            continue;
                        };

                        for (addr_idx, address) in subset.addresses.iter().flatten().enumerate() {
                            targets.push(build_target(
                                decl,
                                ctx,
                                endpoint,
                                &ns_name,
                                &svc_name,
                                subset_port,
                                address,
                                TargetState::Ready,
                                format!(
                                    "{}-{}-{}-{}-{}-{}",
                                    decl.target_name,
                                    ns_name,
                                    svc_name,
                                    port_spec.descriptor(),
                                    subset_idx,
                                    addr_idx
                                ),
                            ));
                        }

                        for (addr_idx, address) in subset.not_ready_addresses.iter().flatten().enumerate() {
                            targets.push(build_target(
                                decl,
                                ctx,
                                endpoint,
                                &ns_name,
                                &svc_name,
                                subset_port,
                                address,
                                TargetState::Pending,
                                format!(
                                    "{}-{}-{}-{}-{}-nr-{}",
                                    decl.target_name,
                                    ns_name,
                                    svc_name,
                                    port_spec.descriptor(),
                                    subset_idx,
                                    addr_idx
                                ),
                            ));
                        }
                    }
                }
            }
        }

        targets
    }
}

#[allow(clippy::too_many_arguments)]
fn build_target(
    decl: &TargetDecl,
    ctx: &DiscoveryContext,
    endpoint: &EndpointDecl,
    ns_name: &str,
    svc_name: &str,
    subset_port: &corev1::EndpointPort,
    address: &corev1::EndpointAddress,
    state: TargetState,
    id: String,
) -> Target {
    let tls = endpoint.tls_config.clone().or_else(|| decl.tls_config.clone());
    let scheme = resolve_scheme(
        endpoint.scheme.as_deref().or(decl.scheme.as_deref()),
        tls.as_ref(),
        subset_port.name.as_deref(),
    );
    let path = resolve_path(endpoint.path.as_deref().or(decl.path.as_deref()), ctx.config);
    let url = format!("{scheme}://{}:{}{path}", address.ip, subset_port.port);

    let mut labels = decl.labels.clone();
    labels.insert(JOB_LABEL_KEY.into(), decl.target_name.clone());
    labels.insert(NAMESPACE_LABEL_KEY.into(), ns_name.into());
    labels.insert(SERVICE_LABEL_KEY.into(), svc_name.into());
    labels.insert(INSTANCE_LABEL_KEY.into(), url.clone());

    Target {
        id,
        url,
        state,
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
            node_name: address.node_name.clone().filter(|n| !n.is_empty()),
            port: Some(subset_port.port.to_string()),
        },
        last_seen: ctx.now,
        retry_count: 0,
    }
}
