mod pod_monitor;
mod service_monitor;
mod static_endpoints;

use std::sync::Arc;
use std::time::Duration;

use pa_core::config::{
    ConfigStore,
    EndpointDecl,
    TargetDecl,
    TlsConfig,
};
use pa_core::k8s::ClusterView;
use pa_core::prelude::*;
use pa_core::relabel::RelabelRule;
pub(crate) use pod_monitor::PodMonitorReconciler;
pub(crate) use service_monitor::ServiceMonitorReconciler;
pub(crate) use static_endpoints::StaticEndpointsReconciler;

// Everything a reconciler needs to expand one declaration during a cycle.
// The timestamp is pinned at the top of the cycle so that every target
// produced by it carries the same last_seen.
pub(crate) struct DiscoveryContext<'a> {
    pub(crate) cluster: &'a dyn ClusterView,
    pub(crate) config: &'a ConfigStore,
    pub(crate) now: i64,
}

// One reconciler per declaration type; adding a new type means adding an
// implementation and registering it with the engine, nothing else.
pub(crate) trait Reconciler {
    fn handles(&self, decl: &TargetDecl) -> bool;
    fn expand(&self, decl: &TargetDecl, ctx: &DiscoveryContext) -> Vec<crate::Target>;
}

// Scheme precedence: explicit declaration/endpoint scheme, then https when a
// TLS config is present, then https when the matched port is named "https",
// then plain http.
pub(crate) fn resolve_scheme(explicit: Option<&str>, tls: Option<&TlsConfig>, port_name: Option<&str>) -> String {
    if let Some(s) = explicit
        && !s.is_empty()
    {
        return s.into();
    }
    if tls.is_some() || port_name == Some(HTTPS_PORT_NAME) {
        return "https".into();
    }
    "http".into()
}

// The produced URL always contains the final scrape path; nothing downstream
// is allowed to append to it again.
pub(crate) fn resolve_path(explicit: Option<&str>, config: &ConfigStore) -> String {
    let path = match explicit {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => config.global_path(),
    };
    if path.starts_with('/') { path } else { format!("/{path}") }
}

// Endpoint interval, then declaration interval, then the global interval
pub(crate) fn resolve_interval(
    endpoint: Option<&EndpointDecl>,
    decl: &TargetDecl,
    config: &ConfigStore,
) -> Duration {
    endpoint
        .and_then(|e| e.interval)
        .or(decl.interval)
        .unwrap_or_else(|| config.global_interval())
}

pub(crate) fn resolve_timeout(endpoint: Option<&EndpointDecl>, decl: &TargetDecl) -> Duration {
    endpoint
        .and_then(|e| e.timeout)
        .or(decl.timeout)
        .unwrap_or(Duration::from_secs(DEFAULT_SCRAPE_TIMEOUT_SECONDS))
}

// Endpoint-level rules win over declaration-level ones when both are present
pub(crate) fn resolve_relabel_rules(endpoint: Option<&EndpointDecl>, decl: &TargetDecl) -> Arc<Vec<RelabelRule>> {
    match endpoint {
        Some(e) if !e.metric_relabel_configs.is_empty() => e.metric_relabel_configs.clone(),
        _ => decl.metric_relabel_configs.clone(),
    }
}
