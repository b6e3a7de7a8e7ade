use pa_core::config::{
    TargetDecl,
    TargetKind,
};
use pa_core::prelude::*;

use super::*;
use crate::{
    ScrapeMeta,
    Target,
    TargetState,
};

// Static address lists need no cluster state at all: every address becomes a
// Ready target, and the index in the list pins the id.
pub(crate) struct StaticEndpointsReconciler;

impl Reconciler for StaticEndpointsReconciler {
    fn handles(&self, decl: &TargetDecl) -> bool {
        decl.kind == TargetKind::StaticEndpoints
    }

    fn expand(&self, decl: &TargetDecl, ctx: &DiscoveryContext) -> Vec<Target> {
        let scheme = resolve_scheme(decl.scheme.as_deref(), decl.tls_config.as_ref(), None);
        let path = resolve_path(decl.path.as_deref(), ctx.config);

        decl.addresses
            .iter()
            .enumerate()
            .map(|(idx, address)| {
                let url = format!("{scheme}://{address}{path}");

                let mut labels = decl.labels.clone();
                labels.insert(JOB_LABEL_KEY.into(), decl.target_name.clone());
                labels.insert(INSTANCE_LABEL_KEY.into(), url.clone());

                Target {
                    id: format!("{}-static-{idx}", decl.target_name),
                    url,
                    state: TargetState::Ready,
                    labels,
                    metadata: ScrapeMeta {
                        scheme: scheme.clone(),
                        tls: decl.tls_config.clone(),
                        path: path.clone(),
                        interval: resolve_interval(None, decl, ctx.config),
                        timeout: resolve_timeout(None, decl),
                        relabel_rules: decl.metric_relabel_configs.clone(),
                        params: decl.params.clone(),
                        add_node_label: false,
                        node_name: None,
                        port: None,
                    },
                    last_seen: ctx.now,
                    retry_count: 0,
                }
            })
            .collect()
    }
}
