use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

use futures::StreamExt;
use kube::runtime::reflector::Store;
use kube::runtime::{
    WatchStreamExt,
    reflector,
    watcher,
};
use serde::de::DeserializeOwned;
use tokio::task::JoinSet;
use tracing::*;

use crate::errors::*;
use crate::prelude::*;

// The discovery engine and the config store only ever see this trait; all of
// the queries are answered from informer-local stores, so none of them can
// block on the apiserver.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait ClusterView: Send + Sync {
    fn is_initialized(&self) -> bool;
    fn pods_by_labels(&self, namespace: &str, selector: &BTreeMap<String, String>) -> Vec<corev1::Pod>;
    fn services_by_labels(&self, namespace: &str, selector: &BTreeMap<String, String>) -> Vec<corev1::Service>;
    fn endpoints_for_service(&self, namespace: &str, service: &str) -> Option<corev1::Endpoints>;

    // An empty name list matches every namespace in the cluster
    fn namespaces_by_names(&self, names: &[String]) -> Vec<corev1::Namespace>;
    fn config_map(&self, namespace: &str, name: &str) -> Option<corev1::ConfigMap>;

    // Returns the empty string when the pod or its node is not (yet) known
    fn node_for_pod(&self, pod_name: &str, namespace: &str) -> String;
}

pub struct InformerCache {
    pods: Store<corev1::Pod>,
    services: Store<corev1::Service>,
    endpoints: Store<corev1::Endpoints>,
    namespaces: Store<corev1::Namespace>,
    nodes: Store<corev1::Node>,
    config_maps: Store<corev1::ConfigMap>,
}

impl InformerCache {
    // Spawns one watch task per resource kind into the caller's JoinSet and
    // blocks until every local store has completed its initial sync.
    pub async fn start(client: kube::Client, tasks: &mut JoinSet<()>) -> anyhow::Result<InformerCache> {
        let cache = InformerCache {
            pods: watch_resource(client.clone(), tasks),
            services: watch_resource(client.clone(), tasks),
            endpoints: watch_resource(client.clone(), tasks),
            namespaces: watch_resource(client.clone(), tasks),
            nodes: watch_resource(client.clone(), tasks),
            config_maps: watch_resource(client, tasks),
        };
        cache.wait_ready().await?;
        info!("informer caches synced");
        Ok(cache)
    }

    async fn wait_ready(&self) -> EmptyResult {
        wait_for(&self.pods).await?;
        wait_for(&self.services).await?;
        wait_for(&self.endpoints).await?;
        wait_for(&self.namespaces).await?;
        wait_for(&self.nodes).await?;
        wait_for(&self.config_maps).await
    }
}

impl ClusterView for InformerCache {
    fn is_initialized(&self) -> bool {
        true
    }

    fn pods_by_labels(&self, namespace: &str, selector: &BTreeMap<String, String>) -> Vec<corev1::Pod> {
        self.pods
            .state()
            .iter()
            .filter(|p| p.namespace().as_deref() == Some(namespace) && p.labels_match(selector))
            .map(|p| (**p).clone())
            .collect()
    }

    fn services_by_labels(&self, namespace: &str, selector: &BTreeMap<String, String>) -> Vec<corev1::Service> {
        self.services
            .state()
            .iter()
            .filter(|s| s.namespace().as_deref() == Some(namespace) && s.labels_match(selector))
            .map(|s| (**s).clone())
            .collect()
    }

    fn endpoints_for_service(&self, namespace: &str, service: &str) -> Option<corev1::Endpoints> {
        // An Endpoints object shares its name with the service it backs
        self.endpoints
            .state()
            .iter()
            .find(|e| e.namespace().as_deref() == Some(namespace) && e.name_any() == service)
            .map(|e| (**e).clone())
    }

    fn namespaces_by_names(&self, names: &[String]) -> Vec<corev1::Namespace> {
        self.namespaces
            .state()
            .iter()
            .filter(|ns| names.is_empty() || names.contains(&ns.name_any()))
            .map(|ns| (**ns).clone())
            .collect()
    }

    fn config_map(&self, namespace: &str, name: &str) -> Option<corev1::ConfigMap> {
        self.config_maps
            .state()
            .iter()
            .find(|cm| cm.namespace().as_deref() == Some(namespace) && cm.name_any() == name)
            .map(|cm| (**cm).clone())
    }

    fn node_for_pod(&self, pod_name: &str, namespace: &str) -> String {
        let Some(node_name) = self
            .pods
            .state()
            .iter()
            .find(|p| p.namespace().as_deref() == Some(namespace) && p.name_any() == pod_name)
            .and_then(|p| p.spec.as_ref()?.node_name.clone())
        else {
            return String::new();
        };

        // A node name we can't resolve in the node cache counts as unknown;
        // the cache may just be lagging, in which case the next discovery
        // cycle picks it up.
        if self.nodes.state().iter().any(|n| n.name_any() == node_name) {
            node_name
        } else {
            debug!("node {node_name} for pod {namespace}/{pod_name} not in cache yet");
            String::new()
        }
    }
}

// A stand-in for clusterless (standalone) operation: every dynamic query
// resolves empty, and discovery can tell why via is_initialized.
#[derive(Clone, Copy, Debug, Default)]
pub struct UninitializedCluster;

impl ClusterView for UninitializedCluster {
    fn is_initialized(&self) -> bool {
        false
    }

    fn pods_by_labels(&self, _: &str, _: &BTreeMap<String, String>) -> Vec<corev1::Pod> {
        vec![]
    }

    fn services_by_labels(&self, _: &str, _: &BTreeMap<String, String>) -> Vec<corev1::Service> {
        vec![]
    }

    fn endpoints_for_service(&self, _: &str, _: &str) -> Option<corev1::Endpoints> {
        None
    }

    fn namespaces_by_names(&self, _: &[String]) -> Vec<corev1::Namespace> {
        vec![]
    }

    fn config_map(&self, _: &str, _: &str) -> Option<corev1::ConfigMap> {
        None
    }

    fn node_for_pod(&self, _: &str, _: &str) -> String {
        String::new()
    }
}

fn watch_resource<K>(client: kube::Client, tasks: &mut JoinSet<()>) -> Store<K>
where
    K: kube::Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Clone + Default + Eq + Hash,
{
    let api = kube::Api::<K>::all(client);
    let (reader, writer) = reflector::store();
    let mut stream = watcher(api, Default::default())
        .default_backoff()
        .reflect(writer)
        .applied_objects()
        .boxed();

    tasks.spawn(async move {
        while let Some(ev) = stream.next().await {
            if let Err(err) = ev {
                warn!("watch stream error: {err}");
            }
        }
    });

    reader
}

async fn wait_for<K>(store: &Store<K>) -> EmptyResult
where
    K: kube::Resource + Clone + 'static,
    K::DynamicType: Clone + Default + Eq + Hash,
{
    store
        .wait_until_ready()
        .await
        .map_err(|e| anyhow!(KubernetesError::CacheSyncFailed(e.to_string())))
}
