use std::collections::{
    BTreeMap,
    HashMap,
};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::de::Deserializer;

use crate::errors::*;
use crate::k8s::split_host_port;
use crate::relabel::{
    self,
    RelabelRule,
};

// The on-disk/ConfigMap document: everything we care about hangs off a
// features.openAgent block; unrelated feature blocks are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub features: Features,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    #[serde(default)]
    pub open_agent: OpenAgentConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAgentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, deserialize_with = "de_duration_opt")]
    pub global_interval: Option<Duration>,

    #[serde(default)]
    pub global_path: Option<String>,

    #[serde(default, deserialize_with = "de_duration_opt")]
    pub scraping_interval: Option<Duration>,

    #[serde(default)]
    pub max_concurrency: Option<usize>,

    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub targets: Vec<TargetDecl>,
}

impl Default for OpenAgentConfig {
    fn default() -> Self {
        OpenAgentConfig {
            enabled: true,
            global_interval: None,
            global_path: None,
            scraping_interval: None,
            max_concurrency: None,
            debug: false,
            targets: vec![],
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
pub enum TargetKind {
    PodMonitor,
    ServiceMonitor,
    StaticEndpoints,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDecl {
    pub target_name: String,

    #[serde(rename = "type")]
    pub kind: TargetKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    // dynamic (PodMonitor/ServiceMonitor) fields
    #[serde(default)]
    pub namespace_selector: NamespaceSelector,

    #[serde(default)]
    pub selector: LabelSelector,

    #[serde(default)]
    pub endpoints: Vec<EndpointDecl>,

    // static fields
    #[serde(default)]
    pub addresses: Vec<String>,

    #[serde(default)]
    pub scheme: Option<String>,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default, deserialize_with = "de_duration_opt")]
    pub interval: Option<Duration>,

    #[serde(default, deserialize_with = "de_duration_opt")]
    pub timeout: Option<Duration>,

    #[serde(default)]
    pub tls_config: Option<TlsConfig>,

    #[serde(
        default = "relabel::no_rules",
        rename = "metric_relabel_configs",
        deserialize_with = "relabel::deserialize_compiled"
    )]
    pub metric_relabel_configs: Arc<Vec<RelabelRule>>,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub params: HashMap<String, Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSelector {
    #[serde(default)]
    pub match_names: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDecl {
    #[serde(default)]
    pub port: Option<PortSpec>,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub scheme: Option<String>,

    #[serde(default, deserialize_with = "de_duration_opt")]
    pub interval: Option<Duration>,

    #[serde(default, deserialize_with = "de_duration_opt")]
    pub timeout: Option<Duration>,

    #[serde(default)]
    pub params: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub tls_config: Option<TlsConfig>,

    #[serde(
        default = "relabel::no_rules",
        rename = "metric_relabel_configs",
        deserialize_with = "relabel::deserialize_compiled"
    )]
    pub metric_relabel_configs: Arc<Vec<RelabelRule>>,

    #[serde(default)]
    pub add_node_label: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    #[serde(default)]
    pub insecure_skip_verify: bool,

    #[serde(default)]
    pub ca_file: Option<String>,
}

// A declared port can name a container/subset port or give its number
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum PortSpec {
    Number(u16),
    Name(String),
}

impl PortSpec {
    pub fn matches(&self, name: Option<&str>, number: i32) -> bool {
        match self {
            PortSpec::Number(n) => i32::from(*n) == number,
            PortSpec::Name(s) => name == Some(s.as_str()),
        }
    }

    // Stable port descriptor used in target ids
    pub fn descriptor(&self) -> String {
        match self {
            PortSpec::Number(n) => n.to_string(),
            PortSpec::Name(s) => s.clone(),
        }
    }
}

impl OpenAgentConfig {
    pub fn validate(&self) -> EmptyResult {
        for (i, target) in self.targets.iter().enumerate() {
            target
                .validate()
                .map_err(|e| anyhow!("targets[{i}] ({}): {e}", target.target_name))?;
        }
        Ok(())
    }
}

impl TargetDecl {
    fn validate(&self) -> EmptyResult {
        ensure!(!self.target_name.is_empty(), "targetName must not be empty");

        if self.kind == TargetKind::StaticEndpoints {
            ensure!(!self.addresses.is_empty(), "StaticEndpoints targets need at least one address");
            for addr in &self.addresses {
                ensure!(
                    split_host_port(addr).1.is_some(),
                    "address {addr:?} must be of the form host:port"
                );
            }
        }

        for name in self.labels.keys() {
            ensure!(is_valid_label_name(name), "{name:?} is not a valid Prometheus label name");
        }
        Ok(())
    }
}

/// Validates that a string is a legal Prometheus label name: `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn is_valid_label_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        None => false,
        Some(c) => {
            (c.is_ascii_alphabetic() || c == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        },
    }
}

fn default_true() -> bool {
    true
}

// Durations are written humantime-style in the document ("15s", "2m")
fn de_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let maybe_str = Option::<String>::deserialize(deserializer)?;
    maybe_str
        .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}
