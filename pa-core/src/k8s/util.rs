use std::collections::BTreeMap;

use super::*;
use crate::prelude::*;

impl<T: kube::Resource> KubeResourceExt for T {
    fn namespaced_name(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}", ns, self.name_any()),
            None => self.name_any().clone(),
        }
    }

    // Target declarations only carry match-labels selectors; an empty selector
    // matches everything, which mirrors the apiserver's behavior.
    fn labels_match(&self, selector: &BTreeMap<String, String>) -> bool {
        selector.iter().all(|(k, v)| self.labels().get(k) == Some(v))
    }
}

pub fn split_host_port(address: &str) -> (String, Option<u16>) {
    match address.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(p) => (host.into(), Some(p)),
            Err(_) => (address.into(), None),
        },
        None => (address.into(), None),
    }
}
