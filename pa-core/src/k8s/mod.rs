mod cache;
mod util;

use std::collections::BTreeMap;

pub use cache::*;
pub use util::*;

pub trait KubeResourceExt {
    fn namespaced_name(&self) -> String;
    fn labels_match(&self, selector: &BTreeMap<String, String>) -> bool;
}

#[cfg(test)]
mod tests;
