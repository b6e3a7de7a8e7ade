mod engine_test;
mod static_test;

use std::sync::Arc;

use pa_core::config::{
    ConfigStore,
    TargetDecl,
    parse_document,
};
use pa_core::k8s::MockClusterView;
use pa_core::prelude::*;
use pa_testutils::*;

use super::*;
use crate::reconcilers::*;

const TEST_NOW: i64 = 1234;

fn store_from(yaml: &str) -> ConfigStore {
    ConfigStore::fixed(parse_document(yaml).unwrap())
}

fn decl_from(yaml: &str) -> TargetDecl {
    parse_document(yaml).unwrap().targets.swap_remove(0)
}
