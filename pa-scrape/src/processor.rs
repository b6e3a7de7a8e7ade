use pa_core::prelude::*;
use pa_discovery::Target;

use crate::expfmt::parse_body;
use crate::relabel::apply_rules;
use crate::sample::ScrapeBatch;

// Turns one raw scrape body into the batch handed to the sender: parse, apply
// the target's relabel rules, enrich, and drop anything non-finite.
pub fn process_batch(target: &Target, body: &str, collected_at_ms: i64) -> ScrapeBatch {
    let parsed = parse_body(body, collected_at_ms);

    let mut samples = Vec::with_capacity(parsed.samples.len());
    for sample in parsed.samples {
        let Some(mut sample) = apply_rules(&target.metadata.relabel_rules, sample) else {
            continue;
        };

        if !sample.labels.contains(INSTANCE_LABEL_KEY) {
            sample.labels.set(INSTANCE_LABEL_KEY, &target.url);
        }
        if target.metadata.add_node_label
            && let Some(node) = &target.metadata.node_name
            && !sample.labels.contains(NODE_LABEL_KEY)
        {
            sample.labels.set(NODE_LABEL_KEY, node);
        }

        // NaN and the infinities never leave the agent
        if !sample.value.is_finite() {
            continue;
        }
        samples.push(sample);
    }

    ScrapeBatch {
        target_url: target.url.clone(),
        collected_at_ms,
        samples,
        metadata: parsed.metadata,
    }
}
