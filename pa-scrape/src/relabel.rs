use pa_core::prelude::METRIC_NAME_LABEL;
use pa_core::relabel::{
    RelabelAction,
    RelabelRule,
};

use crate::sample::MetricSample;

// Applies one target's metric_relabel_configs to a sample, in declared order.
// Returns None when a keep/drop rule eliminates the sample; all later rules
// see the label set as rewritten by the earlier ones.
pub fn apply_rules(rules: &[RelabelRule], mut sample: MetricSample) -> Option<MetricSample> {
    for rule in rules {
        if !apply_rule(rule, &mut sample) {
            return None;
        }
    }
    Some(sample)
}

fn apply_rule(rule: &RelabelRule, sample: &mut MetricSample) -> bool {
    match rule.action {
        // The name-based actions ignore source_labels entirely and test the
        // regex against each label name instead.
        RelabelAction::LabelMap => {
            let mapped: Vec<(String, String)> = sample
                .labels
                .iter()
                .filter_map(|l| {
                    rule.regex.captures(&l.name).map(|caps| {
                        let mut new_name = String::new();
                        caps.expand(&rule.replacement, &mut new_name);
                        (new_name, l.value.clone())
                    })
                })
                .collect();
            for (name, value) in mapped {
                if !name.is_empty() {
                    sample.labels.set(&name, &value);
                }
            }
            true
        },
        RelabelAction::LabelDrop => {
            sample.labels.retain(|l| !rule.regex.is_match(&l.name));
            true
        },
        RelabelAction::LabelKeep => {
            sample.labels.retain(|l| rule.regex.is_match(&l.name));
            true
        },

        // Everything else matches against the joined source label values;
        // missing labels contribute the empty string.
        _ => {
            let input = rule
                .source_labels
                .iter()
                .map(|name| source_value(sample, name))
                .collect::<Vec<_>>()
                .join(&rule.separator);

            let Some(caps) = rule.regex.captures(&input) else {
                // no match: keep drops the sample, drop keeps it, everything
                // else is a no-op
                return rule.action != RelabelAction::Keep;
            };

            match rule.action {
                RelabelAction::Keep => true,
                RelabelAction::Drop => false,
                RelabelAction::Replace => {
                    if !rule.target_label.is_empty() {
                        let mut replaced = String::new();
                        caps.expand(&rule.replacement, &mut replaced);
                        write_label(sample, &rule.target_label, &replaced);
                    }
                    true
                },
                RelabelAction::HashMod => {
                    if rule.modulus > 0 && !rule.target_label.is_empty() {
                        let hashed = fnv1a64(input.as_bytes()) % rule.modulus;
                        write_label(sample, &rule.target_label, &hashed.to_string());
                    }
                    true
                },
                // name-based actions are handled above
                _ => true,
            }
        },
    }
}

// `__name__` reads and writes resolve to the sample's metric name
fn source_value(sample: &MetricSample, name: &str) -> String {
    if name == METRIC_NAME_LABEL {
        sample.metric.clone()
    } else {
        sample.labels.get(name).unwrap_or("").to_string()
    }
}

// An empty replacement removes the target label
fn write_label(sample: &mut MetricSample, name: &str, value: &str) {
    if name == METRIC_NAME_LABEL {
        if !value.is_empty() {
            sample.metric = value.into();
        }
    } else if value.is_empty() {
        sample.labels.remove(name);
    } else {
        sample.labels.set(name, value);
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
