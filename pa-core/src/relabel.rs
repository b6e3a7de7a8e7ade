use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use serde::de::Deserializer;
use tracing::*;

const DEFAULT_SEPARATOR: &str = ";";
const DEFAULT_REGEX: &str = ".+";
const DEFAULT_REPLACEMENT: &str = "$1";

// The wire-level shape of one metric_relabel_configs entry, Prometheus field
// names and defaults.  This is only an intermediate form; rules are compiled
// into RelabelRule at configuration load so that no regex is ever built on the
// scrape path.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelabelConfig {
    #[serde(default)]
    pub source_labels: Vec<String>,

    #[serde(default = "default_separator")]
    pub separator: String,

    #[serde(default)]
    pub target_label: String,

    #[serde(default = "default_regex")]
    pub regex: String,

    #[serde(default)]
    pub modulus: u64,

    #[serde(default = "default_replacement")]
    pub replacement: String,

    #[serde(default)]
    pub action: RelabelAction,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.into()
}

fn default_regex() -> String {
    DEFAULT_REGEX.into()
}

fn default_replacement() -> String {
    DEFAULT_REPLACEMENT.into()
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RelabelAction {
    Keep,
    Drop,
    #[default]
    Replace,
    LabelMap,
    LabelDrop,
    LabelKeep,
    HashMod,
}

#[derive(Clone, Debug)]
pub struct RelabelRule {
    pub source_labels: Vec<String>,
    pub separator: String,
    pub target_label: String,
    pub regex: Regex,
    pub modulus: u64,
    pub replacement: String,
    pub action: RelabelAction,
}

impl RelabelConfig {
    // Prometheus matches relabel regexes fully anchored
    pub fn compile(self) -> Result<RelabelRule, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})$", self.regex))?;
        Ok(RelabelRule {
            source_labels: self.source_labels,
            separator: self.separator,
            target_label: self.target_label,
            regex,
            modulus: self.modulus,
            replacement: self.replacement,
            action: self.action,
        })
    }
}

// A rule with an invalid regex is dropped here with a warning; the rest of the
// rule list stays active.
pub fn compile_rules(configs: Vec<RelabelConfig>) -> Arc<Vec<RelabelRule>> {
    let mut rules = Vec::with_capacity(configs.len());
    for config in configs {
        let pattern = config.regex.clone();
        match config.compile() {
            Ok(rule) => rules.push(rule),
            Err(err) => warn!("dropping relabel rule with invalid regex {pattern:?}: {err}"),
        }
    }
    Arc::new(rules)
}

// serde adapter so configuration types hold compiled rules directly
pub fn deserialize_compiled<'de, D>(deserializer: D) -> Result<Arc<Vec<RelabelRule>>, D::Error>
where
    D: Deserializer<'de>,
{
    let configs = Vec::<RelabelConfig>::deserialize(deserializer)?;
    Ok(compile_rules(configs))
}

pub fn no_rules() -> Arc<Vec<RelabelRule>> {
    Arc::new(Vec::new())
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_defaults() {
        let rule: RelabelConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(rule.separator, ";");
        assert_eq!(rule.regex, ".+");
        assert_eq!(rule.replacement, "$1");
        assert_eq!(rule.action, RelabelAction::Replace);
    }

    #[rstest]
    #[case::keep("keep", RelabelAction::Keep)]
    #[case::labelmap("labelmap", RelabelAction::LabelMap)]
    #[case::labeldrop("labeldrop", RelabelAction::LabelDrop)]
    #[case::hashmod("hashmod", RelabelAction::HashMod)]
    fn test_action_names(#[case] name: &str, #[case] expected: RelabelAction) {
        let rule: RelabelConfig = serde_yaml::from_str(&format!("action: {name}")).unwrap();
        assert_eq!(rule.action, expected);
    }

    #[rstest]
    fn test_compile_anchors() {
        let config: RelabelConfig = serde_yaml::from_str("regex: apiserver_.*").unwrap();
        let rule = config.compile().unwrap();
        assert!(rule.regex.is_match("apiserver_request_total"));
        assert!(!rule.regex.is_match("xx_apiserver_request_total"));
    }

    #[rstest]
    fn test_invalid_regex_dropped() {
        let configs: Vec<RelabelConfig> = serde_yaml::from_str(
            "
- regex: 'valid_.*'
- regex: '(unclosed'
- regex: 'also_valid'
",
        )
        .unwrap();

        let rules = compile_rules(configs);
        assert_eq!(rules.len(), 2);
    }
}
