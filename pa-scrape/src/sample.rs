use std::collections::HashMap;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Label {
    pub name: String,
    pub value: String,
}

// An ordered label set.  Order is preserved from the exposition body (and
// from relabeling appends), which keeps output deterministic for the sender.
// Lookups are linear; real-world samples carry a handful of labels, so a map
// would cost more than it saves.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Labels(Vec<Label>);

impl Labels {
    pub fn new() -> Labels {
        Labels(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|l| l.name == name).map(|l| l.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|l| l.name == name)
    }

    // Replaces in place when the label exists, appends otherwise
    pub fn set(&mut self, name: &str, value: &str) {
        match self.0.iter_mut().find(|l| l.name == name) {
            Some(label) => label.value = value.into(),
            None => self.0.push(Label { name: name.into(), value: value.into() }),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|l| l.name != name);
    }

    pub fn retain<F: FnMut(&Label) -> bool>(&mut self, f: F) {
        self.0.retain(f);
    }

    pub fn push(&mut self, label: Label) {
        self.0.push(label);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Labels {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Labels {
        Labels(iter.into_iter().map(|(name, value)| Label { name, value }).collect())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Labels {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Labels {
        Labels(
            iter.into_iter()
                .map(|(name, value)| Label { name: name.into(), value: value.into() })
                .collect(),
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetricSample {
    pub metric: String,
    pub labels: Labels,
    pub value: f64,
    pub timestamp_ms: i64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Untyped,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Summary => "summary",
            MetricType::Untyped => "untyped",
        }
    }
}

// HELP/TYPE records accumulated while parsing one body
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricMeta {
    pub help: Option<String>,
    pub kind: Option<MetricType>,
}

// The output of one scrape, as handed to the sender channel.  Serialization
// and transport past that point belong to the external sender.
#[derive(Clone, Debug)]
pub struct ScrapeBatch {
    pub target_url: String,
    pub collected_at_ms: i64,
    pub samples: Vec<MetricSample>,
    pub metadata: HashMap<String, MetricMeta>,
}
