//! Metric records produced by the collectors.
//!
//! A [`Metric`] is one observation: a family name without the namespace
//! prefix, an ordered label set and a final value. Records are rendered
//! immediately and never stored.

use std::fmt;

/// Value of a single metric line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Unsigned(v) => write!(f, "{}", v),
            MetricValue::Signed(v) => write!(f, "{}", v),
            // Six decimals, the way load averages have always been printed.
            MetricValue::Float(v) => write!(f, "{:.6}", v),
        }
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Unsigned(v)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Signed(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

/// Immutable (name, labels, value) tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    name: String,
    labels: Vec<(&'static str, String)>,
    value: MetricValue,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
            value: value.into(),
        }
    }

    /// Appends a label; labels keep insertion order.
    pub fn with_label(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.labels.push((key, value.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &[(&'static str, String)] {
        &self.labels
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn value(&self) -> MetricValue {
        self.value
    }
}
