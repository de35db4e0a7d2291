//! Metric values, arguments and result maps.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A computed metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum MetricValue {
    /// Counts and integer aggregates.
    Long(i64),
    /// Floating point aggregates and proportions.
    Double(f64),
    /// Rendered values such as a temporal minimum.
    Text(String),
    /// An ordered list, e.g. column names.
    List(Vec<String>),
    /// Value frequencies, most frequent first.
    Frequencies(Vec<(String, i64)>),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Double(v) => Some(*v),
            MetricValue::Long(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetricValue::Long(v) => Some(*v),
            MetricValue::Double(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            MetricValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Long(v) => write!(f, "{v}"),
            MetricValue::Double(v) => write!(f, "{v}"),
            MetricValue::Text(s) => write!(f, "{s}"),
            MetricValue::List(items) => write!(f, "{}", items.join(",")),
            MetricValue::Frequencies(bins) => {
                let rendered: Vec<String> = bins.iter().map(|(v, n)| format!("{v}={n}")).collect();
                write!(f, "{}", rendered.join(", "))
            }
        }
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Long(value)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Double(value)
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        MetricValue::Text(value)
    }
}

/// Whether a metric is computed over a whole table or a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricLevel {
    Table,
    Column,
}

impl fmt::Display for MetricLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricLevel::Table => write!(f, "table"),
            MetricLevel::Column => write!(f, "column"),
        }
    }
}

/// Optional inputs of parameterized metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricArgs {
    /// Pattern for `regexCount`.
    pub pattern: Option<String>,
    /// Values for `countInSet`.
    pub values: Vec<String>,
    /// Timestamp column for `insertedRowCount`.
    pub column: Option<String>,
    /// Lower bound for `insertedRowCount`.
    pub since: Option<NaiveDateTime>,
    /// Number of bins for `histogram`.
    pub bins: Option<usize>,
}

impl MetricArgs {
    pub const DEFAULT_BINS: usize = 10;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_values(mut self, values: Vec<String>) -> Self {
        self.values = values;
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_since(mut self, since: NaiveDateTime) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = Some(bins);
        self
    }

    pub fn bins(&self) -> usize {
        self.bins.unwrap_or(Self::DEFAULT_BINS)
    }
}

/// Results of one resolution, keyed by metric name.
///
/// A present key with a `None` value means the metric was evaluated but is
/// not computable for this data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricResults {
    values: HashMap<String, Option<MetricValue>>,
}

impl MetricResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<MetricValue>) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.values.get(name).and_then(Option::as_ref)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(MetricValue::as_f64)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(MetricValue::as_i64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&MetricValue>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}
