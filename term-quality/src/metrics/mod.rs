//! Metric registry, metric implementations and the resolver.
//!
//! A metric is either *static*, computed by a backend through one of the two
//! function pointers of its [`MetricSpec`], or *composed*, derived from other
//! metrics of the same level. [`MetricRegistry::resolution_order`] guarantees
//! dependencies are computed first and rejects cycles.
//!
//! ```rust
//! use term_quality::metrics::MetricRegistry;
//!
//! let registry = MetricRegistry::standard();
//! let spec = registry.resolve("uniqueProportion").unwrap();
//! assert_eq!(spec.required_metric_names(), ["uniqueCount", "valuesCount"]);
//! ```

pub mod composed;
pub mod registry;
pub mod resolver;
pub mod spec;
pub mod standard;
pub mod state;
pub mod types;

pub use registry::MetricRegistry;
pub use resolver::MetricResolver;
pub use spec::{MetricKind, MetricSpec, SqlPlan, SqlTarget, TabularTarget};
pub use types::{MetricArgs, MetricLevel, MetricResults, MetricValue};

/// Names of the built-in metrics.
pub mod names {
    pub const ROW_COUNT: &str = "rowCount";
    pub const COLUMN_COUNT: &str = "columnCount";
    pub const COLUMN_NAMES: &str = "columnNames";
    pub const INSERTED_ROW_COUNT: &str = "insertedRowCount";

    pub const VALUES_COUNT: &str = "valuesCount";
    pub const NULL_COUNT: &str = "nullCount";
    pub const DISTINCT_COUNT: &str = "distinctCount";
    pub const UNIQUE_COUNT: &str = "uniqueCount";
    pub const MIN: &str = "min";
    pub const MAX: &str = "max";
    pub const MEAN: &str = "mean";
    pub const SUM: &str = "sum";
    pub const MEDIAN: &str = "median";
    pub const STDDEV: &str = "stddev";
    pub const MIN_LENGTH: &str = "minLength";
    pub const MAX_LENGTH: &str = "maxLength";
    pub const REGEX_COUNT: &str = "regexCount";
    pub const COUNT_IN_SET: &str = "countInSet";
    pub const HISTOGRAM: &str = "histogram";

    pub const DISTINCT_PROPORTION: &str = "distinctProportion";
    pub const UNIQUE_PROPORTION: &str = "uniqueProportion";
    pub const NULL_PROPORTION: &str = "nullProportion";
    pub const DUPLICATE_COUNT: &str = "duplicateCount";
    pub const NON_PARAMETRIC_SKEW: &str = "nonParametricSkew";
}
