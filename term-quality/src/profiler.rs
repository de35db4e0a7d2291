//! Table and column profiling over the metric registry.
//!
//! A profile is the set of metrics the engine can compute for a table without
//! any test case: table-level counts plus, for every column, the static and
//! composed column metrics that apply to its type. Metrics that do not apply
//! (the mean of a text column, say) are simply left out of the profile.

use crate::backends::Backend;
use crate::config::EngineConfig;
use crate::core::{ColumnHandle, SemanticType};
use crate::error::Result;
use crate::metrics::{
    names, MetricArgs, MetricRegistry, MetricResolver, MetricResults, MetricValue,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

const TABLE_METRICS: &[&str] = &[names::ROW_COUNT, names::COLUMN_COUNT, names::COLUMN_NAMES];

/// Column metrics requested for every column. The backend reports `None`
/// for the ones that do not apply to the column type.
const COLUMN_METRICS: &[&str] = &[
    names::VALUES_COUNT,
    names::NULL_COUNT,
    names::DISTINCT_COUNT,
    names::UNIQUE_COUNT,
    names::MIN,
    names::MAX,
    names::MEAN,
    names::SUM,
    names::MEDIAN,
    names::STDDEV,
    names::MIN_LENGTH,
    names::MAX_LENGTH,
    names::HISTOGRAM,
    names::DISTINCT_PROPORTION,
    names::UNIQUE_PROPORTION,
    names::NULL_PROPORTION,
    names::DUPLICATE_COUNT,
    names::NON_PARAMETRIC_SKEW,
];

/// Options of one profiling call.
#[derive(Debug, Clone, Copy)]
pub struct ProfileOptions {
    /// Record failing metrics in the profile instead of failing the run.
    pub continue_on_error: bool,
    /// Number of histogram bins per column.
    pub histogram_bins: usize,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            histogram_bins: MetricArgs::DEFAULT_BINS,
        }
    }
}

/// A metric that could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub metric: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnProfile {
    pub name: String,
    pub data_type: SemanticType,
    pub metrics: BTreeMap<String, MetricValue>,
}

impl ColumnProfile {
    pub fn metric(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableProfile {
    pub table: String,
    pub metrics: BTreeMap<String, MetricValue>,
    pub columns: Vec<ColumnProfile>,
    pub errors: Vec<MetricFailure>,
    pub profiling_time_ms: u64,
}

impl TableProfile {
    pub fn metric(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Profiles the table served by one backend.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use term_quality::backends::TabularBackend;
/// use term_quality::metrics::names;
/// use term_quality::profiler::{ProfileOptions, TableProfiler};
///
/// # async fn example(backend: TabularBackend) -> term_quality::error::Result<()> {
/// let profiler = TableProfiler::new(Arc::new(backend));
/// let profile = profiler.profile(ProfileOptions::default()).await?;
/// if let Some(rows) = profile.metric(names::ROW_COUNT) {
///     println!("{} has {rows} rows", profile.table);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TableProfiler {
    backend: Arc<dyn Backend>,
    metrics: Arc<MetricRegistry>,
    config: EngineConfig,
}

impl TableProfiler {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            metrics: MetricRegistry::standard(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_registry(mut self, metrics: Arc<MetricRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Computes the table profile.
    ///
    /// With `continue_on_error`, a failing metric request is retried one
    /// metric at a time and every metric that still fails is recorded in
    /// [`TableProfile::errors`]. Without it the first failure is returned.
    #[instrument(skip(self), fields(
        table.name = %self.backend.table().name(),
        backend.kind = %self.backend.kind(),
    ))]
    pub async fn profile(&self, options: ProfileOptions) -> Result<TableProfile> {
        let start = Instant::now();
        let table = self.backend.table();
        info!(table.columns = table.columns().len(), "Starting table profile");

        let mut errors = Vec::new();
        let metrics = self
            .collect(None, TABLE_METRICS, &MetricArgs::default(), options, &mut errors)
            .await?;

        let args = MetricArgs::default().with_bins(options.histogram_bins);
        let mut columns = Vec::with_capacity(table.columns().len());
        for column in table.columns() {
            debug!(column.name = %column.name(), "Profiling column");
            let metrics = self
                .collect(Some(column), COLUMN_METRICS, &args, options, &mut errors)
                .await?;
            columns.push(ColumnProfile {
                name: column.name().to_string(),
                data_type: column.data_type(),
                metrics,
            });
        }

        let profiling_time_ms = start.elapsed().as_millis() as u64;
        info!(
            profile.errors = errors.len(),
            profile.time_ms = profiling_time_ms,
            "Table profile completed"
        );
        Ok(TableProfile {
            table: table.name().to_string(),
            metrics,
            columns,
            errors,
            profiling_time_ms,
        })
    }

    async fn collect(
        &self,
        column: Option<&ColumnHandle>,
        names: &[&str],
        args: &MetricArgs,
        options: ProfileOptions,
        errors: &mut Vec<MetricFailure>,
    ) -> Result<BTreeMap<String, MetricValue>> {
        match self.resolve(column, names, args).await {
            Ok(results) => return Ok(present(&results)),
            Err(e) if !options.continue_on_error => return Err(e),
            Err(e) => warn!(error = %e, "Batched metrics failed, retrying one at a time"),
        }

        let mut collected = BTreeMap::new();
        for name in names {
            match self.resolve(column, std::slice::from_ref(name), args).await {
                Ok(results) => collected.extend(present(&results)),
                Err(e) => {
                    warn!(metric.name = %name, error = %e, "Metric failed");
                    errors.push(MetricFailure {
                        column: column.map(|c| c.name().to_string()),
                        metric: name.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(collected)
    }

    async fn resolve(
        &self,
        column: Option<&ColumnHandle>,
        names: &[&str],
        args: &MetricArgs,
    ) -> Result<MetricResults> {
        let resolver = MetricResolver::new(
            &self.metrics,
            self.backend.as_ref(),
            &self.config,
        );
        match column {
            Some(column) => resolver.column_metrics(column, names, args).await,
            None => resolver.table_metrics(names, args).await,
        }
    }
}

/// The computable metrics of a resolution.
fn present(results: &MetricResults) -> BTreeMap<String, MetricValue> {
    results
        .iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{BackendKind, CustomSqlStrategy};
    use crate::core::TableHandle;
    use crate::metrics::MetricSpec;
    use crate::test_helpers::{orders_batches, sql, tabular};
    use async_trait::async_trait;

    #[tokio::test]
    async fn test_profile_covers_table_and_columns() {
        let profiler = TableProfiler::new(tabular("orders", orders_batches()));
        let profile = profiler.profile(ProfileOptions::default()).await.unwrap();

        assert_eq!(profile.table, "orders");
        assert_eq!(profile.metric(names::ROW_COUNT), Some(&MetricValue::Long(5)));
        assert_eq!(profile.columns.len(), 3);
        assert!(profile.errors.is_empty());

        let status = profile.column("status").unwrap();
        assert_eq!(status.data_type, SemanticType::Text);
        assert_eq!(status.metric(names::NULL_COUNT), Some(&MetricValue::Long(1)));
        assert_eq!(status.metric(names::DISTINCT_COUNT), Some(&MetricValue::Long(3)));
        // not applicable to text
        assert_eq!(status.metric(names::MEAN), None);

        let amount = profile.column("amount").unwrap();
        assert_eq!(amount.metric(names::MEAN), Some(&MetricValue::Double(25.0)));
        assert_eq!(amount.metric(names::MIN_LENGTH), None);
    }

    #[tokio::test]
    async fn test_profiles_agree_across_backends() {
        let tabular = TableProfiler::new(tabular("orders", orders_batches()))
            .profile(ProfileOptions::default())
            .await
            .unwrap();
        let sql = TableProfiler::new(sql("orders", orders_batches()).await)
            .profile(ProfileOptions::default())
            .await
            .unwrap();

        for name in [names::VALUES_COUNT, names::NULL_COUNT, names::DISTINCT_COUNT, names::UNIQUE_COUNT] {
            let t = tabular.column("status").and_then(|c| c.metric(name)).and_then(MetricValue::as_i64);
            let s = sql.column("status").and_then(|c| c.metric(name)).and_then(MetricValue::as_i64);
            assert_eq!(t, s, "{name}");
        }
    }

    /// Serves a fixed table and fails every request that includes `stddev`.
    #[derive(Debug)]
    struct FlakyBackend {
        inner: Arc<dyn Backend>,
    }

    #[async_trait]
    impl Backend for FlakyBackend {
        fn kind(&self) -> BackendKind {
            self.inner.kind()
        }

        fn table(&self) -> &TableHandle {
            self.inner.table()
        }

        async fn get_table_metric(
            &self,
            metric: &MetricSpec,
            args: &MetricArgs,
        ) -> Result<Option<MetricValue>> {
            self.inner.get_table_metric(metric, args).await
        }

        async fn get_column_metric(
            &self,
            column: &ColumnHandle,
            metric: &MetricSpec,
            args: &MetricArgs,
        ) -> Result<Option<MetricValue>> {
            if metric.name == names::STDDEV {
                return Err(crate::error::TermError::metric_computation(
                    names::STDDEV,
                    "connection reset",
                ));
            }
            self.inner.get_column_metric(column, metric, args).await
        }

        async fn query_row_count(&self, query: &str, strategy: CustomSqlStrategy) -> Result<i64> {
            self.inner.query_row_count(query, strategy).await
        }
    }

    #[tokio::test]
    async fn test_failures_are_recorded_with_continue_on_error() {
        let backend = Arc::new(FlakyBackend {
            inner: tabular("orders", orders_batches()),
        });
        let profile = TableProfiler::new(backend.clone())
            .profile(ProfileOptions::default())
            .await
            .unwrap();

        // stddev and the skew built on it fail for each column, the rest is computed
        assert_eq!(profile.errors.len(), 6);
        assert!(profile
            .errors
            .iter()
            .all(|e| e.metric == names::STDDEV || e.metric == names::NON_PARAMETRIC_SKEW));
        assert_eq!(profile.errors[0].column.as_deref(), Some("id"));
        let amount = profile.column("amount").unwrap();
        assert_eq!(amount.metric(names::STDDEV), None);
        assert_eq!(amount.metric(names::SUM), Some(&MetricValue::Double(100.0)));

        let err = TableProfiler::new(backend)
            .profile(ProfileOptions {
                continue_on_error: false,
                ..ProfileOptions::default()
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_profile_serializes_camel_case() {
        let profile = TableProfiler::new(tabular("orders", orders_batches()))
            .profile(ProfileOptions::default())
            .await
            .unwrap();
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("profilingTimeMs").is_some());
        assert_eq!(json["columns"][0]["dataType"], "INTEGER");
    }
}
