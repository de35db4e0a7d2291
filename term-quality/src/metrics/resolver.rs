//! Dependency-ordered metric computation against a backend.

use super::registry::MetricRegistry;
use super::spec::MetricSpec;
use super::types::{MetricArgs, MetricLevel, MetricResults, MetricValue};
use crate::backends::Backend;
use crate::config::EngineConfig;
use crate::core::ColumnHandle;
use crate::error::{Result, TermError};
use crate::logging::truncate_field;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument, Level};

/// Runs `future`, failing with [`TermError::MetricTimeout`] after `timeout`.
pub async fn with_timeout<T, F>(timeout: Option<Duration>, metric: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| TermError::MetricTimeout {
                metric: metric.to_string(),
                timeout: limit,
            })?,
        None => future.await,
    }
}

/// Computes requested metrics, dependencies first.
///
/// Static metrics are fetched from the backend (in one batched call when
/// [`EngineConfig::batch_metrics`] is set), then composed metrics are derived
/// in dependency order. Nothing is cached between calls.
pub struct MetricResolver<'a> {
    registry: &'a MetricRegistry,
    backend: &'a dyn Backend,
    config: &'a EngineConfig,
}

impl<'a> MetricResolver<'a> {
    pub fn new(registry: &'a MetricRegistry, backend: &'a dyn Backend, config: &'a EngineConfig) -> Self {
        Self {
            registry,
            backend,
            config,
        }
    }

    /// Computes table-level metrics.
    #[instrument(skip(self, args), fields(backend.kind = %self.backend.kind()))]
    pub async fn table_metrics(&self, names: &[&str], args: &MetricArgs) -> Result<MetricResults> {
        self.resolve(None, names, args).await
    }

    /// Computes column-level metrics for `column`.
    #[instrument(skip(self, column, args), fields(backend.kind = %self.backend.kind(), column.name = %column.name()))]
    pub async fn column_metrics(
        &self,
        column: &ColumnHandle,
        names: &[&str],
        args: &MetricArgs,
    ) -> Result<MetricResults> {
        self.resolve(Some(column), names, args).await
    }

    async fn resolve(
        &self,
        column: Option<&ColumnHandle>,
        names: &[&str],
        args: &MetricArgs,
    ) -> Result<MetricResults> {
        let level = if column.is_some() {
            MetricLevel::Column
        } else {
            MetricLevel::Table
        };
        let order = self.registry.resolution_order(names)?;
        if let Some(spec) = order.iter().find(|s| s.level != level) {
            return Err(TermError::Configuration(format!(
                "Metric '{}' is a {} metric but was requested at {level} level",
                spec.name, spec.level
            )));
        }

        let (composed, statics): (Vec<&MetricSpec>, Vec<&MetricSpec>) =
            order.into_iter().partition(|s| s.is_composed());

        let mut results = MetricResults::new();
        for (spec, value) in statics.iter().zip(self.fetch_static(column, &statics, args).await?) {
            self.record(&mut results, spec.name, value);
        }
        for spec in composed {
            let value = spec.compose(&results)?;
            self.record(&mut results, spec.name, value);
        }
        Ok(results)
    }

    async fn fetch_static(
        &self,
        column: Option<&ColumnHandle>,
        statics: &[&MetricSpec],
        args: &MetricArgs,
    ) -> Result<Vec<Option<MetricValue>>> {
        if statics.is_empty() {
            return Ok(Vec::new());
        }
        let timeout = self.config.metric_timeout;

        if self.config.batch_metrics {
            let label = statics.iter().map(|s| s.name).collect::<Vec<_>>().join(",");
            let values = with_timeout(timeout, &label, self.fetch(column, statics, args)).await?;
            if values.len() != statics.len() {
                return Err(TermError::Internal(format!(
                    "Backend returned {} values for {} metrics",
                    values.len(),
                    statics.len()
                )));
            }
            return Ok(values);
        }

        let mut values = Vec::with_capacity(statics.len());
        for spec in statics {
            let mut single =
                with_timeout(timeout, spec.name, self.fetch(column, std::slice::from_ref(spec), args))
                    .await?;
            values.push(single.pop().flatten());
        }
        Ok(values)
    }

    async fn fetch(
        &self,
        column: Option<&ColumnHandle>,
        specs: &[&MetricSpec],
        args: &MetricArgs,
    ) -> Result<Vec<Option<MetricValue>>> {
        match column {
            Some(column) => self.backend.get_column_metrics(column, specs, args).await,
            None => self.backend.get_table_metrics(specs, args).await,
        }
    }

    fn record(&self, results: &mut MetricResults, name: &str, value: Option<MetricValue>) {
        if self.config.log.log_metric_values && self.config.log.enabled(Level::DEBUG) {
            let rendered = value
                .as_ref()
                .map(|v| truncate_field(&v.to_string(), self.config.log.max_field_length));
            debug!(metric.name = %name, metric.value = ?rendered, "Metric computed");
        }
        results.insert(name, value);
    }
}
