//! Execution backends.
//!
//! A [`Backend`] owns the (possibly partitioned and sampled) data of one table
//! and computes static metrics over it:
//!
//! - [`TabularBackend`] holds Arrow record batches in memory and folds
//!   per-chunk partial states.
//! - [`SqlBackend`] pushes metrics down as SQL to a DataFusion session.
//!
//! Both return `Ok(None)` when a metric does not apply to a column's type.

use crate::core::{ColumnHandle, TableHandle};
use crate::error::{Result, TermError};
use crate::metrics::{MetricArgs, MetricSpec, MetricValue};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod sql;
pub mod tabular;

pub use sql::SqlBackend;
pub use tabular::TabularBackend;

/// The kind of execution engine behind a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Tabular,
    Sql,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Tabular => write!(f, "tabular"),
            BackendKind::Sql => write!(f, "sql"),
        }
    }
}

/// How the custom SQL test turns a query into a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomSqlStrategy {
    /// The number of rows the query returns.
    Rows,
    /// The first value of the first row, which the query computes itself.
    Count,
}

impl CustomSqlStrategy {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_uppercase().as_str() {
            "ROWS" => Ok(CustomSqlStrategy::Rows),
            "COUNT" => Ok(CustomSqlStrategy::Count),
            other => Err(TermError::parameter(
                "strategy",
                format!("expected ROWS or COUNT, got '{other}'"),
            )),
        }
    }
}

/// Computes static metrics over the data of one table.
///
/// Implementations are read-only after construction and may be shared across
/// concurrent validations of the same table.
#[async_trait]
pub trait Backend: Send + Sync + fmt::Debug {
    fn kind(&self) -> BackendKind;

    /// The table this backend serves.
    fn table(&self) -> &TableHandle;

    /// Computes a table-level static metric.
    async fn get_table_metric(
        &self,
        metric: &MetricSpec,
        args: &MetricArgs,
    ) -> Result<Option<MetricValue>>;

    /// Computes a column-level static metric.
    async fn get_column_metric(
        &self,
        column: &ColumnHandle,
        metric: &MetricSpec,
        args: &MetricArgs,
    ) -> Result<Option<MetricValue>>;

    /// Computes several table-level metrics, in order.
    async fn get_table_metrics(
        &self,
        metrics: &[&MetricSpec],
        args: &MetricArgs,
    ) -> Result<Vec<Option<MetricValue>>> {
        let mut values = Vec::with_capacity(metrics.len());
        for metric in metrics {
            values.push(self.get_table_metric(metric, args).await?);
        }
        Ok(values)
    }

    /// Computes several column-level metrics, in order.
    async fn get_column_metrics(
        &self,
        column: &ColumnHandle,
        metrics: &[&MetricSpec],
        args: &MetricArgs,
    ) -> Result<Vec<Option<MetricValue>>> {
        let mut values = Vec::with_capacity(metrics.len());
        for metric in metrics {
            values.push(self.get_column_metric(column, metric, args).await?);
        }
        Ok(values)
    }

    /// Runs a user query and reduces it to a count.
    async fn query_row_count(&self, _query: &str, _strategy: CustomSqlStrategy) -> Result<i64> {
        Err(TermError::NotSupported(format!(
            "Custom SQL queries on the {} backend",
            self.kind()
        )))
    }
}
