//! Metric specifications: plain function pointers per backend.

use super::types::{MetricArgs, MetricLevel, MetricResults, MetricValue};
use crate::core::{ColumnHandle, TableHandle};
use crate::error::{Result, TermError};
use crate::security::SqlSecurity;
use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;
use std::fmt;

/// What a metric is computed over on the tabular backend.
#[derive(Debug, Clone, Copy)]
pub struct TabularTarget<'a> {
    pub table: &'a TableHandle,
    pub batches: &'a [RecordBatch],
    pub column: Option<&'a ColumnHandle>,
}

impl<'a> TabularTarget<'a> {
    /// The target column of a column-level metric.
    pub fn column(&self, metric: &str) -> Result<&'a ColumnHandle> {
        self.column.ok_or_else(|| {
            TermError::Internal(format!("Column metric '{metric}' requested without a column"))
        })
    }

    /// The per-chunk arrays of a column.
    pub fn arrays(&self, column: &ColumnHandle) -> Vec<ArrayRef> {
        self.batches
            .iter()
            .map(|batch| batch.column(column.index()).clone())
            .collect()
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}

/// What a metric is computed over on the SQL backend.
#[derive(Debug, Clone, Copy)]
pub struct SqlTarget<'a> {
    pub table: &'a TableHandle,
    /// The relation to select from: a quoted table name, a filtered subquery
    /// or a registered sample view.
    pub relation: &'a str,
    pub column: Option<&'a ColumnHandle>,
}

impl<'a> SqlTarget<'a> {
    /// The target column and its quoted identifier.
    pub fn column(&self, metric: &str) -> Result<(&'a ColumnHandle, String)> {
        let column = self.column.ok_or_else(|| {
            TermError::Internal(format!("Column metric '{metric}' requested without a column"))
        })?;
        Ok((column, SqlSecurity::quote_identifier(column.name())?))
    }
}

/// How the SQL backend obtains a metric.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlPlan {
    /// An aggregate expression over the relation. Several of these can share
    /// one `SELECT`.
    Aggregate(String),
    /// A full query returning one row with one column.
    Scalar(String),
    /// A full query returning `(value, count)` rows.
    Frequencies(String),
    /// Known without querying, e.g. from reflected metadata.
    Metadata(MetricValue),
}

/// Computes a static metric over in-memory chunks.
pub type TabularFn = fn(&TabularTarget<'_>, &MetricArgs) -> Result<Option<MetricValue>>;

/// Plans a static metric as SQL. `None` means not computable for this column.
pub type SqlFn = fn(&SqlTarget<'_>, &MetricArgs) -> Result<Option<SqlPlan>>;

/// Derives a composed metric from already computed results.
pub type ComposeFn = fn(&MetricResults) -> Option<MetricValue>;

#[derive(Clone, Copy)]
pub enum MetricKind {
    /// Computed directly by a backend.
    Static { tabular: TabularFn, sql: SqlFn },
    /// A pure function of other metrics of the same level.
    Composed {
        requires: &'static [&'static str],
        compose: ComposeFn,
    },
}

impl fmt::Debug for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Static { .. } => write!(f, "Static"),
            MetricKind::Composed { requires, .. } => {
                f.debug_struct("Composed").field("requires", requires).finish()
            }
        }
    }
}

/// A registered metric.
#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub name: &'static str,
    pub level: MetricLevel,
    pub kind: MetricKind,
}

impl MetricSpec {
    pub const fn new_static(
        name: &'static str,
        level: MetricLevel,
        tabular: TabularFn,
        sql: SqlFn,
    ) -> Self {
        Self {
            name,
            level,
            kind: MetricKind::Static { tabular, sql },
        }
    }

    pub const fn new_composed(
        name: &'static str,
        level: MetricLevel,
        requires: &'static [&'static str],
        compose: ComposeFn,
    ) -> Self {
        Self {
            name,
            level,
            kind: MetricKind::Composed { requires, compose },
        }
    }

    pub fn is_table_level(&self) -> bool {
        self.level == MetricLevel::Table
    }

    pub fn is_composed(&self) -> bool {
        matches!(self.kind, MetricKind::Composed { .. })
    }

    /// Direct dependencies, in declaration order. Empty for static metrics.
    pub fn required_metric_names(&self) -> &'static [&'static str] {
        match self.kind {
            MetricKind::Static { .. } => &[],
            MetricKind::Composed { requires, .. } => requires,
        }
    }

    /// Runs the tabular implementation of a static metric.
    pub fn compute_tabular(
        &self,
        target: &TabularTarget<'_>,
        args: &MetricArgs,
    ) -> Result<Option<MetricValue>> {
        match self.kind {
            MetricKind::Static { tabular, .. } => tabular(target, args),
            MetricKind::Composed { .. } => Err(self.not_static()),
        }
    }

    /// Plans the SQL implementation of a static metric.
    pub fn plan_sql(&self, target: &SqlTarget<'_>, args: &MetricArgs) -> Result<Option<SqlPlan>> {
        match self.kind {
            MetricKind::Static { sql, .. } => sql(target, args),
            MetricKind::Composed { .. } => Err(self.not_static()),
        }
    }

    /// Applies a composed metric to computed results.
    pub fn compose(&self, results: &MetricResults) -> Result<Option<MetricValue>> {
        match self.kind {
            MetricKind::Composed { compose, .. } => Ok(compose(results)),
            MetricKind::Static { .. } => Err(TermError::Internal(format!(
                "Metric '{}' is static and cannot be composed",
                self.name
            ))),
        }
    }

    fn not_static(&self) -> TermError {
        TermError::Internal(format!(
            "Composed metric '{}' cannot be computed by a backend",
            self.name
        ))
    }
}
