//! SQL backend over a DataFusion session.

use super::{Backend, BackendKind, CustomSqlStrategy};
use crate::core::sampling::format_timestamp;
use crate::core::{ColumnHandle, PartitionPredicate, ProfileConfig, SampleConfig, TableHandle};
use crate::error::{ErrorContext, Result, TermError};
use crate::metrics::{MetricArgs, MetricSpec, MetricValue, SqlPlan, SqlTarget};
use crate::security::SqlSecurity;
use arrow::array::{Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::Utc;
use datafusion::prelude::SessionContext;
use datafusion::scalar::ScalarValue;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, instrument, warn};

static SAMPLE_VIEW_ID: AtomicU64 = AtomicU64::new(0);

/// Pushes metrics down to a table registered in a [`SessionContext`].
///
/// The table's schema is reflected once at connection. A partition becomes a
/// filtered subquery; a sample is drawn once, cached and registered as a view
/// so that every metric of the run sees the same rows. The view is
/// deregistered when the backend is dropped.
///
/// # Examples
///
/// ```rust,no_run
/// use datafusion::prelude::SessionContext;
/// use term_quality::backends::{Backend, SqlBackend};
///
/// # async fn example(ctx: SessionContext) -> term_quality::error::Result<()> {
/// let backend = SqlBackend::connect(ctx, "users", None).await?;
/// println!("{} columns", backend.table().columns().len());
/// # Ok(())
/// # }
/// ```
pub struct SqlBackend {
    ctx: SessionContext,
    table: TableHandle,
    relation: String,
    sample_view: Option<String>,
}

impl fmt::Debug for SqlBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlBackend")
            .field("table", &self.table.name())
            .field("relation", &self.relation)
            .field("sample_view", &self.sample_view)
            .finish_non_exhaustive()
    }
}

impl SqlBackend {
    /// Connects to `table_name`, applying the optional profile directive.
    #[instrument(skip(ctx, profile), fields(table.name = %table_name))]
    pub async fn connect(
        ctx: SessionContext,
        table_name: &str,
        profile: Option<&ProfileConfig>,
    ) -> Result<Self> {
        let df = ctx
            .table(table_name)
            .await
            .with_context(|| format!("Failed to open table '{table_name}'"))?;
        let table = TableHandle::from_schema(table_name, df.schema().as_arrow());
        let mut relation = SqlSecurity::quote_qualified(table_name)?;
        let mut sample_view = None;

        if let Some(profile) = profile {
            profile.validate()?;
            if let Some(partition) = &profile.partition {
                let filter = partition.resolve(Utc::now().naive_utc())?;
                let column = table.column(&filter.column)?;
                filter.check_column(column)?;
                relation = format!(
                    "(SELECT * FROM {relation} WHERE {}) AS partitioned",
                    partition_predicate(column, &filter.predicate)?
                );
            }
            if let Some(sample) = &profile.sample {
                if let Some(seed) = profile.sample_seed {
                    warn!(
                        sample.seed = seed,
                        "SQL samples are drawn with random() and ignore the seed; results are not reproducible"
                    );
                }
                let query = match sample {
                    SampleConfig::Percentage { percent } => {
                        format!("SELECT * FROM {relation} WHERE random() < {}", percent / 100.0)
                    }
                    SampleConfig::Rows { count } => {
                        format!("SELECT * FROM {relation} ORDER BY random() LIMIT {count}")
                    }
                };
                let sampled = ctx.sql(&query).await?.cache().await?;
                let view = format!(
                    "__term_sample_{}",
                    SAMPLE_VIEW_ID.fetch_add(1, Ordering::Relaxed)
                );
                ctx.register_table(view.as_str(), sampled.into_view())?;
                relation = SqlSecurity::quote_identifier(&view)?;
                sample_view = Some(view);
            }
        }

        info!(
            table.name = %table.name(),
            columns = table.columns().len(),
            relation = %relation,
            "SQL backend connected"
        );
        Ok(Self {
            ctx,
            table,
            relation,
            sample_view,
        })
    }

    /// The relation metrics are computed over.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn session(&self) -> &SessionContext {
        &self.ctx
    }

    fn target<'a>(&'a self, column: Option<&'a ColumnHandle>) -> SqlTarget<'a> {
        SqlTarget {
            table: &self.table,
            relation: &self.relation,
            column,
        }
    }

    async fn collect(&self, sql: &str) -> Result<Vec<RecordBatch>> {
        debug!(sql = %sql, "Executing SQL");
        Ok(self.ctx.sql(sql).await?.collect().await?)
    }

    /// Plans and runs metrics. Aggregate plans share a single `SELECT`.
    async fn compute(
        &self,
        column: Option<&ColumnHandle>,
        metrics: &[&MetricSpec],
        args: &MetricArgs,
    ) -> Result<Vec<Option<MetricValue>>> {
        let target = self.target(column);
        let mut values = vec![None; metrics.len()];
        let mut aggregates = Vec::new();

        for (i, metric) in metrics.iter().enumerate() {
            match metric.plan_sql(&target, args)? {
                None => {}
                Some(SqlPlan::Metadata(value)) => values[i] = Some(value),
                Some(SqlPlan::Aggregate(expr)) => aggregates.push((i, expr)),
                Some(SqlPlan::Scalar(sql)) => {
                    let batches = self.collect(&sql).await?;
                    values[i] = first_value(&batches, 0, metric.name)?;
                }
                Some(SqlPlan::Frequencies(sql)) => {
                    let batches = self.collect(&sql).await?;
                    values[i] = Some(frequencies(&batches, metric.name)?);
                }
            }
        }

        if !aggregates.is_empty() {
            let select = aggregates
                .iter()
                .enumerate()
                .map(|(slot, (_, expr))| format!("{expr} AS m{slot}"))
                .collect::<Vec<_>>()
                .join(", ");
            let batches = self
                .collect(&format!("SELECT {select} FROM {}", self.relation))
                .await?;
            for (slot, (i, _)) in aggregates.iter().enumerate() {
                values[*i] = first_value(&batches, slot, metrics[*i].name)?;
            }
        }
        Ok(values)
    }
}

impl Drop for SqlBackend {
    fn drop(&mut self) {
        if let Some(view) = self.sample_view.take() {
            if let Err(e) = self.ctx.deregister_table(view.as_str()) {
                warn!(view = %view, error = %e, "Failed to deregister sample view");
            }
        }
    }
}

fn partition_predicate(column: &ColumnHandle, predicate: &PartitionPredicate) -> Result<String> {
    let c = SqlSecurity::quote_identifier(column.name())?;
    Ok(match predicate {
        PartitionPredicate::InValues(values) => {
            let literals = values
                .iter()
                .map(|v| SqlSecurity::quote_literal(v))
                .collect::<Result<Vec<_>>>()?;
            format!("CAST({c} AS VARCHAR) IN ({})", literals.join(", "))
        }
        PartitionPredicate::InRange { start, end } => {
            format!("CAST({c} AS BIGINT) BETWEEN {start} AND {end}")
        }
        PartitionPredicate::Since(since) => format!(
            "CAST({c} AS TIMESTAMP) >= TIMESTAMP {}",
            SqlSecurity::quote_literal(&format_timestamp(since))?
        ),
    })
}

/// Decodes the value at `(row 0, column)` of a result set.
fn first_value(batches: &[RecordBatch], column: usize, metric: &str) -> Result<Option<MetricValue>> {
    let Some(batch) = batches.iter().find(|b| b.num_rows() > 0) else {
        return Ok(None);
    };
    if column >= batch.num_columns() {
        return Err(TermError::metric_computation(
            metric,
            format!("result has no column {column}"),
        ));
    }
    decode_scalar(ScalarValue::try_from_array(batch.column(column), 0)?, metric)
}

fn decode_scalar(value: ScalarValue, metric: &str) -> Result<Option<MetricValue>> {
    if value.is_null() {
        return Ok(None);
    }
    let decoded = match value {
        ScalarValue::Int8(Some(v)) => MetricValue::Long(i64::from(v)),
        ScalarValue::Int16(Some(v)) => MetricValue::Long(i64::from(v)),
        ScalarValue::Int32(Some(v)) => MetricValue::Long(i64::from(v)),
        ScalarValue::Int64(Some(v)) => MetricValue::Long(v),
        ScalarValue::UInt8(Some(v)) => MetricValue::Long(i64::from(v)),
        ScalarValue::UInt16(Some(v)) => MetricValue::Long(i64::from(v)),
        ScalarValue::UInt32(Some(v)) => MetricValue::Long(i64::from(v)),
        ScalarValue::UInt64(Some(v)) => MetricValue::Long(i64::try_from(v).map_err(|_| {
            TermError::metric_computation(metric, format!("value {v} overflows a 64-bit integer"))
        })?),
        ScalarValue::Float32(Some(v)) => MetricValue::Double(f64::from(v)),
        ScalarValue::Float64(Some(v)) => MetricValue::Double(v),
        ScalarValue::Utf8(Some(v))
        | ScalarValue::LargeUtf8(Some(v))
        | ScalarValue::Utf8View(Some(v)) => MetricValue::Text(v),
        other => {
            return Err(TermError::metric_computation(
                metric,
                format!("unsupported result type {}", other.data_type()),
            ))
        }
    };
    Ok(Some(decoded))
}

fn frequencies(batches: &[RecordBatch], metric: &str) -> Result<MetricValue> {
    let mut entries = Vec::new();
    for batch in batches {
        if batch.num_columns() < 2 {
            return Err(TermError::metric_computation(
                metric,
                "frequency query must return (value, count)",
            ));
        }
        let values = cast(batch.column(0), &DataType::Utf8)?;
        let counts = cast(batch.column(1), &DataType::Int64)?;
        let (Some(values), Some(counts)) = (
            values.as_any().downcast_ref::<StringArray>(),
            counts.as_any().downcast_ref::<Int64Array>(),
        ) else {
            return Err(TermError::metric_computation(
                metric,
                "unexpected frequency result types",
            ));
        };
        for i in 0..batch.num_rows() {
            if values.is_valid(i) && counts.is_valid(i) {
                entries.push((values.value(i).to_string(), counts.value(i)));
            }
        }
    }
    Ok(MetricValue::Frequencies(entries))
}

#[async_trait]
impl Backend for SqlBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sql
    }

    fn table(&self) -> &TableHandle {
        &self.table
    }

    #[instrument(skip(self, metric, args), fields(metric.name = %metric.name, backend.kind = "sql"))]
    async fn get_table_metric(
        &self,
        metric: &MetricSpec,
        args: &MetricArgs,
    ) -> Result<Option<MetricValue>> {
        let mut values = self.compute(None, &[metric], args).await?;
        Ok(values.pop().flatten())
    }

    #[instrument(skip(self, column, metric, args), fields(metric.name = %metric.name, column.name = %column.name(), backend.kind = "sql"))]
    async fn get_column_metric(
        &self,
        column: &ColumnHandle,
        metric: &MetricSpec,
        args: &MetricArgs,
    ) -> Result<Option<MetricValue>> {
        let column = self.table.column(column.name())?;
        let mut values = self.compute(Some(column), &[metric], args).await?;
        Ok(values.pop().flatten())
    }

    #[instrument(skip(self, metrics, args), fields(metrics = metrics.len(), backend.kind = "sql"))]
    async fn get_table_metrics(
        &self,
        metrics: &[&MetricSpec],
        args: &MetricArgs,
    ) -> Result<Vec<Option<MetricValue>>> {
        self.compute(None, metrics, args).await
    }

    #[instrument(skip(self, column, metrics, args), fields(metrics = metrics.len(), column.name = %column.name(), backend.kind = "sql"))]
    async fn get_column_metrics(
        &self,
        column: &ColumnHandle,
        metrics: &[&MetricSpec],
        args: &MetricArgs,
    ) -> Result<Vec<Option<MetricValue>>> {
        let column = self.table.column(column.name())?;
        self.compute(Some(column), metrics, args).await
    }

    #[instrument(skip(self, query), fields(strategy = ?strategy))]
    async fn query_row_count(&self, query: &str, strategy: CustomSqlStrategy) -> Result<i64> {
        let query = SqlSecurity::validate_query(query)?;
        let (sql, label) = match strategy {
            CustomSqlStrategy::Rows => (format!("SELECT COUNT(*) FROM ({query}) AS q"), "ROWS"),
            CustomSqlStrategy::Count => (query, "COUNT"),
        };
        let batches = self.collect(&sql).await?;
        match first_value(&batches, 0, label)? {
            None => Ok(0),
            Some(MetricValue::Long(n)) => Ok(n),
            Some(MetricValue::Double(v)) if v.fract() == 0.0 && v.is_finite() => Ok(v as i64),
            Some(other) => Err(TermError::metric_computation(
                label,
                format!("custom query returned a non-integer value '{other}'"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PartitionConfig, PartitionMethod};
    use crate::metrics::MetricRegistry;
    use arrow::array::{Float64Array, Int32Array};
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn users() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("email", DataType::Utf8, true),
            Field::new("score", DataType::Float64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![1, 2, 3, 4])),
                Arc::new(StringArray::from(vec![
                    Some("a@x.com"),
                    Some("bad"),
                    None,
                    Some("a@x.com"),
                ])),
                Arc::new(Float64Array::from(vec![Some(1.0), Some(2.0), None, Some(3.0)])),
            ],
        )
        .unwrap()
    }

    async fn context() -> SessionContext {
        let ctx = SessionContext::new();
        ctx.register_batch("users", users()).unwrap();
        ctx
    }

    fn spec(name: &str) -> MetricSpec {
        *MetricRegistry::standard().resolve(name).unwrap()
    }

    #[tokio::test]
    async fn test_reflects_schema() {
        let backend = SqlBackend::connect(context().await, "users", None).await.unwrap();
        assert_eq!(backend.kind(), BackendKind::Sql);
        assert_eq!(backend.table().column_names(), vec!["id", "email", "score"]);
        assert_eq!(backend.relation(), "\"users\"");
    }

    #[tokio::test]
    async fn test_debug_shows_relation_and_sample_view() {
        let profile = ProfileConfig::new()
            .with_sample(SampleConfig::Rows { count: 2 })
            .with_seed(7);
        let backend = SqlBackend::connect(context().await, "users", Some(&profile))
            .await
            .unwrap();
        let rendered = format!("{backend:?}");
        assert!(rendered.starts_with("SqlBackend"), "{rendered}");
        assert!(rendered.contains("__term_sample_"), "{rendered}");
        assert!(rendered.contains("table: \"users\""), "{rendered}");
    }

    #[tokio::test]
    async fn test_missing_table_fails() {
        assert!(SqlBackend::connect(context().await, "nope", None).await.is_err());
    }

    #[tokio::test]
    async fn test_batched_column_metrics() {
        let backend = SqlBackend::connect(context().await, "users", None).await.unwrap();
        let email = backend.table().column("email").unwrap().clone();
        let specs = ["valuesCount", "nullCount", "distinctCount", "uniqueCount", "mean"].map(spec);
        let metrics: Vec<&MetricSpec> = specs.iter().collect();
        let values = backend
            .get_column_metrics(&email, &metrics, &MetricArgs::default())
            .await
            .unwrap();
        assert_eq!(values[0], Some(MetricValue::Long(3)));
        assert_eq!(values[1], Some(MetricValue::Long(1)));
        assert_eq!(values[2], Some(MetricValue::Long(2)));
        assert_eq!(values[3], Some(MetricValue::Long(1)));
        // mean does not apply to text
        assert_eq!(values[4], None);
    }

    #[tokio::test]
    async fn test_regex_and_histogram() {
        let backend = SqlBackend::connect(context().await, "users", None).await.unwrap();
        let email = backend.table().column("email").unwrap().clone();
        let regex = backend
            .get_column_metric(
                &email,
                &spec("regexCount"),
                &MetricArgs::default().with_pattern(r"^[^@]+@[^@]+\.[a-z]+$"),
            )
            .await
            .unwrap();
        assert_eq!(regex, Some(MetricValue::Long(2)));

        let histogram = backend
            .get_column_metric(&email, &spec("histogram"), &MetricArgs::default())
            .await
            .unwrap();
        assert_eq!(
            histogram,
            Some(MetricValue::Frequencies(vec![
                ("a@x.com".to_string(), 2),
                ("bad".to_string(), 1)
            ]))
        );
    }

    #[tokio::test]
    async fn test_partitioned_relation() {
        let profile = ProfileConfig::new().with_partition(PartitionConfig::new(
            "id",
            PartitionMethod::IntegerRange { start: 2, end: 3 },
        ));
        let backend = SqlBackend::connect(context().await, "users", Some(&profile))
            .await
            .unwrap();
        let rows = backend
            .get_table_metric(&spec("rowCount"), &MetricArgs::default())
            .await
            .unwrap();
        assert_eq!(rows, Some(MetricValue::Long(2)));
    }

    #[tokio::test]
    async fn test_sample_view_is_stable_and_dropped() {
        let ctx = context().await;
        let profile = ProfileConfig::new().with_sample(SampleConfig::Rows { count: 2 });
        let backend = SqlBackend::connect(ctx.clone(), "users", Some(&profile))
            .await
            .unwrap();
        let view = backend.sample_view.clone().unwrap();
        assert!(ctx.table_exist(view.as_str()).unwrap());

        let first = backend
            .get_column_metric(
                backend.table().column("id").unwrap(),
                &spec("sum"),
                &MetricArgs::default(),
            )
            .await
            .unwrap();
        let second = backend
            .get_column_metric(
                backend.table().column("id").unwrap(),
                &spec("sum"),
                &MetricArgs::default(),
            )
            .await
            .unwrap();
        assert_eq!(first, second);

        drop(backend);
        assert!(!ctx.table_exist(view.as_str()).unwrap());
    }

    #[tokio::test]
    async fn test_custom_query_strategies() {
        let backend = SqlBackend::connect(context().await, "users", None).await.unwrap();
        let rows = backend
            .query_row_count("SELECT * FROM users WHERE email IS NULL", CustomSqlStrategy::Rows)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let count = backend
            .query_row_count("SELECT COUNT(*) FROM users WHERE id > 1", CustomSqlStrategy::Count)
            .await
            .unwrap();
        assert_eq!(count, 3);

        let empty = backend
            .query_row_count("SELECT id FROM users WHERE id > 100", CustomSqlStrategy::Count)
            .await
            .unwrap();
        assert_eq!(empty, 0);

        let rejected = backend
            .query_row_count("DELETE FROM users", CustomSqlStrategy::Rows)
            .await
            .unwrap_err();
        assert!(matches!(rejected, TermError::SecurityError(_)));
    }

    #[test]
    fn test_decode_scalar() {
        assert_eq!(
            decode_scalar(ScalarValue::Int32(Some(4)), "m").unwrap(),
            Some(MetricValue::Long(4))
        );
        assert_eq!(decode_scalar(ScalarValue::Float64(None), "m").unwrap(), None);
        assert_eq!(
            decode_scalar(ScalarValue::Utf8(Some("2024-01-01".into())), "m").unwrap(),
            Some(MetricValue::Text("2024-01-01".to_string()))
        );
        assert!(decode_scalar(ScalarValue::Boolean(Some(true)), "m").is_err());
    }
}
