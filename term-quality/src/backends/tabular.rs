//! In-memory backend over Arrow record batches.

use super::{Backend, BackendKind};
use crate::core::{
    ColumnHandle, PartitionPredicate, ProfileConfig, SampleConfig, TableHandle,
};
use crate::error::{Result, TermError};
use crate::metrics::{MetricArgs, MetricSpec, MetricValue, TabularTarget};
use arrow::array::{
    Array, BooleanArray, Int64Array, StringArray, TimestampNanosecondArray, UInt64Array,
};
use arrow::compute::{cast, concat_batches, filter_record_batch, take_record_batch};
use arrow::datatypes::{DataType, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

/// A backend over in-memory chunks.
///
/// The partition filter and the sample are applied once in
/// [`TabularBackend::try_new`]; the chunks are never modified afterwards.
///
/// Metrics are computed on tokio's blocking pool, so a caller-supplied
/// timeout can expire while a large scan is still running. The scan itself
/// runs to completion in the background.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use arrow::array::{Int64Array, StringArray};
/// use arrow::datatypes::{DataType, Field, Schema};
/// use arrow::record_batch::RecordBatch;
/// use term_quality::backends::{Backend, TabularBackend};
///
/// let schema = Arc::new(Schema::new(vec![
///     Field::new("id", DataType::Int64, false),
///     Field::new("email", DataType::Utf8, true),
/// ]));
/// let batch = RecordBatch::try_new(
///     schema.clone(),
///     vec![
///         Arc::new(Int64Array::from(vec![1, 2])),
///         Arc::new(StringArray::from(vec![Some("a@x.com"), None])),
///     ],
/// )
/// .unwrap();
///
/// let backend = TabularBackend::try_new("users", schema, vec![batch], None).unwrap();
/// assert_eq!(backend.num_rows(), 2);
/// assert_eq!(backend.table().column_names(), vec!["id", "email"]);
/// ```
#[derive(Debug)]
pub struct TabularBackend {
    table: Arc<TableHandle>,
    batches: Arc<Vec<RecordBatch>>,
}

impl TabularBackend {
    /// Builds a backend from chunks sharing `schema`.
    #[instrument(skip_all, fields(table.name = %table_name.as_ref(), chunks = chunks.len()))]
    pub fn try_new(
        table_name: impl AsRef<str>,
        schema: SchemaRef,
        chunks: Vec<RecordBatch>,
        profile: Option<&ProfileConfig>,
    ) -> Result<Self> {
        let table = TableHandle::from_schema(table_name.as_ref(), &schema);
        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.schema().fields() != schema.fields() {
                return Err(TermError::Configuration(format!(
                    "Chunk {i} of table '{}' does not match the table schema",
                    table.name()
                )));
            }
        }

        let mut batches = chunks;
        if let Some(profile) = profile {
            profile.validate()?;
            if let Some(partition) = &profile.partition {
                let filter = partition.resolve(Utc::now().naive_utc())?;
                let column = table.column(&filter.column)?;
                filter.check_column(column)?;
                batches = batches
                    .iter()
                    .map(|batch| partition_batch(batch, column, &filter.predicate))
                    .collect::<Result<Vec<_>>>()?;
            }
            if let Some(sample) = &profile.sample {
                let mut rng = match profile.sample_seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                batches = sample_batches(&schema, batches, sample, &mut rng)?;
            }
        }

        let backend = Self {
            table: Arc::new(table),
            batches: Arc::new(batches),
        };
        info!(
            table.name = %backend.table.name(),
            rows = backend.num_rows(),
            "Tabular backend ready"
        );
        Ok(backend)
    }

    /// Builds a backend from non-empty chunks, taking the schema of the first.
    pub fn from_batches(table_name: impl AsRef<str>, chunks: Vec<RecordBatch>) -> Result<Self> {
        let schema = chunks
            .first()
            .map(RecordBatch::schema)
            .ok_or_else(|| TermError::Configuration("No chunks provided".to_string()))?;
        Self::try_new(table_name, schema, chunks, None)
    }

    /// Rows remaining after partitioning and sampling.
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Computes static metrics in order, off the async executor.
    async fn compute(
        &self,
        column: Option<&ColumnHandle>,
        metrics: &[&MetricSpec],
        args: &MetricArgs,
    ) -> Result<Vec<Option<MetricValue>>> {
        let table = Arc::clone(&self.table);
        let batches = Arc::clone(&self.batches);
        let column = column.map(|c| c.name().to_string());
        let metrics: Vec<MetricSpec> = metrics.iter().map(|m| **m).collect();
        let args = args.clone();

        tokio::task::spawn_blocking(move || {
            let column = column.as_deref().map(|name| table.column(name)).transpose()?;
            let target = TabularTarget {
                table: &table,
                batches: &batches,
                column,
            };
            metrics
                .iter()
                .map(|metric| metric.compute_tabular(&target, &args))
                .collect::<Result<Vec<_>>>()
        })
        .await
        .map_err(|e| TermError::Internal(format!("Tabular metric task failed: {e}")))?
    }

    async fn compute_one(
        &self,
        column: Option<&ColumnHandle>,
        metric: &MetricSpec,
        args: &MetricArgs,
    ) -> Result<Option<MetricValue>> {
        let mut values = self.compute(column, &[metric], args).await?;
        Ok(values.pop().flatten())
    }
}

fn partition_batch(
    batch: &RecordBatch,
    column: &ColumnHandle,
    predicate: &PartitionPredicate,
) -> Result<RecordBatch> {
    let array = batch.column(column.index());
    // null partition values never match
    let mask: BooleanArray = match predicate {
        PartitionPredicate::InValues(values) => {
            let wanted: HashSet<&str> = values.iter().map(String::as_str).collect();
            let rendered = cast(array, &DataType::Utf8)?;
            downcast::<StringArray>(&rendered)?
                .iter()
                .map(|v| v.map(|v| wanted.contains(v)))
                .collect()
        }
        PartitionPredicate::InRange { start, end } => {
            let ints = cast(array, &DataType::Int64)?;
            downcast::<Int64Array>(&ints)?
                .iter()
                .map(|v| v.map(|v| *start <= v && v <= *end))
                .collect()
        }
        PartitionPredicate::Since(since) => {
            let cutoff = since.and_utc().timestamp_nanos_opt().ok_or_else(|| {
                TermError::Configuration(format!("Partition cutoff {since} is out of range"))
            })?;
            let timestamps = cast(array, &DataType::Timestamp(TimeUnit::Nanosecond, None))?;
            downcast::<TimestampNanosecondArray>(&timestamps)?
                .iter()
                .map(|v| v.map(|v| v >= cutoff))
                .collect()
        }
    };
    Ok(filter_record_batch(batch, &mask)?)
}

fn sample_batches(
    schema: &SchemaRef,
    batches: Vec<RecordBatch>,
    sample: &SampleConfig,
    rng: &mut StdRng,
) -> Result<Vec<RecordBatch>> {
    match sample {
        SampleConfig::Percentage { percent } => {
            let fraction = percent / 100.0;
            batches
                .iter()
                .map(|batch| {
                    let mask: BooleanArray = (0..batch.num_rows())
                        .map(|_| Some(rng.random::<f64>() < fraction))
                        .collect();
                    Ok(filter_record_batch(batch, &mask)?)
                })
                .collect()
        }
        SampleConfig::Rows { count } => {
            let total: usize = batches.iter().map(RecordBatch::num_rows).sum();
            let count = usize::try_from(*count).unwrap_or(usize::MAX);
            if count >= total {
                return Ok(batches);
            }
            let combined = concat_batches(schema, &batches)?;
            let mut picked = rand::seq::index::sample(rng, total, count).into_vec();
            picked.sort_unstable();
            let indices = UInt64Array::from_iter_values(picked.into_iter().map(|i| i as u64));
            Ok(vec![take_record_batch(&combined, &indices)?])
        }
    }
}

fn downcast<A: Array + 'static>(array: &dyn Array) -> Result<&A> {
    array
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| TermError::Internal(format!("Unexpected array type {}", array.data_type())))
}

#[async_trait]
impl Backend for TabularBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Tabular
    }

    fn table(&self) -> &TableHandle {
        &self.table
    }

    #[instrument(skip(self, metric, args), fields(metric.name = %metric.name, backend.kind = "tabular"))]
    async fn get_table_metric(
        &self,
        metric: &MetricSpec,
        args: &MetricArgs,
    ) -> Result<Option<MetricValue>> {
        self.compute_one(None, metric, args).await
    }

    #[instrument(skip(self, column, metric, args), fields(metric.name = %metric.name, column.name = %column.name(), backend.kind = "tabular"))]
    async fn get_column_metric(
        &self,
        column: &ColumnHandle,
        metric: &MetricSpec,
        args: &MetricArgs,
    ) -> Result<Option<MetricValue>> {
        self.compute_one(Some(column), metric, args).await
    }

    async fn get_table_metrics(
        &self,
        metrics: &[&MetricSpec],
        args: &MetricArgs,
    ) -> Result<Vec<Option<MetricValue>>> {
        self.compute(None, metrics, args).await
    }

    async fn get_column_metrics(
        &self,
        column: &ColumnHandle,
        metrics: &[&MetricSpec],
        args: &MetricArgs,
    ) -> Result<Vec<Option<MetricValue>>> {
        self.compute(Some(column), metrics, args).await
    }
}
