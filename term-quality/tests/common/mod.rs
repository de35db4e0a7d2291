//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use arrow::array::{Float64Array, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use std::sync::Arc;
use term_quality::backends::{Backend, SqlBackend, TabularBackend};
use term_quality::core::ProfileConfig;

/// `users(id, email)`: three rows, one malformed email.
pub fn users() -> Vec<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("email", DataType::Utf8, true),
    ]));
    vec![RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3])),
            Arc::new(StringArray::from(vec!["a@x.com", "bad", "c@x.com"])),
        ],
    )
    .unwrap()]
}

pub fn orders_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("status", DataType::Utf8, true),
        Field::new("amount", DataType::Float64, true),
        Field::new(
            "created_at",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            true,
        ),
    ]))
}

fn orders_chunk(
    ids: Vec<i64>,
    statuses: Vec<Option<&str>>,
    amounts: Vec<Option<f64>>,
    ages_hours: Vec<i64>,
) -> RecordBatch {
    let now = Utc::now().timestamp_millis();
    let created: Vec<i64> = ages_hours.iter().map(|h| now - h * 3_600_000).collect();
    RecordBatch::try_new(
        orders_schema(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(statuses)),
            Arc::new(Float64Array::from(amounts)),
            Arc::new(TimestampMillisecondArray::from(created)),
        ],
    )
    .unwrap()
}

/// `orders(id, status, amount, created_at)` over three chunks. Statuses repeat
/// across chunks; two orders are younger than a day.
pub fn orders() -> Vec<RecordBatch> {
    vec![
        orders_chunk(
            vec![1, 2, 3],
            vec![Some("new"), Some("paid"), None],
            vec![Some(10.0), Some(20.0), None],
            vec![1, 30, 50],
        ),
        orders_chunk(
            vec![4, 5, 6],
            vec![Some("paid"), Some("void"), Some("new")],
            vec![Some(30.0), Some(40.0), Some(15.5)],
            vec![5, 100, 200],
        ),
        orders_chunk(vec![7, 8], vec![Some("paid"), Some("shipped")], vec![Some(7.25), None], vec![800, 2000]),
    ]
}

pub fn tabular(name: &str, batches: Vec<RecordBatch>) -> Arc<dyn Backend> {
    tabular_with(name, batches, None)
}

pub fn tabular_with(
    name: &str,
    batches: Vec<RecordBatch>,
    profile: Option<&ProfileConfig>,
) -> Arc<dyn Backend> {
    let schema = batches[0].schema();
    Arc::new(TabularBackend::try_new(name, schema, batches, profile).unwrap())
}

pub fn session(name: &str, batches: Vec<RecordBatch>) -> SessionContext {
    let ctx = SessionContext::new();
    let schema = batches[0].schema();
    let table = MemTable::try_new(schema, vec![batches]).unwrap();
    ctx.register_table(name, Arc::new(table)).unwrap();
    ctx
}

pub async fn sql(name: &str, batches: Vec<RecordBatch>) -> Arc<dyn Backend> {
    sql_with(name, batches, None).await
}

pub async fn sql_with(
    name: &str,
    batches: Vec<RecordBatch>,
    profile: Option<&ProfileConfig>,
) -> Arc<dyn Backend> {
    Arc::new(
        SqlBackend::connect(session(name, batches), name, profile)
            .await
            .unwrap(),
    )
}
