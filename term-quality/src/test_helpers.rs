//! Fixtures shared by unit tests.

use crate::backends::{Backend, SqlBackend, TabularBackend};
use crate::builder::ValidatorBuilder;
use crate::config::EngineConfig;
use crate::core::{TestCase, TestCaseResult, TestDefinitionCatalog};
use crate::metrics::MetricRegistry;
use crate::validators::ValidatorRegistry;
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use std::sync::Arc;

/// `users(id, email)` with one malformed email.
pub fn users_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("email", DataType::Utf8, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3])),
            Arc::new(StringArray::from(vec!["a@x.com", "bad", "c@x.com"])),
        ],
    )
    .unwrap()
}

/// `orders(id, status, amount)` split over two chunks, with a null amount
/// and a duplicated status.
pub fn orders_batches() -> Vec<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("status", DataType::Utf8, true),
        Field::new("amount", DataType::Float64, true),
    ]));
    let chunk = |ids: Vec<i64>, statuses: Vec<Option<&str>>, amounts: Vec<Option<f64>>| {
        RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(ids)),
                Arc::new(StringArray::from(statuses)),
                Arc::new(Float64Array::from(amounts)),
            ],
        )
        .unwrap()
    };
    vec![
        chunk(
            vec![1, 2, 3],
            vec![Some("new"), Some("paid"), None],
            vec![Some(10.0), Some(20.0), None],
        ),
        chunk(vec![4, 5], vec![Some("paid"), Some("void")], vec![Some(30.0), Some(40.0)]),
    ]
}

pub fn tabular(name: &str, batches: Vec<RecordBatch>) -> Arc<dyn Backend> {
    Arc::new(TabularBackend::from_batches(name, batches).unwrap())
}

pub async fn sql(name: &str, batches: Vec<RecordBatch>) -> Arc<dyn Backend> {
    let ctx = SessionContext::new();
    let schema = batches[0].schema();
    let table = datafusion::datasource::MemTable::try_new(schema, vec![batches]).unwrap();
    ctx.register_table(name, Arc::new(table)).unwrap();
    Arc::new(SqlBackend::connect(ctx, name, None).await.unwrap())
}

/// Builds the standard validator for `test_case` and runs it.
pub async fn run(backend: Arc<dyn Backend>, test_case: TestCase) -> TestCaseResult {
    ValidatorBuilder::new(
        &ValidatorRegistry::standard(),
        &TestDefinitionCatalog::standard(),
        MetricRegistry::standard(),
        test_case,
        backend,
        EngineConfig::default(),
    )
    .unwrap()
    .into_validator()
    .run_validation()
    .await
}
