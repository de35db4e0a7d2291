//! Test validators.
//!
//! A validator is bound to one test case and evaluates it against the backend
//! it was built with. Every validator follows the same steps:
//!
//! 1. bind the raw parameter values against the test definition,
//! 2. resolve the target column or table,
//! 3. request metrics through the [`MetricResolver`],
//! 4. apply its predicate and build a [`Verdict`].
//!
//! [`Validator::run_validation`] drives these steps and never fails: any
//! error raised on the way becomes an `Aborted` [`TestCaseResult`] whose
//! result values are all absent.

use crate::backends::Backend;
use crate::config::EngineConfig;
use crate::core::{
    ColumnHandle, EntityLink, ExecutionState, ParameterSet, RowCounts, TestCase, TestCaseResult,
    TestCaseStatus, TestDefinition, TestResultValue,
};
use crate::error::{Result, TermError};
use crate::log_validation;
use crate::metrics::{names, MetricArgs, MetricRegistry, MetricResolver, MetricResults};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Declares a validator struct over a [`ValidatorContext`] whose trait impl
/// delegates `evaluate` to an inherent `check` method.
macro_rules! validator {
    ($(#[$meta:meta])* $name:ident, [$($result:expr),* $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            ctx: $crate::validators::ValidatorContext,
        }

        impl $name {
            pub fn boxed(
                ctx: $crate::validators::ValidatorContext,
            ) -> Box<dyn $crate::validators::Validator> {
                Box::new(Self { ctx })
            }
        }

        #[async_trait::async_trait]
        impl $crate::validators::Validator for $name {
            fn context(&self) -> &$crate::validators::ValidatorContext {
                &self.ctx
            }

            fn result_names(&self) -> &'static [&'static str] {
                &[$($result),*]
            }

            async fn evaluate(
                &self,
                params: &$crate::core::ParameterSet,
            ) -> $crate::error::Result<$crate::validators::Verdict> {
                self.check(params).await
            }
        }
    };
}

pub mod column;
pub mod registry;
pub mod table;

pub use registry::{ValidatorEntry, ValidatorRegistry};

/// Everything a validator needs to evaluate its test case.
#[derive(Clone)]
pub struct ValidatorContext {
    pub test_case: Arc<TestCase>,
    pub definition: Arc<TestDefinition>,
    pub entity_link: EntityLink,
    pub backend: Arc<dyn Backend>,
    pub metrics: Arc<MetricRegistry>,
    pub config: EngineConfig,
}

impl fmt::Debug for ValidatorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorContext")
            .field("test_case", &self.test_case.name)
            .field("definition", &self.definition.fully_qualified_name)
            .field("entity_link", &self.entity_link)
            .field("backend", &self.backend.kind())
            .finish()
    }
}

impl ValidatorContext {
    /// The column the entity link points at.
    pub fn column(&self) -> Result<&ColumnHandle> {
        let name = self.entity_link.column_name().ok_or_else(|| {
            TermError::entity_link(self.entity_link.to_string(), "link does not name a column")
        })?;
        self.backend.table().column(name)
    }

    pub fn resolver(&self) -> MetricResolver<'_> {
        MetricResolver::new(&self.metrics, self.backend.as_ref(), &self.config)
    }

    /// Computes table-level metrics for this test case.
    pub async fn table_metrics(&self, names: &[&str], args: &MetricArgs) -> Result<MetricResults> {
        self.resolver().table_metrics(names, args).await
    }

    /// Computes column-level metrics for the linked column.
    pub async fn column_metrics(&self, names: &[&str], args: &MetricArgs) -> Result<MetricResults> {
        let column = self.column()?;
        self.resolver().column_metrics(column, names, args).await
    }
}

/// The outcome of a validator's predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub status: TestCaseStatus,
    pub message: String,
    pub values: Vec<TestResultValue>,
    pub row_counts: Option<RowCounts>,
}

impl Verdict {
    /// `Success` when `passed`, `Failed` otherwise.
    pub fn new(passed: bool, message: impl Into<String>, values: Vec<TestResultValue>) -> Self {
        Self {
            status: if passed {
                TestCaseStatus::Success
            } else {
                TestCaseStatus::Failed
            },
            message: message.into(),
            values,
            row_counts: None,
        }
    }

    pub fn with_row_counts(mut self, counts: Option<RowCounts>) -> Self {
        self.row_counts = counts;
        self
    }

    fn into_result(self) -> TestCaseResult {
        let result = TestCaseResult::new(self.status, self.message, self.values);
        match self.row_counts {
            Some(counts) => result.with_row_counts(counts),
            None => result,
        }
    }
}

/// A numeric metric a validator cannot work without.
pub(crate) fn required(results: &MetricResults, metric: &str) -> Result<f64> {
    match results.get(metric) {
        None => Err(TermError::metric_computation(metric, "metric unavailable")),
        Some(value) => value.as_f64().ok_or_else(|| {
            TermError::metric_computation(metric, format!("value '{value}' is not numeric"))
        }),
    }
}

/// A count metric a validator cannot work without.
pub(crate) fn required_count(results: &MetricResults, metric: &str) -> Result<i64> {
    match results.get(metric) {
        None => Err(TermError::metric_computation(metric, "metric unavailable")),
        Some(value) => value.as_i64().ok_or_else(|| {
            TermError::metric_computation(metric, format!("value '{value}' is not a count"))
        }),
    }
}

/// The table row count when the test case asks for passed/failed row counts.
pub(crate) async fn row_count_for(
    ctx: &ValidatorContext,
    params: &ParameterSet,
) -> Result<Option<i64>> {
    if !params.bool_or("computePassedFailedRowCount", false) {
        return Ok(None);
    }
    let results = ctx
        .table_metrics(&[names::ROW_COUNT], &MetricArgs::default())
        .await?;
    required_count(&results, names::ROW_COUNT).map(Some)
}

/// A strategy evaluating one test definition on one kind of backend.
#[async_trait]
pub trait Validator: Send + Sync + fmt::Debug {
    fn context(&self) -> &ValidatorContext;

    /// Names of the result values this validator reports, in order.
    fn result_names(&self) -> &'static [&'static str];

    /// Applies the test's predicate to freshly computed metrics.
    async fn evaluate(&self, params: &ParameterSet) -> Result<Verdict>;

    fn definition_name(&self) -> &str {
        &self.context().definition.name
    }

    /// Runs the test case. Errors never escape: they become `Aborted`.
    #[instrument(skip(self), fields(
        test_case.name = %self.context().test_case.name,
        test_definition = %self.definition_name(),
        backend.kind = %self.context().backend.kind(),
    ))]
    async fn run_validation(&self) -> TestCaseResult {
        let ctx = self.context();
        let mut state = ExecutionState::Pending;
        log_validation!(ctx.config.log, state = %state, "Validator created");

        state = ExecutionState::Running;
        log_validation!(ctx.config.log, state = %state, "Evaluating test case");

        let outcome = match ParameterSet::bind(&ctx.definition, &ctx.test_case.parameter_values) {
            Ok(params) => self.evaluate(&params).await,
            Err(e) => Err(e),
        };
        let result = match outcome {
            Ok(verdict) => verdict.into_result(),
            Err(e) => {
                warn!(error = %e, "Test case aborted");
                TestCaseResult::aborted(e.to_string(), self.result_names())
            }
        };

        state = ExecutionState::Finished(result.status());
        info!(result.status = %state, "Test case finished");
        result
    }
}
