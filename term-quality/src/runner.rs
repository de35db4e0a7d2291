//! Entry point for running test cases against one backend.

use crate::backends::Backend;
use crate::builder::ValidatorBuilder;
use crate::config::EngineConfig;
use crate::core::{TestCase, TestCaseResultResponse, TestCaseStatus, TestDefinitionCatalog};
use crate::error::{Result, TermError};
use crate::metrics::MetricRegistry;
use crate::validators::ValidatorRegistry;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Per-call options of [`TestRunner::run_all`].
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Record configuration errors and keep going instead of stopping the batch.
    pub continue_on_error: bool,
    /// Test cases evaluated at the same time. Results keep the input order.
    pub concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            concurrency: 1,
        }
    }
}

impl RunOptions {
    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// A test case that could not be scheduled.
#[derive(Debug)]
pub struct BatchError {
    pub test_case: String,
    pub error: TermError,
}

/// Outcome of [`TestRunner::run_all`].
#[derive(Debug, Default)]
pub struct BatchReport {
    pub responses: Vec<TestCaseResultResponse>,
    pub errors: Vec<BatchError>,
}

impl BatchReport {
    /// Number of evaluated test cases with the given status.
    pub fn count(&self, status: TestCaseStatus) -> usize {
        self.responses
            .iter()
            .filter(|r| r.test_case_result.status() == status)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Runs test cases through their validators.
///
/// The runner never computes metrics itself and never catches configuration
/// errors: an unsupported test, an unknown definition or a malformed entity
/// link is returned to the caller. Runtime failures come back as `Aborted`
/// results from the validator.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use term_quality::backends::SqlBackend;
/// use term_quality::core::TestCase;
/// use term_quality::runner::{RunOptions, TestRunner};
/// use datafusion::prelude::SessionContext;
///
/// # async fn example(ctx: SessionContext) -> term_quality::error::Result<()> {
/// let backend = SqlBackend::connect(ctx, "orders", None).await?;
/// let runner = TestRunner::try_new(Arc::new(backend))?;
///
/// let cases = vec![
///     TestCase::new("rows", "<#E::table::shop.orders>", "tableRowCountToBeBetween")
///         .with_parameter("minValue", "1"),
///     TestCase::new("ids", "<#E::table::shop.orders::columns::id>", "columnValuesToBeUnique"),
/// ];
/// let report = runner
///     .run_all(&cases, RunOptions::default().continue_on_error(true))
///     .await?;
/// for response in &report.responses {
///     println!("{}: {}", response.test_case.name, response.test_case_result.status());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TestRunner {
    backend: Arc<dyn Backend>,
    validators: Arc<ValidatorRegistry>,
    metrics: Arc<MetricRegistry>,
    catalog: Arc<TestDefinitionCatalog>,
    config: EngineConfig,
}

impl TestRunner {
    /// A runner over the built-in registries and catalog.
    pub fn try_new(backend: Arc<dyn Backend>) -> Result<Self> {
        Self::with_registries(
            backend,
            ValidatorRegistry::standard(),
            MetricRegistry::standard(),
            TestDefinitionCatalog::standard(),
        )
    }

    /// A runner over custom registries. Both registries are checked up front
    /// so that a misconfiguration fails here and not in the middle of a batch.
    pub fn with_registries(
        backend: Arc<dyn Backend>,
        validators: Arc<ValidatorRegistry>,
        metrics: Arc<MetricRegistry>,
        catalog: Arc<TestDefinitionCatalog>,
    ) -> Result<Self> {
        metrics.validate()?;
        validators.validate(&metrics)?;
        Ok(Self {
            backend,
            validators,
            metrics,
            catalog,
            config: EngineConfig::default(),
        })
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Evaluates one test case.
    #[instrument(skip(self, test_case), fields(test_case.name = %test_case.name))]
    pub async fn run_and_handle(&self, test_case: &TestCase) -> Result<TestCaseResultResponse> {
        let builder = ValidatorBuilder::new(
            &self.validators,
            &self.catalog,
            Arc::clone(&self.metrics),
            test_case.clone(),
            Arc::clone(&self.backend),
            self.config.clone(),
        )?;
        let test_case_result = builder.validator().run_validation().await;
        Ok(TestCaseResultResponse {
            test_case: test_case.clone(),
            test_case_result,
        })
    }

    /// Evaluates a batch of test cases.
    ///
    /// Without `continue_on_error` the first configuration error is returned
    /// and the rest of the batch is dropped.
    #[instrument(skip(self, test_cases), fields(
        batch.size = test_cases.len(),
        batch.continue_on_error = options.continue_on_error,
    ))]
    pub async fn run_all(&self, test_cases: &[TestCase], options: RunOptions) -> Result<BatchReport> {
        info!("Starting test case batch");
        let start = Instant::now();

        let mut outcomes = stream::iter(test_cases)
            .map(|test_case| async move { (test_case, self.run_and_handle(test_case).await) })
            .buffered(options.concurrency.max(1));

        let mut report = BatchReport::default();
        while let Some((test_case, outcome)) = outcomes.next().await {
            match outcome {
                Ok(response) => report.responses.push(response),
                Err(e) => {
                    error!(test_case.name = %test_case.name, error = %e, "Test case could not be scheduled");
                    if !options.continue_on_error {
                        return Err(e);
                    }
                    report.errors.push(BatchError {
                        test_case: test_case.name.clone(),
                        error: e,
                    });
                }
            }
        }

        info!(
            batch.success = report.count(TestCaseStatus::Success),
            batch.failed = report.count(TestCaseStatus::Failed),
            batch.aborted = report.count(TestCaseStatus::Aborted),
            batch.errors = report.errors.len(),
            batch.duration_ms = start.elapsed().as_millis() as u64,
            "Test case batch completed"
        );
        Ok(report)
    }
}
