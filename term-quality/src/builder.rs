//! Resolution of a test case to the validator that evaluates it.

use crate::backends::Backend;
use crate::config::EngineConfig;
use crate::core::{EntityLink, TestCase, TestDefinitionCatalog};
use crate::error::{Result, TermError};
use crate::metrics::MetricRegistry;
use crate::validators::{Validator, ValidatorContext, ValidatorEntry, ValidatorRegistry};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Binds one test case to its validator.
///
/// Construction performs every lookup that can fail with a configuration
/// error: the entity link is parsed and must name the backend's table, the
/// test definition is fetched from the catalog and the (entity type, backend kind, definition) combination is
/// resolved against the [`ValidatorRegistry`]. After that, [`build`] and
/// [`reset`] only instantiate validators.
///
/// [`build`]: ValidatorBuilder::build
/// [`reset`]: ValidatorBuilder::reset
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use term_quality::backends::TabularBackend;
/// use term_quality::builder::ValidatorBuilder;
/// use term_quality::config::EngineConfig;
/// use term_quality::core::{TestCase, TestDefinitionCatalog};
/// use term_quality::metrics::MetricRegistry;
/// use term_quality::validators::{Validator, ValidatorRegistry};
///
/// # async fn example(backend: TabularBackend) -> term_quality::error::Result<()> {
/// let test_case = TestCase::new("rows", "<#E::table::shop.public.orders>", "tableRowCountToBeBetween")
///     .with_parameter("minValue", "1");
///
/// let mut builder = ValidatorBuilder::new(
///     &ValidatorRegistry::standard(),
///     &TestDefinitionCatalog::standard(),
///     MetricRegistry::standard(),
///     test_case,
///     Arc::new(backend),
///     EngineConfig::default(),
/// )?;
/// let first = builder.validator().run_validation().await;
/// builder.reset();
/// let second = builder.validator().run_validation().await;
/// assert_eq!(first.status(), second.status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ValidatorBuilder {
    entry: ValidatorEntry,
    context: ValidatorContext,
    validator: Box<dyn Validator>,
}

impl ValidatorBuilder {
    #[instrument(skip_all, fields(
        test_case.name = %test_case.name,
        test_definition = %test_case.test_definition,
        backend.kind = %backend.kind(),
    ))]
    pub fn new(
        registry: &ValidatorRegistry,
        catalog: &TestDefinitionCatalog,
        metrics: Arc<MetricRegistry>,
        test_case: TestCase,
        backend: Arc<dyn Backend>,
        config: EngineConfig,
    ) -> Result<Self> {
        let entity_link = EntityLink::parse(&test_case.entity_link)?;
        let definition = catalog.get(&test_case.test_definition)?;
        if definition.entity_type != entity_link.entity_type() {
            return Err(TermError::entity_link(
                test_case.entity_link.clone(),
                format!(
                    "test definition '{}' applies to {} entities, the link names a {}",
                    definition.fully_qualified_name,
                    definition.entity_type,
                    entity_link.entity_type()
                ),
            ));
        }
        let table = backend.table().name();
        if !entity_link.refers_to(table) {
            return Err(TermError::entity_link(
                test_case.entity_link.clone(),
                format!(
                    "link names table '{}', the backend serves '{table}'",
                    entity_link.table_fqn()
                ),
            ));
        }

        let entry = registry.resolve(
            definition.entity_type,
            backend.kind(),
            &definition.fully_qualified_name,
        )?;
        debug!(
            required_metrics = ?entry.required_metrics,
            "Resolved validator"
        );

        let context = ValidatorContext {
            test_case: Arc::new(test_case),
            definition,
            entity_link,
            backend,
            metrics,
            config,
        };
        let validator = entry.build(context.clone());
        Ok(Self {
            entry,
            context,
            validator,
        })
    }

    /// The current validator.
    pub fn validator(&self) -> &dyn Validator {
        self.validator.as_ref()
    }

    /// A fresh validator bound to the same test case and backend.
    pub fn build(&self) -> Box<dyn Validator> {
        self.entry.build(self.context.clone())
    }

    /// Replaces the current validator with a fresh one, without resolving the
    /// test case again.
    pub fn reset(&mut self) {
        self.validator = self.build();
    }

    pub fn test_case(&self) -> &TestCase {
        &self.context.test_case
    }

    pub fn into_validator(self) -> Box<dyn Validator> {
        self.validator
    }
}
