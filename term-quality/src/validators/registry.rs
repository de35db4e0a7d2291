//! Static mapping from (entity type, backend kind, test definition) to a
//! validator constructor.

use super::column::{
    BoundedMetricValidator, ColumnValueLengthsToBeBetween, ColumnValuesMissingCount,
    ColumnValuesToBeBetween, ColumnValuesToBeInSet, ColumnValuesToBeNotInSet,
    ColumnValuesToBeNotNull, ColumnValuesToBeUnique, ColumnValuesToMatchRegex,
    ColumnValuesToNotMatchRegex,
};
use super::table::{
    TableColumnCountToBeBetween, TableColumnCountToEqual, TableColumnNameToExist,
    TableColumnToMatchSet, TableCustomSqlQuery, TableRowCountToBeBetween, TableRowCountToEqual,
    TableRowInsertedCountToBeBetween,
};
use super::{Validator, ValidatorContext};
use crate::backends::BackendKind;
use crate::core::EntityType;
use crate::error::{Result, TermError};
use crate::metrics::{names, MetricRegistry};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a validator bound to one test case.
pub type ValidatorConstructor = fn(ValidatorContext) -> Box<dyn Validator>;

/// A registered validator: how to build it and which metrics it reads.
#[derive(Clone, Copy)]
pub struct ValidatorEntry {
    pub constructor: ValidatorConstructor,
    pub required_metrics: &'static [&'static str],
}

impl ValidatorEntry {
    pub const fn new(
        constructor: ValidatorConstructor,
        required_metrics: &'static [&'static str],
    ) -> Self {
        Self {
            constructor,
            required_metrics,
        }
    }

    pub fn build(&self, ctx: ValidatorContext) -> Box<dyn Validator> {
        (self.constructor)(ctx)
    }
}

impl fmt::Debug for ValidatorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorEntry")
            .field("required_metrics", &self.required_metrics)
            .finish()
    }
}

type Key = (EntityType, BackendKind, String);

static STANDARD_VALIDATORS: Lazy<Arc<ValidatorRegistry>> =
    Lazy::new(|| Arc::new(ValidatorRegistry::with_standard_validators()));

/// Resolves validators by a three-key lookup.
///
/// Populated before it is shared and read-only afterwards. An unregistered
/// combination is a configuration error, never a silent skip.
///
/// # Examples
///
/// ```rust
/// use term_quality::backends::BackendKind;
/// use term_quality::core::EntityType;
/// use term_quality::validators::ValidatorRegistry;
///
/// let registry = ValidatorRegistry::standard();
/// assert!(registry
///     .resolve(EntityType::Column, BackendKind::Tabular, "columnValuesToBeNotNull")
///     .is_ok());
/// // custom SQL only runs where there is SQL
/// assert!(registry
///     .resolve(EntityType::Table, BackendKind::Tabular, "tableCustomSQLQuery")
///     .is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidatorRegistry {
    entries: HashMap<Key, ValidatorEntry>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in validators.
    pub fn standard() -> Arc<Self> {
        Arc::clone(&STANDARD_VALIDATORS)
    }

    /// Registers a validator for one backend kind, replacing any previous one.
    pub fn register(
        &mut self,
        entity_type: EntityType,
        backend: BackendKind,
        test_definition: impl Into<String>,
        entry: ValidatorEntry,
    ) {
        self.entries
            .insert((entity_type, backend, test_definition.into()), entry);
    }

    /// Registers a validator for every backend kind.
    pub fn register_everywhere(
        &mut self,
        entity_type: EntityType,
        test_definition: &str,
        entry: ValidatorEntry,
    ) {
        for backend in [BackendKind::Tabular, BackendKind::Sql] {
            self.register(entity_type, backend, test_definition, entry);
        }
    }

    /// Looks up the validator for a combination.
    pub fn resolve(
        &self,
        entity_type: EntityType,
        backend: BackendKind,
        test_definition: &str,
    ) -> Result<ValidatorEntry> {
        self.entries
            .get(&(entity_type, backend, test_definition.to_string()))
            .copied()
            .ok_or_else(|| TermError::UnsupportedTest {
                entity_type,
                backend,
                test_definition: test_definition.to_string(),
            })
    }

    pub fn contains(
        &self,
        entity_type: EntityType,
        backend: BackendKind,
        test_definition: &str,
    ) -> bool {
        self.entries
            .contains_key(&(entity_type, backend, test_definition.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks that every metric a registered validator reads can be resolved.
    pub fn validate(&self, metrics: &MetricRegistry) -> Result<()> {
        for entry in self.entries.values() {
            metrics.resolution_order(entry.required_metrics)?;
        }
        Ok(())
    }

    fn with_standard_validators() -> Self {
        use EntityType::{Column, Table};

        let mut registry = Self::new();
        let tables: [(&str, ValidatorEntry); 7] = [
            (
                "tableRowCountToBeBetween",
                ValidatorEntry::new(TableRowCountToBeBetween::boxed, &[names::ROW_COUNT]),
            ),
            (
                "tableRowCountToEqual",
                ValidatorEntry::new(TableRowCountToEqual::boxed, &[names::ROW_COUNT]),
            ),
            (
                "tableColumnCountToBeBetween",
                ValidatorEntry::new(TableColumnCountToBeBetween::boxed, &[names::COLUMN_COUNT]),
            ),
            (
                "tableColumnCountToEqual",
                ValidatorEntry::new(TableColumnCountToEqual::boxed, &[names::COLUMN_COUNT]),
            ),
            (
                "tableColumnNameToExist",
                ValidatorEntry::new(TableColumnNameToExist::boxed, &[names::COLUMN_NAMES]),
            ),
            (
                "tableColumnToMatchSet",
                ValidatorEntry::new(TableColumnToMatchSet::boxed, &[names::COLUMN_NAMES]),
            ),
            (
                "tableRowInsertedCountToBeBetween",
                ValidatorEntry::new(
                    TableRowInsertedCountToBeBetween::boxed,
                    &[names::INSERTED_ROW_COUNT],
                ),
            ),
        ];
        for (name, entry) in tables {
            registry.register_everywhere(Table, name, entry);
        }
        registry.register(
            Table,
            BackendKind::Sql,
            "tableCustomSQLQuery",
            ValidatorEntry::new(TableCustomSqlQuery::boxed, &[]),
        );

        let columns: [(&str, ValidatorEntry); 16] = [
            (
                "columnValuesToBeBetween",
                ValidatorEntry::new(ColumnValuesToBeBetween::boxed, &[names::MIN, names::MAX]),
            ),
            (
                "columnValueMinToBeBetween",
                ValidatorEntry::new(BoundedMetricValidator::min, &[names::MIN]),
            ),
            (
                "columnValueMaxToBeBetween",
                ValidatorEntry::new(BoundedMetricValidator::max, &[names::MAX]),
            ),
            (
                "columnValueMeanToBeBetween",
                ValidatorEntry::new(BoundedMetricValidator::mean, &[names::MEAN]),
            ),
            (
                "columnValueMedianToBeBetween",
                ValidatorEntry::new(BoundedMetricValidator::median, &[names::MEDIAN]),
            ),
            (
                "columnValueStdDevToBeBetween",
                ValidatorEntry::new(BoundedMetricValidator::stddev, &[names::STDDEV]),
            ),
            (
                "columnValuesSumToBeBetween",
                ValidatorEntry::new(BoundedMetricValidator::sum, &[names::SUM]),
            ),
            (
                "columnValuesUniqueProportionToBeBetween",
                ValidatorEntry::new(
                    BoundedMetricValidator::unique_proportion,
                    &[names::UNIQUE_PROPORTION],
                ),
            ),
            (
                "columnValueLengthsToBeBetween",
                ValidatorEntry::new(
                    ColumnValueLengthsToBeBetween::boxed,
                    &[names::MIN_LENGTH, names::MAX_LENGTH],
                ),
            ),
            (
                "columnValuesToBeNotNull",
                ValidatorEntry::new(ColumnValuesToBeNotNull::boxed, &[names::NULL_COUNT]),
            ),
            (
                "columnValuesToBeUnique",
                ValidatorEntry::new(
                    ColumnValuesToBeUnique::boxed,
                    &[names::VALUES_COUNT, names::UNIQUE_COUNT],
                ),
            ),
            (
                "columnValuesToBeInSet",
                ValidatorEntry::new(
                    ColumnValuesToBeInSet::boxed,
                    &[names::COUNT_IN_SET, names::VALUES_COUNT],
                ),
            ),
            (
                "columnValuesToBeNotInSet",
                ValidatorEntry::new(ColumnValuesToBeNotInSet::boxed, &[names::COUNT_IN_SET]),
            ),
            (
                "columnValuesToMatchRegex",
                ValidatorEntry::new(
                    ColumnValuesToMatchRegex::boxed,
                    &[names::VALUES_COUNT, names::REGEX_COUNT],
                ),
            ),
            (
                "columnValuesToNotMatchRegex",
                ValidatorEntry::new(
                    ColumnValuesToNotMatchRegex::boxed,
                    &[names::VALUES_COUNT, names::REGEX_COUNT],
                ),
            ),
            (
                "columnValuesMissingCount",
                ValidatorEntry::new(
                    ColumnValuesMissingCount::boxed,
                    &[names::NULL_COUNT, names::COUNT_IN_SET],
                ),
            ),
        ];
        for (name, entry) in columns {
            registry.register_everywhere(Column, name, entry);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TestDefinitionCatalog;

    #[test]
    fn test_standard_registry_is_consistent() {
        let registry = ValidatorRegistry::standard();
        registry.validate(&MetricRegistry::standard()).unwrap();
        // 23 definitions on two backends, custom SQL on one
        assert_eq!(registry.len(), 23 * 2 + 1);
    }

    #[test]
    fn test_every_builtin_definition_has_a_validator() {
        let registry = ValidatorRegistry::standard();
        let catalog = TestDefinitionCatalog::standard();
        for name in catalog.names() {
            let definition = catalog.get(name).unwrap();
            assert!(
                registry.contains(definition.entity_type, BackendKind::Sql, name),
                "no SQL validator for {name}"
            );
        }
    }

    #[test]
    fn test_unsupported_combination_names_all_keys() {
        let registry = ValidatorRegistry::standard();
        let err = registry
            .resolve(EntityType::Table, BackendKind::Sql, "foo")
            .unwrap_err();
        assert!(err.is_configuration_error());
        let message = err.to_string();
        assert!(message.contains("TABLE"));
        assert!(message.contains("foo"));
        assert!(message.contains("sql"));

        // entity type is part of the key
        assert!(registry
            .resolve(EntityType::Table, BackendKind::Sql, "columnValuesToBeNotNull")
            .is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_metrics() {
        let mut registry = ValidatorRegistry::new();
        registry.register(
            EntityType::Table,
            BackendKind::Tabular,
            "broken",
            ValidatorEntry::new(TableRowCountToEqual::boxed, &["rowCountt"]),
        );
        assert!(matches!(
            registry.validate(&MetricRegistry::standard()),
            Err(TermError::UnknownMetric(name)) if name == "rowCountt"
        ));
    }
}
