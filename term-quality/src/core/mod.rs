//! Core data model of the quality engine.
//!
//! ## Overview
//!
//! - **[`TestDefinition`]**: the published schema of a check, looked up in a
//!   [`TestDefinitionCatalog`] by fully qualified name
//! - **[`TestCase`]**: a definition bound to an [`EntityLink`] and raw parameter values
//! - **[`ParameterSet`]**: parameter values coerced against the definition
//! - **[`TableHandle`] / [`ColumnHandle`]**: backend-neutral views of the data under test
//! - **[`TestCaseResult`]**: the immutable outcome of one validation
//! - **[`ProfileConfig`]**: sampling and partitioning attached to a table
//!
//! ## Example
//!
//! ```rust
//! use term_quality::core::{EntityLink, EntityType, ParameterSet, TestCase, TestDefinitionCatalog};
//!
//! let test_case = TestCase::new(
//!     "email_format",
//!     "<#E::table::shop.public.users::columns::email>",
//!     "columnValuesToMatchRegex",
//! )
//! .with_parameter("regex", r"^[^@\s]+@[^@\s]+\.[a-z]+$");
//!
//! let link = EntityLink::parse(&test_case.entity_link).unwrap();
//! assert_eq!(link.entity_type(), EntityType::Column);
//!
//! let definition = TestDefinitionCatalog::standard()
//!     .get(&test_case.test_definition)
//!     .unwrap();
//! let params = ParameterSet::bind(&definition, &test_case.parameter_values).unwrap();
//! assert!(params.string("regex").is_ok());
//! ```

mod catalog;
pub mod definition;
pub mod entity_link;
pub mod handle;
pub mod parameters;
pub mod sampling;
pub mod test_case;

pub use definition::{ParameterDefinition, ParameterType, TestDefinition, TestDefinitionCatalog};
pub use entity_link::{EntityLink, EntityType};
pub use handle::{ColumnHandle, SemanticType, TableHandle};
pub use parameters::{Bounds, ParameterSet, ParameterValue};
pub use sampling::{
    PartitionConfig, PartitionFilter, PartitionMethod, PartitionPredicate, ProfileConfig,
    SampleConfig, TimeUnit,
};
pub use test_case::{
    ExecutionState, RowCounts, TestCase, TestCaseParameterValue, TestCaseResult,
    TestCaseResultResponse, TestCaseStatus, TestResultValue,
};
