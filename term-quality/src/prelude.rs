//! Prelude for commonly used types and traits in term-quality.

pub use crate::backends::{Backend, BackendKind, SqlBackend, TabularBackend};
pub use crate::builder::ValidatorBuilder;
pub use crate::config::EngineConfig;
pub use crate::core::{
    EntityLink, EntityType, PartitionConfig, PartitionMethod, ProfileConfig, SampleConfig,
    TestCase, TestCaseResult, TestCaseResultResponse, TestCaseStatus, TestDefinitionCatalog,
};
pub use crate::error::{ErrorContext, Result, TermError};
pub use crate::logging::LogConfig;
pub use crate::metrics::{MetricRegistry, MetricValue};
pub use crate::profiler::{ProfileOptions, TableProfiler};
pub use crate::runner::{RunOptions, TestRunner};
pub use crate::validators::{Validator, ValidatorRegistry};
