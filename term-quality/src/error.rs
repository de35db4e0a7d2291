//! Error types for the Term quality engine.
//!
//! This module provides the error taxonomy of the engine using `thiserror`.
//! All errors are represented by the [`TermError`] enum, and they fall into two
//! families:
//!
//! - **Configuration errors** (unsupported test, unknown metric, bad entity link,
//!   unpublished test definition). These escape the engine and are meant to stop
//!   the batch that scheduled the test case.
//! - **Runtime errors** (parameter coercion, metric computation, timeouts,
//!   engine failures). Validators catch these and turn them into an `Aborted`
//!   test case result.

use crate::backends::BackendKind;
use crate::core::EntityType;
use std::time::Duration;
use thiserror::Error;

/// The main error type for the Term quality engine.
#[derive(Error, Debug)]
pub enum TermError {
    /// A test case parameter is missing, unknown, or fails type coercion.
    #[error("Invalid parameter '{name}': {message}")]
    Parameter {
        /// Name of the offending parameter
        name: String,
        /// Detailed error message
        message: String,
    },

    /// No validator is registered for the requested combination.
    #[error(
        "No validator registered for {entity_type} test '{test_definition}' on the {backend} backend"
    )]
    UnsupportedTest {
        /// Entity type the test case targets
        entity_type: EntityType,
        /// Backend the test case was scheduled on
        backend: BackendKind,
        /// Fully qualified name of the test definition
        test_definition: String,
    },

    /// A metric could not be computed (type incompatibility, engine failure).
    #[error("Metric '{metric}' could not be computed: {message}")]
    MetricComputation {
        /// Name of the metric
        metric: String,
        /// Detailed error message
        message: String,
    },

    /// A metric request exceeded the caller-supplied timeout.
    #[error("Metric '{metric}' timed out after {timeout:?}")]
    MetricTimeout {
        /// Name of the metric
        metric: String,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// The metric name is not registered.
    #[error("Unknown metric '{0}'")]
    UnknownMetric(String),

    /// The required-metrics graph contains a cycle.
    #[error("Metric dependency cycle detected at '{0}'")]
    MetricCycle(String),

    /// No published test definition has the given fully qualified name.
    #[error("Test definition '{0}' is not published")]
    UnknownTestDefinition(String),

    /// The entity link could not be parsed.
    #[error("Invalid entity link '{link}': {message}")]
    EntityLink {
        /// The raw link
        link: String,
        /// Detailed error message
        message: String,
    },

    /// A column referenced by a test case does not exist in the table.
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound {
        /// The missing column
        column: String,
        /// The table that was searched
        table: String,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Security-related error (rejected identifier, pattern, or query).
    #[error("Security error: {0}")]
    SecurityError(String),

    /// Error when an operation is not supported by a backend.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, TermError>`.
///
/// This is the standard `Result` type used throughout the engine.
pub type Result<T> = std::result::Result<T, TermError>;

impl TermError {
    /// Creates a new parameter error.
    pub fn parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a new metric computation error.
    pub fn metric_computation(metric: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MetricComputation {
            metric: metric.into(),
            message: message.into(),
        }
    }

    /// Creates a new entity link error.
    pub fn entity_link(link: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EntityLink {
            link: link.into(),
            message: message.into(),
        }
    }

    /// Returns true when the error is a configuration error that must escape
    /// the engine instead of being reported as an aborted test case.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            TermError::UnsupportedTest { .. }
                | TermError::UnknownMetric(_)
                | TermError::MetricCycle(_)
                | TermError::UnknownTestDefinition(_)
                | TermError::EntityLink { .. }
                | TermError::Configuration(_)
        )
    }
}

impl From<serde_json::Error> for TermError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<TermError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            TermError::Internal(inner) => TermError::Internal(format!("{msg}: {inner}")),
            other => TermError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                TermError::Internal(inner) => TermError::Internal(format!("{msg}: {inner}")),
                other => TermError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
