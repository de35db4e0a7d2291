//! # Term Quality - Test-Case Validation and Profiling
//!
//! Term Quality evaluates declarative data quality test cases against a table
//! and reports a structured result for each one. The same test case runs
//! unchanged on two kinds of backend: an in-memory tabular backend over Arrow
//! record batches, and a SQL-pushdown backend that turns every metric request
//! into a query executed by DataFusion.
//!
//! ## Quick Start
//!
//! ```rust
//! use term_quality::prelude::*;
//! use arrow::array::{Int64Array, StringArray};
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use std::sync::Arc;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let schema = Arc::new(Schema::new(vec![
//!     Field::new("id", DataType::Int64, false),
//!     Field::new("email", DataType::Utf8, true),
//! ]));
//! let batch = RecordBatch::try_new(
//!     schema,
//!     vec![
//!         Arc::new(Int64Array::from(vec![1, 2, 3])),
//!         Arc::new(StringArray::from(vec!["a@x.com", "bad", "c@x.com"])),
//!     ],
//! )?;
//!
//! let backend = TabularBackend::from_batches("users", vec![batch])?;
//! let runner = TestRunner::try_new(Arc::new(backend))?;
//!
//! let test_case = TestCase::new(
//!     "email_format",
//!     "<#E::table::shop.public.users::columns::email>",
//!     "columnValuesToMatchRegex",
//! )
//! .with_parameter("regex", r"^[^@\s]+@[^@\s]+\.[a-z]+$");
//!
//! let response = runner.run_and_handle(&test_case).await?;
//! assert_eq!(response.test_case_result.status(), TestCaseStatus::Failed);
//! println!("{}", response.test_case_result.message());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`core`**: test definitions, test cases, entity links, parameter binding,
//!   table and column handles, results, sampling and partition configuration
//! - **`metrics`**: the metric registry (static and composed metrics) and the
//!   resolver that computes them in dependency order
//! - **`backends`**: the tabular and SQL backends behind one async trait
//! - **`validators`**: one validator per built-in test definition and the
//!   static registry that maps (entity type, backend, definition) to it
//! - **`builder`** / **`runner`**: resolution of a test case to its validator
//!   and batch execution
//! - **`profiler`**: table and column profiles computed from the same metrics
//!
//! ## Error handling
//!
//! Only configuration errors leave the engine: an unsupported test, an
//! unknown metric or definition, a malformed entity link. Everything that goes
//! wrong while computing metrics becomes an `Aborted` result, so a batch keeps
//! going when individual test cases cannot be evaluated.

pub mod backends;
pub mod builder;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod prelude;
pub mod profiler;
pub mod runner;
pub mod security;
pub mod validators;

#[cfg(test)]
mod test_helpers;
