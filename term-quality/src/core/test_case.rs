//! Test cases and their results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw parameter value as delivered by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseParameterValue {
    pub name: String,
    pub value: String,
}

impl TestCaseParameterValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A concrete instantiation of a test definition against an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub name: String,
    pub entity_link: String,
    /// Fully qualified name of the test definition.
    pub test_definition: String,
    #[serde(default)]
    pub parameter_values: Vec<TestCaseParameterValue>,
}

impl TestCase {
    pub fn new(
        name: impl Into<String>,
        entity_link: impl Into<String>,
        test_definition: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            entity_link: entity_link.into(),
            test_definition: test_definition.into(),
            parameter_values: Vec::new(),
        }
    }

    /// Appends a parameter value.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameter_values
            .push(TestCaseParameterValue::new(name, value));
        self
    }
}

/// Terminal status of a test case run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestCaseStatus {
    /// Metrics were computed and satisfied the predicate.
    Success,
    /// Metrics were computed and did not satisfy the predicate.
    Failed,
    /// Metrics could not be computed.
    Aborted,
}

impl fmt::Display for TestCaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestCaseStatus::Success => write!(f, "Success"),
            TestCaseStatus::Failed => write!(f, "Failed"),
            TestCaseStatus::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Lifecycle of a single validation: `Pending -> Running -> terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Pending,
    Running,
    Finished(TestCaseStatus),
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionState::Finished(_))
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionState::Pending => write!(f, "Pending"),
            ExecutionState::Running => write!(f, "Running"),
            ExecutionState::Finished(status) => write!(f, "{status}"),
        }
    }
}

/// A named result value; `None` when its computation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultValue {
    pub name: String,
    pub value: Option<String>,
}

impl TestResultValue {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn some(name: impl Into<String>, value: impl ToString) -> Self {
        Self::new(name, Some(value.to_string()))
    }

    pub fn none(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }
}

/// Passed and failed row counts of a row-level test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCounts {
    pub passed: i64,
    pub failed: i64,
}

impl RowCounts {
    /// Derives counts from the failing rows out of `total`.
    pub fn from_failed(total: i64, failed: i64) -> Self {
        Self {
            passed: (total - failed).max(0),
            failed,
        }
    }

    /// Derives counts from the passing rows out of `total`.
    pub fn from_passed(total: i64, passed: i64) -> Self {
        Self {
            passed,
            failed: (total - passed).max(0),
        }
    }
}

/// The outcome of one validator invocation.
///
/// Fields are read-only; a result is built once and returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    timestamp: DateTime<Utc>,
    test_case_status: TestCaseStatus,
    result: String,
    test_result_value: Vec<TestResultValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    passed_rows: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_rows: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    passed_rows_percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_rows_percentage: Option<f64>,
}

impl TestCaseResult {
    pub fn new(
        status: TestCaseStatus,
        message: impl Into<String>,
        values: Vec<TestResultValue>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            test_case_status: status,
            result: message.into(),
            test_result_value: values,
            passed_rows: None,
            failed_rows: None,
            passed_rows_percentage: None,
            failed_rows_percentage: None,
        }
    }

    /// An aborted result; every expected value is reported as absent.
    pub fn aborted(message: impl Into<String>, result_names: &[&str]) -> Self {
        let values = result_names
            .iter()
            .map(|name| TestResultValue::none(*name))
            .collect();
        Self::new(TestCaseStatus::Aborted, message, values)
    }

    /// Attaches row counts. Percentages are left empty for an empty table.
    pub(crate) fn with_row_counts(mut self, counts: RowCounts) -> Self {
        let total = counts.passed + counts.failed;
        self.passed_rows = Some(counts.passed);
        self.failed_rows = Some(counts.failed);
        if total > 0 {
            self.passed_rows_percentage = Some(counts.passed as f64 / total as f64 * 100.0);
            self.failed_rows_percentage = Some(counts.failed as f64 / total as f64 * 100.0);
        }
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn status(&self) -> TestCaseStatus {
        self.test_case_status
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.result
    }

    pub fn values(&self) -> &[TestResultValue] {
        &self.test_result_value
    }

    /// Looks up a result value by name.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.test_result_value
            .iter()
            .find(|v| v.name == name)
            .and_then(|v| v.value.as_deref())
    }

    pub fn passed_rows(&self) -> Option<i64> {
        self.passed_rows
    }

    pub fn failed_rows(&self) -> Option<i64> {
        self.failed_rows
    }

    pub fn passed_rows_percentage(&self) -> Option<f64> {
        self.passed_rows_percentage
    }

    pub fn failed_rows_percentage(&self) -> Option<f64> {
        self.failed_rows_percentage
    }
}

/// Envelope returned by the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResultResponse {
    pub test_case: TestCase,
    pub test_case_result: TestCaseResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aborted_result_has_empty_values() {
        let result = TestCaseResult::aborted("boom", &["min", "max"]);
        assert_eq!(result.status(), TestCaseStatus::Aborted);
        assert_eq!(result.values().len(), 2);
        assert!(result.values().iter().all(|v| v.value.is_none()));
        assert_eq!(result.value("min"), None);
    }

    #[test]
    fn test_row_counts_and_percentages() {
        let result = TestCaseResult::new(TestCaseStatus::Failed, "x", vec![])
            .with_row_counts(RowCounts::from_failed(4, 1));
        assert_eq!(result.passed_rows(), Some(3));
        assert_eq!(result.failed_rows(), Some(1));
        assert_eq!(result.passed_rows_percentage(), Some(75.0));
        assert_eq!(result.failed_rows_percentage(), Some(25.0));

        let empty = TestCaseResult::new(TestCaseStatus::Success, "x", vec![])
            .with_row_counts(RowCounts::from_passed(0, 0));
        assert_eq!(empty.passed_rows(), Some(0));
        assert_eq!(empty.passed_rows_percentage(), None);
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let response = TestCaseResultResponse {
            test_case: TestCase::new("rows", "table::users", "tableRowCountToEqual")
                .with_parameter("value", "3"),
            test_case_result: TestCaseResult::new(
                TestCaseStatus::Success,
                "Found 3 rows vs. the expected 3.",
                vec![TestResultValue::some("rowCount", 3)],
            ),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["testCase"]["testDefinition"], "tableRowCountToEqual");
        assert_eq!(json["testCaseResult"]["testCaseStatus"], "Success");
        assert_eq!(json["testCaseResult"]["testResultValue"][0]["value"], "3");
        assert!(json["testCaseResult"].get("passedRows").is_none());
    }

    #[test]
    fn test_execution_state() {
        assert!(!ExecutionState::Running.is_terminal());
        let done = ExecutionState::Finished(TestCaseStatus::Aborted);
        assert!(done.is_terminal());
        assert_eq!(done.to_string(), "Aborted");
    }
}
