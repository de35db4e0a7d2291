//! Column-level validators.

use super::{required, required_count, row_count_for, Validator, ValidatorContext, Verdict};
use crate::core::{ParameterSet, RowCounts, TestResultValue};
use crate::error::{Result, TermError};
use crate::metrics::{names, MetricArgs};
use async_trait::async_trait;

validator!(
    /// `columnValuesToBeBetween`: both the column minimum and maximum lie in
    /// `[minValue, maxValue]`.
    ColumnValuesToBeBetween,
    ["min", "max"]
);

impl ColumnValuesToBeBetween {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let bounds = params.bounds("minValue", "maxValue");
        let results = self
            .ctx
            .column_metrics(&[names::MIN, names::MAX], &MetricArgs::default())
            .await?;
        let min = required(&results, names::MIN)?;
        let max = required(&results, names::MAX)?;
        Ok(Verdict::new(
            bounds.contains(min) && bounds.contains(max),
            format!(
                "Found min={min}, max={max} vs. the expected min={}, max={}.",
                bounds.min, bounds.max
            ),
            vec![
                TestResultValue::some("min", min),
                TestResultValue::some("max", max),
            ],
        ))
    }
}

/// One metric compared against a closed interval taken from two parameters.
#[derive(Debug)]
pub struct BoundedMetric {
    pub metric: &'static str,
    pub min_param: &'static str,
    pub max_param: &'static str,
    /// Name of the single result value.
    pub result: &'static str,
}

pub const MIN_BOUNDED: BoundedMetric = BoundedMetric {
    metric: names::MIN,
    min_param: "minValueForMinInCol",
    max_param: "maxValueForMinInCol",
    result: "min",
};

pub const MAX_BOUNDED: BoundedMetric = BoundedMetric {
    metric: names::MAX,
    min_param: "minValueForMaxInCol",
    max_param: "maxValueForMaxInCol",
    result: "max",
};

pub const MEAN_BOUNDED: BoundedMetric = BoundedMetric {
    metric: names::MEAN,
    min_param: "minValueForMeanInCol",
    max_param: "maxValueForMeanInCol",
    result: "mean",
};

pub const MEDIAN_BOUNDED: BoundedMetric = BoundedMetric {
    metric: names::MEDIAN,
    min_param: "minValueForMedianInCol",
    max_param: "maxValueForMedianInCol",
    result: "median",
};

pub const STDDEV_BOUNDED: BoundedMetric = BoundedMetric {
    metric: names::STDDEV,
    min_param: "minValueForStdDevInCol",
    max_param: "maxValueForStdDevInCol",
    result: "stddev",
};

pub const SUM_BOUNDED: BoundedMetric = BoundedMetric {
    metric: names::SUM,
    min_param: "minValueForColSum",
    max_param: "maxValueForColSum",
    result: "sum",
};

pub const UNIQUE_PROPORTION_BOUNDED: BoundedMetric = BoundedMetric {
    metric: names::UNIQUE_PROPORTION,
    min_param: "minValueForUniqueProportion",
    max_param: "maxValueForUniqueProportion",
    result: "uniqueProportion",
};

/// Validates a [`BoundedMetric`]. Shared by the min, max, mean, median,
/// stddev, sum and unique proportion tests.
#[derive(Debug)]
pub struct BoundedMetricValidator {
    ctx: ValidatorContext,
    bounded: &'static BoundedMetric,
}

impl BoundedMetricValidator {
    pub fn new(ctx: ValidatorContext, bounded: &'static BoundedMetric) -> Self {
        Self { ctx, bounded }
    }

    pub fn min(ctx: ValidatorContext) -> Box<dyn Validator> {
        Box::new(Self::new(ctx, &MIN_BOUNDED))
    }

    pub fn max(ctx: ValidatorContext) -> Box<dyn Validator> {
        Box::new(Self::new(ctx, &MAX_BOUNDED))
    }

    pub fn mean(ctx: ValidatorContext) -> Box<dyn Validator> {
        Box::new(Self::new(ctx, &MEAN_BOUNDED))
    }

    pub fn median(ctx: ValidatorContext) -> Box<dyn Validator> {
        Box::new(Self::new(ctx, &MEDIAN_BOUNDED))
    }

    pub fn stddev(ctx: ValidatorContext) -> Box<dyn Validator> {
        Box::new(Self::new(ctx, &STDDEV_BOUNDED))
    }

    pub fn sum(ctx: ValidatorContext) -> Box<dyn Validator> {
        Box::new(Self::new(ctx, &SUM_BOUNDED))
    }

    pub fn unique_proportion(ctx: ValidatorContext) -> Box<dyn Validator> {
        Box::new(Self::new(ctx, &UNIQUE_PROPORTION_BOUNDED))
    }
}

#[async_trait]
impl Validator for BoundedMetricValidator {
    fn context(&self) -> &ValidatorContext {
        &self.ctx
    }

    fn result_names(&self) -> &'static [&'static str] {
        let bounded: &'static BoundedMetric = self.bounded;
        std::slice::from_ref(&bounded.result)
    }

    async fn evaluate(&self, params: &ParameterSet) -> Result<Verdict> {
        let bounded = self.bounded;
        let bounds = params.bounds(bounded.min_param, bounded.max_param);
        let results = self
            .ctx
            .column_metrics(&[bounded.metric], &MetricArgs::default())
            .await?;
        let value = required(&results, bounded.metric)?;
        Ok(Verdict::new(
            bounds.contains(value),
            format!("Found {}={value} vs. the expected range {bounds}.", bounded.result),
            vec![TestResultValue::some(bounded.result, value)],
        ))
    }
}

validator!(
    /// `columnValueLengthsToBeBetween`: the shortest and longest text values
    /// lie in `[minLength, maxLength]`.
    ColumnValueLengthsToBeBetween,
    ["minValueLength", "maxValueLength"]
);

impl ColumnValueLengthsToBeBetween {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let bounds = params.bounds("minLength", "maxLength");
        let results = self
            .ctx
            .column_metrics(&[names::MIN_LENGTH, names::MAX_LENGTH], &MetricArgs::default())
            .await?;
        let shortest = required_count(&results, names::MIN_LENGTH)?;
        let longest = required_count(&results, names::MAX_LENGTH)?;
        Ok(Verdict::new(
            bounds.contains(shortest as f64) && bounds.contains(longest as f64),
            format!(
                "Found minLength={shortest}, maxLength={longest} vs. the expected range {bounds}."
            ),
            vec![
                TestResultValue::some("minValueLength", shortest),
                TestResultValue::some("maxValueLength", longest),
            ],
        ))
    }
}

validator!(
    /// `columnValuesToBeNotNull`: the column has no nulls.
    ColumnValuesToBeNotNull,
    ["nullCount"]
);

impl ColumnValuesToBeNotNull {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let results = self
            .ctx
            .column_metrics(&[names::NULL_COUNT], &MetricArgs::default())
            .await?;
        let nulls = required_count(&results, names::NULL_COUNT)?;
        let rows = row_count_for(&self.ctx, params).await?;
        Ok(Verdict::new(
            nulls == 0,
            format!("Found nullCount={nulls}. It should be 0"),
            vec![TestResultValue::some("nullCount", nulls)],
        )
        .with_row_counts(rows.map(|total| RowCounts::from_failed(total, nulls))))
    }
}

validator!(
    /// `columnValuesToBeUnique`: every non-null value occurs exactly once.
    ColumnValuesToBeUnique,
    ["valuesCount", "uniqueCount"]
);

impl ColumnValuesToBeUnique {
    async fn check(&self, _params: &ParameterSet) -> Result<Verdict> {
        let results = self
            .ctx
            .column_metrics(&[names::VALUES_COUNT, names::UNIQUE_COUNT], &MetricArgs::default())
            .await?;
        let values = required_count(&results, names::VALUES_COUNT)?;
        let unique = required_count(&results, names::UNIQUE_COUNT)?;
        Ok(Verdict::new(
            values == unique,
            format!(
                "Found valuesCount={values} vs. uniqueCount={unique}. Both counts should be equal."
            ),
            vec![
                TestResultValue::some("valuesCount", values),
                TestResultValue::some("uniqueCount", unique),
            ],
        ))
    }
}

validator!(
    /// `columnValuesToBeInSet`: values belong to `allowedValues`. With
    /// `matchEnum` every non-null value must be allowed; otherwise at least
    /// one must be.
    ColumnValuesToBeInSet,
    ["allowedValueCount"]
);

impl ColumnValuesToBeInSet {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let allowed = params.list("allowedValues").to_vec();
        let match_enum = params.bool_or("matchEnum", false);
        let args = MetricArgs::default().with_values(allowed);
        let results = self
            .ctx
            .column_metrics(&[names::COUNT_IN_SET, names::VALUES_COUNT], &args)
            .await?;
        let found = required_count(&results, names::COUNT_IN_SET)?;
        let values = required_count(&results, names::VALUES_COUNT)?;
        let passed = if match_enum { found == values } else { found > 0 };
        let rows = row_count_for(&self.ctx, params).await?;
        Ok(Verdict::new(
            passed,
            format!("Found countInSet={found} out of {values} value(s)."),
            vec![TestResultValue::some("allowedValueCount", found)],
        )
        .with_row_counts(rows.map(|total| RowCounts::from_passed(total, found))))
    }
}

validator!(
    /// `columnValuesToBeNotInSet`: no value belongs to `forbiddenValues`.
    ColumnValuesToBeNotInSet,
    ["countForbiddenValues"]
);

impl ColumnValuesToBeNotInSet {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let args = MetricArgs::default().with_values(params.list("forbiddenValues").to_vec());
        let results = self
            .ctx
            .column_metrics(&[names::COUNT_IN_SET], &args)
            .await?;
        let found = required_count(&results, names::COUNT_IN_SET)?;
        let rows = row_count_for(&self.ctx, params).await?;
        Ok(Verdict::new(
            found == 0,
            format!("Found countInSet={found}. It should be 0"),
            vec![TestResultValue::some("countForbiddenValues", found)],
        )
        .with_row_counts(rows.map(|total| RowCounts::from_failed(total, found))))
    }
}

validator!(
    /// `columnValuesToMatchRegex`: every non-null value matches `regex`.
    ColumnValuesToMatchRegex,
    ["likeCount"]
);

impl ColumnValuesToMatchRegex {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let args = MetricArgs::default().with_pattern(params.string("regex")?);
        let results = self
            .ctx
            .column_metrics(&[names::VALUES_COUNT, names::REGEX_COUNT], &args)
            .await?;
        let values = required_count(&results, names::VALUES_COUNT)?;
        let matching = required_count(&results, names::REGEX_COUNT)?;
        let rows = row_count_for(&self.ctx, params).await?;
        Ok(Verdict::new(
            matching == values,
            format!(
                "Found {matching} value(s) matching regex pattern vs {values} value(s) in the column."
            ),
            vec![TestResultValue::some("likeCount", matching)],
        )
        .with_row_counts(rows.map(|total| RowCounts::from_passed(total, matching))))
    }
}

validator!(
    /// `columnValuesToNotMatchRegex`: no value matches `forbiddenRegex`.
    ColumnValuesToNotMatchRegex,
    ["notLikeCount"]
);

impl ColumnValuesToNotMatchRegex {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let args = MetricArgs::default().with_pattern(params.string("forbiddenRegex")?);
        let results = self
            .ctx
            .column_metrics(&[names::VALUES_COUNT, names::REGEX_COUNT], &args)
            .await?;
        let values = required_count(&results, names::VALUES_COUNT)?;
        let matching = required_count(&results, names::REGEX_COUNT)?;
        let rows = row_count_for(&self.ctx, params).await?;
        Ok(Verdict::new(
            matching == 0,
            format!(
                "Found {matching} value(s) matching the forbidden regex pattern vs {values} value(s) in the column."
            ),
            vec![TestResultValue::some("notLikeCount", matching)],
        )
        .with_row_counts(rows.map(|total| RowCounts::from_failed(total, matching))))
    }
}

validator!(
    /// `columnValuesMissingCount`: nulls plus values listed in
    /// `missingValueMatch` add up to exactly `missingCountValue`.
    ColumnValuesMissingCount,
    ["nullCount"]
);

impl ColumnValuesMissingCount {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let expected = params.i64("missingCountValue")?;
        if expected < 0 {
            return Err(TermError::parameter(
                "missingCountValue",
                format!("expected a non-negative count, got {expected}"),
            ));
        }
        let placeholders = params.list("missingValueMatch").to_vec();

        let mut metrics = vec![names::NULL_COUNT];
        if !placeholders.is_empty() {
            metrics.push(names::COUNT_IN_SET);
        }
        let args = MetricArgs::default().with_values(placeholders);
        let results = self.ctx.column_metrics(&metrics, &args).await?;

        let mut missing = required_count(&results, names::NULL_COUNT)?;
        if results.contains(names::COUNT_IN_SET) {
            missing += required_count(&results, names::COUNT_IN_SET)?;
        }
        Ok(Verdict::new(
            missing == expected,
            format!("Found missingCount={missing} vs. the expected {expected}."),
            vec![TestResultValue::some("nullCount", missing)],
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{TestCase, TestCaseStatus};
    use crate::test_helpers::{orders_batches, run, tabular, users_batch};

    fn column_case(table: &str, column: &str, definition: &str) -> TestCase {
        TestCase::new(
            "c",
            format!("<#E::table::shop.public.{table}::columns::{column}>"),
            definition,
        )
    }

    #[tokio::test]
    async fn test_regex_match_reports_counts() {
        let backend = tabular("users", vec![users_batch()]);
        let result = run(
            backend,
            column_case("users", "email", "columnValuesToMatchRegex")
                .with_parameter("regex", r"^[^@\s]+@[^@\s]+\.[a-z]+$")
                .with_parameter("computePassedFailedRowCount", "true"),
        )
        .await;
        assert_eq!(result.status(), TestCaseStatus::Failed);
        assert_eq!(result.value("likeCount"), Some("2"));
        assert!(result
            .message()
            .contains("Found 2 value(s) matching regex pattern vs 3 value(s)"));
        assert_eq!(result.passed_rows(), Some(2));
        assert_eq!(result.failed_rows(), Some(1));
    }

    #[tokio::test]
    async fn test_not_null_with_row_counts() {
        let backend = tabular("orders", orders_batches());
        let result = run(
            backend,
            column_case("orders", "amount", "columnValuesToBeNotNull")
                .with_parameter("computePassedFailedRowCount", "true"),
        )
        .await;
        assert_eq!(result.status(), TestCaseStatus::Failed);
        assert_eq!(result.message(), "Found nullCount=1. It should be 0");
        assert_eq!(result.passed_rows(), Some(4));
        assert_eq!(result.failed_rows_percentage(), Some(20.0));
    }

    #[tokio::test]
    async fn test_bounded_metrics() {
        let backend = tabular("orders", orders_batches());
        let mean = run(
            backend.clone(),
            column_case("orders", "amount", "columnValueMeanToBeBetween")
                .with_parameter("minValueForMeanInCol", "20")
                .with_parameter("maxValueForMeanInCol", "30"),
        )
        .await;
        assert_eq!(mean.status(), TestCaseStatus::Success);
        assert_eq!(mean.value("mean"), Some("25"));

        let sum = run(
            backend.clone(),
            column_case("orders", "amount", "columnValuesSumToBeBetween").with_parameter("maxValueForColSum", "50"),
        )
        .await;
        assert_eq!(sum.status(), TestCaseStatus::Failed);
        assert_eq!(sum.value("sum"), Some("100"));

        // mean of a text column is unavailable
        let text = run(
            backend,
            column_case("orders", "status", "columnValueMeanToBeBetween"),
        )
        .await;
        assert_eq!(text.status(), TestCaseStatus::Aborted);
        assert_eq!(text.value("mean"), None);
        assert_eq!(text.values().len(), 1);
    }

    #[tokio::test]
    async fn test_values_between_uses_min_and_max() {
        let backend = tabular("orders", orders_batches());
        let result = run(
            backend,
            column_case("orders", "id", "columnValuesToBeBetween")
                .with_parameter("minValue", "1")
                .with_parameter("maxValue", "4"),
        )
        .await;
        assert_eq!(result.status(), TestCaseStatus::Failed);
        assert_eq!(result.value("min"), Some("1"));
        assert_eq!(result.value("max"), Some("5"));
    }

    #[tokio::test]
    async fn test_set_membership() {
        let backend = tabular("orders", orders_batches());
        let in_set = run(
            backend.clone(),
            column_case("orders", "status", "columnValuesToBeInSet")
                .with_parameter("allowedValues", r#"["new", "paid"]"#),
        )
        .await;
        assert_eq!(in_set.status(), TestCaseStatus::Success);
        assert_eq!(in_set.value("allowedValueCount"), Some("3"));

        let enum_match = run(
            backend.clone(),
            column_case("orders", "status", "columnValuesToBeInSet")
                .with_parameter("allowedValues", r#"["new", "paid"]"#)
                .with_parameter("matchEnum", "true"),
        )
        .await;
        assert_eq!(enum_match.status(), TestCaseStatus::Failed);

        let not_in_set = run(
            backend,
            column_case("orders", "status", "columnValuesToBeNotInSet")
                .with_parameter("forbiddenValues", r#"["void"]"#),
        )
        .await;
        assert_eq!(not_in_set.status(), TestCaseStatus::Failed);
        assert_eq!(not_in_set.value("countForbiddenValues"), Some("1"));
    }

    #[tokio::test]
    async fn test_uniqueness_and_missing_count() {
        let backend = tabular("orders", orders_batches());
        let unique = run(backend.clone(), column_case("orders", "status", "columnValuesToBeUnique")).await;
        assert_eq!(unique.status(), TestCaseStatus::Failed);
        assert_eq!(unique.value("valuesCount"), Some("4"));
        assert_eq!(unique.value("uniqueCount"), Some("2"));

        let proportion = run(
            backend.clone(),
            column_case("orders", "status", "columnValuesUniqueProportionToBeBetween")
                .with_parameter("minValueForUniqueProportion", "0.5"),
        )
        .await;
        assert_eq!(proportion.status(), TestCaseStatus::Success);
        assert_eq!(proportion.value("uniqueProportion"), Some("0.5"));

        let missing = run(
            backend,
            column_case("orders", "status", "columnValuesMissingCount")
                .with_parameter("missingCountValue", "2")
                .with_parameter("missingValueMatch", r#"["void"]"#),
        )
        .await;
        assert_eq!(missing.status(), TestCaseStatus::Success);
        assert_eq!(missing.value("nullCount"), Some("2"));
    }

    #[tokio::test]
    async fn test_lengths_and_forbidden_regex() {
        let backend = tabular("users", vec![users_batch()]);
        let lengths = run(
            backend.clone(),
            column_case("users", "email", "columnValueLengthsToBeBetween")
                .with_parameter("minLength", "3")
                .with_parameter("maxLength", "7"),
        )
        .await;
        assert_eq!(lengths.status(), TestCaseStatus::Success);
        assert_eq!(lengths.value("minValueLength"), Some("3"));
        assert_eq!(lengths.value("maxValueLength"), Some("7"));

        let forbidden = run(
            backend,
            column_case("users", "email", "columnValuesToNotMatchRegex").with_parameter("forbiddenRegex", "^bad$"),
        )
        .await;
        assert_eq!(forbidden.status(), TestCaseStatus::Failed);
        assert_eq!(forbidden.value("notLikeCount"), Some("1"));
    }

    #[tokio::test]
    async fn test_missing_column_aborts() {
        let backend = tabular("users", vec![users_batch()]);
        let result = run(backend, column_case("users", "phone", "columnValuesToBeNotNull")).await;
        assert_eq!(result.status(), TestCaseStatus::Aborted);
        assert!(result.message().contains("phone"));
    }
}
