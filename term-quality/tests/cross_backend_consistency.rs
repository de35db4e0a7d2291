//! The same test case must produce the same status and values on the tabular
//! and SQL backends.

mod common;

use term_quality::core::{TestCase, TestCaseResult};
use term_quality::runner::{RunOptions, TestRunner};

fn column(name: &str, column: &str, definition: &str) -> TestCase {
    TestCase::new(
        name,
        format!("<#E::table::shop.public.orders::columns::{column}>"),
        definition,
    )
}

fn table(name: &str, definition: &str) -> TestCase {
    TestCase::new(name, "<#E::table::shop.public.orders>", definition)
}

fn cases() -> Vec<TestCase> {
    vec![
        table("rows", "tableRowCountToBeBetween")
            .with_parameter("minValue", "5")
            .with_parameter("maxValue", "10"),
        table("rows_equal", "tableRowCountToEqual").with_parameter("value", "7"),
        table("columns", "tableColumnCountToEqual").with_parameter("columnCount", "4"),
        table("has_amount", "tableColumnNameToExist").with_parameter("columnName", "amount"),
        table("column_set", "tableColumnToMatchSet")
            .with_parameter("columnNames", "id, status, amount, created_at")
            .with_parameter("ordered", "true"),
        column("id_range", "id", "columnValuesToBeBetween")
            .with_parameter("minValue", "1")
            .with_parameter("maxValue", "8"),
        column("max_amount", "amount", "columnValueMaxToBeBetween")
            .with_parameter("maxValueForMaxInCol", "35"),
        column("min_amount", "amount", "columnValueMinToBeBetween")
            .with_parameter("minValueForMinInCol", "5"),
        column("sum_amount", "amount", "columnValuesSumToBeBetween")
            .with_parameter("minValueForColSum", "100")
            .with_parameter("maxValueForColSum", "200"),
        column("median_id", "id", "columnValueMedianToBeBetween")
            .with_parameter("minValueForMedianInCol", "4"),
        column("status_unique", "status", "columnValuesToBeUnique"),
        column("id_unique", "id", "columnValuesToBeUnique"),
        column("status_proportion", "status", "columnValuesUniqueProportionToBeBetween")
            .with_parameter("maxValueForUniqueProportion", "0.5"),
        column("status_nulls", "status", "columnValuesToBeNotNull"),
        column("status_in_set", "status", "columnValuesToBeInSet")
            .with_parameter("allowedValues", r#"["new", "paid", "shipped"]"#),
        column("status_enum", "status", "columnValuesToBeInSet")
            .with_parameter("allowedValues", r#"["new", "paid", "shipped"]"#)
            .with_parameter("matchEnum", "true"),
        column("status_not_in_set", "status", "columnValuesToBeNotInSet")
            .with_parameter("forbiddenValues", r#"["void"]"#),
        column("status_lengths", "status", "columnValueLengthsToBeBetween")
            .with_parameter("minLength", "3")
            .with_parameter("maxLength", "4"),
        column("status_regex", "status", "columnValuesToMatchRegex")
            .with_parameter("regex", "^[a-z]+$"),
        column("status_not_regex", "status", "columnValuesToNotMatchRegex")
            .with_parameter("forbiddenRegex", "^v"),
        column("status_missing", "status", "columnValuesMissingCount")
            .with_parameter("missingCountValue", "2")
            .with_parameter("missingValueMatch", r#"["void"]"#),
        column("ghost", "ghost", "columnValuesToBeNotNull"),
    ]
}

async fn run(runner: &TestRunner) -> Vec<TestCaseResult> {
    runner
        .run_all(&cases(), RunOptions::default())
        .await
        .unwrap()
        .responses
        .into_iter()
        .map(|r| r.test_case_result)
        .collect()
}

#[tokio::test]
async fn test_backends_agree_on_every_built_in_column_and_table_test() {
    let tabular = TestRunner::try_new(common::tabular("orders", common::orders())).unwrap();
    let sql = TestRunner::try_new(common::sql("orders", common::orders()).await).unwrap();

    let left = run(&tabular).await;
    let right = run(&sql).await;
    assert_eq!(left.len(), cases().len());

    for ((case, l), r) in cases().iter().zip(&left).zip(&right) {
        assert_eq!(l.status(), r.status(), "{}: {} vs {}", case.name, l.message(), r.message());
        assert_eq!(l.values(), r.values(), "{}", case.name);
        assert_eq!(l.passed_rows(), r.passed_rows(), "{}", case.name);
        assert_eq!(l.failed_rows(), r.failed_rows(), "{}", case.name);
    }
}

#[tokio::test]
async fn test_expected_outcomes_on_orders() {
    let sql = TestRunner::try_new(common::sql("orders", common::orders()).await).unwrap();
    let results = run(&sql).await;
    let by_name = |name: &str| {
        let index = cases().iter().position(|c| c.name == name).unwrap();
        results[index].clone()
    };

    use term_quality::core::TestCaseStatus::*;
    assert_eq!(by_name("rows").status(), Success);
    assert_eq!(by_name("rows_equal").value("rowCount"), Some("8"));
    assert_eq!(by_name("rows_equal").status(), Failed);
    assert_eq!(by_name("column_set").status(), Success);
    assert_eq!(by_name("max_amount").value("max"), Some("40"));
    assert_eq!(by_name("max_amount").status(), Failed);
    assert_eq!(by_name("sum_amount").value("sum"), Some("122.75"));
    assert_eq!(by_name("status_unique").status(), Failed);
    assert_eq!(by_name("id_unique").status(), Success);
    assert_eq!(by_name("status_nulls").value("nullCount"), Some("1"));
    assert_eq!(by_name("status_in_set").status(), Success);
    assert_eq!(by_name("status_enum").status(), Failed);
    assert_eq!(by_name("status_not_in_set").value("countForbiddenValues"), Some("1"));
    assert_eq!(by_name("status_lengths").status(), Failed);
    assert_eq!(by_name("status_not_regex").value("notLikeCount"), Some("1"));
    assert_eq!(by_name("status_missing").status(), Success);
    assert_eq!(by_name("ghost").status(), Aborted);
}
