//! Built-in test definitions.

use super::definition::{ParameterDefinition as P, ParameterType as T, TestDefinition};
use super::EntityType;

fn range_type() -> T {
    T::Enum {
        values: vec![
            "HOUR".to_string(),
            "DAY".to_string(),
            "MONTH".to_string(),
            "YEAR".to_string(),
        ],
    }
}

fn strategy() -> T {
    T::Enum {
        values: vec!["ROWS".to_string(), "COUNT".to_string()],
    }
}

fn column_bounded(name: &str, description: &str, min: &str, max: &str) -> TestDefinition {
    TestDefinition::new(name, EntityType::Column)
        .with_description(description)
        .with_parameter(P::optional(min, T::Float))
        .with_parameter(P::optional(max, T::Float))
}

fn computes_row_counts(definition: TestDefinition) -> TestDefinition {
    definition.with_parameter(
        P::optional("computePassedFailedRowCount", T::Boolean)
            .with_default("false")
            .with_description("Also report passed and failed row counts"),
    )
}

pub(super) fn standard_definitions() -> Vec<TestDefinition> {
    use EntityType::{Column, Table};

    vec![
        TestDefinition::new("tableRowCountToBeBetween", Table)
            .with_description("The number of rows in the table lies within a closed range")
            .with_parameter(P::optional("minValue", T::Int))
            .with_parameter(P::optional("maxValue", T::Int)),
        TestDefinition::new("tableRowCountToEqual", Table)
            .with_description("The table has exactly the expected number of rows")
            .with_parameter(P::required("value", T::Int)),
        TestDefinition::new("tableColumnCountToBeBetween", Table)
            .with_description("The number of columns lies within a closed range")
            .with_parameter(P::optional("minColValue", T::Int))
            .with_parameter(P::optional("maxColValue", T::Int)),
        TestDefinition::new("tableColumnCountToEqual", Table)
            .with_description("The table has exactly the expected number of columns")
            .with_parameter(P::required("columnCount", T::Int)),
        TestDefinition::new("tableColumnNameToExist", Table)
            .with_description("A column with the given name exists")
            .with_parameter(P::required("columnName", T::String)),
        TestDefinition::new("tableColumnToMatchSet", Table)
            .with_description("The table columns match a comma separated list of names")
            .with_parameter(P::required("columnNames", T::String))
            .with_parameter(
                P::optional("ordered", T::Boolean)
                    .with_default("false")
                    .with_description("Require the same column order"),
            ),
        TestDefinition::new("tableRowInsertedCountToBeBetween", Table)
            .with_description("Rows inserted within a recent time window lie within a closed range")
            .with_parameter(P::optional("min", T::Int))
            .with_parameter(P::optional("max", T::Int))
            .with_parameter(P::required("columnName", T::String))
            .with_parameter(P::optional("rangeType", range_type()).with_default("DAY"))
            .with_parameter(P::optional("rangeInterval", T::Int).with_default("1")),
        TestDefinition::new("tableCustomSQLQuery", Table)
            .with_description("A custom query returns no more rows than the threshold")
            .with_parameter(P::required("sqlExpression", T::String))
            .with_parameter(P::optional("strategy", strategy()).with_default("ROWS"))
            .with_parameter(P::optional("threshold", T::Int).with_default("0")),
        column_bounded(
            "columnValuesToBeBetween",
            "Column min and max lie within a closed range",
            "minValue",
            "maxValue",
        ),
        column_bounded(
            "columnValueMinToBeBetween",
            "The column minimum lies within a closed range",
            "minValueForMinInCol",
            "maxValueForMinInCol",
        ),
        column_bounded(
            "columnValueMaxToBeBetween",
            "The column maximum lies within a closed range",
            "minValueForMaxInCol",
            "maxValueForMaxInCol",
        ),
        column_bounded(
            "columnValueMeanToBeBetween",
            "The column mean lies within a closed range",
            "minValueForMeanInCol",
            "maxValueForMeanInCol",
        ),
        column_bounded(
            "columnValueMedianToBeBetween",
            "The column median lies within a closed range",
            "minValueForMedianInCol",
            "maxValueForMedianInCol",
        ),
        column_bounded(
            "columnValueStdDevToBeBetween",
            "The population standard deviation lies within a closed range",
            "minValueForStdDevInCol",
            "maxValueForStdDevInCol",
        ),
        column_bounded(
            "columnValuesSumToBeBetween",
            "The column sum lies within a closed range",
            "minValueForColSum",
            "maxValueForColSum",
        ),
        column_bounded(
            "columnValuesUniqueProportionToBeBetween",
            "The share of values occurring exactly once lies within a closed range",
            "minValueForUniqueProportion",
            "maxValueForUniqueProportion",
        ),
        TestDefinition::new("columnValueLengthsToBeBetween", Column)
            .with_description("Text value lengths lie within a closed range")
            .with_parameter(P::optional("minLength", T::Int))
            .with_parameter(P::optional("maxLength", T::Int)),
        computes_row_counts(
            TestDefinition::new("columnValuesToBeNotNull", Column)
                .with_description("The column contains no null values"),
        ),
        TestDefinition::new("columnValuesToBeUnique", Column)
            .with_description("Every non-null value occurs exactly once"),
        computes_row_counts(
            TestDefinition::new("columnValuesToBeInSet", Column)
                .with_description("Column values belong to the allowed set")
                .with_parameter(P::required("allowedValues", T::Array))
                .with_parameter(
                    P::optional("matchEnum", T::Boolean)
                        .with_default("false")
                        .with_description("Require every non-null value to be allowed"),
                ),
        ),
        computes_row_counts(
            TestDefinition::new("columnValuesToBeNotInSet", Column)
                .with_description("Column values avoid the forbidden set")
                .with_parameter(P::required("forbiddenValues", T::Array)),
        ),
        computes_row_counts(
            TestDefinition::new("columnValuesToMatchRegex", Column)
                .with_description("Every non-null value matches the pattern")
                .with_parameter(P::required("regex", T::String)),
        ),
        computes_row_counts(
            TestDefinition::new("columnValuesToNotMatchRegex", Column)
                .with_description("No value matches the forbidden pattern")
                .with_parameter(P::required("forbiddenRegex", T::String)),
        ),
        TestDefinition::new("columnValuesMissingCount", Column)
            .with_description("Nulls plus placeholder values add up to the expected count")
            .with_parameter(P::required("missingCountValue", T::Int))
            .with_parameter(P::optional("missingValueMatch", T::Array)),
    ]
}
