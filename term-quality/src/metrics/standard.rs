//! Static metrics and their two backend implementations.
//!
//! Tabular implementations fold mergeable partial states over the chunks. SQL
//! implementations plan an aggregate expression, a scalar query or a frequency
//! query over the backend's relation. Both sides convert values with the same
//! Arrow casts so their results agree.

use super::names;
use super::spec::{MetricSpec, SqlPlan, SqlTarget, TabularTarget};
use super::state::{
    fold_chunks, CountState, CounterState, DistinctState, ExtremaState, FrequencyState, Labeled,
    MomentsState, ValuesState,
};
use super::types::{MetricArgs, MetricLevel, MetricValue};
use crate::core::sampling::format_timestamp;
use crate::core::{ColumnHandle, SemanticType};
use crate::error::{Result, TermError};
use crate::security::SqlSecurity;
use arrow::array::{
    Array, ArrayRef, Float64Array, Int64Array, StringArray, TimestampNanosecondArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit};
use arrow::row::{RowConverter, SortField};
use regex::Regex;
use std::collections::HashSet;

pub(super) fn static_metrics() -> Vec<MetricSpec> {
    use MetricLevel::{Column, Table};

    vec![
        MetricSpec::new_static(names::ROW_COUNT, Table, tabular_row_count, sql_row_count),
        MetricSpec::new_static(names::COLUMN_COUNT, Table, tabular_column_count, sql_column_count),
        MetricSpec::new_static(names::COLUMN_NAMES, Table, tabular_column_names, sql_column_names),
        MetricSpec::new_static(
            names::INSERTED_ROW_COUNT,
            Table,
            tabular_inserted_row_count,
            sql_inserted_row_count,
        ),
        MetricSpec::new_static(names::VALUES_COUNT, Column, tabular_values_count, sql_values_count),
        MetricSpec::new_static(names::NULL_COUNT, Column, tabular_null_count, sql_null_count),
        MetricSpec::new_static(
            names::DISTINCT_COUNT,
            Column,
            tabular_distinct_count,
            sql_distinct_count,
        ),
        MetricSpec::new_static(names::UNIQUE_COUNT, Column, tabular_unique_count, sql_unique_count),
        MetricSpec::new_static(names::MIN, Column, tabular_min, sql_min),
        MetricSpec::new_static(names::MAX, Column, tabular_max, sql_max),
        MetricSpec::new_static(names::MEAN, Column, tabular_mean, sql_mean),
        MetricSpec::new_static(names::SUM, Column, tabular_sum, sql_sum),
        MetricSpec::new_static(names::MEDIAN, Column, tabular_median, sql_median),
        MetricSpec::new_static(names::STDDEV, Column, tabular_stddev, sql_stddev),
        MetricSpec::new_static(names::MIN_LENGTH, Column, tabular_min_length, sql_min_length),
        MetricSpec::new_static(names::MAX_LENGTH, Column, tabular_max_length, sql_max_length),
        MetricSpec::new_static(names::REGEX_COUNT, Column, tabular_regex_count, sql_regex_count),
        MetricSpec::new_static(
            names::COUNT_IN_SET,
            Column,
            tabular_count_in_set,
            sql_count_in_set,
        ),
        MetricSpec::new_static(names::HISTOGRAM, Column, tabular_histogram, sql_histogram),
    ]
}

// --- array helpers ---

fn cast_as<A: Array + Clone + 'static>(
    array: &ArrayRef,
    to: &DataType,
    metric: &str,
) -> Result<A> {
    let casted = cast(array, to)?;
    casted
        .as_any()
        .downcast_ref::<A>()
        .cloned()
        .ok_or_else(|| TermError::metric_computation(metric, format!("expected {to} values")))
}

fn float_values(array: &ArrayRef, metric: &str) -> Result<Float64Array> {
    cast_as::<Float64Array>(array, &DataType::Float64, metric)
}

fn int_values(array: &ArrayRef, metric: &str) -> Result<Int64Array> {
    cast_as::<Int64Array>(array, &DataType::Int64, metric)
}

fn string_values(array: &ArrayRef, metric: &str) -> Result<StringArray> {
    cast_as::<StringArray>(array, &DataType::Utf8, metric)
}

fn render_value(array: &ArrayRef, index: usize, metric: &str) -> Result<String> {
    let rendered = string_values(&array.slice(index, 1), metric)?;
    Ok(rendered.value(0).to_string())
}

fn since_arg(args: &MetricArgs, metric: &str) -> Result<chrono::NaiveDateTime> {
    args.since
        .ok_or_else(|| TermError::metric_computation(metric, "requires a 'since' timestamp"))
}

fn pattern_arg<'a>(args: &'a MetricArgs, metric: &str) -> Result<&'a str> {
    args.pattern
        .as_deref()
        .ok_or_else(|| TermError::metric_computation(metric, "requires a regex pattern"))
}

fn inserted_column<'a>(
    table: &'a crate::core::TableHandle,
    args: &MetricArgs,
) -> Result<&'a ColumnHandle> {
    let name = args.column.as_deref().ok_or_else(|| {
        TermError::metric_computation(names::INSERTED_ROW_COUNT, "requires a timestamp column")
    })?;
    table.column(name)
}

fn aggregate(expr: String) -> Result<Option<SqlPlan>> {
    Ok(Some(SqlPlan::Aggregate(expr)))
}

// --- table metrics ---

fn tabular_row_count(target: &TabularTarget<'_>, _args: &MetricArgs) -> Result<Option<MetricValue>> {
    Ok(Some(MetricValue::Long(target.num_rows() as i64)))
}

fn sql_row_count(_target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    aggregate("COUNT(*)".to_string())
}

fn tabular_column_count(
    target: &TabularTarget<'_>,
    _args: &MetricArgs,
) -> Result<Option<MetricValue>> {
    Ok(Some(MetricValue::Long(target.table.columns().len() as i64)))
}

fn sql_column_count(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    Ok(Some(SqlPlan::Metadata(MetricValue::Long(
        target.table.columns().len() as i64,
    ))))
}

fn tabular_column_names(
    target: &TabularTarget<'_>,
    _args: &MetricArgs,
) -> Result<Option<MetricValue>> {
    Ok(Some(MetricValue::List(target.table.column_names())))
}

fn sql_column_names(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    Ok(Some(SqlPlan::Metadata(MetricValue::List(
        target.table.column_names(),
    ))))
}

fn tabular_inserted_row_count(
    target: &TabularTarget<'_>,
    args: &MetricArgs,
) -> Result<Option<MetricValue>> {
    let column = inserted_column(target.table, args)?;
    if !column.data_type().is_temporal() {
        return Ok(None);
    }
    let since = since_arg(args, names::INSERTED_ROW_COUNT)?
        .and_utc()
        .timestamp_nanos_opt()
        .ok_or_else(|| {
            TermError::metric_computation(names::INSERTED_ROW_COUNT, "timestamp out of range")
        })?;

    let counter: CounterState = fold_chunks(&target.arrays(column), |array| {
        let timestamps = cast_as::<TimestampNanosecondArray>(
            array,
            &DataType::Timestamp(TimeUnit::Nanosecond, None),
            names::INSERTED_ROW_COUNT,
        )?;
        Ok(CounterState(
            timestamps.iter().flatten().filter(|ts| *ts >= since).count() as i64,
        ))
    })?;
    Ok(Some(MetricValue::Long(counter.0)))
}

fn sql_inserted_row_count(target: &SqlTarget<'_>, args: &MetricArgs) -> Result<Option<SqlPlan>> {
    let column = inserted_column(target.table, args)?;
    if !column.data_type().is_temporal() {
        return Ok(None);
    }
    let since = since_arg(args, names::INSERTED_ROW_COUNT)?;
    aggregate(format!(
        "COUNT(CASE WHEN CAST({} AS TIMESTAMP) >= TIMESTAMP {} THEN 1 END)",
        SqlSecurity::quote_identifier(column.name())?,
        SqlSecurity::quote_literal(&format_timestamp(&since))?
    ))
}

// --- counts ---

fn column_counts(target: &TabularTarget<'_>, metric: &str) -> Result<CountState> {
    let column = target.column(metric)?;
    fold_chunks(&target.arrays(column), |array| Ok(CountState::of(array)))
}

fn tabular_values_count(
    target: &TabularTarget<'_>,
    _args: &MetricArgs,
) -> Result<Option<MetricValue>> {
    let counts = column_counts(target, names::VALUES_COUNT)?;
    Ok(Some(MetricValue::Long(counts.values)))
}

fn sql_values_count(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    let (_, c) = target.column(names::VALUES_COUNT)?;
    aggregate(format!("COUNT({c})"))
}

fn tabular_null_count(target: &TabularTarget<'_>, _args: &MetricArgs) -> Result<Option<MetricValue>> {
    let counts = column_counts(target, names::NULL_COUNT)?;
    Ok(Some(MetricValue::Long(counts.nulls())))
}

fn sql_null_count(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    let (_, c) = target.column(names::NULL_COUNT)?;
    aggregate(format!("COUNT(*) - COUNT({c})"))
}

fn row_converter(column: &ColumnHandle) -> Result<RowConverter> {
    Ok(RowConverter::new(vec![SortField::new(
        column.arrow_type().clone(),
    )])?)
}

fn tabular_distinct_count(
    target: &TabularTarget<'_>,
    _args: &MetricArgs,
) -> Result<Option<MetricValue>> {
    let column = target.column(names::DISTINCT_COUNT)?;
    if column.data_type() == SemanticType::Other {
        return Ok(None);
    }
    // one converter for every chunk so equal values encode to equal rows
    let converter = row_converter(column)?;
    let distinct: DistinctState = fold_chunks(&target.arrays(column), |array| {
        let rows = converter.convert_columns(std::slice::from_ref(array))?;
        let mut state = DistinctState::default();
        for (i, row) in rows.iter().enumerate() {
            if array.is_valid(i) {
                state.0.insert(row.owned());
            }
        }
        Ok(state)
    })?;
    Ok(Some(MetricValue::Long(distinct.0.len() as i64)))
}

fn sql_distinct_count(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    let (column, c) = target.column(names::DISTINCT_COUNT)?;
    if column.data_type() == SemanticType::Other {
        return Ok(None);
    }
    aggregate(format!("COUNT(DISTINCT {c})"))
}

fn tabular_unique_count(
    target: &TabularTarget<'_>,
    _args: &MetricArgs,
) -> Result<Option<MetricValue>> {
    let column = target.column(names::UNIQUE_COUNT)?;
    if column.data_type() == SemanticType::Other {
        return Ok(None);
    }
    let converter = row_converter(column)?;
    let frequencies: FrequencyState<_> = fold_chunks(&target.arrays(column), |array| {
        let rows = converter.convert_columns(std::slice::from_ref(array))?;
        let mut state = FrequencyState::default();
        for (i, row) in rows.iter().enumerate() {
            if array.is_valid(i) {
                state.observe(row.owned());
            }
        }
        Ok(state)
    })?;
    Ok(Some(MetricValue::Long(frequencies.singletons())))
}

fn sql_unique_count(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    let (column, c) = target.column(names::UNIQUE_COUNT)?;
    if column.data_type() == SemanticType::Other {
        return Ok(None);
    }
    Ok(Some(SqlPlan::Scalar(format!(
        "SELECT COUNT(*) FROM (SELECT {c} FROM {relation} WHERE {c} IS NOT NULL GROUP BY {c} HAVING COUNT(*) = 1) AS unique_values",
        relation = target.relation
    ))))
}

// --- extrema ---

#[derive(Clone, Copy, PartialEq)]
enum Extreme {
    Min,
    Max,
}

impl Extreme {
    fn metric(self) -> &'static str {
        match self {
            Extreme::Min => names::MIN,
            Extreme::Max => names::MAX,
        }
    }

    fn pick<T>(self, state: ExtremaState<T>) -> Option<T> {
        match self {
            Extreme::Min => state.min,
            Extreme::Max => state.max,
        }
    }

    fn sql_fn(self) -> &'static str {
        match self {
            Extreme::Min => "MIN",
            Extreme::Max => "MAX",
        }
    }
}

fn tabular_extreme(target: &TabularTarget<'_>, which: Extreme) -> Result<Option<MetricValue>> {
    let metric = which.metric();
    let column = target.column(metric)?;
    let arrays = target.arrays(column);

    match column.data_type() {
        SemanticType::Integer => {
            let state: ExtremaState<i64> = fold_chunks(&arrays, |array| {
                let mut state = ExtremaState::default();
                int_values(array, metric)?
                    .iter()
                    .flatten()
                    .for_each(|v| state.observe(v));
                Ok(state)
            })?;
            Ok(which.pick(state).map(MetricValue::Long))
        }
        SemanticType::Float => {
            let state: ExtremaState<f64> = fold_chunks(&arrays, |array| {
                let mut state = ExtremaState::default();
                float_values(array, metric)?
                    .iter()
                    .flatten()
                    .for_each(|v| state.observe(v));
                Ok(state)
            })?;
            Ok(which.pick(state).map(MetricValue::Double))
        }
        SemanticType::Date | SemanticType::Timestamp => {
            // order by the physical value, render only the winners
            let state: ExtremaState<Labeled> = fold_chunks(&arrays, |array| {
                let keys = int_values(array, metric)?;
                let mut best: ExtremaState<(i64, usize)> = ExtremaState::default();
                for (i, key) in keys.iter().enumerate() {
                    if let Some(key) = key {
                        best.observe((key, i));
                    }
                }
                let mut state = ExtremaState::default();
                for (key, i) in [best.min, best.max].into_iter().flatten() {
                    state.observe(Labeled {
                        key,
                        label: render_value(array, i, metric)?,
                    });
                }
                Ok(state)
            })?;
            Ok(which.pick(state).map(|l| MetricValue::Text(l.label)))
        }
        _ => Ok(None),
    }
}

fn sql_extreme(target: &SqlTarget<'_>, which: Extreme) -> Result<Option<SqlPlan>> {
    let (column, c) = target.column(which.metric())?;
    let f = which.sql_fn();
    match column.data_type() {
        SemanticType::Integer => aggregate(format!("CAST({f}({c}) AS BIGINT)")),
        SemanticType::Float => aggregate(format!("CAST({f}({c}) AS DOUBLE)")),
        SemanticType::Date | SemanticType::Timestamp => {
            aggregate(format!("CAST({f}({c}) AS VARCHAR)"))
        }
        _ => Ok(None),
    }
}

fn tabular_min(target: &TabularTarget<'_>, _args: &MetricArgs) -> Result<Option<MetricValue>> {
    tabular_extreme(target, Extreme::Min)
}

fn sql_min(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    sql_extreme(target, Extreme::Min)
}

fn tabular_max(target: &TabularTarget<'_>, _args: &MetricArgs) -> Result<Option<MetricValue>> {
    tabular_extreme(target, Extreme::Max)
}

fn sql_max(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    sql_extreme(target, Extreme::Max)
}

// --- moments and order statistics ---

fn numeric_moments(target: &TabularTarget<'_>, metric: &str) -> Result<Option<MomentsState>> {
    let column = target.column(metric)?;
    if !column.data_type().is_numeric() {
        return Ok(None);
    }
    let moments = fold_chunks(&target.arrays(column), |array| {
        let mut state = MomentsState::default();
        float_values(array, metric)?
            .iter()
            .flatten()
            .for_each(|v| state.observe(v));
        Ok(state)
    })?;
    Ok(Some(moments))
}

fn numeric_column(target: &SqlTarget<'_>, metric: &str) -> Result<Option<String>> {
    let (column, c) = target.column(metric)?;
    Ok(column.data_type().is_numeric().then_some(c))
}

fn tabular_mean(target: &TabularTarget<'_>, _args: &MetricArgs) -> Result<Option<MetricValue>> {
    Ok(numeric_moments(target, names::MEAN)?
        .and_then(|m| m.mean())
        .map(MetricValue::Double))
}

fn sql_mean(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    match numeric_column(target, names::MEAN)? {
        Some(c) => aggregate(format!("AVG(CAST({c} AS DOUBLE))")),
        None => Ok(None),
    }
}

fn tabular_stddev(target: &TabularTarget<'_>, _args: &MetricArgs) -> Result<Option<MetricValue>> {
    Ok(numeric_moments(target, names::STDDEV)?
        .and_then(|m| m.stddev_pop())
        .map(MetricValue::Double))
}

fn sql_stddev(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    match numeric_column(target, names::STDDEV)? {
        Some(c) => aggregate(format!("stddev_pop(CAST({c} AS DOUBLE))")),
        None => Ok(None),
    }
}

fn tabular_sum(target: &TabularTarget<'_>, _args: &MetricArgs) -> Result<Option<MetricValue>> {
    let column = target.column(names::SUM)?;
    let arrays = target.arrays(column);
    match column.data_type() {
        SemanticType::Integer => {
            let (sum, count) = arrays.iter().try_fold((0_i64, 0_i64), |(sum, count), array| {
                let values = int_values(array, names::SUM)?;
                let chunk_sum = values.iter().flatten().fold(0_i64, i64::wrapping_add);
                let chunk_count = (values.len() - values.null_count()) as i64;
                Ok::<_, TermError>((sum.wrapping_add(chunk_sum), count + chunk_count))
            })?;
            Ok((count > 0).then_some(MetricValue::Long(sum)))
        }
        SemanticType::Float => {
            let moments = numeric_moments(target, names::SUM)?.unwrap_or_default();
            Ok((moments.count > 0).then_some(MetricValue::Double(moments.sum)))
        }
        _ => Ok(None),
    }
}

fn sql_sum(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    let (column, c) = target.column(names::SUM)?;
    match column.data_type() {
        SemanticType::Integer => aggregate(format!("SUM(CAST({c} AS BIGINT))")),
        SemanticType::Float => aggregate(format!("SUM(CAST({c} AS DOUBLE))")),
        _ => Ok(None),
    }
}

fn tabular_median(target: &TabularTarget<'_>, _args: &MetricArgs) -> Result<Option<MetricValue>> {
    let column = target.column(names::MEDIAN)?;
    if !column.data_type().is_numeric() {
        return Ok(None);
    }
    let values: ValuesState = fold_chunks(&target.arrays(column), |array| {
        Ok(ValuesState(
            float_values(array, names::MEDIAN)?.iter().flatten().collect(),
        ))
    })?;
    Ok(values.median().map(MetricValue::Double))
}

fn sql_median(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    match numeric_column(target, names::MEDIAN)? {
        Some(c) => aggregate(format!("median(CAST({c} AS DOUBLE))")),
        None => Ok(None),
    }
}

// --- text ---

fn tabular_length(target: &TabularTarget<'_>, which: Extreme) -> Result<Option<MetricValue>> {
    let metric = match which {
        Extreme::Min => names::MIN_LENGTH,
        Extreme::Max => names::MAX_LENGTH,
    };
    let column = target.column(metric)?;
    if !column.data_type().is_text() {
        return Ok(None);
    }
    let state: ExtremaState<i64> = fold_chunks(&target.arrays(column), |array| {
        let mut state = ExtremaState::default();
        string_values(array, metric)?
            .iter()
            .flatten()
            .for_each(|s| state.observe(s.chars().count() as i64));
        Ok(state)
    })?;
    Ok(which.pick(state).map(MetricValue::Long))
}

fn sql_length(target: &SqlTarget<'_>, which: Extreme, metric: &str) -> Result<Option<SqlPlan>> {
    let (column, c) = target.column(metric)?;
    if !column.data_type().is_text() {
        return Ok(None);
    }
    aggregate(format!(
        "CAST({}(character_length({c})) AS BIGINT)",
        which.sql_fn()
    ))
}

fn tabular_min_length(
    target: &TabularTarget<'_>,
    _args: &MetricArgs,
) -> Result<Option<MetricValue>> {
    tabular_length(target, Extreme::Min)
}

fn sql_min_length(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    sql_length(target, Extreme::Min, names::MIN_LENGTH)
}

fn tabular_max_length(
    target: &TabularTarget<'_>,
    _args: &MetricArgs,
) -> Result<Option<MetricValue>> {
    tabular_length(target, Extreme::Max)
}

fn sql_max_length(target: &SqlTarget<'_>, _args: &MetricArgs) -> Result<Option<SqlPlan>> {
    sql_length(target, Extreme::Max, names::MAX_LENGTH)
}

fn tabular_regex_count(
    target: &TabularTarget<'_>,
    args: &MetricArgs,
) -> Result<Option<MetricValue>> {
    let column = target.column(names::REGEX_COUNT)?;
    if !column.data_type().is_text() {
        return Ok(None);
    }
    let pattern = pattern_arg(args, names::REGEX_COUNT)?;
    SqlSecurity::validate_regex_pattern(pattern)?;
    let regex = Regex::new(pattern)
        .map_err(|e| TermError::metric_computation(names::REGEX_COUNT, e.to_string()))?;

    let matches: CounterState = fold_chunks(&target.arrays(column), |array| {
        let values = string_values(array, names::REGEX_COUNT)?;
        Ok(CounterState(
            values.iter().flatten().filter(|v| regex.is_match(v)).count() as i64,
        ))
    })?;
    Ok(Some(MetricValue::Long(matches.0)))
}

fn sql_regex_count(target: &SqlTarget<'_>, args: &MetricArgs) -> Result<Option<SqlPlan>> {
    let (column, c) = target.column(names::REGEX_COUNT)?;
    if !column.data_type().is_text() {
        return Ok(None);
    }
    let escaped = SqlSecurity::validate_regex_pattern(pattern_arg(args, names::REGEX_COUNT)?)?;
    aggregate(format!("COUNT(CASE WHEN {c} ~ '{escaped}' THEN 1 END)"))
}

// --- value sets ---

fn tabular_count_in_set(
    target: &TabularTarget<'_>,
    args: &MetricArgs,
) -> Result<Option<MetricValue>> {
    let column = target.column(names::COUNT_IN_SET)?;
    if !column.data_type().is_displayable() {
        return Ok(None);
    }
    let wanted: HashSet<&str> = args.values.iter().map(String::as_str).collect();
    let found: CounterState = fold_chunks(&target.arrays(column), |array| {
        let values = string_values(array, names::COUNT_IN_SET)?;
        Ok(CounterState(
            values.iter().flatten().filter(|v| wanted.contains(v)).count() as i64,
        ))
    })?;
    Ok(Some(MetricValue::Long(found.0)))
}

fn sql_count_in_set(target: &SqlTarget<'_>, args: &MetricArgs) -> Result<Option<SqlPlan>> {
    let (column, c) = target.column(names::COUNT_IN_SET)?;
    if !column.data_type().is_displayable() {
        return Ok(None);
    }
    if args.values.is_empty() {
        return Ok(Some(SqlPlan::Metadata(MetricValue::Long(0))));
    }
    let literals = args
        .values
        .iter()
        .map(|v| SqlSecurity::quote_literal(v))
        .collect::<Result<Vec<_>>>()?;
    aggregate(format!(
        "COUNT(CASE WHEN CAST({c} AS VARCHAR) IN ({}) THEN 1 END)",
        literals.join(", ")
    ))
}

fn tabular_histogram(target: &TabularTarget<'_>, args: &MetricArgs) -> Result<Option<MetricValue>> {
    let column = target.column(names::HISTOGRAM)?;
    if !column.data_type().is_displayable() {
        return Ok(None);
    }
    let frequencies: FrequencyState<String> = fold_chunks(&target.arrays(column), |array| {
        let mut state = FrequencyState::default();
        string_values(array, names::HISTOGRAM)?
            .iter()
            .flatten()
            .for_each(|v| state.observe(v.to_string()));
        Ok(state)
    })?;
    Ok(Some(MetricValue::Frequencies(frequencies.top(args.bins()))))
}

fn sql_histogram(target: &SqlTarget<'_>, args: &MetricArgs) -> Result<Option<SqlPlan>> {
    let (column, c) = target.column(names::HISTOGRAM)?;
    if !column.data_type().is_displayable() {
        return Ok(None);
    }
    Ok(Some(SqlPlan::Frequencies(format!(
        "SELECT CAST({c} AS VARCHAR) AS v, COUNT(*) AS n FROM {relation} WHERE {c} IS NOT NULL \
         GROUP BY CAST({c} AS VARCHAR) ORDER BY n DESC, v ASC LIMIT {bins}",
        relation = target.relation,
        bins = args.bins()
    ))))
}
