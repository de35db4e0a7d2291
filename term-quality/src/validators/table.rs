//! Table-level validators.

use super::{required_count, ValidatorContext, Verdict};
use crate::backends::CustomSqlStrategy;
use crate::core::{ParameterSet, TestResultValue, TimeUnit};
use crate::error::{Result, TermError};
use crate::log_backend_op;
use crate::metrics::resolver::with_timeout;
use crate::metrics::{names, MetricArgs, MetricResults};
use crate::security::SqlSecurity;
use chrono::Utc;

impl ValidatorContext {
    async fn table_metric(&self, metric: &str, args: &MetricArgs) -> Result<i64> {
        let results: MetricResults = self.table_metrics(&[metric], args).await?;
        required_count(&results, metric)
    }
}

validator!(
    /// `tableRowCountToBeBetween`: the row count lies in `[minValue, maxValue]`.
    TableRowCountToBeBetween,
    ["rowCount"]
);

impl TableRowCountToBeBetween {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let bounds = params.bounds("minValue", "maxValue");
        let rows = self
            .ctx
            .table_metric(names::ROW_COUNT, &MetricArgs::default())
            .await?;
        Ok(Verdict::new(
            bounds.contains(rows as f64),
            format!("Found {rows} rows vs. the expected range {bounds}."),
            vec![TestResultValue::some("rowCount", rows)],
        ))
    }
}

validator!(
    /// `tableRowCountToEqual`: the row count equals `value`.
    TableRowCountToEqual,
    ["rowCount"]
);

impl TableRowCountToEqual {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let expected = params.i64("value")?;
        let rows = self
            .ctx
            .table_metric(names::ROW_COUNT, &MetricArgs::default())
            .await?;
        Ok(Verdict::new(
            rows == expected,
            format!("Found {rows} rows vs. the expected {expected}."),
            vec![TestResultValue::some("rowCount", rows)],
        ))
    }
}

validator!(
    /// `tableColumnCountToBeBetween`: the column count lies in
    /// `[minColValue, maxColValue]`.
    TableColumnCountToBeBetween,
    ["columnCount"]
);

impl TableColumnCountToBeBetween {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let bounds = params.bounds("minColValue", "maxColValue");
        let columns = self
            .ctx
            .table_metric(names::COLUMN_COUNT, &MetricArgs::default())
            .await?;
        Ok(Verdict::new(
            bounds.contains(columns as f64),
            format!("Found {columns} column vs. the expected range {bounds}."),
            vec![TestResultValue::some("columnCount", columns)],
        ))
    }
}

validator!(
    /// `tableColumnCountToEqual`: the column count equals `columnCount`.
    TableColumnCountToEqual,
    ["columnCount"]
);

impl TableColumnCountToEqual {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let expected = params.i64("columnCount")?;
        let columns = self
            .ctx
            .table_metric(names::COLUMN_COUNT, &MetricArgs::default())
            .await?;
        Ok(Verdict::new(
            columns == expected,
            format!("Found {columns} columns vs. the expected {expected}."),
            vec![TestResultValue::some("columnCount", columns)],
        ))
    }
}

impl ValidatorContext {
    async fn column_names(&self) -> Result<Vec<String>> {
        let results = self
            .table_metrics(&[names::COLUMN_NAMES], &MetricArgs::default())
            .await?;
        results
            .get(names::COLUMN_NAMES)
            .and_then(|v| v.as_list())
            .map(<[String]>::to_vec)
            .ok_or_else(|| TermError::metric_computation(names::COLUMN_NAMES, "metric unavailable"))
    }
}

validator!(
    /// `tableColumnNameToExist`: a column called `columnName` exists.
    TableColumnNameToExist,
    ["columnNameExists"]
);

impl TableColumnNameToExist {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let expected = params.string("columnName")?;
        let columns = self.ctx.column_names().await?;
        let exists = columns.iter().any(|c| c == expected);
        Ok(Verdict::new(
            exists,
            format!("{expected} column expected vs {}", columns.join(", ")),
            vec![TestResultValue::some(
                "columnNameExists",
                if exists { "True" } else { "False" },
            )],
        ))
    }
}

validator!(
    /// `tableColumnToMatchSet`: the column names match `columnNames`, a comma
    /// separated list, in order when `ordered` is set.
    TableColumnToMatchSet,
    ["columnNames"]
);

impl TableColumnToMatchSet {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let expected: Vec<String> = params
            .string("columnNames")?
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let ordered = params.bool_or("ordered", false);
        let actual = self.ctx.column_names().await?;

        let matches = if ordered {
            actual == expected
        } else {
            let mut a = actual.clone();
            let mut e = expected.clone();
            a.sort();
            e.sort();
            a == e
        };
        Ok(Verdict::new(
            matches,
            format!(
                "Found {} column vs. the expected column names {}.",
                actual.join(", "),
                expected.join(", ")
            ),
            vec![TestResultValue::some("columnNames", actual.join(","))],
        ))
    }
}

validator!(
    /// `tableRowInsertedCountToBeBetween`: rows whose `columnName` falls in the
    /// last `rangeInterval` `rangeType` units lie in `[min, max]`.
    TableRowInsertedCountToBeBetween,
    ["rowCount"]
);

impl TableRowInsertedCountToBeBetween {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let bounds = params.bounds("min", "max");
        let column = params.string("columnName")?;
        let unit = TimeUnit::parse(params.enum_value("rangeType")?)
            .map_err(|e| TermError::parameter("rangeType", e.to_string()))?;
        let interval = params.i64("rangeInterval")?;
        let interval = u32::try_from(interval)
            .ok()
            .filter(|i| *i > 0)
            .ok_or_else(|| {
                TermError::parameter(
                    "rangeInterval",
                    format!("expected a positive interval, got {interval}"),
                )
            })?;
        let since = unit.subtract(Utc::now().naive_utc(), interval)?;

        let args = MetricArgs::default().with_column(column).with_since(since);
        let rows = self
            .ctx
            .table_metric(names::INSERTED_ROW_COUNT, &args)
            .await?;
        Ok(Verdict::new(
            bounds.contains(rows as f64),
            format!(
                "Found {rows} rows inserted in the last {interval} {unit} vs. the expected range {bounds}."
            ),
            vec![TestResultValue::some("rowCount", rows)],
        ))
    }
}

validator!(
    /// `tableCustomSQLQuery`: a user query yields no more than `threshold`
    /// rows (strategy `ROWS`) or a count no greater than it (strategy
    /// `COUNT`). The query runs against the whole session, unsampled.
    TableCustomSqlQuery,
    ["resultRowCount"]
);

impl TableCustomSqlQuery {
    async fn check(&self, params: &ParameterSet) -> Result<Verdict> {
        let query = SqlSecurity::validate_query(params.string("sqlExpression")?)?;
        let strategy = CustomSqlStrategy::parse(params.enum_value("strategy")?)?;
        let threshold = params.i64("threshold")?;

        log_backend_op!(self.ctx.config.log, strategy = ?strategy, "Running custom SQL query");
        let count = with_timeout(
            self.ctx.config.metric_timeout,
            "customSqlQuery",
            self.ctx.backend.query_row_count(&query, strategy),
        )
        .await?;
        Ok(Verdict::new(
            count <= threshold,
            format!(
                "Found {count} row(s). Test query is expected to return at most {threshold} row(s)."
            ),
            vec![TestResultValue::some("resultRowCount", count)],
        ))
    }
}
