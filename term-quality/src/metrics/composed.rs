//! Composed metrics: pure functions of other metrics' results.
//!
//! Every function returns `None` when an input is missing or not computable,
//! or when a denominator is zero.

use super::names;
use super::spec::MetricSpec;
use super::types::{MetricLevel, MetricResults, MetricValue};

pub(super) fn composed_metrics() -> Vec<MetricSpec> {
    use MetricLevel::Column;

    vec![
        MetricSpec::new_composed(
            names::DISTINCT_PROPORTION,
            Column,
            &[names::DISTINCT_COUNT, names::VALUES_COUNT],
            distinct_proportion,
        ),
        MetricSpec::new_composed(
            names::UNIQUE_PROPORTION,
            Column,
            &[names::UNIQUE_COUNT, names::VALUES_COUNT],
            unique_proportion,
        ),
        MetricSpec::new_composed(
            names::NULL_PROPORTION,
            Column,
            &[names::NULL_COUNT, names::VALUES_COUNT],
            null_proportion,
        ),
        MetricSpec::new_composed(
            names::DUPLICATE_COUNT,
            Column,
            &[names::VALUES_COUNT, names::DISTINCT_COUNT],
            duplicate_count,
        ),
        MetricSpec::new_composed(
            names::NON_PARAMETRIC_SKEW,
            Column,
            &[names::MEAN, names::MEDIAN, names::STDDEV],
            non_parametric_skew,
        ),
    ]
}

fn ratio(numerator: f64, denominator: f64) -> Option<MetricValue> {
    (denominator != 0.0).then(|| MetricValue::Double(numerator / denominator))
}

fn distinct_proportion(results: &MetricResults) -> Option<MetricValue> {
    ratio(
        results.f64(names::DISTINCT_COUNT)?,
        results.f64(names::VALUES_COUNT)?,
    )
}

fn unique_proportion(results: &MetricResults) -> Option<MetricValue> {
    ratio(
        results.f64(names::UNIQUE_COUNT)?,
        results.f64(names::VALUES_COUNT)?,
    )
}

fn null_proportion(results: &MetricResults) -> Option<MetricValue> {
    let nulls = results.f64(names::NULL_COUNT)?;
    ratio(nulls, nulls + results.f64(names::VALUES_COUNT)?)
}

fn duplicate_count(results: &MetricResults) -> Option<MetricValue> {
    Some(MetricValue::Long(
        results.i64(names::VALUES_COUNT)? - results.i64(names::DISTINCT_COUNT)?,
    ))
}

/// Pearson's second skewness coefficient.
fn non_parametric_skew(results: &MetricResults) -> Option<MetricValue> {
    let mean = results.f64(names::MEAN)?;
    let median = results.f64(names::MEDIAN)?;
    ratio(3.0 * (mean - median), results.f64(names::STDDEV)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(pairs: &[(&str, Option<MetricValue>)]) -> MetricResults {
        let mut results = MetricResults::new();
        for (name, value) in pairs {
            results.insert(*name, value.clone());
        }
        results
    }

    #[test]
    fn test_proportions() {
        let r = results(&[
            ("distinctCount", Some(MetricValue::Long(3))),
            ("uniqueCount", Some(MetricValue::Long(2))),
            ("valuesCount", Some(MetricValue::Long(4))),
            ("nullCount", Some(MetricValue::Long(1))),
        ]);
        assert_eq!(distinct_proportion(&r), Some(MetricValue::Double(0.75)));
        assert_eq!(unique_proportion(&r), Some(MetricValue::Double(0.5)));
        assert_eq!(null_proportion(&r), Some(MetricValue::Double(0.2)));
        assert_eq!(duplicate_count(&r), Some(MetricValue::Long(1)));
    }

    #[test]
    fn test_missing_inputs_and_zero_denominators() {
        let empty = results(&[
            ("uniqueCount", Some(MetricValue::Long(0))),
            ("valuesCount", Some(MetricValue::Long(0))),
        ]);
        assert_eq!(unique_proportion(&empty), None);

        let text = results(&[
            ("mean", None),
            ("median", None),
            ("stddev", None),
        ]);
        assert_eq!(non_parametric_skew(&text), None);

        let flat = results(&[
            ("mean", Some(MetricValue::Double(2.0))),
            ("median", Some(MetricValue::Double(2.0))),
            ("stddev", Some(MetricValue::Double(0.0))),
        ]);
        assert_eq!(non_parametric_skew(&flat), None);
    }
}
