//! Sampling and partition configuration attached to a table.
//!
//! Both backends apply the partition filter first and then draw the sample
//! from the filtered rows.

use super::handle::{ColumnHandle, SemanticType};
use crate::error::{Result, TermError};
use chrono::{Duration, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-table profile directive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<SampleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionConfig>,
    /// Seed for tabular sampling.
    ///
    /// The SQL backend samples with the engine's `random()` and ignores the
    /// seed, so SQL samples differ between runs. A warning is logged when a
    /// seed reaches the SQL backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_seed: Option<u64>,
}

impl ProfileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample(mut self, sample: SampleConfig) -> Self {
        self.sample = Some(sample);
        self
    }

    pub fn with_partition(mut self, partition: PartitionConfig) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(sample) = &self.sample {
            sample.validate()?;
        }
        if let Some(partition) = &self.partition {
            partition.validate()?;
        }
        Ok(())
    }
}

/// How rows are sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SampleConfig {
    /// Each row is kept independently with probability `percent / 100`.
    Percentage { percent: f64 },
    /// A uniform sample of exactly `count` rows, or all rows if fewer.
    Rows { count: u64 },
}

impl SampleConfig {
    fn validate(&self) -> Result<()> {
        match self {
            SampleConfig::Percentage { percent } => {
                if !(percent.is_finite() && *percent > 0.0 && *percent <= 100.0) {
                    return Err(TermError::Configuration(format!(
                        "Sample percentage must be in (0, 100], got {percent}"
                    )));
                }
            }
            SampleConfig::Rows { count } => {
                if *count == 0 {
                    return Err(TermError::Configuration(
                        "Sample row count must be positive".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Granularity of a time-window partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Hour,
    Day,
    Month,
    Year,
}

impl TimeUnit {
    /// Parses `HOUR`, `DAY`, `MONTH` or `YEAR`, ignoring case.
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_uppercase().as_str() {
            "HOUR" => Ok(TimeUnit::Hour),
            "DAY" => Ok(TimeUnit::Day),
            "MONTH" => Ok(TimeUnit::Month),
            "YEAR" => Ok(TimeUnit::Year),
            other => Err(TermError::Configuration(format!(
                "Unknown time unit '{other}'"
            ))),
        }
    }

    /// The instant `interval` units before `now`.
    pub fn subtract(&self, now: NaiveDateTime, interval: u32) -> Result<NaiveDateTime> {
        let cutoff = match self {
            TimeUnit::Hour => now.checked_sub_signed(Duration::hours(i64::from(interval))),
            TimeUnit::Day => now.checked_sub_signed(Duration::days(i64::from(interval))),
            TimeUnit::Month => now.checked_sub_months(Months::new(interval)),
            TimeUnit::Year => interval
                .checked_mul(12)
                .and_then(|months| now.checked_sub_months(Months::new(months))),
        };
        cutoff.ok_or_else(|| {
            TermError::Configuration(format!("Time window of {interval} {self} is out of range"))
        })
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Hour => write!(f, "HOUR"),
            TimeUnit::Day => write!(f, "DAY"),
            TimeUnit::Month => write!(f, "MONTH"),
            TimeUnit::Year => write!(f, "YEAR"),
        }
    }
}

/// Partition filter on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionConfig {
    pub column: String,
    pub method: PartitionMethod,
}

impl PartitionConfig {
    pub fn new(column: impl Into<String>, method: PartitionMethod) -> Self {
        Self {
            column: column.into(),
            method,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.column.trim().is_empty() {
            return Err(TermError::Configuration(
                "Partition column cannot be empty".to_string(),
            ));
        }
        match &self.method {
            PartitionMethod::ColumnValues { values } if values.is_empty() => Err(
                TermError::Configuration("Partition value list cannot be empty".to_string()),
            ),
            PartitionMethod::IntegerRange { start, end } if start > end => {
                Err(TermError::Configuration(format!(
                    "Partition range start {start} is greater than end {end}"
                )))
            }
            PartitionMethod::TimeWindow { interval: 0, .. } => Err(TermError::Configuration(
                "Partition time window interval must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Resolves the filter against a point in time.
    ///
    /// Backends call this once at construction so every metric of a run sees
    /// the same rows.
    pub fn resolve(&self, now: NaiveDateTime) -> Result<PartitionFilter> {
        self.validate()?;
        let predicate = match &self.method {
            PartitionMethod::ColumnValues { values } => PartitionPredicate::InValues(values.clone()),
            PartitionMethod::IntegerRange { start, end } => PartitionPredicate::InRange {
                start: *start,
                end: *end,
            },
            PartitionMethod::TimeWindow { unit, interval } => {
                PartitionPredicate::Since(unit.subtract(now, *interval)?)
            }
        };
        Ok(PartitionFilter {
            column: self.column.clone(),
            predicate,
        })
    }
}

/// The single partition strategy of a [`PartitionConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PartitionMethod {
    /// Rows whose value, rendered as text, is one of `values`.
    ColumnValues { values: Vec<String> },
    /// Rows whose integer value lies in `[start, end]`.
    IntegerRange { start: i64, end: i64 },
    /// Rows whose timestamp is within the last `interval` units.
    TimeWindow { unit: TimeUnit, interval: u32 },
}

/// A partition filter with its time window pinned to a cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionFilter {
    pub column: String,
    pub predicate: PartitionPredicate,
}

impl PartitionFilter {
    /// Checks that the partition column's type supports the predicate.
    pub fn check_column(&self, column: &ColumnHandle) -> Result<()> {
        let data_type = column.data_type();
        let supported = match self.predicate {
            PartitionPredicate::InValues(_) => data_type.is_displayable(),
            PartitionPredicate::InRange { .. } => data_type == SemanticType::Integer,
            PartitionPredicate::Since(_) => data_type.is_temporal(),
        };
        if supported {
            Ok(())
        } else {
            Err(TermError::Configuration(format!(
                "Partition column '{}' of type {data_type} does not support {}",
                column.name(),
                self.predicate.describe()
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartitionPredicate {
    InValues(Vec<String>),
    InRange { start: i64, end: i64 },
    Since(NaiveDateTime),
}

impl PartitionPredicate {
    fn describe(&self) -> &'static str {
        match self {
            PartitionPredicate::InValues(_) => "value partitioning",
            PartitionPredicate::InRange { .. } => "integer range partitioning",
            PartitionPredicate::Since(_) => "time window partitioning",
        }
    }
}

/// Formats a timestamp the way both backends compare it.
pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_time_unit_subtract() {
        let now = at(2024, 3, 31, 12);
        assert_eq!(TimeUnit::Hour.subtract(now, 2).unwrap(), at(2024, 3, 31, 10));
        assert_eq!(TimeUnit::Day.subtract(now, 1).unwrap(), at(2024, 3, 30, 12));
        // month arithmetic clamps to the last day of the month
        assert_eq!(TimeUnit::Month.subtract(now, 1).unwrap(), at(2024, 2, 29, 12));
        assert_eq!(TimeUnit::Year.subtract(now, 1).unwrap(), at(2023, 3, 31, 12));
        assert_eq!(TimeUnit::parse("day").unwrap(), TimeUnit::Day);
        assert!(TimeUnit::parse("WEEK").is_err());
    }

    #[test]
    fn test_profile_validation() {
        assert!(ProfileConfig::new().validate().is_ok());
        assert!(ProfileConfig::new()
            .with_sample(SampleConfig::Percentage { percent: 0.0 })
            .validate()
            .is_err());
        assert!(ProfileConfig::new()
            .with_sample(SampleConfig::Percentage { percent: 100.0 })
            .validate()
            .is_ok());
        assert!(ProfileConfig::new()
            .with_sample(SampleConfig::Rows { count: 0 })
            .validate()
            .is_err());
        assert!(ProfileConfig::new()
            .with_partition(PartitionConfig::new(
                "id",
                PartitionMethod::IntegerRange { start: 5, end: 1 }
            ))
            .validate()
            .is_err());
        assert!(ProfileConfig::new()
            .with_partition(PartitionConfig::new(
                "region",
                PartitionMethod::ColumnValues { values: vec![] }
            ))
            .validate()
            .is_err());
    }

    #[test]
    fn test_resolve_pins_cutoff() {
        let partition = PartitionConfig::new(
            "created_at",
            PartitionMethod::TimeWindow {
                unit: TimeUnit::Day,
                interval: 7,
            },
        );
        let filter = partition.resolve(at(2024, 1, 8, 0)).unwrap();
        assert_eq!(filter.column, "created_at");
        assert_eq!(filter.predicate, PartitionPredicate::Since(at(2024, 1, 1, 0)));
        assert_eq!(format_timestamp(&at(2024, 1, 1, 0)), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_profile_deserializes() {
        let json = r#"{
            "sample": {"type": "percentage", "percent": 50},
            "partition": {"column": "region", "method": {"type": "columnValues", "values": ["EU"]}},
            "sampleSeed": 7
        }"#;
        let config: ProfileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.sample, Some(SampleConfig::Percentage { percent: 50.0 }));
        assert_eq!(config.sample_seed, Some(7));
        assert!(config.validate().is_ok());
    }
}
