//! Binding of raw test case parameter values against a definition's schema.

use super::definition::{ParameterType, TestDefinition};
use super::test_case::TestCaseParameterValue;
use crate::error::{Result, TermError};
use std::collections::HashMap;
use std::fmt;

/// A parameter value after coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    String(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
    Array(Vec<String>),
    Enum(String),
}

impl ParameterValue {
    /// Coerces a raw string against a declared type.
    fn coerce(name: &str, raw: &str, data_type: &ParameterType) -> Result<Self> {
        let value = raw.trim();
        match data_type {
            ParameterType::String => Ok(ParameterValue::String(raw.to_string())),
            ParameterType::Int => {
                if let Ok(v) = value.parse::<i64>() {
                    return Ok(ParameterValue::Int(v));
                }
                match value.parse::<f64>() {
                    Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(ParameterValue::Int(v as i64)),
                    _ => Err(TermError::parameter(
                        name,
                        format!("expected an integer, got '{raw}'"),
                    )),
                }
            }
            ParameterType::Float => match value.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(ParameterValue::Float(v)),
                _ => Err(TermError::parameter(
                    name,
                    format!("expected a finite number, got '{raw}'"),
                )),
            },
            ParameterType::Boolean => match value.to_ascii_lowercase().as_str() {
                "true" => Ok(ParameterValue::Boolean(true)),
                "false" => Ok(ParameterValue::Boolean(false)),
                _ => Err(TermError::parameter(
                    name,
                    format!("expected 'true' or 'false', got '{raw}'"),
                )),
            },
            ParameterType::Array => Self::parse_array(name, value).map(ParameterValue::Array),
            ParameterType::Enum { values } => values
                .iter()
                .find(|allowed| allowed.eq_ignore_ascii_case(value))
                .map(|allowed| ParameterValue::Enum(allowed.clone()))
                .ok_or_else(|| {
                    TermError::parameter(
                        name,
                        format!("expected one of {}, got '{raw}'", values.join(", ")),
                    )
                }),
        }
    }

    fn parse_array(name: &str, raw: &str) -> Result<Vec<String>> {
        let parsed: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
            TermError::parameter(name, format!("expected a JSON array, got '{raw}': {e}"))
        })?;
        let items = parsed
            .as_array()
            .ok_or_else(|| TermError::parameter(name, format!("expected a JSON array, got '{raw}'")))?;

        items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Ok(s.clone()),
                serde_json::Value::Number(n) => Ok(n.to_string()),
                serde_json::Value::Bool(b) => Ok(b.to_string()),
                other => Err(TermError::parameter(
                    name,
                    format!("array items must be scalars, got {other}"),
                )),
            })
            .collect()
    }
}

/// A closed interval; absent bounds are infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min: min.unwrap_or(f64::NEG_INFINITY),
            max: max.unwrap_or(f64::INFINITY),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    /// `min <= value <= max`. NaN is never contained.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Coerced parameters of one test case, defaults filled in.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    values: HashMap<String, ParameterValue>,
}

impl ParameterSet {
    /// Binds raw values against the definition's parameter schema.
    ///
    /// Unknown and duplicate names, missing required parameters and failed
    /// coercions are rejected with [`TermError::Parameter`]. Empty strings for
    /// non-string parameters count as absent.
    pub fn bind(definition: &TestDefinition, raw: &[TestCaseParameterValue]) -> Result<Self> {
        let mut provided: HashMap<&str, &str> = HashMap::new();
        for parameter in raw {
            if definition.parameter(&parameter.name).is_none() {
                return Err(TermError::parameter(
                    &parameter.name,
                    format!("not declared by test definition '{}'", definition.name),
                ));
            }
            if provided
                .insert(parameter.name.as_str(), parameter.value.as_str())
                .is_some()
            {
                return Err(TermError::parameter(&parameter.name, "provided more than once"));
            }
        }

        let mut values = HashMap::new();
        for declared in &definition.parameters {
            let raw_value = provided
                .get(declared.name.as_str())
                .copied()
                .filter(|v| declared.data_type == ParameterType::String || !v.trim().is_empty());

            let source = match (raw_value, declared.default.as_deref()) {
                (Some(v), _) => v,
                (None, Some(default)) => default,
                (None, None) if declared.required => {
                    return Err(TermError::parameter(&declared.name, "required parameter is missing"))
                }
                (None, None) => continue,
            };

            let value = ParameterValue::coerce(&declared.name, source, &declared.data_type)?;
            values.insert(declared.name.clone(), value);
        }

        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    /// A numeric parameter as `f64`, if present.
    pub fn f64_opt(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(ParameterValue::Float(v)) => Some(*v),
            Some(ParameterValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn f64_or(&self, name: &str, default: f64) -> f64 {
        self.f64_opt(name).unwrap_or(default)
    }

    /// A required integer parameter.
    pub fn i64(&self, name: &str) -> Result<i64> {
        match self.values.get(name) {
            Some(ParameterValue::Int(v)) => Ok(*v),
            Some(other) => Err(TermError::parameter(
                name,
                format!("expected an integer, found {other:?}"),
            )),
            None => Err(TermError::parameter(name, "required parameter is missing")),
        }
    }

    /// A required string parameter.
    pub fn string(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(ParameterValue::String(v)) => Ok(v),
            Some(other) => Err(TermError::parameter(
                name,
                format!("expected a string, found {other:?}"),
            )),
            None => Err(TermError::parameter(name, "required parameter is missing")),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        match self.values.get(name) {
            Some(ParameterValue::Boolean(v)) => *v,
            _ => default,
        }
    }

    /// An array parameter; absent arrays are empty.
    pub fn list(&self, name: &str) -> &[String] {
        match self.values.get(name) {
            Some(ParameterValue::Array(items)) => items,
            _ => &[],
        }
    }

    /// A required enum parameter, in its canonical spelling.
    pub fn enum_value(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(ParameterValue::Enum(v)) => Ok(v),
            Some(other) => Err(TermError::parameter(
                name,
                format!("expected an enum value, found {other:?}"),
            )),
            None => Err(TermError::parameter(name, "required parameter is missing")),
        }
    }

    pub fn bounds(&self, min: &str, max: &str) -> Bounds {
        Bounds::new(self.f64_opt(min), self.f64_opt(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityType, ParameterDefinition, TestDefinition};

    fn definition() -> TestDefinition {
        TestDefinition::new("sample", EntityType::Column)
            .with_parameter(ParameterDefinition::optional("minValue", ParameterType::Float))
            .with_parameter(ParameterDefinition::optional("maxValue", ParameterType::Float))
            .with_parameter(ParameterDefinition::required("regex", ParameterType::String))
            .with_parameter(
                ParameterDefinition::optional("threshold", ParameterType::Int).with_default("0"),
            )
            .with_parameter(ParameterDefinition::optional("allowed", ParameterType::Array))
            .with_parameter(
                ParameterDefinition::optional(
                    "strategy",
                    ParameterType::Enum {
                        values: vec!["ROWS".to_string(), "COUNT".to_string()],
                    },
                )
                .with_default("ROWS"),
            )
    }

    fn raw(pairs: &[(&str, &str)]) -> Vec<TestCaseParameterValue> {
        pairs
            .iter()
            .map(|(n, v)| TestCaseParameterValue::new(*n, *v))
            .collect()
    }

    #[test]
    fn test_bind_coerces_and_fills_defaults() {
        let params = ParameterSet::bind(
            &definition(),
            &raw(&[
                ("minValue", "2"),
                ("regex", "^a"),
                ("allowed", r#"["a", 1, true]"#),
                ("strategy", "count"),
            ]),
        )
        .unwrap();

        assert_eq!(params.f64_opt("minValue"), Some(2.0));
        assert_eq!(params.f64_opt("maxValue"), None);
        assert_eq!(params.string("regex").unwrap(), "^a");
        assert_eq!(params.i64("threshold").unwrap(), 0);
        assert_eq!(params.list("allowed"), ["a", "1", "true"]);
        assert_eq!(params.enum_value("strategy").unwrap(), "COUNT");
    }

    #[test]
    fn test_bind_rejects_bad_input() {
        let def = definition();

        let unknown = ParameterSet::bind(&def, &raw(&[("regex", "a"), ("colour", "red")]));
        assert!(matches!(unknown, Err(TermError::Parameter { ref name, .. }) if name == "colour"));

        let missing = ParameterSet::bind(&def, &raw(&[("minValue", "1")]));
        assert!(matches!(missing, Err(TermError::Parameter { ref name, .. }) if name == "regex"));

        let malformed = ParameterSet::bind(&def, &raw(&[("regex", "a"), ("minValue", "abc")]));
        assert!(matches!(malformed, Err(TermError::Parameter { ref name, .. }) if name == "minValue"));

        let duplicate = ParameterSet::bind(&def, &raw(&[("regex", "a"), ("regex", "b")]));
        assert!(duplicate.is_err());

        let bad_enum = ParameterSet::bind(&def, &raw(&[("regex", "a"), ("strategy", "ALL")]));
        assert!(bad_enum.is_err());

        let bad_array = ParameterSet::bind(&def, &raw(&[("regex", "a"), ("allowed", "a,b")]));
        assert!(bad_array.is_err());

        let infinite = ParameterSet::bind(&def, &raw(&[("regex", "a"), ("maxValue", "inf")]));
        assert!(infinite.is_err());
    }

    #[test]
    fn test_empty_values_count_as_absent() {
        let params =
            ParameterSet::bind(&definition(), &raw(&[("regex", "a"), ("minValue", "  ")])).unwrap();
        assert_eq!(params.f64_opt("minValue"), None);
        assert_eq!(params.bounds("minValue", "maxValue"), Bounds::unbounded());
    }

    #[test]
    fn test_int_accepts_integral_floats() {
        let params =
            ParameterSet::bind(&definition(), &raw(&[("regex", "a"), ("threshold", "5.0")])).unwrap();
        assert_eq!(params.i64("threshold").unwrap(), 5);
        assert!(ParameterSet::bind(&definition(), &raw(&[("regex", "a"), ("threshold", "5.5")])).is_err());
    }

    #[test]
    fn test_bounds_are_closed() {
        let bounds = Bounds::new(Some(2.0), Some(5.0));
        assert!(bounds.contains(2.0));
        assert!(bounds.contains(5.0));
        assert!(!bounds.contains(5.000001));
        assert!(!bounds.contains(f64::NAN));
        assert_eq!(bounds.to_string(), "[2, 5]");
        assert_eq!(Bounds::unbounded().to_string(), "[-inf, inf]");
        assert!(Bounds::unbounded().contains(i64::MAX as f64));
    }
}
