//! Test definitions: the published, parameterized schema of a check.

use super::catalog;
use super::EntityType;
use crate::error::{Result, TermError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Declared type of a test parameter.
///
/// Parameter values always arrive as strings and are coerced against this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterType {
    String,
    Int,
    Float,
    Boolean,
    /// A JSON array of scalar values.
    Array,
    /// One of a closed set of upper-case names.
    Enum { values: Vec<String> },
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterType::String => write!(f, "STRING"),
            ParameterType::Int => write!(f, "INT"),
            ParameterType::Float => write!(f, "FLOAT"),
            ParameterType::Boolean => write!(f, "BOOLEAN"),
            ParameterType::Array => write!(f, "ARRAY"),
            ParameterType::Enum { values } => write!(f, "ENUM({})", values.join("|")),
        }
    }
}

/// One entry of a test definition's parameter schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    pub name: String,
    pub data_type: ParameterType,
    #[serde(default)]
    pub required: bool,
    /// Raw default, coerced like a provided value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl ParameterDefinition {
    /// An optional parameter without a default.
    pub fn optional(name: impl Into<String>, data_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            data_type,
            required: false,
            default: None,
            description: String::new(),
        }
    }

    /// A parameter that must be provided.
    pub fn required(name: impl Into<String>, data_type: ParameterType) -> Self {
        Self {
            required: true,
            ..Self::optional(name, data_type)
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A named, versioned test definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    pub name: String,
    pub fully_qualified_name: String,
    pub entity_type: EntityType,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
}

fn default_version() -> String {
    "0.1".to_string()
}

impl TestDefinition {
    /// Creates a definition whose fully qualified name equals its name.
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        let name = name.into();
        Self {
            fully_qualified_name: name.clone(),
            name,
            entity_type,
            description: String::new(),
            version: default_version(),
            parameters: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterDefinition) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

static STANDARD_CATALOG: Lazy<Arc<TestDefinitionCatalog>> =
    Lazy::new(|| Arc::new(TestDefinitionCatalog::from_definitions(catalog::standard_definitions())));

/// Published test definitions indexed by fully qualified name.
///
/// Definitions are immutable once published: [`publish`](Self::publish)
/// refuses to overwrite an existing name.
#[derive(Debug, Clone, Default)]
pub struct TestDefinitionCatalog {
    definitions: HashMap<String, Arc<TestDefinition>>,
}

impl TestDefinitionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide catalog of built-in definitions.
    pub fn standard() -> Arc<Self> {
        Arc::clone(&STANDARD_CATALOG)
    }

    fn from_definitions(definitions: Vec<TestDefinition>) -> Self {
        let definitions = definitions
            .into_iter()
            .map(|d| (d.fully_qualified_name.clone(), Arc::new(d)))
            .collect();
        Self { definitions }
    }

    /// Publishes a definition.
    pub fn publish(&mut self, definition: TestDefinition) -> Result<()> {
        let fqn = definition.fully_qualified_name.clone();
        if self.definitions.contains_key(&fqn) {
            return Err(TermError::Configuration(format!(
                "Test definition '{fqn}' is already published"
            )));
        }
        self.definitions.insert(fqn, Arc::new(definition));
        Ok(())
    }

    /// Looks up a definition by fully qualified name.
    pub fn get(&self, fqn: &str) -> Result<Arc<TestDefinition>> {
        self.definitions
            .get(fqn)
            .cloned()
            .ok_or_else(|| TermError::UnknownTestDefinition(fqn.to_string()))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_contains_builtins() {
        let catalog = TestDefinitionCatalog::standard();
        let regex = catalog.get("columnValuesToMatchRegex").unwrap();
        assert_eq!(regex.entity_type, EntityType::Column);
        assert!(regex.parameter("regex").unwrap().required);

        let sql = catalog.get("tableCustomSQLQuery").unwrap();
        let strategy = sql.parameter("strategy").unwrap();
        assert_eq!(strategy.default.as_deref(), Some("ROWS"));

        assert!(matches!(
            catalog.get("nope"),
            Err(TermError::UnknownTestDefinition(_))
        ));
    }

    #[test]
    fn test_publish_is_immutable() {
        let mut catalog = TestDefinitionCatalog::new();
        catalog
            .publish(TestDefinition::new("foo", EntityType::Table))
            .unwrap();
        let err = catalog
            .publish(TestDefinition::new("foo", EntityType::Column))
            .unwrap_err();
        assert!(err.is_configuration_error());
        assert_eq!(catalog.get("foo").unwrap().entity_type, EntityType::Table);
    }

    #[test]
    fn test_definition_deserializes_camel_case() {
        let json = r#"{
            "name": "tableRowCountToEqual",
            "fullyQualifiedName": "tableRowCountToEqual",
            "entityType": "TABLE",
            "parameters": [
                {"name": "value", "dataType": {"type": "INT"}, "required": true}
            ]
        }"#;
        let definition: TestDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(definition.version, "0.1");
        assert_eq!(definition.parameters[0].data_type, ParameterType::Int);
    }
}
