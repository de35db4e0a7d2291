//! Backend-neutral handles to the table and columns under test.
//!
//! Handles are derived from an Arrow schema by both backends, so validators
//! resolve columns the same way regardless of where the data lives. They are
//! built per backend instance and never shared across runs.

use crate::error::{Result, TermError};
use arrow::datatypes::{DataType, Schema};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse data type classification used to decide metric applicability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticType {
    Integer,
    Float,
    Text,
    Boolean,
    Date,
    Timestamp,
    Binary,
    Other,
}

impl SemanticType {
    /// Classifies an Arrow data type.
    pub fn from_arrow(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => SemanticType::Integer,
            DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _) => SemanticType::Float,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => SemanticType::Text,
            DataType::Boolean => SemanticType::Boolean,
            DataType::Date32 | DataType::Date64 => SemanticType::Date,
            DataType::Timestamp(_, _) => SemanticType::Timestamp,
            DataType::Binary
            | DataType::LargeBinary
            | DataType::BinaryView
            | DataType::FixedSizeBinary(_) => SemanticType::Binary,
            DataType::Dictionary(_, value) => Self::from_arrow(value),
            _ => SemanticType::Other,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SemanticType::Integer | SemanticType::Float)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, SemanticType::Date | SemanticType::Timestamp)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, SemanticType::Text)
    }

    /// Whether values can be rendered as text for set membership and histograms.
    pub fn is_displayable(&self) -> bool {
        !matches!(self, SemanticType::Binary | SemanticType::Other)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::Integer => "INTEGER",
            SemanticType::Float => "FLOAT",
            SemanticType::Text => "TEXT",
            SemanticType::Boolean => "BOOLEAN",
            SemanticType::Date => "DATE",
            SemanticType::Timestamp => "TIMESTAMP",
            SemanticType::Binary => "BINARY",
            SemanticType::Other => "OTHER",
        };
        write!(f, "{name}")
    }
}

/// A column of the table under test.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnHandle {
    name: String,
    data_type: SemanticType,
    arrow_type: DataType,
    index: usize,
}

impl ColumnHandle {
    pub fn new(name: impl Into<String>, arrow_type: DataType, index: usize) -> Self {
        Self {
            name: name.into(),
            data_type: SemanticType::from_arrow(&arrow_type),
            arrow_type,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> SemanticType {
        self.data_type
    }

    pub fn arrow_type(&self) -> &DataType {
        &self.arrow_type
    }

    /// Position of the column in the table schema.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// The table under test and its columns, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableHandle {
    name: String,
    columns: Vec<ColumnHandle>,
}

impl TableHandle {
    /// Builds a handle from an Arrow schema.
    pub fn from_schema(name: impl Into<String>, schema: &Schema) -> Self {
        let columns = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(index, field)| ColumnHandle::new(field.name(), field.data_type().clone(), index))
            .collect();
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnHandle] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Looks up a column by exact name.
    pub fn column(&self, name: &str) -> Result<&ColumnHandle> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| TermError::ColumnNotFound {
                column: name.to_string(),
                table: self.name.clone(),
            })
    }
}
