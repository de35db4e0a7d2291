//! Entity links locate the table, or the column within a table, a test case targets.

use crate::error::{Result, TermError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of entity a test definition applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// Whole-table tests (row counts, column sets, custom SQL).
    Table,
    /// Tests over the values of a single column.
    Column,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Table => write!(f, "TABLE"),
            EntityType::Column => write!(f, "COLUMN"),
        }
    }
}

/// A parsed entity link.
///
/// Three encodings are accepted:
///
/// - `<#E::table::svc.db.schema.orders::columns::email>`
/// - `table::svc.db.schema.orders::email`
/// - `table::svc.db.schema.orders`
///
/// A link with a column component targets [`EntityType::Column`], otherwise
/// [`EntityType::Table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityLink {
    table_fqn: String,
    column: Option<String>,
}

impl EntityLink {
    /// Creates a link to a table.
    pub fn table(table_fqn: impl Into<String>) -> Self {
        Self {
            table_fqn: table_fqn.into(),
            column: None,
        }
    }

    /// Creates a link to a column of a table.
    pub fn column(table_fqn: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table_fqn: table_fqn.into(),
            column: Some(column.into()),
        }
    }

    /// Parses an entity link string.
    pub fn parse(link: &str) -> Result<Self> {
        let trimmed = link.trim();
        let body = match trimmed.strip_prefix("<#E::") {
            Some(rest) => rest
                .strip_suffix('>')
                .ok_or_else(|| TermError::entity_link(link, "missing closing '>'"))?,
            None => trimmed,
        };

        let parts: Vec<&str> = body.split("::").collect();
        let (kind, rest) = parts
            .split_first()
            .ok_or_else(|| TermError::entity_link(link, "empty link"))?;
        if *kind != "table" {
            return Err(TermError::entity_link(
                link,
                format!("unsupported entity kind '{kind}'"),
            ));
        }

        let (table_fqn, column) = match rest {
            [fqn] => (*fqn, None),
            [fqn, "columns", column] => (*fqn, Some(*column)),
            [fqn, column] => (*fqn, Some(*column)),
            _ => {
                return Err(TermError::entity_link(
                    link,
                    "expected 'table::<fqn>' with an optional column",
                ))
            }
        };

        if table_fqn.trim().is_empty() {
            return Err(TermError::entity_link(link, "table name is empty"));
        }
        if column.is_some_and(|c| c.trim().is_empty()) {
            return Err(TermError::entity_link(link, "column name is empty"));
        }

        Ok(Self {
            table_fqn: table_fqn.to_string(),
            column: column.map(str::to_string),
        })
    }

    /// Fully qualified name of the table.
    pub fn table_fqn(&self) -> &str {
        &self.table_fqn
    }

    /// Column name, when the link targets a column.
    pub fn column_name(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Whether the link's table is `table_name`.
    ///
    /// Names are compared by their dot-separated segments, and the shorter
    /// name must be a suffix of the longer one: `shop.public.orders` refers to
    /// `orders` and to `public.orders`, never to `archive.orders`.
    pub fn refers_to(&self, table_name: &str) -> bool {
        let link: Vec<&str> = self.table_fqn.split('.').collect();
        let table: Vec<&str> = table_name.split('.').collect();
        let (short, long) = if link.len() <= table.len() {
            (&link, &table)
        } else {
            (&table, &link)
        };
        long.ends_with(short)
    }

    /// The entity type this link addresses.
    pub fn entity_type(&self) -> EntityType {
        if self.column.is_some() {
            EntityType::Column
        } else {
            EntityType::Table
        }
    }
}

impl FromStr for EntityLink {
    type Err = TermError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for EntityLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "<#E::table::{}::columns::{column}>", self.table_fqn),
            None => write!(f, "<#E::table::{}>", self.table_fqn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bracketed_column_link() {
        let link = EntityLink::parse("<#E::table::shop.public.users::columns::email>").unwrap();
        assert_eq!(link.table_fqn(), "shop.public.users");
        assert_eq!(link.column_name(), Some("email"));
        assert_eq!(link.entity_type(), EntityType::Column);
    }

    #[test]
    fn test_parse_short_forms() {
        let column = EntityLink::parse("table::shop.public.users::email").unwrap();
        assert_eq!(column, EntityLink::column("shop.public.users", "email"));

        let table: EntityLink = "table::shop.public.users".parse().unwrap();
        assert_eq!(table.entity_type(), EntityType::Table);
        assert_eq!(table.column_name(), None);
    }

    #[test]
    fn test_display_round_trips() {
        let link = EntityLink::column("users", "email");
        assert_eq!(EntityLink::parse(&link.to_string()).unwrap(), link);
        assert_eq!(EntityLink::table("users").to_string(), "<#E::table::users>");
    }

    #[test]
    fn test_refers_to_matches_trailing_segments() {
        let link = EntityLink::table("shop.public.orders");
        assert!(link.refers_to("orders"));
        assert!(link.refers_to("public.orders"));
        assert!(link.refers_to("shop.public.orders"));
        assert!(!link.refers_to("users"));
        assert!(!link.refers_to("archive.orders"));
        assert!(!link.refers_to("rders"));

        let short = EntityLink::column("orders", "id");
        assert!(short.refers_to("shop.public.orders"));
        assert!(!short.refers_to("shop.public.orders_v2"));
    }

    #[test]
    fn test_invalid_links() {
        for raw in [
            "",
            "dashboard::sales",
            "<#E::table::users",
            "table::",
            "table::users::",
            "table::a::b::c::d",
        ] {
            let err = EntityLink::parse(raw).unwrap_err();
            assert!(
                matches!(err, TermError::EntityLink { .. }),
                "expected entity link error for {raw:?}"
            );
        }
    }
}
