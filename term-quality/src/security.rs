//! SQL hardening for the pushdown backend.
//!
//! Every identifier that reaches generated SQL goes through
//! [`SqlSecurity::quote_identifier`], every literal through
//! [`SqlSecurity::quote_literal`]. User-authored queries of the custom SQL test
//! must pass [`SqlSecurity::validate_query`].

use crate::error::{Result, TermError};
use once_cell::sync::Lazy;
use regex::Regex;

const MAX_IDENTIFIER_LENGTH: usize = 256;
const MAX_PATTERN_LENGTH: usize = 1000;
const MAX_QUERY_LENGTH: usize = 10_000;

/// SQL identifier, literal and query validation utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Quotes a single SQL identifier (table or column name).
    ///
    /// The identifier is wrapped in double quotes and embedded double quotes are
    /// doubled, so names such as `created_at` or `Order Date` are safe to use
    /// verbatim.
    ///
    /// # Examples
    /// ```rust
    /// use term_quality::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::quote_identifier("email").unwrap(), "\"email\"");
    /// assert_eq!(SqlSecurity::quote_identifier("a\"b").unwrap(), "\"a\"\"b\"");
    /// assert!(SqlSecurity::quote_identifier("").is_err());
    /// ```
    pub fn quote_identifier(identifier: &str) -> Result<String> {
        if identifier.trim().is_empty() {
            return Err(TermError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }
        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            return Err(TermError::SecurityError(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }
        if identifier.contains('\0') {
            return Err(TermError::SecurityError(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }

        let escaped = identifier.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }

    /// Quotes a dotted name segment by segment (`db.schema.table`).
    pub fn quote_qualified(name: &str) -> Result<String> {
        let segments = name
            .split('.')
            .map(Self::quote_identifier)
            .collect::<Result<Vec<_>>>()?;
        Ok(segments.join("."))
    }

    /// Quotes a string literal, doubling embedded single quotes.
    pub fn quote_literal(value: &str) -> Result<String> {
        if value.contains('\0') {
            return Err(TermError::SecurityError(
                "SQL literal cannot contain null bytes".to_string(),
            ));
        }
        Ok(format!("'{}'", value.replace('\'', "''")))
    }

    /// Validates a regex pattern and returns it escaped for a SQL literal body.
    ///
    /// The pattern must compile with the `regex` crate, which is the dialect
    /// both backends evaluate.
    pub fn validate_regex_pattern(pattern: &str) -> Result<String> {
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(TermError::SecurityError(format!(
                "Regex pattern too long (max {MAX_PATTERN_LENGTH} characters)"
            )));
        }
        if pattern.contains('\0') {
            return Err(TermError::SecurityError(
                "Regex pattern cannot contain null bytes".to_string(),
            ));
        }
        if let Err(e) = Regex::new(pattern) {
            return Err(TermError::SecurityError(format!(
                "Invalid regex pattern: {e}"
            )));
        }

        // Only the textbook catastrophic shapes; anything subtler is accepted.
        for dangerous in ["(.*)*", "(.*)+", "(.+)+", "(a+)+", "(a*)*"] {
            if pattern.contains(dangerous) {
                return Err(TermError::SecurityError(
                    "Regex pattern might cause ReDoS attack".to_string(),
                ));
            }
        }

        Ok(pattern.replace('\'', "''"))
    }

    /// Validates a user-authored query for the custom SQL test.
    ///
    /// Accepts one read-only statement starting with `SELECT` or `WITH`.
    /// Statement separators, comments and data-modifying keywords are rejected.
    pub fn validate_query(query: &str) -> Result<String> {
        static LEADING_KEYWORD: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(r"(?i)^\s*(select|with)\b").expect("Hard-coded regex pattern should be valid")
        });
        static FORBIDDEN_KEYWORD: Lazy<Regex> = Lazy::new(|| {
            #[allow(clippy::expect_used)]
            Regex::new(
                r"(?i)\b(insert|update|delete|merge|drop|create|alter|truncate|grant|revoke|copy|exec|execute|call|attach|detach|pragma|vacuum|commit|rollback)\b",
            )
            .expect("Hard-coded regex pattern should be valid")
        });

        if query.len() > MAX_QUERY_LENGTH {
            return Err(TermError::SecurityError(format!(
                "SQL query too long (max {MAX_QUERY_LENGTH} characters)"
            )));
        }
        if query.contains('\0') {
            return Err(TermError::SecurityError(
                "SQL query cannot contain null bytes".to_string(),
            ));
        }

        let trimmed = query.trim().trim_end_matches(';').trim_end();
        if !LEADING_KEYWORD.is_match(trimmed) {
            return Err(TermError::SecurityError(
                "SQL query must be a SELECT or WITH statement".to_string(),
            ));
        }
        if trimmed.contains(';') {
            return Err(TermError::SecurityError(
                "SQL query must contain a single statement".to_string(),
            ));
        }
        if trimmed.contains("--") || trimmed.contains("/*") {
            return Err(TermError::SecurityError(
                "SQL query cannot contain comments".to_string(),
            ));
        }
        if let Some(found) = FORBIDDEN_KEYWORD.find(&Self::strip_string_literals(trimmed)) {
            return Err(TermError::SecurityError(format!(
                "SQL query contains forbidden keyword: '{}'",
                found.as_str()
            )));
        }

        Ok(trimmed.to_string())
    }

    /// Blanks out the contents of single-quoted literals.
    fn strip_string_literals(query: &str) -> String {
        let mut out = String::with_capacity(query.len());
        let mut in_literal = false;
        for c in query.chars() {
            if c == '\'' {
                in_literal = !in_literal;
                out.push(c);
            } else if in_literal {
                out.push(' ');
            } else {
                out.push(c);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(
            SqlSecurity::quote_identifier("customer_id").unwrap(),
            "\"customer_id\""
        );
        assert_eq!(
            SqlSecurity::quote_identifier("created_at").unwrap(),
            "\"created_at\""
        );
        assert_eq!(
            SqlSecurity::quote_identifier("Order Date").unwrap(),
            "\"Order Date\""
        );
        assert_eq!(
            SqlSecurity::quote_identifier("x\"; DROP TABLE t; --").unwrap(),
            "\"x\"\"; DROP TABLE t; --\""
        );

        assert!(SqlSecurity::quote_identifier("").is_err());
        assert!(SqlSecurity::quote_identifier("   ").is_err());
        assert!(SqlSecurity::quote_identifier("a\0b").is_err());
        assert!(SqlSecurity::quote_identifier(&"a".repeat(300)).is_err());
    }

    #[test]
    fn test_quote_qualified() {
        assert_eq!(
            SqlSecurity::quote_qualified("shop.public.orders").unwrap(),
            "\"shop\".\"public\".\"orders\""
        );
        assert!(SqlSecurity::quote_qualified("shop..orders").is_err());
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(SqlSecurity::quote_literal("abc").unwrap(), "'abc'");
        assert_eq!(SqlSecurity::quote_literal("it's").unwrap(), "'it''s'");
        assert!(SqlSecurity::quote_literal("a\0").is_err());
    }

    #[test]
    fn test_regex_pattern_validation() {
        assert!(SqlSecurity::validate_regex_pattern(r"^[A-Z]\d+$").is_ok());
        assert!(
            SqlSecurity::validate_regex_pattern(r"^[^@\s]+@[^@\s]+\.[a-z]+$").is_ok()
        );
        assert!(SqlSecurity::validate_regex_pattern(r"[unclosed").is_err());
        assert!(SqlSecurity::validate_regex_pattern(&"a".repeat(2000)).is_err());
        assert!(SqlSecurity::validate_regex_pattern("(.*)*x").is_err());
        assert_eq!(
            SqlSecurity::validate_regex_pattern("it's").unwrap(),
            "it''s"
        );
    }

    #[test]
    fn test_validate_query_accepts_read_only_statements() {
        assert_eq!(
            SqlSecurity::validate_query("SELECT * FROM users WHERE age < 0;").unwrap(),
            "SELECT * FROM users WHERE age < 0"
        );
        assert!(SqlSecurity::validate_query(
            "with recent as (select * from orders where created_at > '2024-01-01') select * from recent"
        )
        .is_ok());
        assert!(SqlSecurity::validate_query("SELECT updated_by FROM t").is_ok());
        // keywords inside literals are data
        assert!(SqlSecurity::validate_query("SELECT * FROM t WHERE status = 'deleted drop'").is_ok());
    }

    #[test]
    fn test_validate_query_rejects_unsafe_statements() {
        assert!(SqlSecurity::validate_query("DELETE FROM users").is_err());
        assert!(SqlSecurity::validate_query("SELECT 1; DROP TABLE users").is_err());
        assert!(SqlSecurity::validate_query("SELECT 1 -- hidden").is_err());
        assert!(SqlSecurity::validate_query("SELECT /* x */ 1").is_err());
        assert!(SqlSecurity::validate_query("WITH x AS (DELETE FROM t) SELECT 1").is_err());
        assert!(SqlSecurity::validate_query("").is_err());
    }
}
