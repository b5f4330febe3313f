//! Identifier validation and quoting.
//!
//! Only identifiers (schemas, tables, columns, roles) are ever written into
//! SQL text, and only through [`quote`]. Values always travel as bound
//! parameters.

use thiserror::Error;

/// Postgres truncates identifiers longer than this.
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Errors produced while quoting identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentError {
    /// The identifier was empty.
    #[error("identifier must be a non-empty string")]
    Empty,
}

/// Check that `s` matches `^[a-zA-Z0-9_]+$` and fits the Postgres limit.
#[inline]
pub fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_IDENTIFIER_LENGTH
        && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Quote an identifier for inclusion in SQL text.
///
/// Embedded double quotes are doubled (`a"b` becomes `"a""b"`); there is no
/// backslash escaping in Postgres identifiers.
pub fn quote(identifier: &str) -> Result<String, IdentError> {
    if identifier.is_empty() {
        return Err(IdentError::Empty);
    }
    Ok(format!("\"{}\"", identifier.replace('"', "\"\"")))
}

/// Quote a table, optionally qualified by a schema.
pub fn qualified(schema: Option<&str>, table: &str) -> Result<String, IdentError> {
    match schema {
        Some(schema) => Ok(format!("{}.{}", quote(schema)?, quote(table)?)),
        None => quote(table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_doubles_embedded_quotes() {
        assert_eq!(quote("a\"b").unwrap(), "\"a\"\"b\"");
        assert_eq!(quote("users").unwrap(), "\"users\"");
    }

    #[test]
    fn test_quote_rejects_empty() {
        assert_eq!(quote(""), Err(IdentError::Empty));
    }

    #[test]
    fn test_valid_identifiers() {
        assert!(is_valid_identifier("users"));
        assert!(is_valid_identifier("user_id"));
        assert!(is_valid_identifier("2024_orders"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("user-name"));
        assert!(!is_valid_identifier("users; DROP TABLE x"));
        assert!(!is_valid_identifier("naïve"));
        assert!(!is_valid_identifier(&"a".repeat(64)));
    }

    #[test]
    fn test_qualified() {
        assert_eq!(qualified(Some("api"), "todos").unwrap(), "\"api\".\"todos\"");
        assert_eq!(qualified(None, "todos").unwrap(), "\"todos\"");
    }
}
