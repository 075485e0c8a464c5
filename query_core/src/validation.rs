//! Identifier validation
//!
//! Table and column names are interpolated into statements, never bound, so
//! every name that reaches the compiler goes through here first.

use std::fmt;

/// Validation errors for database identifiers
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Name contains invalid characters (only alphanumeric and underscore allowed)
    InvalidCharacters(String),
    /// Name is too long (PostgreSQL limit is 63 characters)
    TooLong {
        name: String,
        length: usize,
        max_length: usize,
    },
    /// Name is empty
    Empty,
    /// Name starts with invalid character (must start with letter or underscore)
    InvalidStartCharacter(String),
    /// Name is a reserved SQL keyword
    ReservedKeyword(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCharacters(name) => {
                write!(f, "Invalid characters in name '{}': only alphanumeric characters and underscores are allowed", name)
            }
            ValidationError::TooLong {
                name,
                length,
                max_length,
            } => {
                write!(
                    f,
                    "Name '{}' is too long: {} characters (max {})",
                    name, length, max_length
                )
            }
            ValidationError::Empty => {
                write!(f, "Name cannot be empty")
            }
            ValidationError::InvalidStartCharacter(name) => {
                write!(f, "Name '{}' must start with a letter or underscore", name)
            }
            ValidationError::ReservedKeyword(name) => {
                write!(f, "Name '{}' is a reserved SQL keyword", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for crate::errors::QueryError {
    fn from(error: ValidationError) -> Self {
        crate::errors::QueryError::Validation(error.to_string())
    }
}

/// PostgreSQL identifier length limit
const MAX_LENGTH: usize = 63;

/// A validated table name that is safe to use in SQL queries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedTableName(String);

impl ValidatedTableName {
    /// Create a new validated table name, optionally schema-qualified
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        validate_qualified(name, true)?;
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatedTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate a bare column name as written in INSERT/UPDATE/ON CONFLICT lists
pub fn validate_column(name: &str) -> Result<(), ValidationError> {
    validate_segment(name, name, true)
}

/// Validate a column reference that may be table-qualified (`orders.user_id`)
///
/// Reserved words are accepted in the last segment because references like
/// `orders.key` are unambiguous once qualified; bare references are checked.
pub fn validate_column_ref(name: &str) -> Result<(), ValidationError> {
    let qualified = name.contains('.');
    validate_qualified(name, !qualified)
}

fn validate_qualified(name: &str, reject_reserved: bool) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::Empty);
    }

    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() > 2 {
        return Err(ValidationError::InvalidCharacters(name.to_string()));
    }

    for segment in segments {
        validate_segment(segment, name, reject_reserved)?;
    }
    Ok(())
}

fn validate_segment(segment: &str, full: &str, reject_reserved: bool) -> Result<(), ValidationError> {
    if segment.is_empty() {
        return if full.is_empty() {
            Err(ValidationError::Empty)
        } else {
            Err(ValidationError::InvalidCharacters(full.to_string()))
        };
    }

    if segment.len() > MAX_LENGTH {
        return Err(ValidationError::TooLong {
            name: full.to_string(),
            length: segment.len(),
            max_length: MAX_LENGTH,
        });
    }

    let first_char = segment.chars().next().ok_or(ValidationError::Empty)?;
    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(ValidationError::InvalidStartCharacter(full.to_string()));
    }

    if !segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidCharacters(full.to_string()));
    }

    if reject_reserved && is_reserved_keyword(segment) {
        return Err(ValidationError::ReservedKeyword(full.to_string()));
    }

    Ok(())
}

/// Check if a name is a reserved SQL keyword
fn is_reserved_keyword(name: &str) -> bool {
    // Words PostgreSQL refuses as bare column or table names
    const RESERVED_KEYWORDS: &[&str] = &[
        "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "ASYMMETRIC", "BOTH",
        "CASE", "CAST", "CHECK", "COLLATE", "COLUMN", "CONSTRAINT", "CREATE", "CURRENT_DATE",
        "CURRENT_ROLE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "DEFAULT",
        "DEFERRABLE", "DELETE", "DESC", "DISTINCT", "DO", "DROP", "ELSE", "END", "EXCEPT",
        "FALSE", "FETCH", "FOR", "FOREIGN", "FROM", "GRANT", "GROUP", "HAVING", "IN",
        "INITIALLY", "INSERT", "INTERSECT", "INTO", "JOIN", "LATERAL", "LEADING", "LIMIT",
        "LOCALTIME", "LOCALTIMESTAMP", "NOT", "NULL", "OFFSET", "ON", "ONLY", "OR", "ORDER",
        "PLACING", "PRIMARY", "REFERENCES", "RETURNING", "SELECT", "SESSION_USER", "SOME",
        "SYMMETRIC", "TABLE", "THEN", "TO", "TRAILING", "TRUE", "UNION", "UNIQUE", "UPDATE",
        "USER", "USING", "VARIADIC", "WHEN", "WHERE", "WINDOW", "WITH",
    ];

    RESERVED_KEYWORDS.contains(&name.to_ascii_uppercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_table_names() {
        let valid_names = [
            "users",
            "order_items",
            "OrderItems",
            "_private_table",
            "table123",
            "public.products",
            &"a".repeat(63),
        ];

        for name in valid_names {
            assert!(
                ValidatedTableName::new(name).is_ok(),
                "Should accept valid name: {}",
                name
            );
        }
    }

    #[test]
    fn test_invalid_table_names() {
        let test_cases = [
            ("", ValidationError::Empty),
            (
                "123table",
                ValidationError::InvalidStartCharacter("123table".to_string()),
            ),
            (
                "user-name",
                ValidationError::InvalidCharacters("user-name".to_string()),
            ),
            (
                "users; DROP TABLE users",
                ValidationError::InvalidCharacters("users; DROP TABLE users".to_string()),
            ),
            ("a.b.c", ValidationError::InvalidCharacters("a.b.c".to_string())),
            ("users.", ValidationError::InvalidCharacters("users.".to_string())),
            ("select", ValidationError::ReservedKeyword("select".to_string())),
            ("ORDER", ValidationError::ReservedKeyword("ORDER".to_string())),
        ];

        for (name, expected_error) in test_cases {
            let result = ValidatedTableName::new(name);
            assert_eq!(result.unwrap_err(), expected_error, "for {:?}", name);
        }
    }

    #[test]
    fn test_too_long_name() {
        let long_name = "a".repeat(64);
        match ValidatedTableName::new(&long_name).unwrap_err() {
            ValidationError::TooLong {
                length, max_length, ..
            } => {
                assert_eq!(length, 64);
                assert_eq!(max_length, 63);
            }
            other => panic!("Expected TooLong error, got {:?}", other),
        }
    }

    #[test]
    fn test_column_refs() {
        assert!(validate_column_ref("price").is_ok());
        assert!(validate_column_ref("orders.user_id").is_ok());
        // qualified reserved word is unambiguous
        assert!(validate_column_ref("o.order").is_ok());
        assert!(validate_column_ref("order").is_err());
        assert!(validate_column_ref("price > 0").is_err());
        assert!(validate_column_ref("COUNT(*)").is_err());
    }

    #[test]
    fn test_write_columns_are_unqualified() {
        assert!(validate_column("deleted_at").is_ok());
        assert!(validate_column("products.name").is_err());
        assert!(validate_column("user").is_err());
    }
}
