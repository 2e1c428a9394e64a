use std::fmt;

use super::types::{Statement, TypedValue};

/// Scalar extracted from a statement's value, handed to match predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum ComparableValue {
    /// Target id of a reference value (`Q123`).
    Id(String),
    /// Raw literal payload, as encoded by the API.
    Literal(serde_json::Value),
    /// Malformed or missing value; compares as the empty string.
    Empty,
}

impl ComparableValue {
    /// Text form for string-like values: the reference id, a string literal,
    /// or `""` for empty. `None` for structured or numeric literals.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id),
            Self::Literal(serde_json::Value::String(raw)) => Some(raw),
            Self::Literal(_) => None,
            Self::Empty => Some(""),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl PartialEq<str> for ComparableValue {
    fn eq(&self, other: &str) -> bool {
        self.as_text() == Some(other)
    }
}

impl PartialEq<&str> for ComparableValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}

impl fmt::Display for ComparableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.write_str(id),
            Self::Literal(serde_json::Value::String(raw)) => f.write_str(raw),
            Self::Literal(raw) => write!(f, "{}", raw),
            Self::Empty => Ok(()),
        }
    }
}

/// Extracts the comparable scalar of a statement. Never fails: malformed
/// values normalize to [`ComparableValue::Empty`].
pub fn normalize(statement: &Statement) -> ComparableValue {
    match &statement.value {
        TypedValue::Reference { target } => ComparableValue::Id(target.as_str().to_string()),
        TypedValue::Literal { raw } => ComparableValue::Literal(raw.clone()),
        TypedValue::Absent => ComparableValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reference_normalizes_to_target_id() {
        let value = normalize(&Statement::reference("Q1$a", "Q42"));
        assert_eq!(value, ComparableValue::Id("Q42".to_string()));
        assert_eq!(value, "Q42");
    }

    #[test]
    fn string_literal_normalizes_to_itself() {
        let value = normalize(&Statement::literal("Q1$b", json!("hello")));
        assert_eq!(value.as_text(), Some("hello"));
        assert_eq!(value.to_string(), "hello");
    }

    #[test]
    fn structured_literal_is_passed_through() {
        let coords = json!({"latitude": 52.2, "longitude": 21.0, "precision": 0.0001});
        let value = normalize(&Statement::literal("Q1$c", coords.clone()));
        assert_eq!(value, ComparableValue::Literal(coords));
        assert_eq!(value.as_text(), None);
    }

    #[test]
    fn absent_value_normalizes_to_empty_string() {
        let value = normalize(&Statement::absent("Q1$d"));
        assert!(value.is_empty());
        assert_eq!(value, "");
        assert_eq!(value.to_string(), "");
    }
}
