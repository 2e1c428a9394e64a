//! Statement selection and removal against the remote entity API.

pub mod executor;
pub mod mass;
pub mod reader;
pub mod tally;

use crate::core::{ComparableValue, Statement};

pub use executor::MutationExecutor;
pub use reader::EntityReader;
pub use tally::OutcomeTally;

/// Decides whether a statement is selected, given its normalized value.
///
/// Callers passing no predicate select every statement of the property.
pub type MatchPredicate = dyn Fn(&ComparableValue, &Statement) -> bool + Send + Sync;

/// Predicate selecting statements whose value reads as `expected`.
///
/// Reference ids and string literals compare by text, numeric literals by
/// their JSON number form (`5`, `2.5`). Structured literals never match.
pub fn value_equals(expected: impl Into<String>) -> Box<MatchPredicate> {
    let expected = expected.into();
    Box::new(move |value: &ComparableValue, _: &Statement| match value {
        ComparableValue::Literal(serde_json::Value::Number(number)) => {
            number.to_string() == expected
        }
        other => other.as_text() == Some(expected.as_str()),
    })
}

/// Result of an entity-level operation: the entity could not be read, or the
/// operation ran and produced `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityScan<T> {
    Missing,
    Found(T),
}

impl<T> EntityScan<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl EntityScan<usize> {
    /// Count with `-1` standing for an unreadable entity, as reported in logs.
    pub fn as_count(&self) -> i64 {
        match self {
            Self::Missing => -1,
            Self::Found(count) => *count as i64,
        }
    }
}
