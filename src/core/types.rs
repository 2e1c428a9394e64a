use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Remote record id, e.g. `Q42`.
    EntityId
);
string_id!(
    /// Statement group id, e.g. `P625`.
    PropertyId
);
string_id!(
    /// Globally unique statement (claim) id, stable until removed.
    StatementId
);

/// Typed payload of a statement's main value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// Points at another entity.
    Reference { target: EntityId },
    /// Any literal payload: string, number, coordinates, time, ...
    Literal { raw: serde_json::Value },
    /// Missing or malformed value (`novalue`/`somevalue` snaks included).
    Absent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub id: StatementId,
    pub value: TypedValue,
}

impl Statement {
    pub fn new(id: impl Into<StatementId>, value: TypedValue) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }

    pub fn reference(id: impl Into<StatementId>, target: impl Into<EntityId>) -> Self {
        Self::new(
            id,
            TypedValue::Reference {
                target: target.into(),
            },
        )
    }

    pub fn literal(id: impl Into<StatementId>, raw: serde_json::Value) -> Self {
        Self::new(id, TypedValue::Literal { raw })
    }

    pub fn absent(id: impl Into<StatementId>) -> Self {
        Self::new(id, TypedValue::Absent)
    }
}

/// Read-only projection of a remote entity, fetched per call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entity {
    pub id: EntityId,
    pub statements: HashMap<PropertyId, Vec<Statement>>,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            statements: HashMap::new(),
        }
    }

    pub fn with_statements(
        mut self,
        property: impl Into<PropertyId>,
        statements: Vec<Statement>,
    ) -> Self {
        self.statements.insert(property.into(), statements);
        self
    }

    /// Statements for `property` in their remote order; empty when the
    /// property is not set.
    pub fn statements_for(&self, property: &PropertyId) -> &[Statement] {
        self.statements
            .get(property)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
