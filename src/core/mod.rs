pub mod error;
pub mod types;
pub mod value;

pub use error::{Result, SweepError};
pub use types::{Entity, EntityId, PropertyId, Statement, StatementId, TypedValue};
pub use value::{ComparableValue, normalize};
