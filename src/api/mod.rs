//! Remote entity API seam.

pub mod http;
pub mod memory;
pub mod wire;

#[cfg(test)]
pub(crate) mod mock_wiki;

use crate::core::{Entity, EntityId, Result, StatementId};
use async_trait::async_trait;

pub use http::HttpEntityApi;
pub use memory::InMemoryEntityApi;

/// The two calls the engine needs from the remote API.
///
/// Implementations classify failure envelopes into `SweepError` variants;
/// they do not retry.
#[async_trait]
pub trait EntityApi: Send + Sync {
    /// `wbgetentities` for one id.
    async fn read_entity(&self, id: &EntityId) -> Result<Entity>;

    /// `wbremoveclaims` for one statement; the edit token is attached by the
    /// implementation.
    async fn remove_statement(&self, id: &StatementId) -> Result<()>;
}
