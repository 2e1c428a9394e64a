use crate::api::EntityApi;
use crate::core::{EntityId, PropertyId, Result, Statement, SweepError};
use crate::retry::RetryingCaller;
use std::sync::Arc;
use tracing::{info, warn};

/// Fetches entities and extracts one property's statements.
///
/// Nothing is cached: every call re-reads the remote entity.
#[derive(Clone)]
pub struct EntityReader {
    api: Arc<dyn EntityApi>,
    caller: Arc<RetryingCaller>,
}

impl EntityReader {
    pub fn new(api: Arc<dyn EntityApi>, caller: Arc<RetryingCaller>) -> Self {
        Self { api, caller }
    }

    /// Statements of `entity` for `property`, in remote order.
    ///
    /// Any failure of the read call surfaces as
    /// [`SweepError::EntityNotFound`]; a property that is not set yields an
    /// empty list.
    pub async fn statements(
        &self,
        entity: &EntityId,
        property: &PropertyId,
    ) -> Result<Vec<Statement>> {
        let read = self
            .caller
            .call("wbgetentities", || self.api.read_entity(entity))
            .await;
        let mut fetched = match read {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(entity = %entity, error = %err, "Entity {} not found?", entity);
                return Err(SweepError::EntityNotFound(entity.clone()));
            }
        };

        match fetched.statements.remove(property) {
            Some(statements) if !statements.is_empty() => Ok(statements),
            _ => {
                info!("Property {} not found in {}.", property, entity);
                Ok(Vec::new())
            }
        }
    }
}
