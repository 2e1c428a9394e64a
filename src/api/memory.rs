use super::EntityApi;
use crate::core::{Entity, EntityId, PropertyId, Result, Statement, StatementId, SweepError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

#[derive(Default)]
struct InMemoryState {
    entities: HashMap<EntityId, Entity>,
    unreadable: HashSet<EntityId>,
    write_failures: HashMap<StatementId, VecDeque<SweepError>>,
    read_calls: Vec<EntityId>,
    write_calls: Vec<StatementId>,
}

/// An in-memory implementation of `EntityApi` for testing.
///
/// Holds entities locally, records every call, and replays scripted write
/// failures per statement before letting the write through.
#[derive(Clone, Default)]
pub struct InMemoryEntityApi {
    state: Arc<Mutex<InMemoryState>>,
    latency: Option<Duration>,
}

impl InMemoryEntityApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before answering, so concurrent chunks
    /// interleave the way they do against the real API.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn insert_entity(&self, entity: Entity) {
        let mut state = self.state.lock().await;
        state.entities.insert(entity.id.clone(), entity);
    }

    /// Reads of `id` fail as if the request itself failed.
    pub async fn fail_reads_for(&self, id: impl Into<EntityId>) {
        self.state.lock().await.unreadable.insert(id.into());
    }

    /// Queues errors returned, in order, by the next writes of `statement`.
    pub async fn script_write_failures(
        &self,
        statement: impl Into<StatementId>,
        failures: Vec<SweepError>,
    ) {
        let mut state = self.state.lock().await;
        state
            .write_failures
            .entry(statement.into())
            .or_default()
            .extend(failures);
    }

    pub async fn read_calls(&self) -> Vec<EntityId> {
        self.state.lock().await.read_calls.clone()
    }

    pub async fn write_calls(&self) -> Vec<StatementId> {
        self.state.lock().await.write_calls.clone()
    }

    /// Current statements of `entity` for `property`.
    pub async fn statements(&self, entity: &EntityId, property: &PropertyId) -> Vec<Statement> {
        let state = self.state.lock().await;
        state
            .entities
            .get(entity)
            .map(|e| e.statements_for(property).to_vec())
            .unwrap_or_default()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            sleep(latency).await;
        }
    }
}

#[async_trait]
impl EntityApi for InMemoryEntityApi {
    async fn read_entity(&self, id: &EntityId) -> Result<Entity> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;
        state.read_calls.push(id.clone());
        if state.unreadable.contains(id) {
            return Err(SweepError::Transport(format!(
                "connection reset while reading '{}'",
                id
            )));
        }
        state
            .entities
            .get(id)
            .cloned()
            .ok_or_else(|| SweepError::EntityNotFound(id.clone()))
    }

    async fn remove_statement(&self, id: &StatementId) -> Result<()> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;
        state.write_calls.push(id.clone());
        if let Some(err) = state
            .write_failures
            .get_mut(id)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }

        for entity in state.entities.values_mut() {
            for statements in entity.statements.values_mut() {
                if let Some(pos) = statements.iter().position(|s| &s.id == id) {
                    statements.remove(pos);
                    return Ok(());
                }
            }
        }
        Err(SweepError::Remote {
            code: "invalid-guid".to_string(),
            info: format!("Statement '{}' does not exist", id),
            warnings: None,
        })
    }
}
