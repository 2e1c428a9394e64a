use super::{EntityReader, EntityScan, MatchPredicate};
use crate::api::EntityApi;
use crate::core::{EntityId, PropertyId, Result, Statement, StatementId, normalize};
use crate::retry::{RetryPolicy, RetryStats, RetryingCaller};
use std::sync::Arc;
use tracing::{info, warn};

/// Resolves matching statements of an entity and removes them, one write at
/// a time.
///
/// Writes against one entity are strictly sequential so the session's edit
/// token is used coherently and no two edits of the same record race.
#[derive(Clone)]
pub struct MutationExecutor {
    api: Arc<dyn EntityApi>,
    caller: Arc<RetryingCaller>,
    reader: EntityReader,
    progress_step: usize,
}

impl MutationExecutor {
    pub fn new(api: Arc<dyn EntityApi>, policy: RetryPolicy) -> Self {
        let caller = Arc::new(RetryingCaller::new(policy));
        let reader = EntityReader::new(Arc::clone(&api), Arc::clone(&caller));
        Self {
            api,
            caller,
            reader,
            progress_step: 10,
        }
    }

    /// Log progress of [`Self::remove_by_ids`] every `step` removals.
    pub fn with_progress_step(mut self, step: usize) -> Self {
        self.progress_step = step.max(1);
        self
    }

    pub fn retry_stats(&self) -> RetryStats {
        self.caller.stats()
    }

    /// One `wbremoveclaims` call, retried on transient conflicts.
    pub async fn remove_statement(&self, id: &StatementId) -> Result<()> {
        self.caller
            .call("wbremoveclaims", || self.api.remove_statement(id))
            .await
    }

    /// Removes every statement of `property` from `entity`.
    ///
    /// Returns `true` when the property is gone afterwards (including when it
    /// was never set). A failed read, or any removal failing after retries,
    /// returns `false`; statements removed before the failure stay removed.
    pub async fn remove_all_for_property(&self, entity: &EntityId, property: &PropertyId) -> bool {
        self.remove_all_counted(entity, property).await.is_some()
    }

    /// Like [`Self::remove_all_for_property`], returning how many statements
    /// were removed on success.
    pub(crate) async fn remove_all_counted(
        &self,
        entity: &EntityId,
        property: &PropertyId,
    ) -> Option<usize> {
        let statements = self.reader.statements(entity, property).await.ok()?;
        for statement in &statements {
            if let Err(err) = self.remove_statement(&statement.id).await {
                warn!(
                    entity = %entity,
                    statement = %statement.id,
                    error = %err,
                    "Problem removing property {} from {}.",
                    property,
                    entity
                );
                return None;
            }
        }
        Some(statements.len())
    }

    /// Removes statements of `property` selected by `predicate` (all when
    /// `None`).
    ///
    /// A removal failure is logged and the remaining statements are still
    /// processed. Returns [`EntityScan::Missing`] when the entity could not be
    /// read, otherwise the number of statements actually removed.
    pub async fn remove_matching(
        &self,
        entity: &EntityId,
        property: &PropertyId,
        predicate: Option<&MatchPredicate>,
    ) -> EntityScan<usize> {
        let Ok(statements) = self.reader.statements(entity, property).await else {
            return EntityScan::Missing;
        };
        let mut removed = 0;
        for statement in select(&statements, predicate) {
            match self.remove_statement(&statement.id).await {
                Ok(()) => removed += 1,
                Err(err) => warn!(
                    entity = %entity,
                    error = %err,
                    "Problem removing claim {} from {}.",
                    statement.id,
                    entity
                ),
            }
        }
        EntityScan::Found(removed)
    }

    /// Ids of the statements [`Self::remove_matching`] would remove, without
    /// writing anything.
    pub async fn statement_ids(
        &self,
        entity: &EntityId,
        property: &PropertyId,
        predicate: Option<&MatchPredicate>,
    ) -> EntityScan<Vec<StatementId>> {
        let Ok(statements) = self.reader.statements(entity, property).await else {
            return EntityScan::Missing;
        };
        EntityScan::Found(
            select(&statements, predicate)
                .map(|statement| statement.id.clone())
                .collect(),
        )
    }

    /// Removes previously selected statement ids, independent of entities.
    ///
    /// Failures are logged and skipped; the call never stops early. Returns
    /// the number of successful removals.
    pub async fn remove_by_ids(&self, ids: &[StatementId]) -> usize {
        let total = ids.len();
        let mut removed = 0;
        for id in ids {
            match self.remove_statement(id).await {
                Ok(()) => {
                    removed += 1;
                    if removed % self.progress_step == 0 {
                        info!("Removed {} of {}.", removed, total);
                    }
                }
                Err(err) => warn!(error = %err, "Problem removing claim {}.", id),
            }
        }
        removed
    }
}

fn select<'a>(
    statements: &'a [Statement],
    predicate: Option<&'a MatchPredicate>,
) -> impl Iterator<Item = &'a Statement> + 'a {
    statements.iter().filter(move |statement| match predicate {
        Some(predicate) => predicate(&normalize(statement), statement),
        None => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryEntityApi;
    use crate::core::{ComparableValue, Entity, SweepError};
    use crate::engine::value_equals;
    use serde_json::json;

    fn q(id: &str) -> EntityId {
        EntityId::new(id)
    }

    fn p(id: &str) -> PropertyId {
        PropertyId::new(id)
    }

    fn conflict() -> SweepError {
        SweepError::from_envelope("failed-save", "edit conflict", None, "failed-save")
    }

    fn permanent() -> SweepError {
        SweepError::Remote {
            code: "protectedpage".to_string(),
            info: "protected".to_string(),
            warnings: None,
        }
    }

    async fn api_with_coordinates() -> InMemoryEntityApi {
        let api = InMemoryEntityApi::new();
        api.insert_entity(Entity::new("Q1").with_statements(
            "P625",
            vec![
                Statement::literal("Q1$a", json!({"latitude": 52.1, "longitude": 21.0})),
                Statement::reference("Q1$b", "Q42"),
                Statement::reference("Q1$c", "Q42"),
            ],
        ))
        .await;
        api
    }

    fn executor(api: &InMemoryEntityApi) -> MutationExecutor {
        MutationExecutor::new(Arc::new(api.clone()), RetryPolicy::new(3, 10))
    }

    #[tokio::test]
    async fn remove_matching_removes_only_selected() {
        let api = api_with_coordinates().await;
        let matcher = value_equals("Q42");

        let removed = executor(&api)
            .remove_matching(&q("Q1"), &p("P625"), Some(matcher.as_ref()))
            .await;

        assert_eq!(removed, EntityScan::Found(2));
        assert_eq!(
            api.write_calls().await,
            vec![StatementId::new("Q1$b"), StatementId::new("Q1$c")]
        );
        assert_eq!(api.statements(&q("Q1"), &p("P625")).await.len(), 1);
    }

    #[tokio::test]
    async fn remove_matching_never_matching_is_zero_not_missing() {
        let api = api_with_coordinates().await;
        let never: Box<MatchPredicate> = Box::new(|_: &ComparableValue, _: &Statement| false);

        let removed = executor(&api)
            .remove_matching(&q("Q1"), &p("P625"), Some(never.as_ref()))
            .await;

        assert_eq!(removed.as_count(), 0);
        assert!(api.write_calls().await.is_empty());
    }

    #[tokio::test]
    async fn remove_matching_unreadable_entity_is_missing() {
        let api = InMemoryEntityApi::new();
        let removed = executor(&api)
            .remove_matching(&q("Q9"), &p("P625"), None)
            .await;
        assert_eq!(removed, EntityScan::Missing);
        assert_eq!(removed.as_count(), -1);
    }

    #[tokio::test]
    async fn remove_matching_continues_after_failed_removal() {
        let api = api_with_coordinates().await;
        api.script_write_failures("Q1$a", vec![permanent()]).await;

        let removed = executor(&api)
            .remove_matching(&q("Q1"), &p("P625"), None)
            .await;

        assert_eq!(removed, EntityScan::Found(2));
        assert_eq!(api.write_calls().await.len(), 3);
    }

    #[tokio::test]
    async fn predicate_sees_normalized_value_and_statement() {
        let api = api_with_coordinates().await;
        let coordinates_only: Box<MatchPredicate> =
            Box::new(|value: &ComparableValue, statement: &Statement| {
                value.as_text().is_none() && statement.id.as_str().ends_with('a')
            });

        let ids = executor(&api)
            .statement_ids(&q("Q1"), &p("P625"), Some(coordinates_only.as_ref()))
            .await;

        assert_eq!(ids, EntityScan::Found(vec![StatementId::new("Q1$a")]));
        assert!(api.write_calls().await.is_empty());
    }

    #[tokio::test]
    async fn statement_ids_distinguishes_missing_from_no_match() {
        let api = api_with_coordinates().await;
        let exec = executor(&api);

        let none = exec
            .statement_ids(&q("Q1"), &p("P625"), Some(value_equals("Q1").as_ref()))
            .await;
        assert_eq!(none, EntityScan::Found(vec![]));

        let missing = exec.statement_ids(&q("Q404"), &p("P625"), None).await;
        assert!(missing.is_missing());
    }

    #[tokio::test]
    async fn remove_all_succeeds_when_property_absent() {
        let api = InMemoryEntityApi::new();
        api.insert_entity(Entity::new("Q2")).await;

        assert!(executor(&api).remove_all_for_property(&q("Q2"), &p("P625")).await);
        assert!(api.write_calls().await.is_empty());
    }

    #[tokio::test]
    async fn remove_all_fails_on_unreadable_entity() {
        let api = InMemoryEntityApi::new();
        assert!(!executor(&api).remove_all_for_property(&q("Q2"), &p("P625")).await);
    }

    #[tokio::test]
    async fn remove_all_stops_at_first_failure_without_rollback() {
        let api = api_with_coordinates().await;
        api.script_write_failures("Q1$b", vec![permanent()]).await;

        let ok = executor(&api)
            .remove_all_for_property(&q("Q1"), &p("P625"))
            .await;

        assert!(!ok);
        assert_eq!(
            api.write_calls().await,
            vec![StatementId::new("Q1$a"), StatementId::new("Q1$b")]
        );
        let left: Vec<_> = api
            .statements(&q("Q1"), &p("P625"))
            .await
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(left, vec![StatementId::new("Q1$b"), StatementId::new("Q1$c")]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_conflicts_are_retried_per_statement() {
        let api = api_with_coordinates().await;
        api.script_write_failures("Q1$b", vec![conflict(), conflict()]).await;
        let exec = executor(&api);

        assert!(exec.remove_all_for_property(&q("Q1"), &p("P625")).await);
        assert_eq!(api.write_calls().await.len(), 5);
        assert_eq!(exec.retry_stats().backoffs, 2);
    }

    #[tokio::test]
    async fn remove_by_ids_empty_issues_no_writes() {
        let api = api_with_coordinates().await;
        assert_eq!(executor(&api).remove_by_ids(&[]).await, 0);
        assert!(api.write_calls().await.is_empty());
    }

    #[tokio::test]
    async fn remove_by_ids_counts_successes_and_keeps_going() {
        let api = api_with_coordinates().await;
        let ids = vec![
            StatementId::new("Q1$a"),
            StatementId::new("Q1$gone"),
            StatementId::new("Q1$c"),
        ];

        let removed = executor(&api)
            .with_progress_step(1)
            .remove_by_ids(&ids)
            .await;

        assert_eq!(removed, 2);
        assert_eq!(api.write_calls().await, ids);
    }
}
