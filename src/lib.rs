// ============================================================================
// claim-sweeper Library
// ============================================================================

pub mod api;
pub mod batch;
pub mod config;
pub mod core;
pub mod dump;
pub mod engine;
pub mod input;
pub mod instrument;
pub mod retry;
pub mod session;

// Re-export main types for convenience
pub use api::{EntityApi, HttpEntityApi, InMemoryEntityApi};
pub use batch::{BatchReport, partition, run_in_batches};
pub use config::{Credentials, SweeperConfig};
pub use core::{
    ComparableValue, Entity, EntityId, PropertyId, Result, Statement, StatementId, SweepError,
    TypedValue, normalize,
};
pub use engine::{
    EntityReader, EntityScan, MatchPredicate, MutationExecutor, OutcomeTally, value_equals,
};
pub use retry::{RetryPolicy, RetryingCaller};
pub use session::SessionRegistry;

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// High-level Sweeper API
// ============================================================================

/// Aggregated result of one batch-level workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub tally: OutcomeTally,
    /// Selected statement ids, chunk by chunk in input order (select runs only).
    pub statement_ids: Vec<StatementId>,
    pub chunks: usize,
    pub failed_chunks: usize,
}

impl SweepSummary {
    fn from_report(report: BatchReport<(OutcomeTally, Vec<StatementId>)>) -> Self {
        let chunks = report.chunk_count();
        let failed_chunks = report.failed_chunks();
        if failed_chunks > 0 {
            warn!(
                batch = %report.name,
                failed = failed_chunks,
                "{} of {} chunks failed, their entities were not processed",
                failed_chunks,
                chunks
            );
        }
        let mut summary = Self {
            chunks,
            failed_chunks,
            ..Self::default()
        };
        for (tally, ids) in report.into_successes() {
            summary.tally.merge(tally);
            summary.statement_ids.extend(ids);
        }
        summary
    }
}

/// Bulk statement removal over one wiki session
///
/// # Examples
///
/// ```no_run
/// use claim_sweeper::{Credentials, EntityId, PropertyId, SessionRegistry, Sweeper, SweeperConfig};
///
/// # async fn run() -> claim_sweeper::Result<()> {
/// let registry = SessionRegistry::new(
///     SweeperConfig::default(),
///     Credentials::new("Bot@sweeper", "secret"),
/// );
/// let sweeper = Sweeper::connect(&registry).await?;
///
/// let ids = vec![EntityId::new("Q30159570"), EntityId::new("Q30159571")];
/// let summary = sweeper
///     .remove_property_in_batches(&ids, &PropertyId::new("P1435"))
///     .await;
/// println!("removed from {} entities", summary.tally.succeeded);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Sweeper {
    executor: MutationExecutor,
    config: SweeperConfig,
}

impl Sweeper {
    pub fn new(api: Arc<dyn EntityApi>, config: SweeperConfig) -> Self {
        let executor = MutationExecutor::new(api, config.retry.clone())
            .with_progress_step(config.progress_step);
        Self { executor, config }
    }

    /// Sweeper on the registry's base site, logging in if needed.
    pub async fn connect(registry: &SessionRegistry) -> Result<Self> {
        let api: Arc<dyn EntityApi> = registry.default_session().await?;
        Ok(Self::new(api, registry.base_config().clone()))
    }

    pub fn executor(&self) -> &MutationExecutor {
        &self.executor
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Removes `property` entirely from every listed entity, chunks running
    /// concurrently.
    pub async fn remove_property_in_batches(
        &self,
        ids: &[EntityId],
        property: &PropertyId,
    ) -> SweepSummary {
        let executor = &self.executor;
        let report = run_in_batches(
            "remove_property",
            ids,
            self.config.max_chunks,
            move |_, chunk| async move {
                let tally = executor.mass_remove_property(&chunk, property).await;
                Ok((tally, Vec::new()))
            },
        )
        .await;
        SweepSummary::from_report(report)
    }

    /// Removes the `property` values selected by `predicate` from every
    /// listed entity.
    pub async fn remove_value_in_batches(
        &self,
        ids: &[EntityId],
        property: &PropertyId,
        predicate: Option<&MatchPredicate>,
    ) -> SweepSummary {
        let executor = &self.executor;
        let report = run_in_batches(
            "remove_value",
            ids,
            self.config.max_chunks,
            move |_, chunk| async move {
                let tally = executor.mass_remove_value(&chunk, property, predicate).await;
                Ok((tally, Vec::new()))
            },
        )
        .await;
        SweepSummary::from_report(report)
    }

    /// Collects ids of selected statements without writing anything.
    pub async fn select_in_batches(
        &self,
        ids: &[EntityId],
        property: &PropertyId,
        predicate: Option<&MatchPredicate>,
    ) -> SweepSummary {
        let executor = &self.executor;
        let report = run_in_batches(
            "select",
            ids,
            self.config.max_chunks,
            move |_, chunk| async move {
                Ok(executor.mass_statement_ids(&chunk, property, predicate).await)
            },
        )
        .await;
        SweepSummary::from_report(report)
    }

    /// First phase of the two-phase removal: selects statements and writes
    /// their ids to `path`. Returns how many ids were written.
    pub async fn select_to_file(
        &self,
        ids: &[EntityId],
        property: &PropertyId,
        predicate: Option<&MatchPredicate>,
        path: impl AsRef<Path>,
    ) -> Result<usize> {
        let summary = self.select_in_batches(ids, property, predicate).await;
        if summary.failed_chunks > 0 {
            warn!(
                failed = summary.failed_chunks,
                "selection incomplete, some chunks failed"
            );
        }
        dump::write_statement_ids(path.as_ref(), &summary.statement_ids)?;
        info!(
            "Saved {} statement ids to {}.",
            summary.statement_ids.len(),
            path.as_ref().display()
        );
        Ok(summary.statement_ids.len())
    }

    /// Second phase: removes every statement listed in `path`, in order.
    /// Returns how many removals succeeded.
    pub async fn remove_ids_from_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let ids = dump::read_statement_ids(path)?;
        if ids.is_empty() {
            info!("Nothing to remove.");
            return Ok(0);
        }
        Ok(self.executor.remove_by_ids(&ids).await)
    }
}
