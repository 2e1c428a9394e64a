//! Sequential entity loops run inside one batch chunk.

use super::{EntityScan, MatchPredicate, MutationExecutor, OutcomeTally};
use crate::core::{EntityId, PropertyId, StatementId};
use crate::instrument::Stopwatch;
use tracing::{info, instrument, warn};

impl MutationExecutor {
    /// Removes all values of `property` from every listed entity.
    ///
    /// Entities that could not be read, or where a removal failed, end up in
    /// `skipped`.
    #[instrument(
        name = "mass.remove_property",
        skip_all,
        fields(property = %property, entities = ids.len())
    )]
    pub async fn mass_remove_property(
        &self,
        ids: &[EntityId],
        property: &PropertyId,
    ) -> OutcomeTally {
        let stopwatch = Stopwatch::start();
        info!("Running {} removals of {}.", ids.len(), property);

        let mut tally = OutcomeTally::new();
        for entity in ids {
            match self.remove_all_counted(entity, property).await {
                Some(removed) => {
                    info!("Removed from {}", entity);
                    tally.record_success(removed);
                }
                None => tally.record_skip(entity.clone()),
            }
        }

        info!(
            "Done. Removed {} of {} of {}.",
            tally.succeeded,
            ids.len(),
            property
        );
        log_skipped(&tally);
        stopwatch.report("mass_remove_property", "Q", ids.len());
        tally
    }

    /// Removes the values of `property` selected by `predicate` from every
    /// listed entity.
    ///
    /// Unreadable entities are skipped; entities without a match are counted
    /// as processed only.
    #[instrument(
        name = "mass.remove_value",
        skip_all,
        fields(property = %property, entities = ids.len())
    )]
    pub async fn mass_remove_value(
        &self,
        ids: &[EntityId],
        property: &PropertyId,
        predicate: Option<&MatchPredicate>,
    ) -> OutcomeTally {
        let stopwatch = Stopwatch::start();
        info!("Running {} removals of {}.", ids.len(), property);

        let mut tally = OutcomeTally::new();
        for entity in ids {
            match self.remove_matching(entity, property, predicate).await {
                EntityScan::Missing => tally.record_skip(entity.clone()),
                EntityScan::Found(0) => tally.record_untouched(),
                EntityScan::Found(removed) => {
                    info!("Removed from {}", entity);
                    tally.record_success(removed);
                }
            }
        }

        info!(
            "Done. Removed at least one value from {} of {} entities (total values {}).",
            tally.succeeded,
            ids.len(),
            tally.units_removed
        );
        log_skipped(&tally);
        stopwatch.report("mass_remove_value", "Q", ids.len());
        tally
    }

    /// Collects ids of matching statements across the listed entities, in
    /// entity order. Nothing is written.
    #[instrument(
        name = "mass.statement_ids",
        skip_all,
        fields(property = %property, entities = ids.len())
    )]
    pub async fn mass_statement_ids(
        &self,
        ids: &[EntityId],
        property: &PropertyId,
        predicate: Option<&MatchPredicate>,
    ) -> (OutcomeTally, Vec<StatementId>) {
        let stopwatch = Stopwatch::start();
        info!("Running {} statement id reads of {}.", ids.len(), property);

        let mut tally = OutcomeTally::new();
        let mut all = Vec::new();
        for entity in ids {
            match self.statement_ids(entity, property, predicate).await {
                EntityScan::Missing => tally.record_skip(entity.clone()),
                EntityScan::Found(found) if found.is_empty() => tally.record_untouched(),
                EntityScan::Found(found) => {
                    tally.record_success(found.len());
                    all.extend(found);
                }
            }
        }

        info!(
            "Done. Read at least one value from {} of {} entities (total values {}).",
            tally.succeeded,
            ids.len(),
            tally.units_removed
        );
        log_skipped(&tally);
        stopwatch.report("mass_statement_ids", "Q", ids.len());
        (tally, all)
    }
}

fn log_skipped(tally: &OutcomeTally) {
    if !tally.skipped.is_empty() {
        warn!("Skipped {}: {:?}", tally.skipped.len(), tally.skipped);
    }
}
