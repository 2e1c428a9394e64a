use crate::core::EntityId;

/// Per-entity outcome counters of a mass operation.
///
/// Tallies only grow; merging is commutative in the counts, so per-chunk
/// tallies can be combined in whatever order the chunks settle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    /// Entities visited.
    pub processed: usize,
    /// Entities for which the operation achieved its goal.
    pub succeeded: usize,
    /// Statements removed (or selected, for read-only passes).
    pub units_removed: usize,
    /// Entities needing manual follow-up.
    pub skipped: Vec<EntityId>,
}

impl OutcomeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, units: usize) {
        self.processed += 1;
        self.succeeded += 1;
        self.units_removed += units;
    }

    pub fn record_skip(&mut self, entity: EntityId) {
        self.processed += 1;
        self.skipped.push(entity);
    }

    /// Entity visited without success and without needing follow-up.
    pub fn record_untouched(&mut self) {
        self.processed += 1;
    }

    pub fn merge(&mut self, other: OutcomeTally) {
        self.processed += other.processed;
        self.succeeded += other.succeeded;
        self.units_removed += other.units_removed;
        self.skipped.extend(other.skipped);
    }

    pub fn merged(tallies: impl IntoIterator<Item = OutcomeTally>) -> Self {
        tallies.into_iter().fold(Self::new(), |mut acc, tally| {
            acc.merge(tally);
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(successes: &[usize], skips: &[&str]) -> OutcomeTally {
        let mut tally = OutcomeTally::new();
        for units in successes {
            tally.record_success(*units);
        }
        for id in skips {
            tally.record_skip(EntityId::new(*id));
        }
        tally
    }

    #[test]
    fn records_accumulate() {
        let t = tally(&[2, 1], &["Q9"]);
        assert_eq!(t.processed, 3);
        assert_eq!(t.succeeded, 2);
        assert_eq!(t.units_removed, 3);
        assert_eq!(t.skipped, vec![EntityId::new("Q9")]);
    }

    #[test]
    fn merge_order_does_not_change_counts() {
        let a = tally(&[1], &["Q1"]);
        let b = tally(&[3, 3], &[]);
        let c = tally(&[], &["Q2", "Q3"]);

        let forward = OutcomeTally::merged(vec![a.clone(), b.clone(), c.clone()]);
        let backward = OutcomeTally::merged(vec![c, b, a]);

        assert_eq!(forward.processed, backward.processed);
        assert_eq!(forward.succeeded, backward.succeeded);
        assert_eq!(forward.units_removed, backward.units_removed);
        let mut fs = forward.skipped.clone();
        let mut bs = backward.skipped.clone();
        fs.sort();
        bs.sort();
        assert_eq!(fs, bs);
        assert_eq!(forward.processed, 6);
    }
}
