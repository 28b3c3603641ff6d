//! Candidate maintenance after a merge.

use std::collections::VecDeque;

use zone_types::{PairKey, ZoneId};

use crate::adjacency::ZoneAdjacency;
use crate::aggregation::{AggregationPolicy, Selection};
use crate::convert::PairBuilder;
use crate::error::FusionResult;
use crate::pool::{CandidatePool, PairHandle};

/// What an update changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct UpdateOutcome {
    /// Pairs created for the fused zone.
    pub(crate) created: usize,
}

/// Rewires the candidate pool around a freshly fused zone.
///
/// The fused zone must already be live in the builder's zone table.
pub(crate) struct ZonePairUpdater<'a> {
    pub(crate) builder: PairBuilder<'a>,
    pub(crate) policy: &'a AggregationPolicy,
    pub(crate) selection: &'a Selection,
}

impl ZonePairUpdater<'_> {
    /// Replace the pairs of `merged` by pairs of `fused`.
    ///
    /// Drops every pair referencing either merged zone, contracts the
    /// adjacency, inserts one pair per eligible inherited neighbor in id
    /// order, and appends the ones the policy admits to `queue`.
    ///
    /// # Errors
    ///
    /// Returns an error when the distance of a new pair cannot be computed.
    /// Pairs inserted before the failure stay in the pool.
    pub(crate) fn update(
        &self,
        pool: &mut CandidatePool,
        adjacency: &mut ZoneAdjacency,
        merged: PairKey,
        fused: ZoneId,
        queue: &mut VecDeque<PairHandle>,
    ) -> FusionResult<UpdateOutcome> {
        pool.remove_zone(merged.low());
        pool.remove_zone(merged.high());

        let mut outcome = UpdateOutcome::default();

        for (neighbor, length) in adjacency.contract(merged.low(), merged.high(), fused) {
            let Some(pair) = self.builder.build(PairKey::new(fused, neighbor), length)? else {
                continue;
            };
            let handle = pool.insert(pair);
            outcome.created += 1;

            if self.policy.admits(&pair, self.selection, self.builder.zones) {
                queue.push_back(handle);
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{AttributeDistance, AttributeDistances, Combiner, CustomDistance, FeatureDistance};
    use crate::error::FusionError;
    use crate::eligibility::ZoneDistance;
    use crate::linkage::Linkage;
    use crate::pair::ZonePair;
    use crate::zones::ZoneTable;
    use zone_types::{Neighbor, Zone};

    fn id(raw: u32) -> ZoneId {
        ZoneId::new(raw)
    }

    struct Fixture {
        zones: ZoneTable,
        adjacency: ZoneAdjacency,
        pool: CandidatePool,
    }

    // 1:[0.0] - 2:[0.2] - 3:[0.25], 2 - 4:[5.0], 1 - 3
    fn fixture() -> Fixture {
        let zones = vec![
            Zone::new(id(1), vec![0.0]),
            Zone::new(id(2), vec![0.2]),
            Zone::new(id(3), vec![0.25]),
            Zone::new(id(4), vec![5.0]),
        ];
        let normalized = zones.iter().map(|z| z.features.clone()).collect();
        let zones = ZoneTable::new(&zones, normalized, false);
        let relation = [
            Neighbor::new(id(1), id(2)).with_boundary_length(1.0),
            Neighbor::new(id(2), id(3)).with_boundary_length(1.0),
            Neighbor::new(id(1), id(3)).with_boundary_length(0.5),
            Neighbor::new(id(2), id(4)).with_boundary_length(1.0),
        ];
        let adjacency = ZoneAdjacency::build(&relation, |_| true).expect("adjacency");

        let metric = FeatureDistance::default();
        let builder = PairBuilder {
            metric: &metric,
            linkage: Linkage::Centroid,
            eligibility: ZoneDistance::Always,
            zones: &zones,
        };
        let mut pool = CandidatePool::new();
        for pair in builder.initial_pairs(&adjacency, false).expect("pairs") {
            pool.insert(pair);
        }
        Fixture {
            zones,
            adjacency,
            pool,
        }
    }

    #[test]
    fn merge_rewires_pool() {
        let mut f = fixture();
        assert_eq!(f.pool.len(), 4);

        let merged = PairKey::new(id(1), id(2));
        f.zones.fuse(id(1), id(2), id(5)).expect("fuse");

        let metric = FeatureDistance::default();
        let policy = AggregationPolicy::GlobalMinimum;
        let selection = Selection {
            handles: Vec::new(),
            cutoff: 0.2,
            undersized_only: false,
        };
        let updater = ZonePairUpdater {
            builder: PairBuilder {
                metric: &metric,
                linkage: Linkage::Centroid,
                eligibility: ZoneDistance::Always,
                zones: &f.zones,
            },
            policy: &policy,
            selection: &selection,
        };

        let mut queue = VecDeque::new();
        let outcome = updater
            .update(&mut f.pool, &mut f.adjacency, merged, id(5), &mut queue)
            .expect("update");

        assert_eq!(outcome.created, 2);
        assert_eq!(f.pool.len(), 2);
        for zone in [id(1), id(2)] {
            assert_eq!(f.pool.pairs_of(zone).count(), 0);
        }

        // fused features 0.1, so (3,5) sits at 0.15 and cascades
        assert_eq!(queue.len(), 1);
        let queued: Vec<ZonePair> = queue.iter().filter_map(|&h| f.pool.get(h).copied()).collect();
        assert_eq!(queued[0].key(), PairKey::new(id(3), id(5)));
        assert!((queued[0].boundary_length() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn boundary_threshold_gates_new_pairs() {
        let mut f = fixture();
        f.zones.fuse(id(1), id(2), id(5)).expect("fuse");

        let metric = FeatureDistance::default();
        let policy = AggregationPolicy::GlobalMinimum;
        let selection = Selection {
            handles: Vec::new(),
            cutoff: f64::INFINITY,
            undersized_only: false,
        };
        let updater = ZonePairUpdater {
            builder: PairBuilder {
                metric: &metric,
                linkage: Linkage::Centroid,
                eligibility: ZoneDistance::shared_boundary(1.2),
                zones: &f.zones,
            },
            policy: &policy,
            selection: &selection,
        };

        let mut queue = VecDeque::new();
        let outcome = updater.update(
            &mut f.pool,
            &mut f.adjacency,
            PairKey::new(id(1), id(2)),
            id(5),
            &mut queue,
        )
        .expect("update");

        // (3,5) has 1.5 of boundary, (4,5) only 1.0
        assert_eq!(outcome.created, 1);
        assert!(f.adjacency.are_adjacent(id(4), id(5)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn negative_distance_of_new_pair_is_reported() {
        let mut f = fixture();
        f.zones.fuse(id(1), id(2), id(5)).expect("fuse");

        // only the fused value 0.1 falls inside the negative band
        let banded = CustomDistance::new("banded", |a: f64, b: f64| {
            let inside = |v: f64| v > 0.05 && v < 0.15;
            if inside(a) || inside(b) { -1.0 } else { (a - b).abs() }
        });
        let metric = FeatureDistance::new(
            AttributeDistances::Uniform(AttributeDistance::Custom(banded)),
            Combiner::Sum,
        );
        let policy = AggregationPolicy::GlobalMinimum;
        let selection = Selection {
            handles: Vec::new(),
            cutoff: f64::INFINITY,
            undersized_only: false,
        };
        let updater = ZonePairUpdater {
            builder: PairBuilder {
                metric: &metric,
                linkage: Linkage::Centroid,
                eligibility: ZoneDistance::Always,
                zones: &f.zones,
            },
            policy: &policy,
            selection: &selection,
        };

        let mut queue = VecDeque::new();
        let err = updater
            .update(
                &mut f.pool,
                &mut f.adjacency,
                PairKey::new(id(1), id(2)),
                id(5),
                &mut queue,
            )
            .expect_err("negative");
        assert!(matches!(err, FusionError::NegativeDistance { value, .. } if value == -1.0));
        assert!(queue.is_empty());
    }
}
