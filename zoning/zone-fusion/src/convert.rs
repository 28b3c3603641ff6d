//! Turning adjacencies into merge candidates.

use rayon::prelude::*;
use zone_types::PairKey;

use crate::adjacency::ZoneAdjacency;
use crate::distance::FeatureDistance;
use crate::eligibility::ZoneDistance;
use crate::error::FusionResult;
use crate::linkage::Linkage;
use crate::pair::ZonePair;
use crate::params::PARALLEL_THRESHOLD;
use crate::zones::ZoneTable;

/// Builds [`ZonePair`]s for eligible adjacencies.
pub(crate) struct PairBuilder<'a> {
    pub(crate) metric: &'a FeatureDistance,
    pub(crate) linkage: Linkage,
    pub(crate) eligibility: ZoneDistance,
    pub(crate) zones: &'a ZoneTable,
}

impl PairBuilder<'_> {
    /// Candidate for two adjacent zones.
    ///
    /// `None` when the pair fails the eligibility predicate or either zone
    /// is not live.
    pub(crate) fn build(&self, key: PairKey, boundary_length: f64) -> FusionResult<Option<ZonePair>> {
        if !self.eligibility.is_eligible(boundary_length) {
            return Ok(None);
        }
        let (Some(a), Some(b)) = (self.zones.get(key.low()), self.zones.get(key.high())) else {
            return Ok(None);
        };
        let distance = self
            .linkage
            .distance(self.metric, self.zones.cells(), a, b)?;
        Ok(Some(ZonePair::new(key, distance, boundary_length)))
    }

    /// Candidates for every eligible adjacency, in pair-key order.
    ///
    /// On failure the error of the first failing pair in key order is
    /// returned, whether or not the pass ran in parallel.
    pub(crate) fn initial_pairs(
        &self,
        adjacency: &ZoneAdjacency,
        parallel: bool,
    ) -> FusionResult<Vec<ZonePair>> {
        let edges = adjacency.pairs();

        if parallel && edges.len() >= PARALLEL_THRESHOLD {
            let slots: Vec<FusionResult<Option<ZonePair>>> = edges
                .par_iter()
                .map(|&(key, length)| self.build(key, length))
                .collect();
            slots.into_iter().filter_map(Result::transpose).collect()
        } else {
            edges
                .iter()
                .filter_map(|&(key, length)| self.build(key, length).transpose())
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{AttributeDistance, AttributeDistances, Combiner, CustomDistance};
    use crate::error::FusionError;
    use approx::assert_relative_eq;
    use zone_types::{Neighbor, Zone, ZoneId};

    fn id(raw: u32) -> ZoneId {
        ZoneId::new(raw)
    }

    fn fixture() -> (ZoneTable, ZoneAdjacency) {
        let zones = vec![
            Zone::new(id(1), vec![0.0]),
            Zone::new(id(2), vec![0.5]),
            Zone::new(id(3), vec![2.0]),
        ];
        let normalized = zones.iter().map(|z| z.features.clone()).collect();
        let table = ZoneTable::new(&zones, normalized, false);
        let relation = [
            Neighbor::new(id(2), id(3)).with_boundary_length(1.0),
            Neighbor::new(id(1), id(2)).with_boundary_length(5.0),
        ];
        let adjacency = ZoneAdjacency::build(&relation, |_| true).expect("adjacency");
        (table, adjacency)
    }

    #[test]
    fn initial_pairs_in_key_order() {
        let (table, adjacency) = fixture();
        let metric = FeatureDistance::default();
        let builder = PairBuilder {
            metric: &metric,
            linkage: Linkage::Centroid,
            eligibility: ZoneDistance::Always,
            zones: &table,
        };

        let pairs = builder.initial_pairs(&adjacency, true).expect("pairs");
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].key(), PairKey::new(id(1), id(2)));
        assert_relative_eq!(pairs[0].distance(), 0.5);
        assert_relative_eq!(pairs[0].boundary_length(), 5.0);
        assert_relative_eq!(pairs[1].distance(), 1.5);
    }

    #[test]
    fn ineligible_pairs_are_dropped() {
        let (table, adjacency) = fixture();
        let metric = FeatureDistance::default();
        let builder = PairBuilder {
            metric: &metric,
            linkage: Linkage::Centroid,
            eligibility: ZoneDistance::shared_boundary(2.0),
            zones: &table,
        };

        let pairs = builder.initial_pairs(&adjacency, false).expect("pairs");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].key(), PairKey::new(id(1), id(2)));
    }

    #[test]
    fn dead_zone_yields_nothing() {
        let (table, _) = fixture();
        let metric = FeatureDistance::default();
        let builder = PairBuilder {
            metric: &metric,
            linkage: Linkage::Centroid,
            eligibility: ZoneDistance::Always,
            zones: &table,
        };
        assert!(builder.build(PairKey::new(id(1), id(42)), 1.0).expect("build").is_none());
    }

    /// Chain of zones long enough to cross the parallel threshold.
    fn long_chain() -> (ZoneTable, ZoneAdjacency) {
        let count = u32::try_from(PARALLEL_THRESHOLD).expect("threshold") + 200;
        let zones: Vec<Zone> = (1..=count)
            .map(|raw| Zone::new(id(raw), vec![f64::from(raw), f64::from(raw % 11)]))
            .collect();
        let normalized = zones.iter().map(|z| z.features.clone()).collect();
        let table = ZoneTable::new(&zones, normalized, false);
        let relation: Vec<Neighbor> = (1..count)
            .map(|raw| Neighbor::new(id(raw), id(raw + 1)).with_boundary_length(1.0))
            .collect();
        let adjacency = ZoneAdjacency::build(&relation, |_| true).expect("adjacency");
        assert!(adjacency.pair_count() >= PARALLEL_THRESHOLD);
        (table, adjacency)
    }

    #[test]
    fn parallel_pass_matches_sequential() {
        let (table, adjacency) = long_chain();
        let metric = FeatureDistance::default();
        let builder = PairBuilder {
            metric: &metric,
            linkage: Linkage::Centroid,
            eligibility: ZoneDistance::Always,
            zones: &table,
        };

        let parallel = builder.initial_pairs(&adjacency, true).expect("pairs");
        let sequential = builder.initial_pairs(&adjacency, false).expect("pairs");
        assert_eq!(parallel.len(), adjacency.pair_count());
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn first_failing_pair_is_reported_in_both_modes() {
        let (table, adjacency) = long_chain();
        let negative_above = CustomDistance::new("negative-above-1000", |a: f64, b: f64| {
            if a > 1000.0 || b > 1000.0 { -1.0 } else { (a - b).abs() }
        });
        let metric = FeatureDistance::new(
            AttributeDistances::Uniform(AttributeDistance::Custom(negative_above)),
            Combiner::Sum,
        );
        let builder = PairBuilder {
            metric: &metric,
            linkage: Linkage::Centroid,
            eligibility: ZoneDistance::Always,
            zones: &table,
        };

        for parallel in [true, false] {
            let err = builder.initial_pairs(&adjacency, parallel).expect_err("negative");
            assert!(matches!(
                err,
                FusionError::NegativeDistance { attribute: 0, lhs, rhs, .. }
                    if lhs == 1000.0 && rhs == 1001.0
            ));
        }
    }
}
