//! Parameters for zone fusion.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::aggregation::AggregationPolicy;
use crate::distance::{AttributeDistances, Combiner, FeatureDistance};
use crate::eligibility::ZoneDistance;
use crate::error::FusionResult;
use crate::linkage::Linkage;
use crate::normalize::Normalization;

/// Inputs below this many rows or pairs are processed on the calling thread.
pub const PARALLEL_THRESHOLD: usize = 1024;

/// Parameters for zone fusion.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FusionParams {
    /// How attributes are rescaled before comparison. Default: min-max
    pub normalization: Normalization,

    /// Per-attribute distance functions. Default: absolute difference
    pub attribute_distances: AttributeDistances,

    /// How per-attribute distances are folded together. Default: Euclidean
    pub combiner: Combiner,

    /// Which adjacencies may be fused at all. Default: every adjacency
    pub zone_distance: ZoneDistance,

    /// How multi-cell zones are compared. Default: centroid
    pub linkage: Linkage,

    /// Which candidates are merged per round. Default: global minimum
    pub aggregation: AggregationPolicy,

    /// Maximum number of fusions in one run. If None, no limit.
    pub max_fusions: Option<usize>,

    /// Whether normalization and initial distances may use several threads.
    /// Default: true
    pub parallel: bool,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            normalization: Normalization::MinMax,
            attribute_distances: AttributeDistances::default(),
            combiner: Combiner::Euclidean,
            zone_distance: ZoneDistance::Always,
            linkage: Linkage::Centroid,
            aggregation: AggregationPolicy::GlobalMinimum,
            max_fusions: None,
            parallel: true,
        }
    }
}

impl FusionParams {
    /// Create params merging every pair within `max_distance` per round.
    #[must_use]
    pub fn with_threshold(max_distance: f64) -> Self {
        Self {
            aggregation: AggregationPolicy::Threshold { max_distance },
            ..Default::default()
        }
    }

    /// Create params absorbing zones of fewer than `min_size` cells first.
    #[must_use]
    pub fn absorb_small_zones(min_size: usize) -> Self {
        Self {
            aggregation: AggregationPolicy::Size { min_size },
            ..Default::default()
        }
    }

    /// Create params only fusing zones that share at least `min_length` of
    /// boundary.
    #[must_use]
    pub fn contiguous(min_length: f64) -> Self {
        Self {
            zone_distance: ZoneDistance::shared_boundary(min_length),
            ..Default::default()
        }
    }

    /// Set the normalization rule.
    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Set the attribute distances.
    #[must_use]
    pub fn with_attribute_distances(mut self, distances: AttributeDistances) -> Self {
        self.attribute_distances = distances;
        self
    }

    /// Set the combiner.
    #[must_use]
    pub fn with_combiner(mut self, combiner: Combiner) -> Self {
        self.combiner = combiner;
        self
    }

    /// Set the eligibility predicate.
    #[must_use]
    pub fn with_zone_distance(mut self, zone_distance: ZoneDistance) -> Self {
        self.zone_distance = zone_distance;
        self
    }

    /// Set the linkage.
    #[must_use]
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Set the aggregation policy.
    #[must_use]
    pub fn with_aggregation(mut self, aggregation: AggregationPolicy) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Set the fusion budget.
    #[must_use]
    pub fn with_max_fusions(mut self, max_fusions: usize) -> Self {
        self.max_fusions = Some(max_fusions);
        self
    }

    /// Enable or disable multi-threaded setup.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Feature distance described by these params.
    #[must_use]
    pub fn feature_distance(&self) -> FeatureDistance {
        FeatureDistance::new(self.attribute_distances.clone(), self.combiner.clone())
    }

    /// Check every parameter.
    ///
    /// Dimension checks need the input and happen when fusion starts.
    ///
    /// # Errors
    ///
    /// Returns the first invalid parameter found.
    pub fn validate(&self) -> FusionResult<()> {
        self.attribute_distances.validate()?;
        self.combiner.validate()?;
        self.zone_distance.validate()?;
        self.aggregation.validate()?;
        Ok(())
    }
}
