//! Hierarchical fusion of adjacent spatial zones.
//!
//! Given zones carrying feature vectors and the adjacency between them, this
//! crate repeatedly merges neighboring zones whose features are close,
//! producing the ordered sequence of merges from the input partition down to
//! one zone per connected component.
//!
//! # Features
//!
//! - **Normalization**: Min-max or z-score rescaling of every attribute
//! - **Distances**: Per-attribute distances folded by a configurable combiner
//! - **Eligibility**: Shared-boundary thresholds gate which neighbors may merge
//! - **Linkage**: Centroid, single, complete or average comparison of zones
//! - **Aggregation**: Global minimum, threshold, size and area policies with
//!   cascading merges inside a round
//! - **Fusion maps**: Partition of the input zones at any hierarchy level
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **no geometry dependencies**. Adjacency and
//! boundary lengths are computed by the caller and handed over through
//! [`zone_types::Neighbor`].
//!
//! # Example
//!
//! ```
//! use zone_fusion::{AggregationPolicy, FusionEngine, FusionParams};
//! use zone_types::{Neighbor, Zone, ZoneId};
//!
//! let zones: Vec<Zone> = [0.0, 0.1, 0.15, 5.0]
//!     .iter()
//!     .zip(1..)
//!     .map(|(&value, raw)| Zone::new(ZoneId::new(raw), vec![value]))
//!     .collect();
//! let neighbors: Vec<Neighbor> = (1..4)
//!     .map(|raw| Neighbor::new(ZoneId::new(raw), ZoneId::new(raw + 1)))
//!     .collect();
//!
//! let params = FusionParams::default().with_aggregation(AggregationPolicy::GlobalMinimum);
//! let mut engine = FusionEngine::new(params).unwrap();
//! let count = engine.compute(&zones, &neighbors).unwrap();
//! assert_eq!(count, 3);
//!
//! // Two zones remain after the first two merges
//! let map = engine.fusion_map(2);
//! assert_eq!(map.zone_count(), 2);
//! assert_eq!(map.zone_of(ZoneId::new(1)), map.zone_of(ZoneId::new(3)));
//! ```
//!
//! # Algorithm
//!
//! 1. Normalize a private copy of every feature vector
//! 2. Build a candidate pair for every eligible adjacency, with its distance
//! 3. Let the aggregation policy pick the pairs merged in the round
//! 4. After each merge, replace the pairs of both parts by pairs of the fused
//!    zone; the ones within the round's cutoff are merged right away
//! 5. Repeat until no candidate is left

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod adjacency;
mod aggregation;
mod convert;
mod distance;
mod eligibility;
mod engine;
mod error;
mod linkage;
mod normalize;
mod pair;
mod params;
mod partition;
mod pool;
mod result;
mod updater;
mod zones;

// Re-export main types
pub use adjacency::ZoneAdjacency;
pub use aggregation::AggregationPolicy;
pub use distance::{
    AttributeDistance, AttributeDistances, Combiner, CustomDistance, DEGENERATE_DISTANCE,
    FeatureDistance,
};
pub use eligibility::ZoneDistance;
pub use engine::{EngineState, FusionEngine};
pub use error::{ErrorKind, FusionError, FusionResult};
pub use linkage::Linkage;
pub use normalize::{FeatureNormalizer, Normalization};
pub use pair::ZonePair;
pub use params::{FusionParams, PARALLEL_THRESHOLD};
pub use partition::{FusionMap, FusionMaps};
pub use pool::{CandidatePool, PairHandle};
pub use result::ZoneFusion;
