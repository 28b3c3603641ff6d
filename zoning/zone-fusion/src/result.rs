//! Fusion events.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use zone_types::{PairKey, ZoneId};

/// One merge of two zones into a new one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ZoneFusion {
    /// Smaller id of the merged pair.
    pub first: ZoneId,

    /// Larger id of the merged pair.
    pub second: ZoneId,

    /// Id of the zone created by the merge.
    pub fused: ZoneId,

    /// Distance between the merged zones at merge time.
    pub distance: f64,

    /// Normalized representative features of the fused zone.
    pub features: Vec<f64>,

    /// Cell count of the fused zone.
    pub size: usize,

    /// Area of the fused zone.
    pub area: f64,

    /// Round in which the merge happened, starting at 1.
    pub round: usize,

    /// Whether the pair was created and merged within the same round.
    pub cascaded: bool,
}

impl ZoneFusion {
    /// The merged pair.
    #[must_use]
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.first, self.second)
    }

    /// Check whether the merge involved a given zone, as part or result.
    #[must_use]
    pub fn involves(&self, zone: ZoneId) -> bool {
        self.first == zone || self.second == zone || self.fused == zone
    }
}

impl fmt::Display for ZoneFusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} + {} -> {} (distance {:.4}, round {}{})",
            self.first,
            self.second,
            self.fused,
            self.distance,
            self.round,
            if self.cascaded { ", cascade" } else { "" }
        )
    }
}
