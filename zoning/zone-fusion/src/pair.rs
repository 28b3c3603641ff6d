//! Merge candidates.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use zone_types::{PairKey, ZoneId};

/// Two adjacent zones that may be fused, with their feature distance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ZonePair {
    key: PairKey,
    distance: f64,
    boundary_length: f64,
}

impl ZonePair {
    /// Create a candidate.
    #[must_use]
    pub const fn new(key: PairKey, distance: f64, boundary_length: f64) -> Self {
        Self {
            key,
            distance,
            boundary_length,
        }
    }

    /// Unordered identity of the pair.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> PairKey {
        self.key
    }

    /// Smaller zone id.
    #[inline]
    #[must_use]
    pub const fn low(&self) -> ZoneId {
        self.key.low()
    }

    /// Larger zone id.
    #[inline]
    #[must_use]
    pub const fn high(&self) -> ZoneId {
        self.key.high()
    }

    /// Feature distance between the two zones.
    #[inline]
    #[must_use]
    pub const fn distance(&self) -> f64 {
        self.distance
    }

    /// Boundary length shared by the two zones.
    #[inline]
    #[must_use]
    pub const fn boundary_length(&self) -> f64 {
        self.boundary_length
    }
}
