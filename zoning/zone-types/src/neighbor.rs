//! Adjacency records between zones.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::zone::ZoneId;

/// An unordered pair of zone ids.
///
/// The pair is stored normalized (`low <= high`), so the derived ordering is
/// a stable total order on unordered pairs: first by the smaller id, then by
/// the larger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PairKey {
    low: ZoneId,
    high: ZoneId,
}

impl PairKey {
    /// Create a key from two ids in any order.
    ///
    /// # Example
    ///
    /// ```
    /// use zone_types::{PairKey, ZoneId};
    ///
    /// let a = ZoneId::new(5);
    /// let b = ZoneId::new(2);
    /// assert_eq!(PairKey::new(a, b), PairKey::new(b, a));
    /// assert_eq!(PairKey::new(a, b).low(), b);
    /// ```
    #[inline]
    #[must_use]
    pub fn new(a: ZoneId, b: ZoneId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// The smaller id.
    #[inline]
    #[must_use]
    pub const fn low(&self) -> ZoneId {
        self.low
    }

    /// The larger id.
    #[inline]
    #[must_use]
    pub const fn high(&self) -> ZoneId {
        self.high
    }

    /// Check whether the pair names the same zone twice.
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.low == self.high
    }

    /// Check whether the pair references a zone.
    #[inline]
    #[must_use]
    pub fn contains(&self, zone: ZoneId) -> bool {
        self.low == zone || self.high == zone
    }

    /// The id paired with `zone`, if `zone` is part of this pair.
    #[must_use]
    pub fn other(&self, zone: ZoneId) -> Option<ZoneId> {
        if self.low == zone {
            Some(self.high)
        } else if self.high == zone {
            Some(self.low)
        } else {
            None
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.low, self.high)
    }
}

/// Spatial adjacency between two zones.
///
/// Produced by an external geometry module. The shared boundary length is
/// taken as-is; it only feeds the eligibility predicate of the fusion.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Neighbor {
    /// First zone.
    pub a: ZoneId,
    /// Second zone.
    pub b: ZoneId,
    /// Length of the boundary shared by the two zones.
    pub boundary_length: f64,
}

impl Neighbor {
    /// Create an adjacency with a zero boundary length.
    #[must_use]
    pub const fn new(a: ZoneId, b: ZoneId) -> Self {
        Self {
            a,
            b,
            boundary_length: 0.0,
        }
    }

    /// Set the shared boundary length.
    #[must_use]
    pub const fn with_boundary_length(mut self, length: f64) -> Self {
        self.boundary_length = length;
        self
    }

    /// Unordered key of the adjacency.
    #[inline]
    #[must_use]
    pub fn key(&self) -> PairKey {
        PairKey::new(self.a, self.b)
    }
}

impl From<(u32, u32)> for Neighbor {
    fn from((a, b): (u32, u32)) -> Self {
        Self::new(ZoneId::new(a), ZoneId::new(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> ZoneId {
        ZoneId::new(raw)
    }

    #[test]
    fn key_is_normalized() {
        let key = PairKey::new(id(9), id(3));
        assert_eq!(key.low(), id(3));
        assert_eq!(key.high(), id(9));
    }

    #[test]
    fn key_ordering_is_lexicographic() {
        let mut keys = vec![
            PairKey::new(id(2), id(5)),
            PairKey::new(id(1), id(9)),
            PairKey::new(id(2), id(3)),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                PairKey::new(id(1), id(9)),
                PairKey::new(id(2), id(3)),
                PairKey::new(id(2), id(5)),
            ]
        );
    }

    #[test]
    fn key_other() {
        let key = PairKey::new(id(1), id(2));
        assert_eq!(key.other(id(1)), Some(id(2)));
        assert_eq!(key.other(id(2)), Some(id(1)));
        assert_eq!(key.other(id(3)), None);
        assert!(key.contains(id(2)));
        assert!(!key.is_degenerate());
        assert!(PairKey::new(id(4), id(4)).is_degenerate());
    }

    #[test]
    fn neighbor_from_tuple() {
        let n = Neighbor::from((4, 1)).with_boundary_length(3.0);
        assert_eq!(n.key(), PairKey::new(id(1), id(4)));
        assert!((n.boundary_length - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn key_display() {
        assert_eq!(PairKey::new(id(8), id(2)).to_string(), "(z2, z8)");
    }
}
