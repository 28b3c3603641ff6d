//! Zone identity and feature records.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable identity of a zone.
///
/// Ids are opaque to the fusion algorithm. Fused zones receive fresh ids
/// above the largest input id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ZoneId(u32);

impl ZoneId {
    /// Create a zone id from its raw value.
    ///
    /// # Example
    ///
    /// ```
    /// use zone_types::ZoneId;
    ///
    /// let id = ZoneId::new(7);
    /// assert_eq!(id.get(), 7);
    /// assert_eq!(id.to_string(), "z7");
    /// ```
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value of the id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The id following this one, or `None` on overflow.
    #[inline]
    #[must_use]
    pub const fn checked_next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(next) => Some(Self(next)),
            None => None,
        }
    }
}

impl From<u32> for ZoneId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "z{}", self.0)
    }
}

/// A zone: identity plus the attributes used to compare it with its neighbors.
///
/// `size` counts the elementary cells the zone was built from and `area` is
/// its surface in caller units. Both only matter for size- and area-driven
/// aggregation; they default to one cell and zero area.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Zone {
    /// Stable identity.
    pub id: ZoneId,
    /// Ordered attribute values.
    pub features: Vec<f64>,
    /// Number of elementary cells in the zone.
    pub size: usize,
    /// Surface of the zone.
    pub area: f64,
}

impl Zone {
    /// Create a single-cell zone with the given features.
    ///
    /// # Example
    ///
    /// ```
    /// use zone_types::{Zone, ZoneId};
    ///
    /// let zone = Zone::new(ZoneId::new(3), vec![1.0, 2.0, 3.0]);
    /// assert_eq!(zone.size, 1);
    /// assert_eq!(zone.dimension(), 3);
    /// ```
    #[must_use]
    pub fn new(id: ZoneId, features: Vec<f64>) -> Self {
        Self {
            id,
            features,
            size: 1,
            area: 0.0,
        }
    }

    /// Set the number of elementary cells.
    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Set the zone area.
    #[must_use]
    pub fn with_area(mut self, area: f64) -> Self {
        self.area = area;
        self
    }

    /// Number of attributes.
    #[inline]
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.features.len()
    }

    /// Check whether every attribute is a finite number.
    #[must_use]
    pub fn has_finite_features(&self) -> bool {
        self.features.iter().all(|v| v.is_finite())
    }
}
