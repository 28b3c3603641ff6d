//! Linkage: how two multi-cell zones are compared.
//!
//! A zone produced by fusion covers several input cells. Its distance to a
//! neighbor is either measured between representative feature vectors
//! ([`Linkage::Centroid`]) or derived from all cell-to-cell distances across
//! the two zones.

#![allow(clippy::cast_precision_loss)]

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distance::{DEGENERATE_DISTANCE, FeatureDistance};
use crate::error::FusionResult;
use crate::zones::ZoneState;

/// Rule deriving the distance between two zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Linkage {
    /// Distance between the size-weighted mean feature vectors.
    #[default]
    Centroid,
    /// Smallest distance between a cell of one zone and a cell of the other.
    Single,
    /// Largest cell-to-cell distance.
    Complete,
    /// Mean cell-to-cell distance.
    Average,
}

impl Linkage {
    /// Returns `true` if zones must remember the cells they cover.
    #[must_use]
    pub const fn needs_cells(self) -> bool {
        !matches!(self, Self::Centroid)
    }

    /// Distance between two live zones.
    ///
    /// `cells` holds the normalized feature vectors of the input zones,
    /// indexed by the cell indices stored in each zone.
    pub(crate) fn distance(
        self,
        metric: &FeatureDistance,
        cells: &[Vec<f64>],
        a: &ZoneState,
        b: &ZoneState,
    ) -> FusionResult<f64> {
        let stats = match self {
            Self::Centroid => return metric.distance(&a.features, &b.features),
            Self::Single | Self::Complete | Self::Average => CellStats::collect(metric, cells, a, b)?,
        };
        let Some(stats) = stats else {
            return Ok(DEGENERATE_DISTANCE);
        };
        Ok(match self {
            Self::Single => stats.min,
            Self::Complete => stats.max,
            _ => stats.sum / stats.count as f64,
        })
    }
}

/// Summary of the finite cell-to-cell distances between two zones.
struct CellStats {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl CellStats {
    fn collect(
        metric: &FeatureDistance,
        cells: &[Vec<f64>],
        a: &ZoneState,
        b: &ZoneState,
    ) -> FusionResult<Option<Self>> {
        let mut stats = Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        };

        for &i in &a.cells {
            for &j in &b.cells {
                let d = metric.distance(&cells[i as usize], &cells[j as usize])?;
                if !d.is_finite() {
                    continue;
                }
                stats.count += 1;
                stats.sum += d;
                stats.min = stats.min.min(d);
                stats.max = stats.max.max(d);
            }
        }

        Ok((stats.count > 0).then_some(stats))
    }
}
