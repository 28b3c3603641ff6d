//! Live zones of a fusion run.
//!
//! Holds the normalized state of every zone that still exists. Fusing two
//! zones removes both and inserts the fused zone.

#![allow(clippy::cast_precision_loss)]

use hashbrown::HashMap;
use zone_types::{Zone, ZoneId};

/// State of one live zone.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ZoneState {
    /// Normalized representative features (size-weighted mean of the parts).
    pub(crate) features: Vec<f64>,
    /// Number of elementary cells.
    pub(crate) size: usize,
    /// Surface.
    pub(crate) area: f64,
    /// Indices of the input zones covered, empty unless the linkage needs them.
    pub(crate) cells: Vec<u32>,
}

/// Every live zone, plus the normalized features of the input zones.
#[derive(Debug, Clone, Default)]
pub(crate) struct ZoneTable {
    zones: HashMap<ZoneId, ZoneState>,
    cells: Vec<Vec<f64>>,
}

impl ZoneTable {
    /// Build the table from the input zones and their normalized features.
    ///
    /// `normalized[i]` must be the normalized features of `zones[i]`.
    pub(crate) fn new(zones: &[Zone], normalized: Vec<Vec<f64>>, track_cells: bool) -> Self {
        let mut table = HashMap::with_capacity(zones.len());
        for (index, (zone, features)) in zones.iter().zip(&normalized).enumerate() {
            let cells = if track_cells {
                vec![u32::try_from(index).unwrap_or(u32::MAX)]
            } else {
                Vec::new()
            };
            table.insert(
                zone.id,
                ZoneState {
                    features: features.clone(),
                    size: zone.size,
                    area: zone.area,
                    cells,
                },
            );
        }

        let cells = if track_cells { normalized } else { Vec::new() };
        Self {
            zones: table,
            cells,
        }
    }

    pub(crate) fn get(&self, id: ZoneId) -> Option<&ZoneState> {
        self.zones.get(&id)
    }

    pub(crate) fn contains(&self, id: ZoneId) -> bool {
        self.zones.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.zones.len()
    }

    /// Normalized features of the input zones, by input position.
    pub(crate) fn cells(&self) -> &[Vec<f64>] {
        &self.cells
    }

    /// Replace zones `a` and `b` by a new zone `fused`.
    ///
    /// Returns the fused state, or `None` if either part is not live.
    pub(crate) fn fuse(&mut self, a: ZoneId, b: ZoneId, fused: ZoneId) -> Option<&ZoneState> {
        if a == b || !self.contains(a) || !self.contains(b) {
            return None;
        }
        let left = self.zones.remove(&a)?;
        let right = self.zones.remove(&b)?;

        let state = merge_states(left, right);
        self.zones.insert(fused, state);
        self.zones.get(&fused)
    }

    pub(crate) fn clear(&mut self) {
        self.zones.clear();
        self.cells.clear();
    }
}

fn merge_states(left: ZoneState, right: ZoneState) -> ZoneState {
    // Zero-sized parts still count, so two empty zones average evenly.
    let wl = left.size.max(1) as f64;
    let wr = right.size.max(1) as f64;
    let total = wl + wr;

    let features = left
        .features
        .iter()
        .zip(&right.features)
        .map(|(l, r)| (l * wl + r * wr) / total)
        .collect();

    let mut cells = left.cells;
    cells.extend(right.cells);

    ZoneState {
        features,
        size: left.size + right.size,
        area: left.area + right.area,
        cells,
    }
}
