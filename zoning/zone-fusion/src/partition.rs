//! Partitions of the input zones at a level of the fusion hierarchy.
//!
//! Level `k` applies the first `k` fusions: every input zone then belongs to
//! exactly one surviving zone, either itself or a fused zone covering it.

use std::collections::BTreeMap;
use std::iter::FusedIterator;

use hashbrown::HashMap;
use zone_types::ZoneId;

use crate::result::ZoneFusion;

/// Assignment of the input zones to the zones surviving at one level.
///
/// # Example
///
/// ```
/// use zone_fusion::{FusionMap, ZoneFusion};
/// use zone_types::ZoneId;
///
/// let ids: Vec<ZoneId> = (1..=3).map(ZoneId::new).collect();
/// let fusions = vec![ZoneFusion {
///     first: ids[0],
///     second: ids[1],
///     fused: ZoneId::new(4),
///     distance: 0.1,
///     features: vec![0.05],
///     size: 2,
///     area: 0.0,
///     round: 1,
///     cascaded: false,
/// }];
///
/// let map = FusionMap::build(&ids, &fusions, 1);
/// assert_eq!(map.zone_count(), 2);
/// assert_eq!(map.zone_of(ids[1]), Some(ZoneId::new(4)));
/// assert_eq!(map.zone_of(ids[2]), Some(ids[2]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionMap {
    level: usize,
    owner: HashMap<ZoneId, ZoneId>,
    members: BTreeMap<ZoneId, Vec<ZoneId>>,
}

impl FusionMap {
    /// Partition of `initial` after the first `level` fusions.
    ///
    /// A level beyond the number of fusions is clamped.
    #[must_use]
    pub fn build(initial: &[ZoneId], fusions: &[ZoneFusion], level: usize) -> Self {
        let mut map = Self::identity(initial);
        for fusion in &fusions[..level.min(fusions.len())] {
            map.apply(fusion);
        }
        map
    }

    fn identity(initial: &[ZoneId]) -> Self {
        Self {
            level: 0,
            owner: initial.iter().map(|&id| (id, id)).collect(),
            members: initial.iter().map(|&id| (id, vec![id])).collect(),
        }
    }

    fn apply(&mut self, fusion: &ZoneFusion) {
        self.level += 1;

        let mut merged = self.members.remove(&fusion.first).unwrap_or_default();
        merged.extend(self.members.remove(&fusion.second).unwrap_or_default());
        if merged.is_empty() {
            return;
        }
        merged.sort_unstable();

        for &cell in &merged {
            self.owner.insert(cell, fusion.fused);
        }
        self.members.insert(fusion.fused, merged);
    }

    /// Number of fusions applied.
    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Surviving zone covering an input zone.
    #[must_use]
    pub fn zone_of(&self, initial: ZoneId) -> Option<ZoneId> {
        self.owner.get(&initial).copied()
    }

    /// Input zones covered by a surviving zone, sorted.
    #[must_use]
    pub fn members(&self, zone: ZoneId) -> Option<&[ZoneId]> {
        self.members.get(&zone).map(Vec::as_slice)
    }

    /// Every surviving zone with its sorted members, by zone id.
    #[must_use]
    pub const fn zones(&self) -> &BTreeMap<ZoneId, Vec<ZoneId>> {
        &self.members
    }

    /// Number of surviving zones.
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.members.len()
    }
}

/// Iterator over the fusion maps of consecutive levels.
///
/// Each step applies one more fusion to the previous map.
#[derive(Debug, Clone)]
pub struct FusionMaps<'a> {
    current: FusionMap,
    fusions: &'a [ZoneFusion],
    pending: bool,
}

impl<'a> FusionMaps<'a> {
    /// Maps for levels `begin..=fusions.len()`.
    #[must_use]
    pub fn new(initial: &[ZoneId], fusions: &'a [ZoneFusion], begin: usize) -> Self {
        Self {
            current: FusionMap::build(initial, fusions, begin),
            fusions,
            pending: true,
        }
    }
}

impl Iterator for FusionMaps<'_> {
    type Item = FusionMap;

    fn next(&mut self) -> Option<FusionMap> {
        if self.pending {
            self.pending = false;
            return Some(self.current.clone());
        }
        let fusion = self.fusions.get(self.current.level)?;
        self.current.apply(fusion);
        Some(self.current.clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining =
            self.fusions.len().saturating_sub(self.current.level) + usize::from(self.pending);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FusionMaps<'_> {}

impl FusedIterator for FusionMaps<'_> {}
