//! Candidate pool: the live merge candidates of a run.
//!
//! Pairs live in an arena and are addressed by [`PairHandle`]s. Removing a
//! pair leaves a tombstone, so handles held elsewhere (a round's work queue)
//! simply stop resolving. Handles are never reused within a run.
//!
//! Iteration follows [`PairKey`] order, never distance order.

use std::collections::BTreeMap;
use std::fmt;

use hashbrown::HashMap;
use smallvec::SmallVec;
use zone_types::{PairKey, ZoneId};

use crate::pair::ZonePair;

/// Stable reference to a pair in a [`CandidatePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairHandle(usize);

impl PairHandle {
    /// Arena slot of the handle.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PairHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type HandleList = SmallVec<[PairHandle; 8]>;

/// Arena of live zone pairs.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    slots: Vec<Option<ZonePair>>,
    by_key: BTreeMap<PairKey, PairHandle>,
    by_zone: HashMap<ZoneId, HandleList>,
}

impl CandidatePool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns `true` when no pair is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Insert a pair.
    ///
    /// A live pair with the same key is replaced and its handle retired.
    pub fn insert(&mut self, pair: ZonePair) -> PairHandle {
        if let Some(&old) = self.by_key.get(&pair.key()) {
            self.remove(old);
        }

        let handle = PairHandle(self.slots.len());
        self.slots.push(Some(pair));
        self.by_key.insert(pair.key(), handle);
        for zone in [pair.low(), pair.high()] {
            self.by_zone.entry(zone).or_default().push(handle);
        }
        handle
    }

    /// Resolve a handle, `None` once the pair was removed.
    #[must_use]
    pub fn get(&self, handle: PairHandle) -> Option<&ZonePair> {
        self.slots.get(handle.index())?.as_ref()
    }

    /// Check whether a handle still resolves.
    #[must_use]
    pub fn is_live(&self, handle: PairHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Handle of the live pair with this key.
    #[must_use]
    pub fn find(&self, key: PairKey) -> Option<PairHandle> {
        self.by_key.get(&key).copied()
    }

    /// Remove a pair, returning it if it was live.
    pub fn remove(&mut self, handle: PairHandle) -> Option<ZonePair> {
        let pair = self.slots.get_mut(handle.index())?.take()?;
        self.by_key.remove(&pair.key());
        for zone in [pair.low(), pair.high()] {
            if let Some(list) = self.by_zone.get_mut(&zone) {
                list.retain(|h| *h != handle);
                if list.is_empty() {
                    self.by_zone.remove(&zone);
                }
            }
        }
        Some(pair)
    }

    /// Remove every pair referencing `zone`; returns how many were removed.
    pub fn remove_zone(&mut self, zone: ZoneId) -> usize {
        let Some(handles) = self.by_zone.remove(&zone) else {
            return 0;
        };
        handles
            .into_iter()
            .filter(|&handle| self.remove(handle).is_some())
            .count()
    }

    /// Live pairs referencing `zone`.
    pub fn pairs_of(&self, zone: ZoneId) -> impl Iterator<Item = (PairHandle, &ZonePair)> + '_ {
        self.by_zone
            .get(&zone)
            .into_iter()
            .flatten()
            .filter_map(|&h| self.get(h).map(|pair| (h, pair)))
    }

    /// Live pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (PairHandle, &ZonePair)> + '_ {
        self.by_key
            .values()
            .filter_map(|&h| self.get(h).map(|pair| (h, pair)))
    }

    /// Smallest distance over live pairs.
    #[must_use]
    pub fn min_distance(&self) -> Option<f64> {
        self.iter()
            .map(|(_, pair)| pair.distance())
            .min_by(f64::total_cmp)
    }

    /// Number of handles allocated so far, live or retired.
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.slots.len()
    }

    /// Drop every pair and retire every handle.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.by_key.clear();
        self.by_zone.clear();
    }
}
