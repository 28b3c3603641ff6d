//! Live neighbor graph between zones.
//!
//! Every adjacency carries the length of the boundary the two zones share.
//! Fusing two zones contracts the graph: the fused zone inherits the
//! neighbors of both parts and boundary lengths toward a common neighbor add
//! up.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use zone_types::{Neighbor, PairKey, ZoneId};

use crate::error::{FusionError, FusionResult};

/// Zone adjacency with shared boundary lengths.
#[derive(Debug, Clone, Default)]
pub struct ZoneAdjacency {
    neighbors: HashMap<ZoneId, BTreeMap<ZoneId, f64>>,
}

impl ZoneAdjacency {
    /// Build the adjacency from a neighbor relation.
    ///
    /// Entries naming the same unordered pair are collapsed, their boundary
    /// lengths summed. `is_known` tells whether an id belongs to the input
    /// zones.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::SelfNeighbor`] for an entry pairing a zone with
    /// itself and [`FusionError::UnknownZone`] for an id rejected by
    /// `is_known`.
    ///
    /// # Example
    ///
    /// ```
    /// use zone_fusion::ZoneAdjacency;
    /// use zone_types::{Neighbor, ZoneId};
    ///
    /// let (a, b) = (ZoneId::new(1), ZoneId::new(2));
    /// let relation = [
    ///     Neighbor::new(a, b).with_boundary_length(2.0),
    ///     Neighbor::new(b, a).with_boundary_length(3.0),
    /// ];
    /// let adjacency = ZoneAdjacency::build(&relation, |_| true).unwrap();
    /// assert_eq!(adjacency.pair_count(), 1);
    /// assert_eq!(adjacency.boundary_length(a, b), Some(5.0));
    /// ```
    pub fn build<F>(relation: &[Neighbor], is_known: F) -> FusionResult<Self>
    where
        F: Fn(ZoneId) -> bool,
    {
        let mut neighbors: HashMap<ZoneId, BTreeMap<ZoneId, f64>> = HashMap::new();

        for neighbor in relation {
            if neighbor.a == neighbor.b {
                return Err(FusionError::SelfNeighbor(neighbor.a));
            }
            for id in [neighbor.a, neighbor.b] {
                if !is_known(id) {
                    return Err(FusionError::UnknownZone(id));
                }
            }

            *neighbors
                .entry(neighbor.a)
                .or_default()
                .entry(neighbor.b)
                .or_insert(0.0) += neighbor.boundary_length;
            *neighbors
                .entry(neighbor.b)
                .or_default()
                .entry(neighbor.a)
                .or_insert(0.0) += neighbor.boundary_length;
        }

        Ok(Self { neighbors })
    }

    /// Neighbors of a zone with their shared boundary lengths, by id.
    pub fn neighbors(&self, zone: ZoneId) -> impl Iterator<Item = (ZoneId, f64)> + '_ {
        self.neighbors
            .get(&zone)
            .into_iter()
            .flat_map(|map| map.iter().map(|(&id, &length)| (id, length)))
    }

    /// Shared boundary length of two adjacent zones.
    #[must_use]
    pub fn boundary_length(&self, a: ZoneId, b: ZoneId) -> Option<f64> {
        self.neighbors.get(&a)?.get(&b).copied()
    }

    /// Check whether two zones are adjacent.
    #[must_use]
    pub fn are_adjacent(&self, a: ZoneId, b: ZoneId) -> bool {
        self.boundary_length(a, b).is_some()
    }

    /// Number of zones with at least one neighbor.
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Number of distinct adjacent pairs.
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.neighbors.values().map(BTreeMap::len).sum::<usize>() / 2
    }

    /// Every adjacent pair with its boundary length, in pair-key order.
    #[must_use]
    pub fn pairs(&self) -> Vec<(PairKey, f64)> {
        let mut pairs: Vec<(PairKey, f64)> = self
            .neighbors
            .iter()
            .flat_map(|(&zone, map)| {
                map.range(zone..)
                    .filter(move |&(&other, _)| other != zone)
                    .map(move |(&other, &length)| (PairKey::new(zone, other), length))
            })
            .collect();
        pairs.sort_unstable_by_key(|(key, _)| *key);
        pairs
    }

    /// Replace zones `a` and `b` by `fused`.
    ///
    /// Returns the neighbors of the fused zone in id order with their summed
    /// boundary lengths. The edge between `a` and `b` disappears.
    pub fn contract(&mut self, a: ZoneId, b: ZoneId, fused: ZoneId) -> Vec<(ZoneId, f64)> {
        let mut inherited: BTreeMap<ZoneId, f64> = BTreeMap::new();

        for part in [a, b] {
            let Some(map) = self.neighbors.remove(&part) else {
                continue;
            };
            for (other, length) in map {
                if other == a || other == b {
                    continue;
                }
                *inherited.entry(other).or_insert(0.0) += length;
                if let Some(back) = self.neighbors.get_mut(&other) {
                    back.remove(&part);
                }
            }
        }

        for (&other, &length) in &inherited {
            self.neighbors
                .entry(other)
                .or_default()
                .insert(fused, length);
        }

        let result = inherited.iter().map(|(&id, &length)| (id, length)).collect();
        if !inherited.is_empty() {
            self.neighbors.insert(fused, inherited);
        }
        result
    }

    /// Remove every adjacency.
    pub fn clear(&mut self) {
        self.neighbors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> ZoneId {
        ZoneId::new(raw)
    }

    fn relation(entries: &[(u32, u32, f64)]) -> Vec<Neighbor> {
        entries
            .iter()
            .map(|&(a, b, l)| Neighbor::new(id(a), id(b)).with_boundary_length(l))
            .collect()
    }

    #[test]
    fn build_is_symmetric() {
        let adj = ZoneAdjacency::build(&relation(&[(1, 2, 1.0), (2, 3, 2.0)]), |_| true)
            .expect("adjacency");
        assert!(adj.are_adjacent(id(2), id(1)));
        assert!(adj.are_adjacent(id(3), id(2)));
        assert!(!adj.are_adjacent(id(1), id(3)));
        assert_eq!(adj.zone_count(), 3);
        assert_eq!(adj.pair_count(), 2);
    }

    #[test]
    fn duplicate_entries_sum_boundaries() {
        let adj = ZoneAdjacency::build(&relation(&[(1, 2, 1.5), (2, 1, 0.5), (1, 2, 1.0)]), |_| {
            true
        })
        .expect("adjacency");
        assert_eq!(adj.pair_count(), 1);
        assert_eq!(adj.boundary_length(id(1), id(2)), Some(3.0));
    }

    #[test]
    fn self_neighbor_is_rejected() {
        let err = ZoneAdjacency::build(&relation(&[(4, 4, 1.0)]), |_| true);
        assert!(matches!(err, Err(FusionError::SelfNeighbor(z)) if z == id(4)));
    }

    #[test]
    fn unknown_zone_is_rejected() {
        let err = ZoneAdjacency::build(&relation(&[(1, 9, 1.0)]), |z| z != id(9));
        assert!(matches!(err, Err(FusionError::UnknownZone(z)) if z == id(9)));
    }

    #[test]
    fn pairs_are_key_ordered() {
        let adj = ZoneAdjacency::build(&relation(&[(5, 3, 1.0), (1, 4, 1.0), (3, 1, 1.0)]), |_| {
            true
        })
        .expect("adjacency");
        let keys: Vec<PairKey> = adj.pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                PairKey::new(id(1), id(3)),
                PairKey::new(id(1), id(4)),
                PairKey::new(id(3), id(5)),
            ]
        );
    }

    #[test]
    fn contract_merges_neighbor_sets() {
        // 1 - 2 - 3, 1 - 3, 2 - 4
        let mut adj = ZoneAdjacency::build(
            &relation(&[(1, 2, 1.0), (2, 3, 2.0), (1, 3, 0.5), (2, 4, 4.0)]),
            |_| true,
        )
        .expect("adjacency");

        let inherited = adj.contract(id(1), id(2), id(10));
        assert_eq!(inherited, vec![(id(3), 2.5), (id(4), 4.0)]);

        assert!(!adj.are_adjacent(id(3), id(1)));
        assert!(!adj.are_adjacent(id(3), id(2)));
        assert_eq!(adj.boundary_length(id(3), id(10)), Some(2.5));
        assert_eq!(adj.boundary_length(id(10), id(4)), Some(4.0));
        assert_eq!(adj.pair_count(), 2);
    }

    #[test]
    fn contract_isolated_pair_leaves_nothing() {
        let mut adj =
            ZoneAdjacency::build(&relation(&[(1, 2, 1.0)]), |_| true).expect("adjacency");
        assert!(adj.contract(id(1), id(2), id(3)).is_empty());
        assert_eq!(adj.zone_count(), 0);
    }
}
