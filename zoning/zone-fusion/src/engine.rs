//! The fusion engine.
//!
//! Drives one run: validate the input, normalize features, build the
//! adjacency and the initial candidates, then merge round after round until
//! no candidate is left.

use std::collections::VecDeque;
use std::fmt;

use hashbrown::HashSet;
use tracing::{debug, info, warn};
use zone_types::{Neighbor, Zone, ZoneId};

use crate::adjacency::ZoneAdjacency;
use crate::aggregation::{AggregationPolicy, Selection};
use crate::convert::PairBuilder;
use crate::distance::{AttributeDistances, Combiner, FeatureDistance};
use crate::eligibility::ZoneDistance;
use crate::error::{FusionError, FusionResult};
use crate::linkage::Linkage;
use crate::normalize::{FeatureNormalizer, Normalization};
use crate::params::FusionParams;
use crate::partition::{FusionMap, FusionMaps};
use crate::pool::{CandidatePool, PairHandle};
use crate::result::ZoneFusion;
use crate::updater::{UpdateOutcome, ZonePairUpdater};
use crate::zones::ZoneTable;

/// Lifecycle of a [`FusionEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineState {
    /// Nothing computed since the last reset.
    #[default]
    Idle,
    /// Input validated and initial candidates built.
    PairsInitialized,
    /// Merging; also the state left behind when the budget runs out.
    Aggregating,
    /// Every candidate was consumed.
    Done,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::PairsInitialized => "pairs initialized",
            Self::Aggregating => "aggregating",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Hierarchical fusion of adjacent zones.
///
/// # Example
///
/// ```
/// use zone_fusion::{FusionEngine, FusionParams};
/// use zone_types::{Neighbor, Zone, ZoneId};
///
/// let zones = vec![
///     Zone::new(ZoneId::new(1), vec![0.0]),
///     Zone::new(ZoneId::new(2), vec![0.1]),
///     Zone::new(ZoneId::new(3), vec![10.0]),
/// ];
/// let neighbors = vec![
///     Neighbor::new(ZoneId::new(1), ZoneId::new(2)),
///     Neighbor::new(ZoneId::new(2), ZoneId::new(3)),
/// ];
///
/// let mut engine = FusionEngine::new(FusionParams::default()).unwrap();
/// assert_eq!(engine.compute(&zones, &neighbors).unwrap(), 2);
///
/// let first = &engine.fusions()[0];
/// assert_eq!((first.first, first.second), (ZoneId::new(1), ZoneId::new(2)));
/// assert_eq!(engine.surviving_zone_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FusionEngine {
    params: FusionParams,
    metric: FeatureDistance,
    state: EngineState,
    normalizer: Option<FeatureNormalizer>,
    initial_ids: Vec<ZoneId>,
    zones: ZoneTable,
    adjacency: ZoneAdjacency,
    pool: CandidatePool,
    fusions: Vec<ZoneFusion>,
    next_id: Option<ZoneId>,
    round: usize,
}

impl Default for FusionEngine {
    fn default() -> Self {
        let params = FusionParams::default();
        Self {
            metric: params.feature_distance(),
            params,
            state: EngineState::Idle,
            normalizer: None,
            initial_ids: Vec::new(),
            zones: ZoneTable::default(),
            adjacency: ZoneAdjacency::default(),
            pool: CandidatePool::new(),
            fusions: Vec::new(),
            next_id: None,
            round: 0,
        }
    }
}

impl FusionEngine {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the params are invalid.
    pub fn new(params: FusionParams) -> FusionResult<Self> {
        params.validate()?;
        Ok(Self {
            metric: params.feature_distance(),
            params,
            ..Self::default()
        })
    }

    /// Current parameters.
    #[must_use]
    pub const fn params(&self) -> &FusionParams {
        &self.params
    }

    /// Replace every parameter and reset.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the engine untouched, if the params are
    /// invalid.
    pub fn set_params(&mut self, params: FusionParams) -> FusionResult<()> {
        params.validate()?;
        self.metric = params.feature_distance();
        self.params = params;
        self.reset();
        Ok(())
    }

    /// Set the normalization rule and reset.
    pub fn set_normalization(&mut self, normalization: Normalization) {
        self.params.normalization = normalization;
        self.reset();
    }

    /// Set the attribute distances and reset.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the engine untouched, if a distance is
    /// invalid or a custom distance returns negative values.
    pub fn set_attribute_distances(&mut self, distances: AttributeDistances) -> FusionResult<()> {
        distances.validate()?;
        self.params.attribute_distances = distances;
        self.metric = self.params.feature_distance();
        self.reset();
        Ok(())
    }

    /// Set the combiner and reset.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the engine untouched, if the combiner is
    /// invalid.
    pub fn set_combiner(&mut self, combiner: Combiner) -> FusionResult<()> {
        combiner.validate()?;
        self.params.combiner = combiner;
        self.metric = self.params.feature_distance();
        self.reset();
        Ok(())
    }

    /// Set the eligibility predicate and reset.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the engine untouched, if the threshold is
    /// invalid.
    pub fn set_zone_distance(&mut self, zone_distance: ZoneDistance) -> FusionResult<()> {
        zone_distance.validate()?;
        self.params.zone_distance = zone_distance;
        self.reset();
        Ok(())
    }

    /// Set the linkage and reset.
    pub fn set_linkage(&mut self, linkage: Linkage) {
        self.params.linkage = linkage;
        self.reset();
    }

    /// Set the aggregation policy and reset.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving the engine untouched, if the policy
    /// parameter is invalid.
    pub fn set_aggregation(&mut self, aggregation: AggregationPolicy) -> FusionResult<()> {
        aggregation.validate()?;
        self.params.aggregation = aggregation;
        self.reset();
        Ok(())
    }

    /// Set or clear the fusion budget and reset.
    pub fn set_max_fusions(&mut self, max_fusions: Option<usize>) {
        self.params.max_fusions = max_fusions;
        self.reset();
    }

    /// Enable or disable multi-threaded setup and reset.
    pub fn set_parallel(&mut self, parallel: bool) {
        self.params.parallel = parallel;
        self.reset();
    }

    /// Drop every result and return to [`EngineState::Idle`].
    pub fn reset(&mut self) {
        self.state = EngineState::Idle;
        self.normalizer = None;
        self.initial_ids.clear();
        self.zones.clear();
        self.adjacency.clear();
        self.pool.clear();
        self.fusions.clear();
        self.next_id = None;
        self.round = 0;
    }

    /// Fuse `zones` along `neighbors` and return the number of fusions.
    ///
    /// Every previous result is discarded first. The caller's zones are not
    /// modified; features are normalized on a private copy.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed input before anything is merged, or
    /// [`FusionError::BudgetExhausted`] when the fusion budget runs out. In
    /// that case the fusions recorded so far stay available through
    /// [`fusions`](Self::fusions).
    pub fn compute(&mut self, zones: &[Zone], neighbors: &[Neighbor]) -> FusionResult<usize> {
        self.reset();
        self.initialize(zones, neighbors)?;

        info!(
            zones = zones.len(),
            neighbors = neighbors.len(),
            candidates = self.pool.len(),
            policy = %self.params.aggregation,
            "Starting zone fusion"
        );

        self.aggregate()?;

        info!(
            fusions = self.fusions.len(),
            rounds = self.round,
            surviving = self.zones.len(),
            "Zone fusion complete"
        );

        Ok(self.fusions.len())
    }

    fn initialize(&mut self, zones: &[Zone], neighbors: &[Neighbor]) -> FusionResult<()> {
        let mut rows: Vec<Vec<f64>> = zones.iter().map(|z| z.features.clone()).collect();
        let normalizer = FeatureNormalizer::initialize(self.params.normalization, &rows)?;
        if !zones.is_empty() {
            self.params
                .attribute_distances
                .check_dimension(normalizer.dimension())?;
            self.params.combiner.check_dimension(normalizer.dimension())?;
        }

        let mut known = HashSet::with_capacity(zones.len());
        for zone in zones {
            if !known.insert(zone.id) {
                return Err(FusionError::DuplicateZone(zone.id));
            }
        }
        let next_id = next_free_id(zones)?;

        let adjacency = ZoneAdjacency::build(neighbors, |id| known.contains(&id))?;

        normalizer.normalize_all(&mut rows, self.params.parallel);
        let table = ZoneTable::new(zones, rows, self.params.linkage.needs_cells());

        let builder = PairBuilder {
            metric: &self.metric,
            linkage: self.params.linkage,
            eligibility: self.params.zone_distance,
            zones: &table,
        };
        let pairs = builder.initial_pairs(&adjacency, self.params.parallel)?;

        let degenerate = pairs.iter().filter(|p| p.distance().is_infinite()).count();
        if degenerate > 0 {
            warn!(
                degenerate,
                "Candidate pairs with non-finite features will be merged last"
            );
        }

        for pair in pairs {
            self.pool.insert(pair);
        }
        self.initial_ids = zones.iter().map(|z| z.id).collect();
        self.zones = table;
        self.adjacency = adjacency;
        self.normalizer = Some(normalizer);
        self.next_id = next_id;
        self.state = EngineState::PairsInitialized;
        Ok(())
    }

    fn aggregate(&mut self) -> FusionResult<()> {
        self.state = EngineState::Aggregating;

        while !self.pool.is_empty() {
            let policy = self.params.aggregation;
            let selection = policy.select(&self.pool, &self.zones);
            if selection.handles.is_empty() {
                return Err(FusionError::NoProgress {
                    pending: self.pool.len(),
                });
            }

            self.round += 1;
            let before = self.fusions.len();
            let mut cascaded = 0;
            let mut created = 0;
            let mut queue = VecDeque::new();

            for &handle in &selection.handles {
                if let Some(outcome) = self.merge(handle, false, &policy, &selection, &mut queue)? {
                    created += outcome.created;
                }
                while let Some(next) = queue.pop_front() {
                    if let Some(outcome) = self.merge(next, true, &policy, &selection, &mut queue)? {
                        created += outcome.created;
                        cascaded += 1;
                    }
                }
            }

            debug!(
                round = self.round,
                selected = selection.handles.len(),
                merged = self.fusions.len() - before,
                cascaded,
                created,
                cutoff = selection.cutoff,
                pending = self.pool.len(),
                "Aggregation round"
            );
        }

        self.state = EngineState::Done;
        Ok(())
    }

    /// Merge the pair behind `handle` if it is still live.
    fn merge(
        &mut self,
        handle: PairHandle,
        cascaded: bool,
        policy: &AggregationPolicy,
        selection: &Selection,
        queue: &mut VecDeque<PairHandle>,
    ) -> FusionResult<Option<UpdateOutcome>> {
        let Some(pair) = self.pool.get(handle).copied() else {
            return Ok(None);
        };

        if let Some(budget) = self.params.max_fusions
            && self.fusions.len() >= budget
        {
            return Err(FusionError::BudgetExhausted {
                budget,
                completed: self.fusions.len(),
            });
        }

        if !(self.zones.contains(pair.low()) && self.zones.contains(pair.high())) {
            return Err(FusionError::StalePair(pair.key()));
        }

        let fused = self.allocate_id()?;
        self.pool.remove(handle);

        let Some(state) = self.zones.fuse(pair.low(), pair.high(), fused) else {
            return Err(FusionError::StalePair(pair.key()));
        };
        self.fusions.push(ZoneFusion {
            first: pair.low(),
            second: pair.high(),
            fused,
            distance: pair.distance(),
            features: state.features.clone(),
            size: state.size,
            area: state.area,
            round: self.round,
            cascaded,
        });

        let updater = ZonePairUpdater {
            builder: PairBuilder {
                metric: &self.metric,
                linkage: self.params.linkage,
                eligibility: self.params.zone_distance,
                zones: &self.zones,
            },
            policy,
            selection,
        };
        let outcome = updater.update(&mut self.pool, &mut self.adjacency, pair.key(), fused, queue)?;
        Ok(Some(outcome))
    }

    fn allocate_id(&mut self) -> FusionResult<ZoneId> {
        let id = self.next_id.ok_or_else(|| FusionError::ZoneIdOverflow {
            max: ZoneId::new(u32::MAX),
            needed: 1,
        })?;
        self.next_id = id.checked_next();
        Ok(id)
    }

    /// Fusions of the last run, in merge order.
    #[must_use]
    pub fn fusions(&self) -> &[ZoneFusion] {
        &self.fusions
    }

    /// Number of fusions of the last run.
    #[must_use]
    pub fn fusion_count(&self) -> usize {
        self.fusions.len()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Number of candidates still waiting to be merged.
    #[must_use]
    pub fn pending_pairs(&self) -> usize {
        self.pool.len()
    }

    /// Normalization parameters of the last run.
    #[must_use]
    pub const fn normalizer(&self) -> Option<&FeatureNormalizer> {
        self.normalizer.as_ref()
    }

    /// Features of a fused zone in the caller's units.
    #[must_use]
    pub fn unnormalized_features(&self, fusion: &ZoneFusion) -> Option<Vec<f64>> {
        let normalizer = self.normalizer.as_ref()?;
        let mut features = fusion.features.clone();
        normalizer.unnormalize(&mut features);
        Some(features)
    }

    /// Partition of the input zones after the first `level` fusions.
    #[must_use]
    pub fn fusion_map(&self, level: usize) -> FusionMap {
        FusionMap::build(&self.initial_ids, &self.fusions, level)
    }

    /// Partitions for every level from `begin` to the full hierarchy.
    #[must_use]
    pub fn fusion_maps(&self, begin: usize) -> FusionMaps<'_> {
        FusionMaps::new(&self.initial_ids, &self.fusions, begin)
    }

    /// Number of zones alive after the last run.
    #[must_use]
    pub fn surviving_zone_count(&self) -> usize {
        self.zones.len()
    }
}

/// First id above every input id, checked against the ids a full run needs.
fn next_free_id(zones: &[Zone]) -> FusionResult<Option<ZoneId>> {
    let Some(max) = zones.iter().map(|z| z.id).max() else {
        return Ok(None);
    };
    let needed = zones.len() - 1;
    let fits = u32::try_from(needed)
        .ok()
        .and_then(|n| max.get().checked_add(n))
        .is_some();
    if !fits {
        return Err(FusionError::ZoneIdOverflow { max, needed });
    }
    Ok(max.checked_next())
}
