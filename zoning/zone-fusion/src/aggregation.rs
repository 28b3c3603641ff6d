//! Aggregation policies: which candidates are merged in a round.
//!
//! A policy looks at the candidate pool and picks a batch of pairs, listed
//! in pool order. It also fixes the round's cascade cutoff: pairs created by
//! a merge during the round are merged immediately when the policy admits
//! them under that cutoff.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FusionError, FusionResult};
use crate::pair::ZonePair;
use crate::pool::{CandidatePool, PairHandle};
use crate::zones::ZoneTable;

/// Rule selecting the pairs merged in one round.
///
/// # Example
///
/// ```
/// use zone_fusion::AggregationPolicy;
///
/// let policy: AggregationPolicy = "threshold=0.25".parse().unwrap();
/// assert_eq!(policy, AggregationPolicy::Threshold { max_distance: 0.25 });
/// assert_eq!(policy.to_string(), "threshold=0.25");
/// assert!("median".parse::<AggregationPolicy>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AggregationPolicy {
    /// Every pair at the smallest distance.
    #[default]
    GlobalMinimum,
    /// Every pair within `max_distance`, or the global minimum when none is.
    Threshold {
        /// Largest distance merged in a round.
        max_distance: f64,
    },
    /// The closest pairs touching a zone of fewer than `min_size` cells.
    ///
    /// Falls back to the global minimum once no undersized zone has a
    /// candidate.
    Size {
        /// Size below which a zone is absorbed first.
        min_size: usize,
    },
    /// The closest pairs touching a zone smaller than `min_area`.
    ///
    /// Falls back to the global minimum once no undersized zone has a
    /// candidate.
    Area {
        /// Area below which a zone is absorbed first.
        min_area: f64,
    },
}

/// Batch chosen for one round.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Selection {
    /// Selected handles, in pool order.
    pub(crate) handles: Vec<PairHandle>,
    /// Largest distance a cascading pair may have.
    pub(crate) cutoff: f64,
    /// Whether cascading pairs must still touch an undersized zone.
    pub(crate) undersized_only: bool,
}

impl Selection {
    fn empty() -> Self {
        Self {
            handles: Vec::new(),
            cutoff: f64::NEG_INFINITY,
            undersized_only: false,
        }
    }
}

impl AggregationPolicy {
    /// Check the policy parameter.
    ///
    /// # Errors
    ///
    /// Returns an error for a NaN or negative threshold or area.
    pub fn validate(&self) -> FusionResult<()> {
        match *self {
            Self::Threshold { max_distance } if max_distance.is_nan() || max_distance < 0.0 => {
                Err(FusionError::invalid_config(format!(
                    "threshold must be non-negative, got {max_distance}"
                )))
            }
            Self::Area { min_area } if !(min_area.is_finite() && min_area >= 0.0) => {
                Err(FusionError::invalid_config(format!(
                    "minimum area must be finite and non-negative, got {min_area}"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Pick the batch of the next round.
    ///
    /// Never mutates the pool. A non-empty pool always yields at least one
    /// handle.
    pub(crate) fn select(&self, pool: &CandidatePool, zones: &ZoneTable) -> Selection {
        match *self {
            Self::GlobalMinimum => global_minimum(pool),
            Self::Threshold { max_distance } => {
                let handles: Vec<PairHandle> = pool
                    .iter()
                    .filter(|(_, pair)| pair.distance() <= max_distance)
                    .map(|(h, _)| h)
                    .collect();
                if handles.is_empty() {
                    global_minimum(pool)
                } else {
                    Selection {
                        handles,
                        cutoff: max_distance,
                        undersized_only: false,
                    }
                }
            }
            Self::Size { .. } | Self::Area { .. } => {
                let restricted = closest_matching(pool, |pair| self.touches_undersized(pair, zones));
                if restricted.handles.is_empty() {
                    global_minimum(pool)
                } else {
                    Selection {
                        undersized_only: true,
                        ..restricted
                    }
                }
            }
        }
    }

    /// Check whether a pair created during the round merges immediately.
    pub(crate) fn admits(&self, pair: &ZonePair, selection: &Selection, zones: &ZoneTable) -> bool {
        pair.distance() <= selection.cutoff
            && (!selection.undersized_only || self.touches_undersized(pair, zones))
    }

    fn touches_undersized(&self, pair: &ZonePair, zones: &ZoneTable) -> bool {
        let undersized = |id| {
            zones.get(id).is_some_and(|zone| match *self {
                Self::Size { min_size } => zone.size < min_size,
                Self::Area { min_area } => zone.area < min_area,
                Self::GlobalMinimum | Self::Threshold { .. } => false,
            })
        };
        undersized(pair.low()) || undersized(pair.high())
    }
}

fn global_minimum(pool: &CandidatePool) -> Selection {
    closest_matching(pool, |_| true)
}

/// Every pair at the smallest distance among those accepted by `filter`.
fn closest_matching<F>(pool: &CandidatePool, filter: F) -> Selection
where
    F: Fn(&ZonePair) -> bool,
{
    let Some(min) = pool
        .iter()
        .filter(|(_, pair)| filter(pair))
        .map(|(_, pair)| pair.distance())
        .min_by(f64::total_cmp)
    else {
        return Selection::empty();
    };

    let handles = pool
        .iter()
        .filter(|(_, pair)| filter(pair) && pair.distance().total_cmp(&min).is_eq())
        .map(|(h, _)| h)
        .collect();

    Selection {
        handles,
        cutoff: min,
        undersized_only: false,
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GlobalMinimum => write!(f, "minimum"),
            Self::Threshold { max_distance } => write!(f, "threshold={max_distance}"),
            Self::Size { min_size } => write!(f, "size={min_size}"),
            Self::Area { min_area } => write!(f, "area={min_area}"),
        }
    }
}

impl FromStr for AggregationPolicy {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = match s.trim().split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (s.trim(), None),
        };

        let policy = match (name.to_ascii_lowercase().as_str(), value) {
            ("minimum" | "min" | "global", None) => Self::GlobalMinimum,
            ("threshold", Some(v)) => Self::Threshold {
                max_distance: parse_value(name, v)?,
            },
            ("size", Some(v)) => Self::Size {
                min_size: parse_value(name, v)?,
            },
            ("area", Some(v)) => Self::Area {
                min_area: parse_value(name, v)?,
            },
            _ => {
                return Err(FusionError::invalid_config(format!(
                    "unrecognized aggregation policy '{s}'"
                )));
            }
        };

        policy.validate()?;
        Ok(policy)
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> FusionResult<T> {
    value.parse().map_err(|_| {
        FusionError::invalid_config(format!("invalid {name} parameter '{value}'"))
    })
}
