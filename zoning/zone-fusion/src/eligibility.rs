//! Spatial eligibility of a neighbor pair for fusion.
//!
//! Eligibility gates which adjacencies may become merge candidates. It looks
//! only at spatial inputs supplied by the geometry collaborator, never at
//! attribute similarity.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FusionError, FusionResult};

/// Relative tolerance of the boundary length comparison.
const LENGTH_TOLERANCE: f64 = 1e-9;

/// Predicate deciding whether two adjacent zones may be fused.
///
/// # Example
///
/// ```
/// use zone_fusion::ZoneDistance;
///
/// let gate = ZoneDistance::shared_boundary(10.0);
/// assert!(gate.is_eligible(12.0));
/// assert!(!gate.is_eligible(4.0));
/// assert!(ZoneDistance::Always.is_eligible(0.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ZoneDistance {
    /// Every adjacency is eligible.
    #[default]
    Always,
    /// Adjacent zones must share at least `min_length` of boundary.
    SharedBoundary {
        /// Minimum shared boundary length.
        min_length: f64,
    },
}

impl ZoneDistance {
    /// Require a minimum shared boundary length.
    #[must_use]
    pub const fn shared_boundary(min_length: f64) -> Self {
        Self::SharedBoundary { min_length }
    }

    /// Check whether a pair sharing `boundary_length` of boundary is eligible.
    ///
    /// The comparison tolerates rounding in lengths accumulated over merges.
    #[must_use]
    pub fn is_eligible(&self, boundary_length: f64) -> bool {
        match *self {
            Self::Always => true,
            Self::SharedBoundary { min_length } => {
                let slack = LENGTH_TOLERANCE * min_length.abs().max(1.0);
                boundary_length >= min_length - slack
            }
        }
    }

    /// Check the threshold.
    ///
    /// # Errors
    ///
    /// Returns an error for a negative or non-finite minimum length.
    pub fn validate(&self) -> FusionResult<()> {
        match *self {
            Self::SharedBoundary { min_length } if !(min_length.is_finite() && min_length >= 0.0) => {
                Err(FusionError::invalid_config(format!(
                    "minimum shared boundary length must be finite and non-negative, got {min_length}"
                )))
            }
            _ => Ok(()),
        }
    }
}
