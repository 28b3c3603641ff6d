//! Error types for zone fusion.

use thiserror::Error;
use zone_types::{PairKey, ZoneId};

/// Result type for zone fusion operations.
pub type FusionResult<T> = Result<T, FusionError>;

/// Broad category of a [`FusionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The input zones or neighbor relation are malformed.
    PreconditionViolation,
    /// A configuration value was rejected.
    ConfigurationInvalid,
    /// The fusion budget ran out. Work done so far is kept.
    ResourceExhausted,
    /// The engine's bookkeeping broke an invariant.
    Internal,
}

/// Errors that can occur during zone fusion.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FusionError {
    /// A zone has no attributes.
    #[error("zone at position {row} has no attributes")]
    EmptyAttributes {
        /// Position of the zone in the input.
        row: usize,
    },

    /// Zones do not all have the same number of attributes.
    #[error("zone at position {row} has {actual} attributes, expected {expected}")]
    DimensionMismatch {
        /// Position of the offending zone in the input.
        row: usize,
        /// Attribute count of the first zone.
        expected: usize,
        /// Attribute count of the offending zone.
        actual: usize,
    },

    /// The per-attribute distance set does not match the feature dimension.
    #[error("{distances} attribute distances configured for {attributes} attributes")]
    AttributeCountMismatch {
        /// Number of configured attribute distances.
        distances: usize,
        /// Number of attributes per zone.
        attributes: usize,
    },

    /// The combiner weights do not match the feature dimension.
    #[error("{weights} combiner weights configured for {attributes} attributes")]
    WeightCountMismatch {
        /// Number of configured weights.
        weights: usize,
        /// Number of attributes per zone.
        attributes: usize,
    },

    /// Two input zones share the same id.
    #[error("zone {0} appears more than once")]
    DuplicateZone(ZoneId),

    /// The neighbor relation references a zone that is not in the input.
    #[error("neighbor relation references unknown zone {0}")]
    UnknownZone(ZoneId),

    /// The neighbor relation pairs a zone with itself.
    #[error("zone {0} is listed as its own neighbor")]
    SelfNeighbor(ZoneId),

    /// Fused zone ids would not fit in the id space.
    #[error("cannot allocate {needed} fused zone ids above {max}")]
    ZoneIdOverflow {
        /// Largest input zone id.
        max: ZoneId,
        /// Number of ids that may be needed.
        needed: usize,
    },

    /// A configuration parameter is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A distance function produced a negative value.
    #[error("attribute distance {attribute} returned negative value {value} for ({lhs}, {rhs})")]
    NegativeDistance {
        /// Index of the attribute distance (0 for a uniform set).
        attribute: usize,
        /// First compared value.
        lhs: f64,
        /// Second compared value.
        rhs: f64,
        /// Returned distance.
        value: f64,
    },

    /// The fusion budget was exhausted before the candidate pool emptied.
    #[error("fusion budget of {budget} merges exhausted ({completed} fusions kept)")]
    BudgetExhausted {
        /// Configured maximum number of fusions.
        budget: usize,
        /// Number of fusions recorded before stopping.
        completed: usize,
    },

    /// A live candidate references a zone that was already fused.
    #[error("candidate {0} references a zone that is no longer live")]
    StalePair(PairKey),

    /// The aggregation policy selected nothing from a non-empty pool.
    #[error("aggregation selected no pair from {pending} pending candidates")]
    NoProgress {
        /// Number of candidates left in the pool.
        pending: usize,
    },
}

impl FusionError {
    /// Creates an invalid configuration error with the given message.
    ///
    /// # Example
    ///
    /// ```
    /// use zone_fusion::FusionError;
    ///
    /// let error = FusionError::invalid_config("threshold must be finite");
    /// assert!(error.to_string().contains("threshold"));
    /// assert!(error.is_configuration_invalid());
    /// ```
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Category of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyAttributes { .. }
            | Self::DimensionMismatch { .. }
            | Self::AttributeCountMismatch { .. }
            | Self::WeightCountMismatch { .. }
            | Self::DuplicateZone(_)
            | Self::UnknownZone(_)
            | Self::SelfNeighbor(_)
            | Self::ZoneIdOverflow { .. } => ErrorKind::PreconditionViolation,
            Self::InvalidConfig(_) | Self::NegativeDistance { .. } => {
                ErrorKind::ConfigurationInvalid
            }
            Self::BudgetExhausted { .. } => ErrorKind::ResourceExhausted,
            Self::NoProgress { .. } | Self::StalePair(_) => ErrorKind::Internal,
        }
    }

    /// Returns `true` if the input violated a precondition.
    #[must_use]
    pub const fn is_precondition_violation(&self) -> bool {
        matches!(self.kind(), ErrorKind::PreconditionViolation)
    }

    /// Returns `true` if a configuration value was rejected.
    #[must_use]
    pub const fn is_configuration_invalid(&self) -> bool {
        matches!(self.kind(), ErrorKind::ConfigurationInvalid)
    }

    /// Returns `true` if the fusion stopped on its budget.
    ///
    /// The fusions recorded before stopping remain available from the engine.
    #[must_use]
    pub const fn is_resource_exhausted(&self) -> bool {
        matches!(self.kind(), ErrorKind::ResourceExhausted)
    }
}
