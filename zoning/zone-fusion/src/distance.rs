//! Attribute distances and their combination into one feature distance.
//!
//! Each attribute is compared by its own [`AttributeDistance`]; the
//! resulting per-attribute values are folded into a single scalar by a
//! [`Combiner`]. Together they form a [`FeatureDistance`].

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{FusionError, FusionResult};

/// Distance assigned to a pair whose features contain NaN.
///
/// Degenerate pairs sort after every regular pair but are still merged once
/// nothing else is left.
pub const DEGENERATE_DISTANCE: f64 = f64::INFINITY;

/// Values used to probe custom distance functions for negative results.
const PROBE_VALUES: [f64; 7] = [-1.0, -0.5, 0.0, 0.25, 0.5, 1.0, 2.0];

static IGNORED: AttributeDistance = AttributeDistance::Ignore;

/// Caller-supplied attribute distance.
///
/// # Example
///
/// ```
/// use zone_fusion::CustomDistance;
///
/// let log_ratio = CustomDistance::new("log-ratio", |a, b| ((a + 1.0) / (b + 1.0)).ln().abs());
/// assert_eq!(log_ratio.name(), "log-ratio");
/// assert!(log_ratio.eval(1.0, 1.0).abs() < 1e-12);
/// ```
#[derive(Clone)]
pub struct CustomDistance {
    name: String,
    func: Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>,
}

impl CustomDistance {
    /// Wrap a distance function under a display name.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Display name of the function.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the function.
    #[inline]
    #[must_use]
    pub fn eval(&self, a: f64, b: f64) -> f64 {
        (self.func)(a, b)
    }
}

impl fmt::Debug for CustomDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomDistance")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Dissimilarity between two values of one attribute.
///
/// Values are compared after normalization. A NaN operand yields NaN.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttributeDistance {
    /// Absolute difference `|a - b|`.
    #[default]
    Absolute,
    /// Squared difference `(a - b)^2`.
    Squared,
    /// 0 when the values agree within `tolerance`, 1 otherwise.
    ///
    /// Suited to categorical attributes encoded as numbers.
    Discrete {
        /// Largest difference still considered equal.
        tolerance: f64,
    },
    /// Attribute does not take part in the comparison.
    Ignore,
    /// Caller-supplied function.
    #[cfg_attr(feature = "serde", serde(skip))]
    Custom(CustomDistance),
}

impl AttributeDistance {
    /// Distance between two attribute values.
    #[inline]
    #[must_use]
    pub fn eval(&self, a: f64, b: f64) -> f64 {
        if a.is_nan() || b.is_nan() {
            return f64::NAN;
        }
        match self {
            Self::Absolute => (a - b).abs(),
            Self::Squared => (a - b) * (a - b),
            Self::Discrete { tolerance } => {
                if (a - b).abs() <= *tolerance {
                    0.0
                } else {
                    1.0
                }
            }
            Self::Ignore => 0.0,
            Self::Custom(custom) => custom.eval(a, b),
        }
    }

    /// Check parameters and probe custom functions for negative results.
    ///
    /// # Errors
    ///
    /// Returns an error if the tolerance is invalid or if a custom function
    /// returns a negative value on the probe grid.
    pub fn validate(&self, attribute: usize) -> FusionResult<()> {
        match self {
            Self::Discrete { tolerance } if !(tolerance.is_finite() && *tolerance >= 0.0) => {
                Err(FusionError::invalid_config(format!(
                    "discrete tolerance of attribute {attribute} must be finite and non-negative, got {tolerance}"
                )))
            }
            Self::Custom(custom) => {
                for &lhs in &PROBE_VALUES {
                    for &rhs in &PROBE_VALUES {
                        let value = custom.eval(lhs, rhs);
                        if value < 0.0 {
                            return Err(FusionError::NegativeDistance {
                                attribute,
                                lhs,
                                rhs,
                                value,
                            });
                        }
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// The attribute distances of a run, one per attribute.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttributeDistances {
    /// The same distance for every attribute.
    Uniform(AttributeDistance),
    /// One distance per attribute, matched by position.
    PerAttribute(Vec<AttributeDistance>),
}

impl Default for AttributeDistances {
    fn default() -> Self {
        Self::Uniform(AttributeDistance::Absolute)
    }
}

impl AttributeDistances {
    /// Distance used for attribute `index`.
    ///
    /// A per-attribute set shorter than `index` falls back to
    /// [`AttributeDistance::Ignore`]; the engine rejects such sets before
    /// computing anything.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> &AttributeDistance {
        match self {
            Self::Uniform(distance) => distance,
            Self::PerAttribute(distances) => {
                distances.get(index).unwrap_or(&IGNORED)
            }
        }
    }

    /// Number of explicitly configured distances, `None` for a uniform set.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Uniform(_) => None,
            Self::PerAttribute(distances) => Some(distances.len()),
        }
    }

    /// Returns `true` for an empty per-attribute set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::PerAttribute(d) if d.is_empty())
    }

    /// Validate every configured distance.
    ///
    /// # Errors
    ///
    /// Returns an error if the set is empty or if any distance is invalid.
    pub fn validate(&self) -> FusionResult<()> {
        match self {
            Self::Uniform(distance) => distance.validate(0),
            Self::PerAttribute(distances) => {
                if distances.is_empty() {
                    return Err(FusionError::invalid_config(
                        "per-attribute distance set is empty",
                    ));
                }
                distances
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, d)| d.validate(i))
            }
        }
    }

    /// Check that the set fits feature vectors of `dimension` attributes.
    ///
    /// # Errors
    ///
    /// Returns an error for a per-attribute set of a different length.
    pub fn check_dimension(&self, dimension: usize) -> FusionResult<()> {
        match self.len() {
            Some(distances) if distances != dimension => Err(FusionError::AttributeCountMismatch {
                distances,
                attributes: dimension,
            }),
            _ => Ok(()),
        }
    }
}

/// Rule folding per-attribute distances into one scalar.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Combiner {
    /// Plain sum.
    Sum,
    /// Weighted sum, one weight per attribute.
    WeightedSum(Vec<f64>),
    /// Square root of the sum of squares.
    #[default]
    Euclidean,
    /// Square root of the weighted sum of squares.
    WeightedEuclidean(Vec<f64>),
    /// `(sum |d|^p)^(1/p)`.
    Minkowski {
        /// Order of the norm, at least 1.
        p: f64,
    },
    /// Largest per-attribute distance.
    Chebyshev,
}

impl Combiner {
    /// Weights of a weighted combiner.
    #[must_use]
    pub fn weights(&self) -> Option<&[f64]> {
        match self {
            Self::WeightedSum(w) | Self::WeightedEuclidean(w) => Some(w),
            _ => None,
        }
    }

    /// Check combiner parameters.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty or negative weight list or a Minkowski
    /// order below one.
    pub fn validate(&self) -> FusionResult<()> {
        if let Some(weights) = self.weights() {
            if weights.is_empty() {
                return Err(FusionError::invalid_config("combiner weights are empty"));
            }
            if let Some(bad) = weights.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
                return Err(FusionError::invalid_config(format!(
                    "combiner weights must be finite and non-negative, got {bad}"
                )));
            }
        }
        if let Self::Minkowski { p } = self
            && !(p.is_finite() && *p >= 1.0)
        {
            return Err(FusionError::invalid_config(format!(
                "minkowski order must be finite and at least 1, got {p}"
            )));
        }
        Ok(())
    }

    /// Check that weights, if any, fit `dimension` attributes.
    ///
    /// # Errors
    ///
    /// Returns an error when the weight count differs from `dimension`.
    pub fn check_dimension(&self, dimension: usize) -> FusionResult<()> {
        match self.weights() {
            Some(weights) if weights.len() != dimension => Err(FusionError::WeightCountMismatch {
                weights: weights.len(),
                attributes: dimension,
            }),
            _ => Ok(()),
        }
    }

    fn combine(&self, terms: impl Iterator<Item = f64>) -> f64 {
        match self {
            Self::Sum => terms.sum(),
            Self::WeightedSum(w) => terms.zip(w).map(|(d, w)| d * w).sum(),
            Self::Euclidean => terms.map(|d| d * d).sum::<f64>().sqrt(),
            Self::WeightedEuclidean(w) => terms.zip(w).map(|(d, w)| d * d * w).sum::<f64>().sqrt(),
            Self::Minkowski { p } => terms.map(|d| d.abs().powf(*p)).sum::<f64>().powf(p.recip()),
            Self::Chebyshev => terms.fold(0.0, |acc: f64, d| {
                if d.is_nan() || acc.is_nan() {
                    f64::NAN
                } else {
                    acc.max(d)
                }
            }),
        }
    }
}

/// Distance between two feature vectors.
///
/// # Example
///
/// ```
/// use zone_fusion::{AttributeDistances, Combiner, FeatureDistance};
///
/// let distance = FeatureDistance::new(AttributeDistances::default(), Combiner::Euclidean);
/// assert!((distance.eval(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FeatureDistance {
    attributes: AttributeDistances,
    combiner: Combiner,
}

impl FeatureDistance {
    /// Combine an attribute distance set with a combiner.
    #[must_use]
    pub const fn new(attributes: AttributeDistances, combiner: Combiner) -> Self {
        Self {
            attributes,
            combiner,
        }
    }

    /// The attribute distance set.
    #[must_use]
    pub const fn attributes(&self) -> &AttributeDistances {
        &self.attributes
    }

    /// The combiner.
    #[must_use]
    pub const fn combiner(&self) -> &Combiner {
        &self.combiner
    }

    /// Raw distance between two vectors; NaN when any attribute is NaN.
    #[must_use]
    pub fn eval(&self, a: &[f64], b: &[f64]) -> f64 {
        let terms = a
            .iter()
            .zip(b)
            .enumerate()
            .map(|(i, (&x, &y))| self.attributes.get(i).eval(x, y));
        self.combiner.combine(terms)
    }

    /// Checked distance with NaN replaced by [`DEGENERATE_DISTANCE`].
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::NegativeDistance`] when an attribute distance
    /// yields a negative term, whatever the combiner would make of it.
    pub fn distance(&self, a: &[f64], b: &[f64]) -> FusionResult<f64> {
        let mut terms: SmallVec<[f64; 8]> = SmallVec::with_capacity(a.len());
        for (attribute, (&lhs, &rhs)) in a.iter().zip(b).enumerate() {
            let value = self.attributes.get(attribute).eval(lhs, rhs);
            if value < 0.0 {
                return Err(FusionError::NegativeDistance {
                    attribute,
                    lhs,
                    rhs,
                    value,
                });
            }
            terms.push(value);
        }
        let d = self.combiner.combine(terms.into_iter());
        Ok(if d.is_nan() { DEGENERATE_DISTANCE } else { d })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn attribute_distances() {
        assert_relative_eq!(AttributeDistance::Absolute.eval(0.2, 0.7), 0.5);
        assert_relative_eq!(AttributeDistance::Squared.eval(1.0, 3.0), 4.0);
        assert_relative_eq!(
            AttributeDistance::Discrete { tolerance: 0.1 }.eval(1.0, 1.05),
            0.0
        );
        assert_relative_eq!(
            AttributeDistance::Discrete { tolerance: 0.1 }.eval(1.0, 2.0),
            1.0
        );
        assert_relative_eq!(AttributeDistance::Ignore.eval(-5.0, 9.0), 0.0);
    }

    #[test]
    fn nan_propagates() {
        assert!(AttributeDistance::Ignore.eval(f64::NAN, 1.0).is_nan());
        let fd = FeatureDistance::default();
        assert!(fd.eval(&[f64::NAN, 0.0], &[1.0, 0.0]).is_nan());
        assert!(fd.distance(&[f64::NAN], &[1.0]).expect("distance").is_infinite());
    }

    #[test]
    fn combiners() {
        let terms = [3.0, 4.0];
        assert_relative_eq!(Combiner::Sum.combine(terms.into_iter()), 7.0);
        assert_relative_eq!(Combiner::Euclidean.combine(terms.into_iter()), 5.0);
        assert_relative_eq!(Combiner::Chebyshev.combine(terms.into_iter()), 4.0);
        assert_relative_eq!(
            Combiner::WeightedSum(vec![2.0, 0.5]).combine(terms.into_iter()),
            8.0
        );
        assert_relative_eq!(
            Combiner::WeightedEuclidean(vec![1.0, 0.0]).combine(terms.into_iter()),
            3.0
        );
        assert_relative_eq!(
            Combiner::Minkowski { p: 1.0 }.combine(terms.into_iter()),
            7.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn chebyshev_keeps_nan() {
        assert!(Combiner::Chebyshev.combine([1.0, f64::NAN, 0.5].into_iter()).is_nan());
    }

    #[test]
    fn per_attribute_set() {
        let fd = FeatureDistance::new(
            AttributeDistances::PerAttribute(vec![
                AttributeDistance::Absolute,
                AttributeDistance::Ignore,
            ]),
            Combiner::Sum,
        );
        assert_relative_eq!(fd.eval(&[0.0, 0.0], &[0.25, 100.0]), 0.25);
    }

    #[test]
    fn dimension_checks() {
        let set = AttributeDistances::PerAttribute(vec![AttributeDistance::Absolute; 2]);
        assert!(set.check_dimension(2).is_ok());
        assert!(matches!(
            set.check_dimension(3),
            Err(FusionError::AttributeCountMismatch {
                distances: 2,
                attributes: 3
            })
        ));
        assert!(AttributeDistances::default().check_dimension(17).is_ok());

        let weighted = Combiner::WeightedSum(vec![1.0]);
        assert!(weighted.check_dimension(2).is_err());
        assert!(Combiner::Euclidean.check_dimension(2).is_ok());
    }

    #[test]
    fn custom_negative_distance_rejected() {
        let signed = AttributeDistance::Custom(CustomDistance::new("signed", |a, b| a - b));
        let err = signed.validate(3);
        assert!(matches!(
            err,
            Err(FusionError::NegativeDistance { attribute: 3, .. })
        ));

        let fine = AttributeDistance::Custom(CustomDistance::new("abs", |a: f64, b: f64| (a - b).abs()));
        assert!(fine.validate(0).is_ok());
    }

    #[test]
    fn negative_term_outside_validation_grid_is_reported() {
        let large_negative = CustomDistance::new("large-negative", |a: f64, b: f64| {
            if a > 5.0 || b > 5.0 { -3.0 } else { (a - b).abs() }
        });
        let custom = AttributeDistance::Custom(large_negative);
        assert!(custom.validate(0).is_ok());

        for combiner in [Combiner::Sum, Combiner::Euclidean] {
            let fd = FeatureDistance::new(AttributeDistances::Uniform(custom.clone()), combiner);
            assert_relative_eq!(fd.distance(&[0.0], &[1.0]).expect("distance"), 1.0);
            assert!(matches!(
                fd.distance(&[0.0], &[10.0]),
                Err(FusionError::NegativeDistance {
                    attribute: 0,
                    value,
                    ..
                }) if value == -3.0
            ));
        }
    }

    #[test]
    fn invalid_parameters_rejected() {
        assert!(AttributeDistance::Discrete { tolerance: -1.0 }.validate(0).is_err());
        assert!(AttributeDistances::PerAttribute(Vec::new()).validate().is_err());
        assert!(Combiner::WeightedSum(vec![1.0, -2.0]).validate().is_err());
        assert!(Combiner::WeightedEuclidean(Vec::new()).validate().is_err());
        assert!(Combiner::Minkowski { p: 0.5 }.validate().is_err());
        assert!(Combiner::Minkowski { p: 3.0 }.validate().is_ok());
    }
}
