//! Per-attribute feature normalization.
//!
//! Attributes measured in different units are rescaled to a common range
//! before any distance is computed. Normalization is an affine map per
//! attribute, `x' = (x - offset) / scale`, so it can always be undone.

#![allow(clippy::cast_precision_loss)]

use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FusionError, FusionResult};
use crate::params::PARALLEL_THRESHOLD;

/// Rule used to derive the per-attribute normalization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Normalization {
    /// Leave values untouched.
    None,
    /// Map each attribute onto `[0, 1]` using its minimum and maximum.
    #[default]
    MinMax,
    /// Center each attribute on its mean and divide by its standard deviation.
    ZScore,
}

/// Normalization parameters computed from a full set of feature vectors.
///
/// # Example
///
/// ```
/// use zone_fusion::{FeatureNormalizer, Normalization};
///
/// let rows = vec![vec![0.0, 10.0], vec![5.0, 30.0], vec![10.0, 20.0]];
/// let normalizer = FeatureNormalizer::initialize(Normalization::MinMax, &rows).unwrap();
///
/// let mut row = rows[1].clone();
/// normalizer.normalize(&mut row);
/// assert_eq!(row, vec![0.5, 1.0]);
///
/// normalizer.unnormalize(&mut row);
/// assert_eq!(row, vec![5.0, 30.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureNormalizer {
    rule: Normalization,
    offsets: Vec<f64>,
    scales: Vec<f64>,
}

impl FeatureNormalizer {
    /// Compute normalization parameters from every row.
    ///
    /// Non-finite values are left out of the statistics. An attribute with no
    /// spread (or no finite value at all) gets a scale of one.
    ///
    /// # Errors
    ///
    /// Returns an error if a row is empty or if rows differ in length.
    pub fn initialize<R: AsRef<[f64]>>(rule: Normalization, rows: &[R]) -> FusionResult<Self> {
        let dimension = check_dimension(rows)?;

        let (offsets, scales) = match rule {
            Normalization::None => (vec![0.0; dimension], vec![1.0; dimension]),
            Normalization::MinMax => min_max_parameters(rows, dimension),
            Normalization::ZScore => z_score_parameters(rows, dimension),
        };

        Ok(Self {
            rule,
            offsets,
            scales,
        })
    }

    /// Rule these parameters were computed with.
    #[must_use]
    pub const fn rule(&self) -> Normalization {
        self.rule
    }

    /// Number of attributes handled.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.offsets.len()
    }

    /// Per-attribute offsets.
    #[must_use]
    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    /// Per-attribute scales (never zero).
    #[must_use]
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Normalize one feature vector in place.
    ///
    /// Extra trailing values beyond [`dimension`](Self::dimension) are left
    /// untouched.
    pub fn normalize(&self, features: &mut [f64]) {
        for ((value, offset), scale) in features.iter_mut().zip(&self.offsets).zip(&self.scales) {
            *value = (*value - offset) / scale;
        }
    }

    /// Undo [`normalize`](Self::normalize) in place.
    pub fn unnormalize(&self, features: &mut [f64]) {
        for ((value, offset), scale) in features.iter_mut().zip(&self.offsets).zip(&self.scales) {
            *value = value.mul_add(*scale, *offset);
        }
    }

    /// Normalize every row, in parallel when `parallel` is set and the input
    /// is large enough.
    pub fn normalize_all(&self, rows: &mut [Vec<f64>], parallel: bool) {
        if parallel && rows.len() >= PARALLEL_THRESHOLD {
            rows.par_iter_mut().for_each(|row| self.normalize(row));
        } else {
            for row in rows {
                self.normalize(row);
            }
        }
    }
}

fn check_dimension<R: AsRef<[f64]>>(rows: &[R]) -> FusionResult<usize> {
    let Some(first) = rows.first() else {
        return Ok(0);
    };
    let expected = first.as_ref().len();
    if expected == 0 {
        return Err(FusionError::EmptyAttributes { row: 0 });
    }

    for (row, features) in rows.iter().enumerate().skip(1) {
        let actual = features.as_ref().len();
        if actual == 0 {
            return Err(FusionError::EmptyAttributes { row });
        }
        if actual != expected {
            return Err(FusionError::DimensionMismatch {
                row,
                expected,
                actual,
            });
        }
    }

    Ok(expected)
}

fn min_max_parameters<R: AsRef<[f64]>>(rows: &[R], dimension: usize) -> (Vec<f64>, Vec<f64>) {
    let mut min = vec![f64::INFINITY; dimension];
    let mut max = vec![f64::NEG_INFINITY; dimension];

    for row in rows {
        for (i, &value) in row.as_ref().iter().enumerate() {
            if value.is_finite() {
                min[i] = min[i].min(value);
                max[i] = max[i].max(value);
            }
        }
    }

    let mut offsets = Vec::with_capacity(dimension);
    let mut scales = Vec::with_capacity(dimension);
    for (lo, hi) in min.into_iter().zip(max) {
        if lo.is_finite() {
            offsets.push(lo);
            scales.push(usable_scale(hi - lo));
        } else {
            offsets.push(0.0);
            scales.push(1.0);
        }
    }
    (offsets, scales)
}

fn z_score_parameters<R: AsRef<[f64]>>(rows: &[R], dimension: usize) -> (Vec<f64>, Vec<f64>) {
    let mut sum = vec![0.0; dimension];
    let mut count = vec![0_usize; dimension];

    for row in rows {
        for (i, &value) in row.as_ref().iter().enumerate() {
            if value.is_finite() {
                sum[i] += value;
                count[i] += 1;
            }
        }
    }

    let means: Vec<f64> = sum
        .iter()
        .zip(&count)
        .map(|(&s, &n)| if n == 0 { 0.0 } else { s / n as f64 })
        .collect();

    let mut squares = vec![0.0; dimension];
    for row in rows {
        for (i, &value) in row.as_ref().iter().enumerate() {
            if value.is_finite() {
                let centered = value - means[i];
                squares[i] += centered * centered;
            }
        }
    }

    let scales = squares
        .iter()
        .zip(&count)
        .map(|(&sq, &n)| {
            if n == 0 {
                1.0
            } else {
                usable_scale((sq / n as f64).sqrt())
            }
        })
        .collect();

    (means, scales)
}

fn usable_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > f64::EPSILON {
        scale
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn min_max_maps_to_unit_range() {
        let rows = vec![vec![2.0], vec![4.0], vec![6.0]];
        let n = FeatureNormalizer::initialize(Normalization::MinMax, &rows).expect("init");

        let mut lo = vec![2.0];
        let mut hi = vec![6.0];
        n.normalize(&mut lo);
        n.normalize(&mut hi);
        assert_relative_eq!(lo[0], 0.0);
        assert_relative_eq!(hi[0], 1.0);
    }

    #[test]
    fn z_score_centers_and_scales() {
        let rows = vec![vec![1.0], vec![3.0]];
        let n = FeatureNormalizer::initialize(Normalization::ZScore, &rows).expect("init");

        assert_relative_eq!(n.offsets()[0], 2.0);
        assert_relative_eq!(n.scales()[0], 1.0);

        let mut row = vec![3.0];
        n.normalize(&mut row);
        assert_relative_eq!(row[0], 1.0);
    }

    #[test]
    fn none_is_identity() {
        let rows = vec![vec![7.0, -3.0]];
        let n = FeatureNormalizer::initialize(Normalization::None, &rows).expect("init");
        let mut row = vec![7.0, -3.0];
        n.normalize(&mut row);
        assert_eq!(row, vec![7.0, -3.0]);
    }

    #[test]
    fn constant_attribute_gets_unit_scale() {
        let rows = vec![vec![5.0, 1.0], vec![5.0, 2.0]];
        let n = FeatureNormalizer::initialize(Normalization::MinMax, &rows).expect("init");
        assert_relative_eq!(n.scales()[0], 1.0);

        let mut row = vec![5.0, 2.0];
        n.normalize(&mut row);
        assert_relative_eq!(row[0], 0.0);
        assert_relative_eq!(row[1], 1.0);
    }

    #[test]
    fn round_trip_restores_values() {
        let rows = vec![vec![1.5, -20.0, 3.0], vec![8.0, 40.0, 3.5], vec![2.0, 0.0, 9.0]];
        for rule in [Normalization::MinMax, Normalization::ZScore] {
            let n = FeatureNormalizer::initialize(rule, &rows).expect("init");
            let mut row = rows[2].clone();
            n.normalize(&mut row);
            n.unnormalize(&mut row);
            for (got, want) in row.iter().zip(&rows[2]) {
                assert_relative_eq!(*got, *want, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn non_finite_values_are_ignored_in_statistics() {
        let rows = vec![vec![0.0], vec![f64::NAN], vec![10.0]];
        let n = FeatureNormalizer::initialize(Normalization::MinMax, &rows).expect("init");
        assert_relative_eq!(n.offsets()[0], 0.0);
        assert_relative_eq!(n.scales()[0], 10.0);

        let mut row = vec![f64::NAN];
        n.normalize(&mut row);
        assert!(row[0].is_nan());
    }

    #[test]
    fn empty_input_has_zero_dimension() {
        let rows: Vec<Vec<f64>> = Vec::new();
        let n = FeatureNormalizer::initialize(Normalization::MinMax, &rows).expect("init");
        assert_eq!(n.dimension(), 0);
    }

    #[test]
    fn empty_row_is_rejected() {
        let rows = vec![vec![1.0], vec![]];
        let err = FeatureNormalizer::initialize(Normalization::MinMax, &rows);
        assert!(matches!(err, Err(FusionError::EmptyAttributes { row: 1 })));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        let err = FeatureNormalizer::initialize(Normalization::ZScore, &rows);
        assert!(matches!(
            err,
            Err(FusionError::DimensionMismatch {
                row: 1,
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn normalize_all_matches_single_rows() {
        let count = u32::try_from(PARALLEL_THRESHOLD).expect("threshold") + 100;
        let rows: Vec<Vec<f64>> = (0..count).map(|i| vec![f64::from(i), f64::from(i % 17)]).collect();
        let n = FeatureNormalizer::initialize(Normalization::MinMax, &rows).expect("init");

        let mut parallel = rows.clone();
        n.normalize_all(&mut parallel, true);
        let mut sequential = rows.clone();
        n.normalize_all(&mut sequential, false);
        assert_eq!(parallel, sequential);

        for (original, normalized) in rows.iter().zip(&parallel) {
            let mut single = original.clone();
            n.normalize(&mut single);
            assert_eq!(&single, normalized);
        }
    }
}
