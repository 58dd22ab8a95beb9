//! Local Moran's I with conditional-permutation inference.
//!
//! Counts are standardized against the population mean and standard
//! deviation; each region's statistic is its standardized value times
//! the row-standardized spatial lag of its neighbors. Significance uses
//! conditional randomization: the region's own value stays fixed while
//! its neighbor positions are refilled from the remaining regions.

use outbreak_map_analytics_models::Quadrant;
use outbreak_map_spatial::contiguity::SpatialWeights;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::HotspotError;
use crate::progress::{CancelToken, ProgressCallback};

/// Tolerance for the non-isolate weight-row-sums-to-one invariant.
const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// Per-region local autocorrelation result, prior to joining with the
/// region's identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionStatistic {
    /// Standardized count.
    pub z: f64,
    /// Spatial lag of neighbor standardized counts.
    pub lag: f64,
    /// Local Moran's I: `z * lag`.
    pub moran_i: f64,
    /// Quadrant from the signs of `z` and `lag`.
    pub quadrant: Quadrant,
    /// Permutation pseudo p-value.
    pub p_value: f64,
}

/// Standardizes counts: `(x - mean) / std`, population standard
/// deviation over all regions.
///
/// # Errors
///
/// Returns [`HotspotError::EmptyInput`] for an empty slice and
/// [`HotspotError::DegenerateData`] when the variance is zero, which
/// would make every standardized value undefined.
#[allow(clippy::cast_precision_loss)]
pub fn standardize(counts: &[u64]) -> Result<Vec<f64>, HotspotError> {
    if counts.is_empty() {
        return Err(HotspotError::EmptyInput);
    }

    let n = counts.len() as f64;
    let values: Vec<f64> = counts.iter().map(|&count| count as f64).collect();
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if variance <= 0.0 {
        return Err(HotspotError::DegenerateData);
    }

    let std_dev = variance.sqrt();
    Ok(values.iter().map(|v| (v - mean) / std_dev).collect())
}

/// Computes Local Moran's I and permutation pseudo p-values for every
/// region.
///
/// Each region's sampler is seeded from the run seed and the region
/// ordinal, so the draws a region sees do not depend on evaluation
/// order and identical inputs reproduce identical results.
///
/// An isolate has lag 0 and statistic 0; every permuted statistic ties
/// it, so its p-value is exactly 1 and it can never be significant.
///
/// # Errors
///
/// Returns [`HotspotError::Computation`] if the weights do not match the
/// value vector or a non-isolate row fails the sums-to-one invariant,
/// and [`HotspotError::Cancelled`] when the token fires.
pub fn local_moran(
    z: &[f64],
    weights: &SpatialWeights,
    permutations: u32,
    seed: u64,
    progress: Option<&dyn ProgressCallback>,
    cancel: Option<&CancelToken>,
) -> Result<Vec<RegionStatistic>, HotspotError> {
    let n = z.len();
    if weights.len() != n {
        return Err(HotspotError::Computation {
            message: format!("{} weight rows for {n} regions", weights.len()),
        });
    }
    for i in 0..n {
        let row_sum = weights.row_sum(i);
        if !weights.is_isolate(i) && (row_sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(HotspotError::Computation {
                message: format!("weight row {i} sums to {row_sum}, expected 1"),
            });
        }
    }

    let mut results = Vec::with_capacity(n);
    for i in 0..n {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(HotspotError::Cancelled);
            }
        }

        let (neighbors, row_weights) = weights.row(i);
        let lag = weights.spatial_lag(i, z);
        let observed = z[i] * lag;
        let quadrant = Quadrant::from_signs(z[i] > 0.0, lag > 0.0);

        let mut rng = ChaCha8Rng::seed_from_u64(region_seed(seed, i));
        let threshold = observed.abs();
        let mut exceeding = 0u32;
        for _ in 0..permutations {
            let draw = rand::seq::index::sample(&mut rng, n - 1, neighbors.len());
            let mut permuted_lag = 0.0;
            for (slot, index) in draw.iter().enumerate() {
                // Skip over the region's own position in the pool.
                let j = if index >= i { index + 1 } else { index };
                permuted_lag += row_weights[slot] * z[j];
            }
            if (z[i] * permuted_lag).abs() >= threshold {
                exceeding += 1;
            }
        }

        let p_value = f64::from(1 + exceeding) / f64::from(1 + permutations);
        results.push(RegionStatistic {
            z: z[i],
            lag,
            moran_i: observed,
            quadrant,
            p_value,
        });

        if let Some(reporter) = progress {
            reporter.inc(1);
        }
    }

    Ok(results)
}

/// Derives a region's sampler seed from the run seed via a splitmix64
/// finalizer over the region ordinal.
const fn region_seed(seed: u64, ordinal: usize) -> u64 {
    let mut x = seed ^ (ordinal as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^= x >> 31;
    x
}
