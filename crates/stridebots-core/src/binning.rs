//! Rank-weighted selection and threshold layout shared by the archive.
//!
//! Both archive levels use the same scheme: an index-ordered set of slots
//! (diversity bins, score tiers) where later indexes are by convention more
//! elite, a rank weight per eligible slot tuned by a selection pressure, and
//! a cumulative-weight draw. The two threshold layouts (geometrically
//! decaying bin widths, broad/elite tier fractions) live here as well so the
//! archive components agree on the partition math.

use rand::{Rng, rngs::SmallRng};

/// Normalized rank weights for `count` eligible slots in structural order.
///
/// Slot `i` receives rank `1 + rank_increment * i` with
/// `rank_increment = max(0, selection_pressure - 1) / (count - 1)`; a
/// pressure of 1 yields a uniform distribution, larger pressures favor
/// later-indexed (more elite) slots proportionally.
#[must_use]
pub fn rank_weights(count: usize, selection_pressure: f64) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let increment = if count > 1 {
        (selection_pressure - 1.0).max(0.0) / (count - 1) as f64
    } else {
        0.0
    };
    let mut weights: Vec<f64> = (0..count).map(|i| 1.0 + increment * i as f64).collect();
    let total: f64 = weights.iter().sum();
    for weight in &mut weights {
        *weight /= total;
    }
    weights
}

/// Draws one index with probability proportional to `weights`.
///
/// Rounding can exhaust the cumulative walk without a match; the last entry
/// then wins, so a non-empty slice always yields a result.
#[must_use]
pub fn select_weighted(rng: &mut SmallRng, weights: &[f64]) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let draw = rng.random::<f64>();
    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if draw < cumulative {
            return Some(index);
        }
    }
    Some(weights.len() - 1)
}

/// Uniform draw over `count` slots, ignoring weights.
#[must_use]
pub fn select_uniform(rng: &mut SmallRng, count: usize) -> Option<usize> {
    if count == 0 {
        None
    } else {
        Some(rng.random_range(0..count))
    }
}

/// Score-tier thresholds as ascending fractions of the pool record.
///
/// Broad tiers split `[0, drift_threshold)` linearly, so the lowest tier
/// admits anything that survived. Each elite tier then takes half of the
/// remaining gap toward 1.0, producing increasingly narrow, increasingly
/// hard-to-enter high bands.
#[must_use]
pub fn tier_fractions(broad: usize, elite: usize, drift_threshold: f64) -> Vec<f64> {
    let mut fractions = Vec::with_capacity(broad + elite);
    for k in 0..broad {
        fractions.push(drift_threshold * k as f64 / broad as f64);
    }
    let mut lower = drift_threshold;
    for _ in 0..elite {
        lower += (1.0 - lower) * 0.5;
        fractions.push(lower);
    }
    fractions
}

/// Contiguous half-open bin ranges over `[threshold, 1.0]`.
///
/// Bin `i` is weighted `range_decay^i`; widths are normalized so the bins
/// exactly cover the displayable feature range starting at `threshold`.
#[must_use]
pub fn bin_ranges(count: usize, threshold: f64, range_decay: f64) -> Vec<(f64, f64)> {
    if count == 0 {
        return Vec::new();
    }
    let total = 1.0 - threshold;
    let weights: Vec<f64> = (0..count).map(|i| range_decay.powi(i as i32)).collect();
    let weight_sum: f64 = weights.iter().sum();
    let mut low = threshold;
    weights
        .iter()
        .map(|weight| {
            let high = low + total * weight / weight_sum;
            let range = (low, high);
            low = high;
            range
        })
        .collect()
}
