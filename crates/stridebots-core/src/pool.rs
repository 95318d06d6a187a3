//! Score-tiered genome archive owned by each diversity bin.
//!
//! The pool keeps a ladder of FIFO-bounded tiers whose admission thresholds
//! are fractions of the pool's record score, recomputed on every insertion.
//! The lowest tier admits anything that survived; the elite tiers approach
//! the record geometrically, forming an ordered ladder from "merely
//! survived" to "current best".

use std::collections::VecDeque;

use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::binning;
use crate::genome::Genome;

#[derive(Debug, Clone)]
struct PoolEntry {
    genome: Genome,
    score: f64,
}

#[derive(Debug, Clone)]
struct Tier {
    fraction: f64,
    entries: VecDeque<PoolEntry>,
}

/// Read-only view of one score tier for rendering/telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSnapshot {
    /// Admission threshold as a fraction of the pool record.
    pub fraction: f64,
    /// Number of stored genomes.
    pub occupancy: usize,
    /// Mean stored score, 0 when empty.
    pub mean_score: f64,
}

/// Per-diversity-bin archive of genomes stratified by score.
#[derive(Debug, Clone)]
pub struct GenePool {
    capacity: usize,
    record_score: f64,
    tiers: Vec<Tier>,
}

impl GenePool {
    /// Builds an empty pool with the configured tier ladder.
    #[must_use]
    pub fn new(
        broad_tiers: usize,
        elite_tiers: usize,
        drift_threshold: f64,
        capacity: usize,
    ) -> Self {
        let tiers = binning::tier_fractions(broad_tiers, elite_tiers, drift_threshold)
            .into_iter()
            .map(|fraction| Tier {
                fraction,
                entries: VecDeque::new(),
            })
            .collect();
        Self {
            capacity,
            record_score: 0.0,
            tiers,
        }
    }

    /// Archives a genome with its score.
    ///
    /// Thresholds are recomputed against the record that stood before this
    /// insertion; the genome lands in the single most elite tier whose
    /// threshold its score meets, with oldest entries FIFO-evicted past
    /// capacity. Returns whether the pool record advanced. A pool with zero
    /// tiers or zero capacity is a documented no-op returning false, as is a
    /// score below every recomputed threshold.
    pub fn add_walker(&mut self, genome: &Genome, score: f64) -> bool {
        if self.tiers.is_empty() || self.capacity == 0 {
            return false;
        }
        let record = self.record_score;
        let Some(slot) = self
            .tiers
            .iter()
            .rposition(|tier| score >= tier.fraction * record)
        else {
            return false;
        };
        let capacity = self.capacity;
        let tier = &mut self.tiers[slot];
        tier.entries.push_back(PoolEntry {
            genome: genome.clone(),
            score,
        });
        while tier.entries.len() > capacity {
            tier.entries.pop_front();
        }
        if score > self.record_score {
            self.record_score = score;
            true
        } else {
            false
        }
    }

    /// Samples a deep-copied genome, favoring elite tiers.
    ///
    /// Eligible tiers are the non-empty ones; one is drawn by rank weight,
    /// then an entry uniformly within it. Returns `None` when the pool is
    /// entirely empty.
    #[must_use]
    pub fn sample_genome(&self, rng: &mut SmallRng, selection_pressure: f64) -> Option<Genome> {
        let eligible: Vec<usize> = self
            .tiers
            .iter()
            .enumerate()
            .filter(|(_, tier)| !tier.entries.is_empty())
            .map(|(index, _)| index)
            .collect();
        let weights = binning::rank_weights(eligible.len(), selection_pressure);
        let pick = binning::select_weighted(rng, &weights)?;
        let tier = &self.tiers[eligible[pick]];
        let entry = binning::select_uniform(rng, tier.entries.len())?;
        Some(tier.entries[entry].genome.clone())
    }

    /// True iff every tier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.iter().all(|tier| tier.entries.is_empty())
    }

    /// Highest score archived into this pool so far.
    #[must_use]
    pub fn record_score(&self) -> f64 {
        self.record_score
    }

    /// Number of tiers in the ladder.
    #[must_use]
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// Replaces the per-tier capacity, trimming oldest entries immediately.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        for tier in &mut self.tiers {
            while tier.entries.len() > capacity {
                tier.entries.pop_front();
            }
        }
    }

    /// Read-only tier summaries, least elite first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TierSnapshot> {
        self.tiers
            .iter()
            .map(|tier| {
                let occupancy = tier.entries.len();
                let mean_score = if occupancy == 0 {
                    0.0
                } else {
                    tier.entries.iter().map(|e| e.score).sum::<f64>() / occupancy as f64
                };
                TierSnapshot {
                    fraction: tier.fraction,
                    occupancy,
                    mean_score,
                }
            })
            .collect()
    }
}
