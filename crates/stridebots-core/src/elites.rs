//! Top-level diversity archive routing walkers into head-height bins.
//!
//! Each bin owns a [`GenePool`]; the archive routes every completed walker
//! into exactly one bin by its mean head height and samples bins by rank
//! weight to produce the next mutated genome. Pool records are forwarded to
//! the owned [`History`] for the leaderboard, whether or not they beat the
//! global record.

use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::binning;
use crate::genome::Genome;
use crate::history::History;
use crate::pool::{GenePool, TierSnapshot};
use crate::walker::Walker;
use crate::{EngineError, StrideBotsConfig};

#[derive(Debug)]
struct Bin {
    enabled: bool,
    low: f64,
    high: f64,
    pool: GenePool,
}

/// Read-only view of one diversity bin for rendering/telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSnapshot {
    pub index: usize,
    pub enabled: bool,
    pub low: f64,
    pub high: f64,
    pub record_score: f64,
    pub tiers: Vec<TierSnapshot>,
}

/// Two-level quality-diversity archive: head-height bins over score-tiered
/// gene pools.
#[derive(Debug)]
pub struct MapElites {
    threshold: f64,
    joint_count: usize,
    mutation_chance: f64,
    mutation_amount: f64,
    bin_selection_pressure: f64,
    tier_selection_pressure: f64,
    bins: Vec<Bin>,
    history: History,
}

impl MapElites {
    /// Builds the archive from a validated configuration.
    #[must_use]
    pub fn new(config: &StrideBotsConfig) -> Self {
        let bins = binning::bin_ranges(config.bin_count, config.bin_threshold, config.range_decay)
            .into_iter()
            .map(|(low, high)| Bin {
                enabled: true,
                low,
                high,
                pool: GenePool::new(
                    config.broad_tiers,
                    config.elite_tiers,
                    config.drift_threshold,
                    config.tier_capacity,
                ),
            })
            .collect();
        Self {
            threshold: config.bin_threshold,
            joint_count: config.joint_count,
            mutation_chance: config.mutation_chance,
            mutation_amount: config.mutation_amount,
            bin_selection_pressure: config.bin_selection_pressure,
            tier_selection_pressure: config.tier_selection_pressure,
            bins,
            history: History::new(config.history_size),
        }
    }

    /// Returns the index of the unique bin containing `feature`.
    ///
    /// `None` outside `[threshold, 1.0]`. The final bin is closed on the
    /// right, catching the `== 1.0` boundary and any floating-point
    /// shortfall in the last computed range.
    #[must_use]
    pub fn select_fitting_bin(&self, feature: f64) -> Option<usize> {
        if feature.is_nan() || feature < self.threshold || feature > 1.0 {
            return None;
        }
        for (index, bin) in self.bins.iter().enumerate() {
            if feature >= bin.low && feature < bin.high {
                return Some(index);
            }
        }
        if self.bins.is_empty() {
            None
        } else {
            Some(self.bins.len() - 1)
        }
    }

    /// Archives an eliminated walker.
    ///
    /// Routes by mean head height; a walker below the feature threshold is
    /// silently discarded and the call returns false. When the receiving
    /// pool reports a new record, a snapshot is forwarded to the history as
    /// an audit insertion. Returns whether a pool record was set.
    pub fn add_walker(&mut self, walker: &Walker) -> bool {
        assert_eq!(
            walker.genome().len(),
            self.joint_count,
            "genome length must match the body joint count"
        );
        let Some(index) = self.select_fitting_bin(walker.mean_head_height()) else {
            return false;
        };
        let is_pool_record = self.bins[index]
            .pool
            .add_walker(walker.genome(), walker.score());
        if is_pool_record {
            self.history.add_allowing_non_record(walker.history_entry());
        }
        is_pool_record
    }

    /// Produces the genome for the next replacement walker.
    ///
    /// Samples an enabled, non-empty bin by rank weight (higher-feature bins
    /// favored), then that bin's pool, and mutates the result. Falls back to
    /// a fresh random genome when the archive has nothing to offer.
    #[must_use]
    pub fn create_mutated_genome(&self, rng: &mut SmallRng) -> Genome {
        let eligible: Vec<usize> = self
            .bins
            .iter()
            .enumerate()
            .filter(|(_, bin)| bin.enabled && !bin.pool.is_empty())
            .map(|(index, _)| index)
            .collect();
        let weights = binning::rank_weights(eligible.len(), self.bin_selection_pressure);
        if let Some(pick) = binning::select_weighted(rng, &weights)
            && let Some(genome) = self.bins[eligible[pick]]
                .pool
                .sample_genome(rng, self.tier_selection_pressure)
        {
            return genome.mutated(rng, self.mutation_chance, self.mutation_amount);
        }
        Genome::random(rng, self.joint_count)
    }

    /// Number of diversity bins.
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Toggles a bin for sampling. Returns false for an unknown index.
    pub fn set_bin_enabled(&mut self, index: usize, enabled: bool) -> bool {
        match self.bins.get_mut(index) {
            Some(bin) => {
                bin.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Replaces the mutation parameters, revalidating them.
    pub fn set_mutation(&mut self, chance: f64, amount: f64) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&chance) {
            return Err(EngineError::InvalidConfig(
                "mutation_chance must be within [0, 1]",
            ));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(EngineError::InvalidConfig(
                "mutation_amount must be finite and non-negative",
            ));
        }
        self.mutation_chance = chance;
        self.mutation_amount = amount;
        Ok(())
    }

    /// Replaces the selection pressures, revalidating them.
    pub fn set_selection_pressures(&mut self, bin: f64, tier: f64) -> Result<(), EngineError> {
        if !bin.is_finite() || bin < 0.0 {
            return Err(EngineError::InvalidConfig(
                "bin_selection_pressure must be finite and non-negative",
            ));
        }
        if !tier.is_finite() || tier < 0.0 {
            return Err(EngineError::InvalidConfig(
                "tier_selection_pressure must be finite and non-negative",
            ));
        }
        self.bin_selection_pressure = bin;
        self.tier_selection_pressure = tier;
        Ok(())
    }

    /// Replaces the per-tier capacity across every pool, trimming live.
    pub fn set_tier_capacity(&mut self, capacity: usize) {
        for bin in &mut self.bins {
            bin.pool.set_capacity(capacity);
        }
    }

    /// The owned record history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Mutable access to the owned record history.
    #[must_use]
    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Record score of one bin's pool, if the index exists.
    #[must_use]
    pub fn bin_record_score(&self, index: usize) -> Option<f64> {
        self.bins.get(index).map(|bin| bin.pool.record_score())
    }

    /// Read-only bin summaries in feature order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<BinSnapshot> {
        self.bins
            .iter()
            .enumerate()
            .map(|(index, bin)| BinSnapshot {
                index,
                enabled: bin.enabled,
                low: bin.low,
                high: bin.high,
                record_score: bin.pool.record_score(),
                tiers: bin.pool.snapshot(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Genome;
    use crate::walker::Walker;
    use rand::SeedableRng;

    fn archive_config() -> StrideBotsConfig {
        StrideBotsConfig {
            joint_count: 3,
            bin_count: 4,
            bin_threshold: 0.3,
            range_decay: 0.5,
            broad_tiers: 2,
            elite_tiers: 1,
            drift_threshold: 0.7,
            tier_capacity: 5,
            history_size: 10,
            rng_seed: Some(21),
            ..StrideBotsConfig::default()
        }
    }

    fn walker_with(config: &StrideBotsConfig, id: u64, head_height: f64, score: f64) -> Walker {
        let mut rng = SmallRng::seed_from_u64(id);
        let mut walker = Walker::new(id, Genome::random(&mut rng, config.joint_count), config);
        walker.force_stats(head_height, score);
        walker
    }

    #[test]
    fn every_feature_value_maps_to_exactly_one_bin() {
        let config = archive_config();
        let elites = MapElites::new(&config);
        let snapshot = elites.snapshot();

        for step in 0..=10_000 {
            let feature = config.bin_threshold + (1.0 - config.bin_threshold) * step as f64 / 10_000.0;
            let index = elites
                .select_fitting_bin(feature)
                .unwrap_or_else(|| panic!("feature {feature} mapped to no bin"));
            let bin = &snapshot[index];
            let contained = if index + 1 == snapshot.len() {
                feature >= bin.low && feature <= 1.0
            } else {
                feature >= bin.low && feature < bin.high
            };
            assert!(contained, "feature {feature} mismatched bin {index}");
        }

        assert_eq!(elites.select_fitting_bin(config.bin_threshold - 1e-9), None);
        assert_eq!(elites.select_fitting_bin(1.0 + 1e-9), None);
        assert_eq!(elites.select_fitting_bin(f64::NAN), None);
        // The 1.0 boundary lands in the final, right-closed bin.
        assert_eq!(elites.select_fitting_bin(1.0), Some(3));
    }

    #[test]
    fn worked_partition_example_holds() {
        let config = StrideBotsConfig {
            bin_count: 2,
            bin_threshold: 0.5,
            range_decay: 0.5,
            ..archive_config()
        };
        let elites = MapElites::new(&config);
        assert_eq!(elites.select_fitting_bin(0.6), Some(0));
        assert_eq!(elites.select_fitting_bin(0.84), Some(1));
        let snapshot = elites.snapshot();
        assert!((snapshot[0].low - 0.5).abs() < 1e-9);
        assert!((snapshot[0].high - 0.8333333333).abs() < 1e-9);
        assert!((snapshot[1].high - 1.0).abs() < 1e-9);
    }

    #[test]
    fn below_threshold_walkers_are_discarded_silently() {
        let config = archive_config();
        let mut elites = MapElites::new(&config);
        let walker = walker_with(&config, 1, 0.1, 50.0);
        assert!(!elites.add_walker(&walker));
        assert!(elites.snapshot().iter().all(|bin| bin.record_score == 0.0));
        assert!(elites.history().is_empty());
    }

    #[test]
    fn empty_archive_falls_back_to_a_random_genome() {
        // Scenario: all bins empty at startup.
        let config = archive_config();
        let elites = MapElites::new(&config);
        let mut rng = SmallRng::seed_from_u64(22);
        let genome = elites.create_mutated_genome(&mut rng);
        assert_eq!(genome.len(), config.joint_count);
        for gene in genome.genes() {
            assert!(gene.amplitude.is_finite());
            assert!(gene.phase.is_finite());
            assert!(gene.frequency.is_finite());
        }
    }

    #[test]
    fn zero_bin_archive_is_a_no_op_with_working_fallback() {
        let config = StrideBotsConfig {
            bin_count: 0,
            ..archive_config()
        };
        let mut elites = MapElites::new(&config);
        let walker = walker_with(&config, 1, 0.9, 50.0);
        assert!(!elites.add_walker(&walker));
        let mut rng = SmallRng::seed_from_u64(23);
        assert_eq!(elites.create_mutated_genome(&mut rng).len(), config.joint_count);
    }

    #[test]
    fn second_higher_scorer_sets_the_pool_record_and_one_history_entry() {
        // Scenario: threshold 0.75, 2 bins, decay 0.5, 2 broad + 1 elite
        // tier, capacity 5; two same-feature walkers, the second scoring
        // higher.
        let config = StrideBotsConfig {
            bin_count: 2,
            bin_threshold: 0.75,
            range_decay: 0.5,
            broad_tiers: 2,
            elite_tiers: 1,
            tier_capacity: 5,
            ..archive_config()
        };
        let mut elites = MapElites::new(&config);

        let first = walker_with(&config, 1, 0.9, 100.0);
        assert!(elites.add_walker(&first));
        let entries_after_first = elites.history().len();

        let second = walker_with(&config, 2, 0.9, 150.0);
        assert!(elites.add_walker(&second));

        let bin = elites.select_fitting_bin(0.9).expect("bin");
        assert_eq!(elites.bin_record_score(bin), Some(150.0));
        // Exactly one new entry arrived for the second insert, and it is the
        // second walker's, not another copy of the first.
        assert_eq!(elites.history().len(), entries_after_first + 1);
        let last = elites.history().entries().last().expect("entry");
        assert_eq!(last.id, 2);
        assert_eq!(elites.history().record_score(), 150.0);
    }

    #[test]
    fn disabled_bins_are_skipped_when_sampling() {
        let config = StrideBotsConfig {
            mutation_chance: 0.0,
            ..archive_config()
        };
        let mut elites = MapElites::new(&config);

        let low_bin_walker = walker_with(&config, 1, 0.35, 10.0);
        let high_bin_walker = walker_with(&config, 2, 0.95, 20.0);
        assert!(elites.add_walker(&low_bin_walker));
        assert!(elites.add_walker(&high_bin_walker));

        let high_bin = elites.select_fitting_bin(0.95).expect("bin");
        let low_bin = elites.select_fitting_bin(0.35).expect("bin");
        assert_ne!(high_bin, low_bin);
        assert!(elites.set_bin_enabled(high_bin, false));

        // With mutation disabled, every sample must be a value-equal copy of
        // the low bin's only genome.
        let mut rng = SmallRng::seed_from_u64(24);
        for _ in 0..50 {
            let genome = elites.create_mutated_genome(&mut rng);
            assert_eq!(&genome, low_bin_walker.genome());
        }
        assert!(!elites.set_bin_enabled(99, false));
    }

    #[test]
    fn live_setters_revalidate() {
        let config = archive_config();
        let mut elites = MapElites::new(&config);
        assert!(elites.set_mutation(0.2, 0.3).is_ok());
        assert!(elites.set_mutation(1.5, 0.3).is_err());
        assert!(elites.set_mutation(0.2, f64::NAN).is_err());
        assert!(elites.set_selection_pressures(1.0, 2.0).is_ok());
        assert!(elites.set_selection_pressures(-1.0, 2.0).is_err());

        let walker = walker_with(&config, 1, 0.9, 10.0);
        assert!(elites.add_walker(&walker));
        elites.set_tier_capacity(0);
        let snapshot = elites.snapshot();
        assert!(
            snapshot
                .iter()
                .all(|bin| bin.tiers.iter().all(|tier| tier.occupancy == 0))
        );
    }

    #[test]
    #[should_panic(expected = "genome length must match")]
    fn genome_length_mismatch_fails_fast() {
        let config = archive_config();
        let mut elites = MapElites::new(&config);
        let bad_config = StrideBotsConfig {
            joint_count: config.joint_count + 1,
            ..config
        };
        let walker = walker_with(&bad_config, 1, 0.9, 10.0);
        elites.add_walker(&walker);
    }
}
