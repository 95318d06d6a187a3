//! Core types and algorithms shared across the StrideBots workspace.
//!
//! The engine evolves a population of articulated walkers: each tick every
//! living walker updates its running fitness, eliminated walkers are archived
//! into a two-level quality-diversity structure (diversity bins keyed by
//! normalized head height, score tiers within each bin), and freed population
//! slots are refilled with mutated descendants sampled from that archive.
//!
//! Physics and rendering are external collaborators reached through the
//! narrow [`WalkerBody`] / [`BodyBuilder`] traits; the engine only reads body
//! positions and writes motor targets.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod binning;
mod elites;
mod genome;
mod history;
mod pool;
mod population;
mod walker;

pub use elites::{BinSnapshot, MapElites};
pub use genome::{Genome, JointGene};
pub use history::{History, HistoryEntry, NullObserver, RecordObserver};
pub use pool::{GenePool, TierSnapshot};
pub use population::{BodyBuilder, Population, TickEvents};
pub use walker::{Walker, WalkerBody, WalkerSnapshot};

/// Errors raised when constructing engine components.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Static configuration for a StrideBots run.
///
/// Plain values, hot-swappable: components needing live reconfiguration
/// expose revalidating setters (for example [`History::set_capacity`]).
/// Zero-sized archives (no bins, no tiers, zero tier capacity) are valid and
/// degrade to documented no-ops rather than failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrideBotsConfig {
    /// Number of population slots (walkers alive at any time).
    pub population_size: usize,
    /// Controllable joints in the fixed body topology; genome length.
    pub joint_count: usize,
    /// Per-field probability that mutation perturbs a genome value.
    pub mutation_chance: f64,
    /// Relative perturbation scale: `v * (1 + mutation_amount * U[-1, 1])`.
    pub mutation_amount: f64,
    /// Maximum genomes retained per score tier (FIFO eviction); 0 disables archiving.
    pub tier_capacity: usize,
    /// Number of broad-spectrum score tiers per gene pool.
    pub broad_tiers: usize,
    /// Number of elite-refinement score tiers per gene pool.
    pub elite_tiers: usize,
    /// Fraction of the record score splitting broad tiers from elite tiers.
    pub drift_threshold: f64,
    /// Number of diversity bins partitioning the head-height feature.
    pub bin_count: usize,
    /// Lower bound of the archived head-height feature domain.
    pub bin_threshold: f64,
    /// Geometric decay factor applied to successive bin widths.
    pub range_decay: f64,
    /// Rank weighting applied across diversity bins when sampling (1 = uniform).
    pub bin_selection_pressure: f64,
    /// Rank weighting applied across score tiers when sampling (1 = uniform).
    pub tier_selection_pressure: f64,
    /// Maximum record-breaking entries retained by the history buffer.
    pub history_size: usize,
    /// Ticks without forward progress before a walker is eliminated.
    pub max_steps_without_improvement: u32,
    /// Starting position of the pressure line relative to the walker origin.
    pub pressure_start_offset: f64,
    /// Initial per-tick advance of the pressure line.
    pub pressure_speed: f64,
    /// Per-tick increase of the pressure line speed.
    pub pressure_acceleration: f64,
    /// Simulation tick rate used to scale per-tick displacement to velocity.
    pub ticks_per_second: f64,
    /// Torso position of the floor's far boundary; reaching it ends the run.
    pub floor_end: f64,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
}

impl Default for StrideBotsConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            joint_count: 8,
            mutation_chance: 0.1,
            mutation_amount: 0.25,
            tier_capacity: 10,
            broad_tiers: 4,
            elite_tiers: 3,
            drift_threshold: 0.7,
            bin_count: 10,
            bin_threshold: 0.2,
            range_decay: 0.85,
            bin_selection_pressure: 2.0,
            tier_selection_pressure: 3.0,
            history_size: 20,
            max_steps_without_improvement: 600,
            pressure_start_offset: -3.0,
            pressure_speed: 0.0005,
            pressure_acceleration: 0.000_000_5,
            ticks_per_second: 60.0,
            floor_end: 40.0,
            rng_seed: None,
        }
    }
}

impl StrideBotsConfig {
    /// Validates the configuration.
    ///
    /// Empty archives are allowed; malformed fractions, pressures, and rates
    /// are rejected because they would silently corrupt archive placement.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.population_size == 0 {
            return Err(EngineError::InvalidConfig(
                "population_size must be non-zero",
            ));
        }
        if self.joint_count == 0 {
            return Err(EngineError::InvalidConfig("joint_count must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.mutation_chance) {
            return Err(EngineError::InvalidConfig(
                "mutation_chance must be within [0, 1]",
            ));
        }
        if !self.mutation_amount.is_finite() || self.mutation_amount < 0.0 {
            return Err(EngineError::InvalidConfig(
                "mutation_amount must be finite and non-negative",
            ));
        }
        if !(0.0..1.0).contains(&self.drift_threshold) {
            return Err(EngineError::InvalidConfig(
                "drift_threshold must be within [0, 1)",
            ));
        }
        if !(0.0..1.0).contains(&self.bin_threshold) {
            return Err(EngineError::InvalidConfig(
                "bin_threshold must be within [0, 1)",
            ));
        }
        if !self.range_decay.is_finite() || self.range_decay <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "range_decay must be finite and positive",
            ));
        }
        if !self.bin_selection_pressure.is_finite() || self.bin_selection_pressure < 0.0 {
            return Err(EngineError::InvalidConfig(
                "bin_selection_pressure must be finite and non-negative",
            ));
        }
        if !self.tier_selection_pressure.is_finite() || self.tier_selection_pressure < 0.0 {
            return Err(EngineError::InvalidConfig(
                "tier_selection_pressure must be finite and non-negative",
            ));
        }
        if self.max_steps_without_improvement == 0 {
            return Err(EngineError::InvalidConfig(
                "max_steps_without_improvement must be non-zero",
            ));
        }
        if !self.ticks_per_second.is_finite() || self.ticks_per_second <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "ticks_per_second must be finite and positive",
            ));
        }
        if !self.pressure_start_offset.is_finite() {
            return Err(EngineError::InvalidConfig(
                "pressure_start_offset must be finite",
            ));
        }
        if !self.pressure_speed.is_finite() || self.pressure_speed < 0.0 {
            return Err(EngineError::InvalidConfig(
                "pressure_speed must be finite and non-negative",
            ));
        }
        if !self.pressure_acceleration.is_finite() || self.pressure_acceleration < 0.0 {
            return Err(EngineError::InvalidConfig(
                "pressure_acceleration must be finite and non-negative",
            ));
        }
        if !self.floor_end.is_finite() {
            return Err(EngineError::InvalidConfig("floor_end must be finite"));
        }
        Ok(())
    }

    /// Returns the configured RNG, generating a seed from entropy if absent.
    #[must_use]
    pub fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(StrideBotsConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_archive_shapes_are_valid() {
        let config = StrideBotsConfig {
            bin_count: 0,
            broad_tiers: 0,
            elite_tiers: 0,
            tier_capacity: 0,
            history_size: 0,
            ..StrideBotsConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_values_are_rejected() {
        let cases = [
            StrideBotsConfig {
                population_size: 0,
                ..StrideBotsConfig::default()
            },
            StrideBotsConfig {
                joint_count: 0,
                ..StrideBotsConfig::default()
            },
            StrideBotsConfig {
                mutation_chance: 1.5,
                ..StrideBotsConfig::default()
            },
            StrideBotsConfig {
                mutation_amount: f64::NAN,
                ..StrideBotsConfig::default()
            },
            StrideBotsConfig {
                drift_threshold: 1.0,
                ..StrideBotsConfig::default()
            },
            StrideBotsConfig {
                bin_threshold: -0.1,
                ..StrideBotsConfig::default()
            },
            StrideBotsConfig {
                range_decay: 0.0,
                ..StrideBotsConfig::default()
            },
            StrideBotsConfig {
                tier_selection_pressure: f64::INFINITY,
                ..StrideBotsConfig::default()
            },
            StrideBotsConfig {
                max_steps_without_improvement: 0,
                ..StrideBotsConfig::default()
            },
            StrideBotsConfig {
                ticks_per_second: 0.0,
                ..StrideBotsConfig::default()
            },
        ];
        for config in cases {
            assert!(matches!(
                config.validate(),
                Err(EngineError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        use rand::Rng;
        let config = StrideBotsConfig {
            rng_seed: Some(99),
            ..StrideBotsConfig::default()
        };
        let a: f64 = config.seeded_rng().random();
        let b: f64 = config.seeded_rng().random();
        assert_eq!(a, b);
    }
}
