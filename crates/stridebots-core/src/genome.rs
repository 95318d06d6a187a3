//! Genome value type and the single-parent mutation operator.
//!
//! A genome is a fixed-length ordered list of per-joint oscillator
//! parameters. Genomes are value objects: storage, retrieval, and mutation
//! always deep-copy, so archive entries never alias live walkers.

use rand::{Rng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

/// Fresh amplitudes are drawn from `[0, MAX_FRESH_AMPLITUDE)` rad/s.
const MAX_FRESH_AMPLITUDE: f64 = 3.0;
/// Fresh phases are drawn from `[0, TAU)`.
const MAX_FRESH_PHASE: f64 = std::f64::consts::TAU;
/// Fresh frequencies are drawn from `[0, MAX_FRESH_FREQUENCY)` per tick.
const MAX_FRESH_FREQUENCY: f64 = 0.5;

/// Sinusoidal oscillator parameters for one controllable joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointGene {
    pub amplitude: f64,
    pub phase: f64,
    pub frequency: f64,
}

impl JointGene {
    /// Motor target speed for this joint at the given local step.
    #[must_use]
    pub fn motor_speed(&self, local_step: u64) -> f64 {
        self.amplitude * (self.phase + self.frequency * local_step as f64).cos()
    }
}

/// Fixed-length ordered sequence of joint genes.
///
/// The length is constant across a run and equals the joint count of the
/// fixed body topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    genes: Vec<JointGene>,
}

impl Genome {
    /// Builds a genome from explicit genes.
    #[must_use]
    pub fn new(genes: Vec<JointGene>) -> Self {
        Self { genes }
    }

    /// Draws a fresh random genome of `joint_count` genes.
    #[must_use]
    pub fn random(rng: &mut SmallRng, joint_count: usize) -> Self {
        let genes = (0..joint_count)
            .map(|_| JointGene {
                amplitude: rng.random_range(0.0..MAX_FRESH_AMPLITUDE),
                phase: rng.random_range(0.0..MAX_FRESH_PHASE),
                frequency: rng.random_range(0.0..MAX_FRESH_FREQUENCY),
            })
            .collect();
        Self { genes }
    }

    /// Number of joint genes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Whether the genome holds no genes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Read-only access to the gene records.
    #[must_use]
    pub fn genes(&self) -> &[JointGene] {
        &self.genes
    }

    /// Returns a mutated deep copy of this genome.
    ///
    /// Every field of every gene is independently perturbed with probability
    /// `chance` to `v * (1 + amount * U)` with `U` uniform on `[-1, 1]`. No
    /// field is exempt and no bound is clamped. Deterministic under a seeded
    /// RNG.
    #[must_use]
    pub fn mutated(&self, rng: &mut SmallRng, chance: f64, amount: f64) -> Self {
        let mut child = self.clone();
        if chance <= 0.0 {
            return child;
        }
        for gene in &mut child.genes {
            gene.amplitude = mutate_field(rng, gene.amplitude, chance, amount);
            gene.phase = mutate_field(rng, gene.phase, chance, amount);
            gene.frequency = mutate_field(rng, gene.frequency, chance, amount);
        }
        child
    }
}

fn mutate_field(rng: &mut SmallRng, value: f64, chance: f64, amount: f64) -> f64 {
    if rng.random::<f64>() >= chance {
        return value;
    }
    value * (1.0 + amount * rng.random_range(-1.0..=1.0))
}
