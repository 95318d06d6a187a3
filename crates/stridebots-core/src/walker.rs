//! Walker agents: per-individual fitness tracking and elimination.
//!
//! A walker owns its genome and running statistics; the physical body lives
//! behind [`WalkerBody`], a narrow interface onto the external physics
//! collaborator. Each tick the walker writes motor targets, reads the torso
//! position, and updates a progress-weighted, velocity-amplified score until
//! one of three elimination conditions fires. Once eliminated the walker is
//! frozen and no statistic changes again.

use serde::{Deserialize, Serialize};

use crate::StrideBotsConfig;
use crate::genome::Genome;
use crate::history::HistoryEntry;

/// Narrow interface onto one articulated body in the physics collaborator.
pub trait WalkerBody {
    /// Current torso x-position in world units.
    fn torso_x(&self) -> f64;

    /// Head height normalized to `[0, 1]`: 0 at the rest baseline,
    /// saturating toward 1 at a reference maximum, clamped at 0 below rest.
    fn head_height_normalized(&self) -> f64;

    /// Whether the torso has passed the floor's far boundary.
    fn beyond_floor_end(&self) -> bool;

    /// Sets the motor target speed for joint `joint`.
    fn set_joint_motor(&mut self, joint: usize, speed: f64);

    /// Releases all physical resources for this body. Idempotent.
    fn destroy(&mut self);
}

/// One simulated walker with its running fitness statistics.
#[derive(Debug, Clone)]
pub struct Walker {
    id: u64,
    name: String,
    genome: Genome,
    eliminated: bool,
    max_torso_position: f64,
    head_height_sum: f64,
    velocity_sum: f64,
    mean_head_height: f64,
    mean_forward_velocity: f64,
    score: f64,
    steps_without_improvement: u32,
    local_steps: u64,
    pressure_position: f64,
    pressure_speed: f64,
}

/// Read-only view of a walker for rendering/telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkerSnapshot {
    pub id: u64,
    pub name: String,
    pub score: f64,
    pub eliminated: bool,
    pub max_torso_position: f64,
    pub mean_head_height: f64,
    pub mean_forward_velocity: f64,
    pub local_steps: u64,
}

impl Walker {
    /// Creates a fresh walker at the origin with the given genome.
    #[must_use]
    pub fn new(id: u64, genome: Genome, config: &StrideBotsConfig) -> Self {
        Self {
            id,
            name: generate_name(id),
            genome,
            eliminated: false,
            max_torso_position: 0.0,
            head_height_sum: 0.0,
            velocity_sum: 0.0,
            mean_head_height: 0.0,
            mean_forward_velocity: 0.0,
            score: 0.0,
            steps_without_improvement: 0,
            local_steps: 0,
            pressure_position: config.pressure_start_offset,
            pressure_speed: config.pressure_speed,
        }
    }

    /// Advances this walker by one tick: actuate motors, update running
    /// fitness, and evaluate the elimination predicate. No-op once
    /// eliminated.
    pub fn simulation_step(&mut self, body: &mut dyn WalkerBody, config: &StrideBotsConfig) {
        if self.eliminated {
            return;
        }
        self.local_steps += 1;

        for (joint, gene) in self.genome.genes().iter().enumerate() {
            body.set_joint_motor(joint, gene.motor_speed(self.local_steps));
        }

        let torso_x = body.torso_x();
        let forward_change = (torso_x - self.max_torso_position).max(0.0);
        if torso_x > self.max_torso_position {
            self.max_torso_position = torso_x;
        }

        if forward_change > 0.0 {
            // Head height is sampled only on forward-progress ticks.
            self.head_height_sum += body.head_height_normalized().max(0.0);
            self.velocity_sum += forward_change * config.ticks_per_second;
            self.steps_without_improvement = 0;
        } else {
            self.steps_without_improvement += 1;
        }
        self.mean_head_height = self.head_height_sum / self.local_steps as f64;
        self.mean_forward_velocity = self.velocity_sum / self.local_steps as f64;

        // A stalled tick contributes zero regardless of velocity.
        self.score += forward_change * (1.0 + self.mean_forward_velocity);

        self.pressure_position += self.pressure_speed;
        self.pressure_speed += config.pressure_acceleration;

        if self.steps_without_improvement >= config.max_steps_without_improvement {
            self.eliminated = true;
        }
        if body.beyond_floor_end() {
            self.eliminated = true;
        }
        if torso_x - self.pressure_position <= 0.0 {
            self.eliminated = true;
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    #[must_use]
    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    /// Cumulative fitness; monotone non-decreasing.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[must_use]
    pub fn max_torso_position(&self) -> f64 {
        self.max_torso_position
    }

    #[must_use]
    pub fn mean_head_height(&self) -> f64 {
        self.mean_head_height
    }

    #[must_use]
    pub fn mean_forward_velocity(&self) -> f64 {
        self.mean_forward_velocity
    }

    #[must_use]
    pub fn steps_without_improvement(&self) -> u32 {
        self.steps_without_improvement
    }

    /// Ticks since this walker was created.
    #[must_use]
    pub fn local_steps(&self) -> u64 {
        self.local_steps
    }

    /// Immutable archive snapshot of this walker.
    #[must_use]
    pub fn history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            id: self.id,
            name: self.name.clone(),
            score: self.score,
            mean_head_height: self.mean_head_height,
            mean_forward_velocity: self.mean_forward_velocity,
            max_torso_position: self.max_torso_position,
            genome: self.genome.clone(),
        }
    }

    /// Read-only view for rendering/telemetry.
    #[must_use]
    pub fn snapshot(&self) -> WalkerSnapshot {
        WalkerSnapshot {
            id: self.id,
            name: self.name.clone(),
            score: self.score,
            eliminated: self.eliminated,
            max_torso_position: self.max_torso_position,
            mean_head_height: self.mean_head_height,
            mean_forward_velocity: self.mean_forward_velocity,
            local_steps: self.local_steps,
        }
    }

    #[cfg(test)]
    pub(crate) fn force_stats(&mut self, mean_head_height: f64, score: f64) {
        self.mean_head_height = mean_head_height;
        self.score = score;
    }
}

const NAME_HEADS: &[&str] = &[
    "Bal", "Cor", "Dun", "Fen", "Gal", "Hob", "Jun", "Kel", "Lor", "Mar", "Nor", "Pim", "Quil",
    "Ras", "Sten", "Tor", "Ulm", "Ver", "Wim", "Zan",
];

const NAME_TAILS: &[&str] = &[
    "dash", "foot", "gait", "hop", "leg", "lope", "march", "pace", "shin", "step", "stride",
    "trek", "trot", "walk",
];

/// Deterministic cosmetic name derived from a walker id.
fn generate_name(id: u64) -> String {
    let head = NAME_HEADS[(id % NAME_HEADS.len() as u64) as usize];
    let tail = NAME_TAILS[((id / NAME_HEADS.len() as u64) % NAME_TAILS.len() as u64) as usize];
    let ordinal = id / (NAME_HEADS.len() as u64 * NAME_TAILS.len() as u64);
    if ordinal == 0 {
        format!("{head}{tail}")
    } else {
        format!("{head}{tail} {}", ordinal + 1)
    }
}
