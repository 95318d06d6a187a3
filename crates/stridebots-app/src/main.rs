use anyhow::Result;
use stridebots_core::{
    BodyBuilder, Genome, HistoryEntry, Population, RecordObserver, StrideBotsConfig, WalkerBody,
};
use tracing::{debug, info};

fn main() -> Result<()> {
    init_tracing();
    info!("Starting StrideBots evolution shell");
    let mut population = bootstrap_population()?;

    for _ in 0..20_000 {
        let events = population.step();
        if events.replacements > 0 {
            debug!(
                tick = events.tick,
                replacements = events.replacements,
                pool_records = events.pool_records,
                "Recycled walker slots",
            );
        }
        if events.tick % 2_000 == 0 {
            log_progress(&population);
        }
    }

    let history = population.elites().history();
    info!(
        record_score = history.record_score(),
        leaderboard = history.len(),
        "Evolution run complete",
    );
    for entry in history.entries() {
        info!(
            id = entry.id,
            name = %entry.name,
            score = entry.score,
            head_height = entry.mean_head_height,
            "Leaderboard entry",
        );
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn bootstrap_population() -> Result<Population> {
    let config = StrideBotsConfig {
        rng_seed: Some(0x57A1_D0B0_7501_u64),
        ..StrideBotsConfig::default()
    };
    let builder = ServoBodyBuilder {
        joints: config.joint_count,
        floor_end: config.floor_end,
    };
    let mut population = Population::new(config, Box::new(builder))?;
    population
        .elites_mut()
        .history_mut()
        .set_observer(Box::new(TracingObserver));
    Ok(population)
}

fn log_progress(population: &Population) {
    let bins = population.elites().snapshot();
    let occupied = bins.iter().filter(|bin| bin.record_score > 0.0).count();
    let best = bins
        .iter()
        .map(|bin| bin.record_score)
        .fold(0.0_f64, f64::max);
    info!(
        tick = population.tick(),
        occupied_bins = occupied,
        best_bin_record = best,
        global_record = population.elites().history().record_score(),
        "Progress",
    );
}

/// Emits a structured log line for each leaderboard insertion.
struct TracingObserver;

impl RecordObserver for TracingObserver {
    fn on_entry(&mut self, entry: &HistoryEntry, new_record: bool) {
        info!(
            id = entry.id,
            name = %entry.name,
            score = entry.score,
            new_record,
            "Leaderboard insertion",
        );
    }
}

/// Kinematic stand-in for a physics body.
///
/// Integrates the commanded motor speeds into torso displacement and head
/// sway without simulating contact or gravity. Good enough to exercise the
/// full evolution loop headlessly; a physics backend would replace it.
struct ServoBody {
    torso_x: f64,
    head_height: f64,
    floor_end: f64,
    motors: Vec<f64>,
    fatigue: f64,
}

impl WalkerBody for ServoBody {
    fn torso_x(&self) -> f64 {
        self.torso_x
    }

    fn head_height_normalized(&self) -> f64 {
        self.head_height
    }

    fn beyond_floor_end(&self) -> bool {
        self.torso_x > self.floor_end
    }

    fn set_joint_motor(&mut self, joint: usize, speed: f64) {
        if let Some(slot) = self.motors.get_mut(joint) {
            *slot = speed;
        }
        if joint + 1 == self.motors.len() {
            self.advance();
        }
    }

    fn destroy(&mut self) {}
}

impl ServoBody {
    fn new(joints: usize, floor_end: f64) -> Self {
        Self {
            torso_x: 0.0,
            head_height: 0.5,
            floor_end,
            motors: vec![0.0; joints],
            fatigue: 1.0,
        }
    }

    /// Converts the latest motor command set into displacement. Alternating
    /// joints push against each other, so coordinated gaits travel farther
    /// than thrashing ones. Fatigue decays output so every gait stalls
    /// eventually.
    fn advance(&mut self) {
        let drive: f64 = self
            .motors
            .iter()
            .enumerate()
            .map(|(joint, speed)| if joint % 2 == 0 { *speed } else { -speed })
            .sum();
        self.torso_x += (drive.abs() * 0.002 * self.fatigue).min(0.05);
        let sway: f64 = self.motors.iter().map(|speed| speed.abs()).sum();
        self.head_height = 0.25 + 0.7 / (1.0 + 0.2 * sway);
        self.fatigue *= 0.9995;
    }
}

struct ServoBodyBuilder {
    joints: usize,
    floor_end: f64,
}

impl BodyBuilder for ServoBodyBuilder {
    fn joint_count(&self) -> usize {
        self.joints
    }

    fn build(&mut self, _genome: &Genome) -> Box<dyn WalkerBody> {
        Box::new(ServoBody::new(self.joints, self.floor_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stridebots_core::{JointGene, Walker};

    #[test]
    fn servo_body_reports_the_floor_boundary() {
        let mut body = ServoBody::new(2, 1.5);
        assert!(!body.beyond_floor_end());
        body.torso_x = 1.5;
        assert!(!body.beyond_floor_end());
        body.torso_x = 1.6;
        assert!(body.beyond_floor_end());
    }

    #[test]
    fn crossing_the_configured_floor_eliminates_a_walker() {
        // A floor boundary at the origin: the first forward displacement
        // crosses it.
        let config = StrideBotsConfig {
            joint_count: 1,
            floor_end: 0.0,
            ..StrideBotsConfig::default()
        };
        let genome = Genome::new(vec![JointGene {
            amplitude: 1.0,
            phase: 0.0,
            frequency: 0.1,
        }]);
        let mut builder = ServoBodyBuilder {
            joints: config.joint_count,
            floor_end: config.floor_end,
        };
        let mut body = builder.build(&genome);
        let mut walker = Walker::new(0, genome, &config);
        walker.simulation_step(body.as_mut(), &config);
        assert!(walker.is_eliminated());
        assert!(walker.max_torso_position() > config.floor_end);
    }
}
