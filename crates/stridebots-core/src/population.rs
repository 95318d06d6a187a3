//! Fixed-size walker population driving the archive lifecycle.
//!
//! The population owns a slot per walker plus the simulated body behind it.
//! Each tick advances every living walker synchronously; an eliminated
//! walker is archived, its body torn down, and the slot refilled with a
//! mutated descendant sampled from the archive before the tick ends.

use std::fmt;

use rand::rngs::SmallRng;

use crate::elites::MapElites;
use crate::genome::Genome;
use crate::walker::{Walker, WalkerBody, WalkerSnapshot};
use crate::{EngineError, StrideBotsConfig};

/// Constructs simulated bodies for freshly spawned walkers.
///
/// The engine stays agnostic of the physics backend; implementors wire a
/// genome to whatever articulated body the host simulation provides.
pub trait BodyBuilder: Send {
    /// Number of motorized joints on the bodies this builder produces.
    fn joint_count(&self) -> usize;

    /// Builds a live body for `genome`, positioned at the start of the run.
    fn build(&mut self, genome: &Genome) -> Box<dyn WalkerBody>;
}

/// Per-tick bookkeeping returned by [`Population::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Tick number this report covers.
    pub tick: u64,
    /// Slots refilled with a new walker this tick.
    pub replacements: usize,
    /// Archived walkers that set a bin record this tick.
    pub pool_records: usize,
}

struct Slot {
    walker: Walker,
    body: Box<dyn WalkerBody>,
}

/// The running population and the quality-diversity archive behind it.
pub struct Population {
    config: StrideBotsConfig,
    rng: SmallRng,
    elites: MapElites,
    builder: Box<dyn BodyBuilder>,
    slots: Vec<Slot>,
    next_id: u64,
    tick: u64,
}

impl fmt::Debug for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Population")
            .field("tick", &self.tick)
            .field("next_id", &self.next_id)
            .field("slots", &self.slots.len())
            .field("elites", &self.elites)
            .finish_non_exhaustive()
    }
}

impl Population {
    /// Builds a population of random walkers from a validated configuration.
    ///
    /// The builder's joint count must match the configured genome length;
    /// the two disagreeing is a wiring bug, not a runtime condition.
    pub fn new(
        config: StrideBotsConfig,
        builder: Box<dyn BodyBuilder>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if builder.joint_count() != config.joint_count {
            return Err(EngineError::InvalidConfig(
                "body builder joint count must match joint_count",
            ));
        }
        let mut rng = config.seeded_rng();
        let elites = MapElites::new(&config);
        let mut builder = builder;
        let mut slots = Vec::with_capacity(config.population_size);
        let mut next_id = 0;
        for _ in 0..config.population_size {
            let genome = Genome::random(&mut rng, config.joint_count);
            let body = builder.build(&genome);
            slots.push(Slot {
                walker: Walker::new(next_id, genome, &config),
                body,
            });
            next_id += 1;
        }
        Ok(Self {
            config,
            rng,
            elites,
            builder,
            slots,
            next_id,
            tick: 0,
        })
    }

    /// Advances the whole population by one tick.
    ///
    /// Slots are visited in index order. A slot whose walker was eliminated
    /// on a previous tick is recycled this tick: the walker is archived, its
    /// body destroyed, and a mutated descendant spawned in its place. The
    /// descendant does not simulate until the next tick. Living walkers
    /// advance synchronously.
    pub fn step(&mut self) -> TickEvents {
        self.tick += 1;
        let mut events = TickEvents {
            tick: self.tick,
            ..TickEvents::default()
        };
        for index in 0..self.slots.len() {
            if self.slots[index].walker.is_eliminated() {
                if self.elites.add_walker(&self.slots[index].walker) {
                    events.pool_records += 1;
                }
                self.slots[index].body.destroy();
                let genome = self.elites.create_mutated_genome(&mut self.rng);
                let id = self.next_id;
                self.next_id += 1;
                let body = self.builder.build(&genome);
                self.slots[index] = Slot {
                    walker: Walker::new(id, genome, &self.config),
                    body,
                };
                events.replacements += 1;
                continue;
            }
            let slot = &mut self.slots[index];
            slot.walker.simulation_step(slot.body.as_mut(), &self.config);
        }
        events
    }

    /// Ticks completed so far.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Walkers in slot order.
    pub fn walkers(&self) -> impl Iterator<Item = &Walker> {
        self.slots.iter().map(|slot| &slot.walker)
    }

    /// The quality-diversity archive.
    #[must_use]
    pub fn elites(&self) -> &MapElites {
        &self.elites
    }

    /// Mutable access to the archive for live tuning and observer wiring.
    #[must_use]
    pub fn elites_mut(&mut self) -> &mut MapElites {
        &mut self.elites
    }

    /// The configuration the population was built with.
    #[must_use]
    pub fn config(&self) -> &StrideBotsConfig {
        &self.config
    }

    /// Walker snapshots in slot order, for rendering and telemetry.
    #[must_use]
    pub fn snapshot(&self) -> Vec<WalkerSnapshot> {
        self.slots.iter().map(|slot| slot.walker.snapshot()).collect()
    }
}
