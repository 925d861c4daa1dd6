use crate::agent::Agent;
use crate::config::{SimConfig, SimConfigError};
use crate::metrics::{
    collect_step_metrics, snapshot_agent, snapshot_resource, BirthSnapshot, PopulationStats,
    RunSummary, StepMetrics, StepSnapshot,
};
use crate::reproduction::{BirthQueue, BirthRecord};
use crate::resource::Resource;
use crate::rng::create_rng;
use crate::spatial::{NodeRegion, QuadTree, Rect};
use crate::traits::Traits;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use std::{error::Error, fmt};

/// Initial animal supplied by the population source.
///
/// `traits` are final values: species multipliers are already applied.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSeed {
    pub species: usize,
    pub position: [f64; 2],
    pub traits: Traits,
}

/// Initial plant. It starts empty and regrows toward `max_yield`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceSeed {
    pub position: [f64; 2],
    pub max_yield: f64,
}

#[derive(Clone, Debug)]
pub struct StepTimings {
    pub birth_us: u64,
    pub spatial_build_us: u64,
    pub cull_us: u64,
    pub behavior_us: u64,
    pub perception_us: u64,
    pub environment_us: u64,
    pub total_us: u64,
}

pub struct World {
    pub agents: Vec<Agent>,
    resources: Vec<Resource>,
    config: SimConfig,
    rng: ChaCha12Rng,
    agent_index: QuadTree<u32>,
    resource_index: QuadTree<usize>,
    birth_queue: BirthQueue,
    next_agent_id: u32,
    step_index: usize,
    births_last_step: Vec<BirthSnapshot>,
    deaths_last_step: usize,
    total_births: usize,
    total_deaths: usize,
    total_agent_id_exhaustions: usize,
    lifespans_last_step: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(SimConfigError),
    UnknownSpecies { index: usize, species: usize },
    InvalidAgentSeed { index: usize },
    InvalidResource { index: usize },
    AgentIdOverflow { max: usize, actual: usize },
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{}", e),
            WorldInitError::UnknownSpecies { index, species } => write!(
                f,
                "agent seed {index} names species {species}, which is not in the catalog"
            ),
            WorldInitError::InvalidAgentSeed { index } => write!(
                f,
                "agent seed {index} must have a finite position and finite, non-negative traits"
            ),
            WorldInitError::InvalidResource { index } => write!(
                f,
                "resource seed {index} must have a finite position and a finite, non-negative max yield"
            ),
            WorldInitError::AgentIdOverflow { max, actual } => {
                write!(f, "agent count ({actual}) exceeds supported maximum ({max})")
            }
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    InvalidSampleEvery,
    TooManySteps { max: usize, actual: usize },
    TooManySamples { max: usize, actual: usize },
    TooManySnapshots { max: usize, actual: usize },
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            ExperimentError::TooManySteps { max, actual } => {
                write!(f, "steps ({actual}) exceed supported maximum ({max})")
            }
            ExperimentError::TooManySamples { max, actual } => {
                write!(
                    f,
                    "sample count ({actual}) exceeds supported maximum ({max})"
                )
            }
            ExperimentError::TooManySnapshots { max, actual } => {
                write!(
                    f,
                    "snapshot count ({actual}) exceeds supported maximum ({max})"
                )
            }
        }
    }
}

impl Error for ExperimentError {}

fn finite_point(p: [f64; 2]) -> bool {
    p[0].is_finite() && p[1].is_finite()
}

impl World {
    pub const MAX_EXPERIMENT_STEPS: usize = crate::constants::MAX_EXPERIMENT_STEPS;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;
    pub const MAX_EXPERIMENT_SNAPSHOTS: usize = 1_000;

    pub fn new(
        config: SimConfig,
        agents: Vec<AgentSeed>,
        resources: Vec<ResourceSeed>,
    ) -> Result<Self, WorldInitError> {
        config.validate()?;
        if agents.len() >= u32::MAX as usize {
            return Err(WorldInitError::AgentIdOverflow {
                max: u32::MAX as usize - 1,
                actual: agents.len(),
            });
        }
        for (index, seed) in agents.iter().enumerate() {
            if config.species(seed.species).is_none() {
                return Err(WorldInitError::UnknownSpecies {
                    index,
                    species: seed.species,
                });
            }
            if !(finite_point(seed.position)
                && seed.traits.is_finite()
                && seed.traits.is_non_negative())
            {
                return Err(WorldInitError::InvalidAgentSeed { index });
            }
        }
        for (index, seed) in resources.iter().enumerate() {
            if !(finite_point(seed.position) && seed.max_yield.is_finite() && seed.max_yield >= 0.0)
            {
                return Err(WorldInitError::InvalidResource { index });
            }
        }

        let mut rng = create_rng(config.seed);
        let population: Vec<Agent> = agents
            .iter()
            .enumerate()
            .map(|(id, seed)| {
                Agent::spawn(
                    id as u32,
                    seed.species,
                    seed.position,
                    seed.traits,
                    &config,
                    &config.species[seed.species],
                    &mut rng,
                )
            })
            .collect();
        let resources: Vec<Resource> = resources
            .iter()
            .map(|seed| Resource::new(seed.position, seed.max_yield))
            .collect();

        let bounds = Rect::new(0.0, 0.0, config.arena_width, config.arena_height);
        let mut world = Self {
            next_agent_id: population.len() as u32,
            agents: population,
            resources,
            config,
            rng,
            agent_index: QuadTree::new(bounds),
            resource_index: QuadTree::new(bounds),
            birth_queue: BirthQueue::new(),
            step_index: 0,
            births_last_step: Vec::new(),
            deaths_last_step: 0,
            total_births: 0,
            total_deaths: 0,
            total_agent_id_exhaustions: 0,
            lifespans_last_step: Vec::new(),
        };
        world.rebuild_indexes();
        world.step_perception_phase();
        Ok(world)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut [Resource] {
        &mut self.resources
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn pending_births(&self) -> usize {
        self.birth_queue.len()
    }

    pub fn agent(&self, id: u32) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn agent_mut(&mut self, id: u32) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    /// Queue a birth directly, bypassing gestation.
    pub fn enqueue_birth(&mut self, record: BirthRecord) {
        self.birth_queue.push(record);
    }

    pub fn population_stats(&self) -> PopulationStats {
        let n = self.agents.len();
        let age_sum: f64 = self.agents.iter().map(|a| f64::from(a.age)).sum();
        PopulationStats {
            population_size: n,
            total_births: self.total_births,
            total_deaths: self.total_deaths,
            pending_births: self.birth_queue.len(),
            mean_age: if n > 0 { age_sum / n as f64 } else { 0.0 },
        }
    }

    /// Partition of the agent index as of the last rebuild.
    pub fn index_regions(&self) -> Vec<NodeRegion> {
        self.agent_index.regions()
    }

    /// Ages of the agents removed in the last step.
    pub fn last_step_lifespans(&self) -> &[u32] {
        &self.lifespans_last_step
    }

    pub fn total_agent_id_exhaustions(&self) -> usize {
        self.total_agent_id_exhaustions
    }

    /// Read-only view of the current population, resources, and this step's births.
    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            step: self.step_index,
            agents: self.agents.iter().map(snapshot_agent).collect(),
            resources: self.resources.iter().map(snapshot_resource).collect(),
            births: self.births_last_step.clone(),
        }
    }

    pub fn step_metrics(&self) -> StepMetrics {
        collect_step_metrics(
            self.step_index,
            self.births_last_step.len(),
            self.deaths_last_step,
            &self.agents,
            &self.resources,
            &self.config.species,
        )
    }

    fn next_agent_id_checked(&mut self) -> Option<u32> {
        if self.next_agent_id == u32::MAX {
            return None;
        }
        let id = self.next_agent_id;
        self.next_agent_id += 1;
        Some(id)
    }

    fn rebuild_indexes(&mut self) {
        self.agent_index
            .rebuild(self.agents.iter().map(|a| (a.id, a.position)));
        self.resource_index.rebuild(
            self.resources
                .iter()
                .enumerate()
                .map(|(idx, r)| (idx, r.position)),
        );
    }

    #[cfg(test)]
    pub fn run_experiment(&mut self, steps: usize, sample_every: usize) -> RunSummary {
        self.try_run_experiment(steps, sample_every)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        self.try_run_experiment_with_snapshots(steps, sample_every, &[])
    }

    /// Run `steps` steps, sampling metrics every `sample_every` steps (and at the
    /// last step) and taking a full snapshot after each step in `snapshot_steps`.
    pub fn try_run_experiment_with_snapshots(
        &mut self,
        steps: usize,
        sample_every: usize,
        snapshot_steps: &[usize],
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        if snapshot_steps.len() > Self::MAX_EXPERIMENT_SNAPSHOTS {
            return Err(ExperimentError::TooManySnapshots {
                max: Self::MAX_EXPERIMENT_SNAPSHOTS,
                actual: snapshot_steps.len(),
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }

        let mut lifespans = Vec::new();
        let births_before = self.total_births;
        let mut samples = Vec::with_capacity(estimated_samples);
        let mut snapshots = Vec::with_capacity(snapshot_steps.len());
        let snapshot_steps_set: HashSet<usize> = snapshot_steps.iter().copied().collect();

        for step in 1..=steps {
            self.step();
            lifespans.extend_from_slice(&self.lifespans_last_step);
            if step % sample_every == 0 || step == steps {
                let mut metrics = self.step_metrics();
                metrics.step = step;
                samples.push(metrics);
            }
            if snapshot_steps_set.contains(&step) {
                let mut snapshot = self.snapshot();
                snapshot.step = step;
                snapshots.push(snapshot);
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            steps,
            sample_every,
            final_population: self.agents.len(),
            samples,
            lifespans,
            total_births: self.total_births - births_before,
            snapshots,
        })
    }

    /// Advance one step: admit births, rebuild the index, cull the dead,
    /// update every agent, requery perception, regrow plants, wrap positions.
    pub fn step(&mut self) -> StepTimings {
        let total_start = Instant::now();
        self.step_index = self.step_index.saturating_add(1);
        self.births_last_step.clear();
        self.lifespans_last_step.clear();
        self.deaths_last_step = 0;

        let t0 = Instant::now();
        self.step_births_phase();
        let birth_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        self.rebuild_indexes();
        let spatial_build_us = t1.elapsed().as_micros() as u64;

        let t2 = Instant::now();
        self.step_culling_phase();
        let cull_us = t2.elapsed().as_micros() as u64;

        let t3 = Instant::now();
        self.step_behavior_phase();
        let behavior_us = t3.elapsed().as_micros() as u64;

        let t4 = Instant::now();
        self.rebuild_indexes();
        self.step_perception_phase();
        let perception_us = t4.elapsed().as_micros() as u64;

        let t5 = Instant::now();
        self.step_environment_phase();
        let environment_us = t5.elapsed().as_micros() as u64;

        tracing::trace!(
            step = self.step_index,
            population = self.agents.len(),
            births = self.births_last_step.len(),
            deaths = self.deaths_last_step,
            "step complete"
        );

        StepTimings {
            birth_us,
            spatial_build_us,
            cull_us,
            behavior_us,
            perception_us,
            environment_us,
            total_us: total_start.elapsed().as_micros() as u64,
        }
    }
}

mod phases;
