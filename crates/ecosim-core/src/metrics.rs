use crate::agent::{Agent, BehaviorState};
use crate::resource::Resource;
use crate::species::SpeciesTemplate;
use crate::traits::Traits;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: u32,
    pub species: usize,
    pub position: [f64; 2],
    pub health: f64,
    pub hunger: f64,
    pub state: BehaviorState,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub position: [f64; 2],
    #[serde(rename = "yield")]
    pub current_yield: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BirthSnapshot {
    pub id: u32,
    pub species: usize,
    pub traits: Traits,
}

/// Read-only view of the world after a step, for persistence or plotting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub step: usize,
    pub agents: Vec<AgentSnapshot>,
    pub resources: Vec<ResourceSnapshot>,
    /// Agents admitted from the birth queue during this step.
    pub births: Vec<BirthSnapshot>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub population_size: usize,
    pub birth_count: usize,
    pub death_count: usize,
    pub species_counts: Vec<usize>,
    pub herbivore_count: usize,
    pub carnivore_count: usize,
    pub herbivore_hunger_mean: f64,
    pub herbivore_health_mean: f64,
    pub carnivore_hunger_mean: f64,
    pub carnivore_health_mean: f64,
    pub pregnant_count: usize,
    pub resource_total: f64,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub steps: usize,
    pub sample_every: usize,
    pub final_population: usize,
    pub samples: Vec<StepMetrics>,
    /// Ages at death of every agent removed during the run.
    #[serde(default)]
    pub lifespans: Vec<u32>,
    #[serde(default)]
    pub total_births: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<StepSnapshot>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PopulationStats {
    pub population_size: usize,
    pub total_births: usize,
    pub total_deaths: usize,
    pub pending_births: usize,
    pub mean_age: f64,
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Aggregate the live population at the end of `step`.
pub fn collect_step_metrics(
    step: usize,
    births: usize,
    deaths: usize,
    agents: &[Agent],
    resources: &[Resource],
    catalog: &[SpeciesTemplate],
) -> StepMetrics {
    let mut species_counts = vec![0usize; catalog.len()];
    let mut herbivore = (0usize, 0.0f64, 0.0f64);
    let mut carnivore = (0usize, 0.0f64, 0.0f64);
    let mut pregnant_count = 0;

    for agent in agents {
        if let Some(count) = species_counts.get_mut(agent.species) {
            *count += 1;
        }
        let bucket = if catalog.get(agent.species).is_some_and(|t| t.herbivore) {
            &mut herbivore
        } else {
            &mut carnivore
        };
        bucket.0 += 1;
        bucket.1 += agent.hunger;
        bucket.2 += agent.health;
        if agent.is_pregnant() {
            pregnant_count += 1;
        }
    }

    StepMetrics {
        step,
        population_size: agents.len(),
        birth_count: births,
        death_count: deaths,
        species_counts,
        herbivore_count: herbivore.0,
        carnivore_count: carnivore.0,
        herbivore_hunger_mean: mean(herbivore.1, herbivore.0),
        herbivore_health_mean: mean(herbivore.2, herbivore.0),
        carnivore_hunger_mean: mean(carnivore.1, carnivore.0),
        carnivore_health_mean: mean(carnivore.2, carnivore.0),
        pregnant_count,
        resource_total: resources.iter().map(|r| r.current_yield).sum(),
    }
}

pub fn snapshot_agent(agent: &Agent) -> AgentSnapshot {
    AgentSnapshot {
        id: agent.id,
        species: agent.species,
        position: agent.position,
        health: agent.health,
        hunger: agent.hunger,
        state: agent.state,
    }
}

pub fn snapshot_resource(resource: &Resource) -> ResourceSnapshot {
    ResourceSnapshot {
        position: resource.position,
        current_yield: resource.current_yield,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::reproduction::Litter;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn metrics_split_herbivores_and_carnivores() {
        let config = SimConfig::default();
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let traits = Traits::new(1.0, 40.0, 0.2, 0.2);
        let mut agents: Vec<Agent> = [0usize, 0, 6]
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                Agent::spawn(i as u32, s, [0.0, 0.0], traits, &config, &config.species[s], &mut rng)
            })
            .collect();
        agents[0].hunger = 10.0;
        agents[1].hunger = 30.0;
        agents[1].pregnancy = Some(Litter {
            position: [0.0, 0.0],
            traits,
        });
        let mut plant = Resource::new([1.0, 1.0], 50.0);
        plant.current_yield = 12.5;

        let m = collect_step_metrics(4, 1, 2, &agents, &[plant], &config.species);
        assert_eq!(m.step, 4);
        assert_eq!(m.population_size, 3);
        assert_eq!(m.species_counts[0], 2);
        assert_eq!(m.species_counts[6], 1);
        assert_eq!(m.herbivore_count, 2);
        assert_eq!(m.carnivore_count, 1);
        assert!((m.herbivore_hunger_mean - 20.0).abs() < 1e-12);
        assert_eq!(m.pregnant_count, 1);
        assert_eq!(m.resource_total, 12.5);
    }

    #[test]
    fn empty_population_has_zero_means() {
        let m = collect_step_metrics(0, 0, 0, &[], &[], &[]);
        assert_eq!(m.herbivore_hunger_mean, 0.0);
        assert_eq!(m.carnivore_health_mean, 0.0);
    }

    #[test]
    fn run_summary_defaults_missing_fields() {
        let json = r#"{ "steps": 5, "sample_every": 1, "final_population": 2, "samples": [] }"#;
        let summary: RunSummary = serde_json::from_str(json).expect("summary parses");
        assert_eq!(summary.schema_version, 1);
        assert!(summary.lifespans.is_empty());
        assert!(summary.snapshots.is_empty());
    }
}
