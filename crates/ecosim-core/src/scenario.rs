use crate::config::SimConfig;
use crate::traits::Traits;
use crate::world::{AgentSeed, ResourceSeed};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Initial population layout: how many animals and plants, which species,
/// and how their starting traits are drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub num_animals: usize,
    pub num_plants: usize,
    /// Relative spawn weight per catalog entry.
    pub species_weights: Vec<u32>,
    /// Animals spawn at least this far from every arena edge.
    pub spawn_margin: f64,
    pub base_speed_min: f64,
    pub base_speed_spread: f64,
    pub base_detection_range: f64,
    pub base_stealth_spread: f64,
    pub base_skill_spread: f64,
    pub plant_max_yield_min: f64,
    pub plant_max_yield_spread: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let mut species_weights = vec![0; 10];
        species_weights[0] = 150;
        species_weights[1] = 150;
        Self {
            num_animals: 50,
            num_plants: 50,
            species_weights,
            spawn_margin: 222.0,
            base_speed_min: 0.6,
            base_speed_spread: 100.0 / 130.0,
            base_detection_range: 40.0,
            base_stealth_spread: 0.25,
            base_skill_spread: 0.25,
            plant_max_yield_min: 75.0,
            plant_max_yield_spread: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioError {
    WeightCountMismatch { expected: usize, actual: usize },
    ZeroTotalWeight,
    InvalidSpawnMargin,
    InvalidTraitRanges,
    InvalidPlantYield,
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::WeightCountMismatch { expected, actual } => write!(
                f,
                "species_weights has {actual} entries but the catalog has {expected} species"
            ),
            ScenarioError::ZeroTotalWeight => {
                write!(f, "species_weights must contain at least one positive weight")
            }
            ScenarioError::InvalidSpawnMargin => write!(
                f,
                "spawn_margin must be finite, non-negative and less than half the arena"
            ),
            ScenarioError::InvalidTraitRanges => {
                write!(f, "base trait parameters must be finite and non-negative")
            }
            ScenarioError::InvalidPlantYield => {
                write!(f, "plant yield parameters must be finite and non-negative")
            }
        }
    }
}

impl Error for ScenarioError {}

impl ScenarioConfig {
    pub fn validate(&self, sim: &SimConfig) -> Result<(), ScenarioError> {
        if self.species_weights.len() != sim.species.len() {
            return Err(ScenarioError::WeightCountMismatch {
                expected: sim.species.len(),
                actual: self.species_weights.len(),
            });
        }
        if self.species_weights.iter().all(|&w| w == 0) {
            return Err(ScenarioError::ZeroTotalWeight);
        }
        let half_extent = sim.arena_width.min(sim.arena_height) / 2.0;
        if !(self.spawn_margin.is_finite()
            && self.spawn_margin >= 0.0
            && self.spawn_margin < half_extent)
        {
            return Err(ScenarioError::InvalidSpawnMargin);
        }
        let traits = [
            self.base_speed_min,
            self.base_speed_spread,
            self.base_detection_range,
            self.base_stealth_spread,
            self.base_skill_spread,
        ];
        if !traits.iter().all(|v| v.is_finite() && *v >= 0.0) {
            return Err(ScenarioError::InvalidTraitRanges);
        }
        if !(self.plant_max_yield_min.is_finite()
            && self.plant_max_yield_min >= 0.0
            && self.plant_max_yield_spread.is_finite()
            && self.plant_max_yield_spread >= 0.0)
        {
            return Err(ScenarioError::InvalidPlantYield);
        }
        Ok(())
    }

    /// Draw the initial animals and plants for `sim`'s arena and catalog.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        sim: &SimConfig,
        rng: &mut R,
    ) -> Result<(Vec<AgentSeed>, Vec<ResourceSeed>), ScenarioError> {
        self.validate(sim)?;
        let total_weight: u64 = self.species_weights.iter().map(|&w| u64::from(w)).sum();

        let margin = self.spawn_margin;
        let span_x = sim.arena_width - 2.0 * margin;
        let span_y = sim.arena_height - 2.0 * margin;

        let agents = (0..self.num_animals)
            .map(|_| {
                let species = pick_weighted(&self.species_weights, total_weight, rng);
                let seed = Traits::new(
                    self.base_speed_min + rng.random::<f64>() * self.base_speed_spread,
                    self.base_detection_range,
                    rng.random::<f64>() * self.base_stealth_spread,
                    rng.random::<f64>() * self.base_skill_spread,
                );
                let position = [
                    margin + rng.random::<f64>() * span_x,
                    margin + rng.random::<f64>() * span_y,
                ];
                AgentSeed {
                    species,
                    position,
                    traits: seed.times(sim.species[species].multipliers),
                }
            })
            .collect();

        let resources = (0..self.num_plants)
            .map(|_| ResourceSeed {
                position: [
                    rng.random::<f64>() * sim.arena_width,
                    rng.random::<f64>() * sim.arena_height,
                ],
                max_yield: self.plant_max_yield_min
                    + rng.random::<f64>() * self.plant_max_yield_spread,
            })
            .collect();

        Ok((agents, resources))
    }
}

fn pick_weighted<R: Rng + ?Sized>(weights: &[u32], total: u64, rng: &mut R) -> usize {
    let mut roll = rng.random_range(0..total);
    for (idx, &w) in weights.iter().enumerate() {
        let w = u64::from(w);
        if roll < w {
            return idx;
        }
        roll -= w;
    }
    weights.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn default_scenario_spawns_only_weighted_species_inside_margin() {
        let sim = SimConfig::default();
        let scenario = ScenarioConfig::default();
        let mut rng = ChaCha12Rng::seed_from_u64(42);
        let (agents, plants) = scenario.generate(&sim, &mut rng).expect("valid scenario");
        assert_eq!(agents.len(), 50);
        assert_eq!(plants.len(), 50);
        for seed in &agents {
            assert!(seed.species <= 1);
            assert!(seed.position[0] >= 222.0 && seed.position[0] <= 278.0);
            assert!(seed.position[1] >= 222.0 && seed.position[1] <= 278.0);
            assert!((seed.traits.detection_range - 40.0).abs() < 1e-12);
            // Rabbit and Deer share multipliers.
            assert!(seed.traits.speed >= 0.6 * 1.7);
            assert!(seed.traits.stealth < 0.25 * 1.8);
        }
        for plant in &plants {
            assert!(plant.max_yield >= 75.0 && plant.max_yield < 125.0);
        }
    }

    #[test]
    fn validate_rejects_weight_mismatch_and_zero_weights() {
        let sim = SimConfig::default();
        let short = ScenarioConfig {
            species_weights: vec![1, 1],
            ..ScenarioConfig::default()
        };
        assert_eq!(
            short.validate(&sim),
            Err(ScenarioError::WeightCountMismatch {
                expected: 10,
                actual: 2
            })
        );
        let zero = ScenarioConfig {
            species_weights: vec![0; 10],
            ..ScenarioConfig::default()
        };
        assert_eq!(zero.validate(&sim), Err(ScenarioError::ZeroTotalWeight));
    }

    #[test]
    fn validate_rejects_margin_covering_arena() {
        let sim = SimConfig::default();
        let scenario = ScenarioConfig {
            spawn_margin: 250.0,
            ..ScenarioConfig::default()
        };
        assert_eq!(scenario.validate(&sim), Err(ScenarioError::InvalidSpawnMargin));
    }

    #[test]
    fn weighted_pick_respects_zero_weights() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let weights = [0, 5, 0, 5];
        for _ in 0..500 {
            let idx = pick_weighted(&weights, 10, &mut rng);
            assert!(idx == 1 || idx == 3);
        }
    }
}
