use crate::species::{default_catalog, SpeciesTemplate};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Width of the toroidal arena in world units.
    pub arena_width: f64,
    /// Height of the toroidal arena in world units.
    pub arena_height: f64,
    /// Largest heading change (radians) an agent can make in one step.
    pub max_turn_rate: f64,
    /// Speed factor applied while wandering, grazing, or courting.
    pub idle_speed: f64,
    /// Speed factor applied while chasing prey or fleeing.
    pub pursuit_speed: f64,
    /// Hunger-dependent speed multiplier at zero hunger.
    pub speed_multiplier_base: f64,
    /// Extra speed multiplier gained at full hunger.
    pub speed_multiplier_hunger_scale: f64,
    /// Hunger ceiling shared by all agents.
    pub max_hunger: f64,
    /// Lower bound of a new agent's max health.
    pub base_max_health: f64,
    /// Width of the uniform jitter added to `base_max_health`.
    pub max_health_jitter: f64,
    /// Lower bound of a new agent's hunger, as a fraction of `max_hunger`.
    pub initial_hunger_min: f64,
    /// Upper bound (exclusive) of a new agent's hunger, as a fraction of `max_hunger`.
    pub initial_hunger_max: f64,
    /// Per-step hunger increase at rest or low exertion.
    pub idle_hunger_rate: f64,
    /// Per-step hunger increase while fleeing; also prices a prey chase.
    pub exertion_hunger_rate: f64,
    /// Per-step health regeneration at rest or low exertion.
    pub idle_health_gain: f64,
    /// Health lost per step while hunger sits at its ceiling.
    pub starvation_damage: f64,
    /// Config-wide max-health decay per step, scaled by each species' health factor.
    pub base_health_decay_rate: f64,
    /// Distance within which a herbivore can graze a resource.
    pub eat_range: f64,
    /// Largest yield a herbivore removes from a resource in one bite.
    pub max_bite: f64,
    /// Hunger reduction per unit of yield eaten.
    pub bite_hunger_ratio: f64,
    /// Distance within which a predator strikes its target.
    pub attack_range: f64,
    /// Health removed from the target by one strike.
    pub attack_damage: f64,
    /// Constant term of the detection odds before stealth and skill.
    pub detection_base: f64,
    /// Scale applied to the detection odds before distance falloff.
    pub detection_scale: f64,
    /// Distance at which a courting pair conceives.
    pub mating_distance: f64,
    /// Offspring spawn within this offset of the carrying parent on each axis.
    pub offspring_spawn_offset: f64,
    /// Trait multiplier applied for the duration of a pregnancy.
    pub gestation_trait_factor: f64,
    /// Peak magnitude of a heritable trait mutation.
    pub mutation_rate: f64,
    /// Yield each resource regrows per step until saturated.
    pub resource_regrowth: f64,
    /// Species catalog. Index into this list is the species id.
    pub species: Vec<SpeciesTemplate>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            arena_width: 500.0,
            arena_height: 500.0,
            max_turn_rate: PI / 4.0,
            idle_speed: 1.0,
            pursuit_speed: 2.0,
            speed_multiplier_base: 0.7,
            speed_multiplier_hunger_scale: 0.25,
            max_hunger: 100.0,
            base_max_health: 100.0,
            max_health_jitter: 50.0,
            initial_hunger_min: 0.2,
            initial_hunger_max: 0.8,
            idle_hunger_rate: 0.015,
            exertion_hunger_rate: 0.025,
            idle_health_gain: 0.5,
            starvation_damage: 1.0,
            base_health_decay_rate: 0.0,
            eat_range: 1.0,
            max_bite: 80.0,
            bite_hunger_ratio: 0.5,
            attack_range: 3.0,
            attack_damage: 300.0,
            detection_base: 0.5,
            detection_scale: 0.65,
            mating_distance: 3.0,
            offspring_spawn_offset: 5.0,
            gestation_trait_factor: 0.8,
            mutation_rate: 0.175,
            resource_regrowth: 0.05,
            species: default_catalog(),
        }
    }
}

macro_rules! define_sim_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum SimConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for SimConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_sim_config_error! {
    InvalidArenaSize => "arena_width and arena_height must be positive and finite";
    ArenaTooLarge { max: f64, actual: f64 } => "arena dimension ({actual}) exceeds supported maximum ({max})";
    InvalidMaxTurnRate => "max_turn_rate must be finite and within (0, pi]";
    InvalidSpeedFactors => "idle_speed, pursuit_speed and speed multipliers must be finite and non-negative";
    InvalidMaxHunger => "max_hunger must be positive and finite";
    InvalidMaxHealth => "base_max_health must be positive and max_health_jitter non-negative";
    InvalidInitialHunger => "initial_hunger_min/initial_hunger_max must be ordered fractions within [0,1]";
    InvalidVitalRates => "hunger, health and starvation rates must be finite and non-negative";
    InvalidFeeding => "eat_range, max_bite and bite_hunger_ratio must be finite and non-negative";
    InvalidCombat => "attack_range and attack_damage must be finite and non-negative";
    InvalidDetection => "detection_base and detection_scale must be finite and non-negative";
    InvalidMatingDistance => "mating_distance must be finite and non-negative";
    InvalidSpawnOffset => "offspring_spawn_offset must be finite and non-negative";
    InvalidGestationFactor => "gestation_trait_factor must be finite and within (0,1]";
    InvalidMutationRate => "mutation_rate must be finite and non-negative";
    InvalidResourceRegrowth => "resource_regrowth must be finite and non-negative";
    EmptySpeciesCatalog => "species catalog must not be empty";
    InvalidPreyIndex { species: usize, prey: usize } => "species {} lists prey {} outside the catalog", species, prey;
    InvalidTraitLimits { species: usize } => "species {} has unordered or non-finite trait limits", species;
    InvalidMaxLitter { species: usize } => "species {} must allow at least one offspring per litter", species;
    InvalidSpeciesTemplate { species: usize } => "species {} has a non-finite or negative template value", species;
}

impl std::error::Error for SimConfigError {}

fn finite_non_negative(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite() && *v >= 0.0)
}

impl SimConfig {
    pub const MAX_WORLD_SIZE: f64 = crate::constants::MAX_WORLD_SIZE;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_arena()?;
        self.validate_movement()?;
        self.validate_vitals()?;
        self.validate_interactions()?;
        self.validate_reproduction()?;
        self.validate_species()?;
        Ok(())
    }

    /// Template for `species`, if it is in the catalog.
    pub fn species(&self, species: usize) -> Option<&SpeciesTemplate> {
        self.species.get(species)
    }

    /// Whether `predator` may consume `prey` under this catalog.
    pub fn preys_on(&self, predator: usize, prey: usize) -> bool {
        crate::species::preys_on(&self.species, predator, prey)
    }

    fn validate_arena(&self) -> Result<(), SimConfigError> {
        for dim in [self.arena_width, self.arena_height] {
            if !(dim.is_finite() && dim > 0.0) {
                return Err(SimConfigError::InvalidArenaSize);
            }
            if dim > Self::MAX_WORLD_SIZE {
                return Err(SimConfigError::ArenaTooLarge {
                    max: Self::MAX_WORLD_SIZE,
                    actual: dim,
                });
            }
        }
        Ok(())
    }

    fn validate_movement(&self) -> Result<(), SimConfigError> {
        if !(self.max_turn_rate.is_finite() && self.max_turn_rate > 0.0 && self.max_turn_rate <= PI)
        {
            return Err(SimConfigError::InvalidMaxTurnRate);
        }
        if !finite_non_negative(&[
            self.idle_speed,
            self.pursuit_speed,
            self.speed_multiplier_base,
            self.speed_multiplier_hunger_scale,
        ]) {
            return Err(SimConfigError::InvalidSpeedFactors);
        }
        Ok(())
    }

    fn validate_vitals(&self) -> Result<(), SimConfigError> {
        if !(self.max_hunger.is_finite() && self.max_hunger > 0.0) {
            return Err(SimConfigError::InvalidMaxHunger);
        }
        if !(self.base_max_health.is_finite()
            && self.base_max_health > 0.0
            && self.max_health_jitter.is_finite()
            && self.max_health_jitter >= 0.0)
        {
            return Err(SimConfigError::InvalidMaxHealth);
        }
        if !(self.initial_hunger_min.is_finite()
            && self.initial_hunger_max.is_finite()
            && 0.0 <= self.initial_hunger_min
            && self.initial_hunger_min <= self.initial_hunger_max
            && self.initial_hunger_max <= 1.0)
        {
            return Err(SimConfigError::InvalidInitialHunger);
        }
        if !finite_non_negative(&[
            self.idle_hunger_rate,
            self.exertion_hunger_rate,
            self.idle_health_gain,
            self.starvation_damage,
            self.base_health_decay_rate,
        ]) {
            return Err(SimConfigError::InvalidVitalRates);
        }
        Ok(())
    }

    fn validate_interactions(&self) -> Result<(), SimConfigError> {
        if !finite_non_negative(&[self.eat_range, self.max_bite, self.bite_hunger_ratio]) {
            return Err(SimConfigError::InvalidFeeding);
        }
        if !finite_non_negative(&[self.attack_range, self.attack_damage]) {
            return Err(SimConfigError::InvalidCombat);
        }
        if !finite_non_negative(&[self.detection_base, self.detection_scale]) {
            return Err(SimConfigError::InvalidDetection);
        }
        if !finite_non_negative(&[self.resource_regrowth]) {
            return Err(SimConfigError::InvalidResourceRegrowth);
        }
        Ok(())
    }

    fn validate_reproduction(&self) -> Result<(), SimConfigError> {
        if !finite_non_negative(&[self.mating_distance]) {
            return Err(SimConfigError::InvalidMatingDistance);
        }
        if !finite_non_negative(&[self.offspring_spawn_offset]) {
            return Err(SimConfigError::InvalidSpawnOffset);
        }
        if !(self.gestation_trait_factor.is_finite()
            && self.gestation_trait_factor > 0.0
            && self.gestation_trait_factor <= 1.0)
        {
            return Err(SimConfigError::InvalidGestationFactor);
        }
        if !finite_non_negative(&[self.mutation_rate]) {
            return Err(SimConfigError::InvalidMutationRate);
        }
        Ok(())
    }

    fn validate_species(&self) -> Result<(), SimConfigError> {
        if self.species.is_empty() {
            return Err(SimConfigError::EmptySpeciesCatalog);
        }
        let count = self.species.len();
        for (idx, template) in self.species.iter().enumerate() {
            if let Some(&prey) = template.prey.iter().find(|&&p| p >= count) {
                return Err(SimConfigError::InvalidPreyIndex {
                    species: idx,
                    prey,
                });
            }
            if !template.trait_limits.is_ordered() {
                return Err(SimConfigError::InvalidTraitLimits { species: idx });
            }
            if template.max_litter == 0 {
                return Err(SimConfigError::InvalidMaxLitter { species: idx });
            }
            if !(template.multipliers.is_finite()
                && template.multipliers.is_non_negative()
                && finite_non_negative(&[
                    template.health_factor,
                    template.aging_factor,
                    template.nutritional_value,
                ])
                && template.aging_factor <= 1.0)
            {
                return Err(SimConfigError::InvalidSpeciesTemplate { species: idx });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_default() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_invalid_arena_size() {
        let config = SimConfig {
            arena_width: 0.0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidArenaSize));

        let config = SimConfig {
            arena_height: f64::NAN,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidArenaSize));

        let config = SimConfig {
            arena_width: SimConfig::MAX_WORLD_SIZE + 1.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::ArenaTooLarge { .. })
        ));
    }

    #[test]
    fn validate_rejects_empty_catalog() {
        let config = SimConfig {
            species: Vec::new(),
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::EmptySpeciesCatalog));
    }

    #[test]
    fn validate_rejects_prey_outside_catalog() {
        let mut config = SimConfig::default();
        config.species[6].prey.push(10);
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidPreyIndex {
                species: 6,
                prey: 10
            })
        );
    }

    #[test]
    fn validate_rejects_zero_litter() {
        let mut config = SimConfig::default();
        config.species[2].max_litter = 0;
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidMaxLitter { species: 2 })
        );
    }

    #[test]
    fn validate_rejects_gestation_factor_out_of_range() {
        let config = SimConfig {
            gestation_trait_factor: 0.0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidGestationFactor));
    }

    #[test]
    fn partial_config_json_deserializes_with_defaults() {
        let partial_json = r#"{
            "seed": 7,
            "arena_width": 200.0,
            "arena_height": 120.0
        }"#;
        let cfg: SimConfig = serde_json::from_str(partial_json).expect("partial config should parse");
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.species.len(), 10);
        assert_eq!(cfg.attack_damage, 300.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn species_template_fields_default_individually() {
        let json = r#"{ "species": [ { "name": "Vole", "max_litter": 4 } ] }"#;
        let cfg: SimConfig = serde_json::from_str(json).expect("species subset should parse");
        assert_eq!(cfg.species.len(), 1);
        assert_eq!(cfg.species[0].name, "Vole");
        assert_eq!(cfg.species[0].max_litter, 4);
        assert!(cfg.species[0].herbivore);
        assert!(cfg.validate().is_ok());
    }
}
