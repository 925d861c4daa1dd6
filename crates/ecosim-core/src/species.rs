use crate::traits::Traits;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Allowed band for each heritable trait of a species.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraitLimits {
    pub min: Traits,
    pub max: Traits,
}

impl Default for TraitLimits {
    fn default() -> Self {
        Self {
            min: Traits::new(0.0, 0.0, 0.0, 0.0),
            max: Traits::new(10.0, 10.0, 10.0, 10.0),
        }
    }
}

impl TraitLimits {
    pub fn is_ordered(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min.speed <= self.max.speed
            && self.min.detection_range <= self.max.detection_range
            && self.min.stealth <= self.max.stealth
            && self.min.detection_skill <= self.max.detection_skill
    }
}

/// Per-species template. Multipliers scale the seed traits supplied at creation;
/// the remaining fields drive life history and the food chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesTemplate {
    pub name: String,
    /// Seed-trait multipliers (speed, detection range, stealth, detection skill).
    pub multipliers: Traits,
    /// Scales the config-wide base max-health decay rate.
    pub health_factor: f64,
    /// Fraction of each trait lost per step of aging.
    pub aging_factor: f64,
    pub reproduction_cooldown_base: u32,
    pub reproduction_cooldown_jitter: u32,
    pub lifespan_base: u32,
    pub lifespan_jitter: u32,
    /// Upper bound on offspring per litter (at least 1).
    pub max_litter: u32,
    /// Hunger removed from a predator that kills this species.
    pub nutritional_value: f64,
    /// Whether this species feeds on plants.
    pub herbivore: bool,
    /// Catalog indices of species this one hunts.
    pub prey: Vec<usize>,
    pub trait_limits: TraitLimits,
}

impl Default for SpeciesTemplate {
    fn default() -> Self {
        Self {
            name: String::from("Unnamed"),
            multipliers: Traits::new(1.0, 1.0, 1.0, 1.0),
            health_factor: 1.0,
            aging_factor: 0.0,
            reproduction_cooldown_base: 1000,
            reproduction_cooldown_jitter: 1000,
            lifespan_base: 15_000,
            lifespan_jitter: 3300,
            max_litter: 1,
            nutritional_value: 50.0,
            herbivore: true,
            prey: Vec::new(),
            trait_limits: TraitLimits::default(),
        }
    }
}

impl SpeciesTemplate {
    /// Per-step max-health loss for this species.
    pub fn health_decay_rate(&self, base_rate: f64) -> f64 {
        base_rate * self.health_factor
    }

    pub fn hunts(&self, prey_species: usize) -> bool {
        self.prey.contains(&prey_species)
    }

    /// Fresh reproduction cooldown: base plus `U[0, jitter)`.
    pub fn draw_cooldown<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        jittered(rng, self.reproduction_cooldown_base, self.reproduction_cooldown_jitter)
    }

    /// Step count at which an individual dies of old age.
    pub fn draw_death_age<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        jittered(rng, self.lifespan_base, self.lifespan_jitter)
    }

    /// Offspring per birth, uniform in `1..=max_litter`.
    pub fn draw_litter_size<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.random_range(1..=self.max_litter.max(1))
    }
}

fn jittered<R: Rng + ?Sized>(rng: &mut R, base: u32, jitter: u32) -> u32 {
    if jitter == 0 {
        return base;
    }
    base.saturating_add(rng.random_range(0..jitter))
}

/// Whether `predator` may consume `prey`. Unknown indices never prey.
pub fn preys_on(catalog: &[SpeciesTemplate], predator: usize, prey: usize) -> bool {
    catalog.get(predator).is_some_and(|t| t.hunts(prey))
}

#[allow(clippy::too_many_arguments)]
fn template(
    name: &str,
    speed: f64,
    stealth: f64,
    detection_skill: f64,
    health_factor: f64,
    cooldown: (u32, u32),
    lifespan: (u32, u32),
    nutritional_value: f64,
    herbivore: bool,
    prey: &[usize],
) -> SpeciesTemplate {
    SpeciesTemplate {
        name: name.to_string(),
        multipliers: Traits::new(speed, 1.0, stealth, detection_skill),
        health_factor,
        reproduction_cooldown_base: cooldown.0,
        reproduction_cooldown_jitter: cooldown.1,
        lifespan_base: lifespan.0,
        lifespan_jitter: lifespan.1,
        nutritional_value,
        herbivore,
        prey: prey.to_vec(),
        ..SpeciesTemplate::default()
    }
}

/// The ten-species forest catalog: four herbivores, two omnivore slots that
/// graze, and four carnivores.
pub fn default_catalog() -> Vec<SpeciesTemplate> {
    const SMALL: (u32, u32) = (4000, 1000);
    const LONG: (u32, u32) = (15_000, 3300);
    vec![
        template("Rabbit", 1.7, 1.8, 1.5, 0.5, (1700, 300), (8000, 800), 105.0, true, &[]),
        template("Deer", 1.7, 1.8, 1.5, 0.5, (1700, 300), (8000, 800), 105.0, true, &[]),
        template("Squirrel", 1.3, 1.6, 1.1, 0.6, SMALL, LONG, 5.0, true, &[]),
        template("Elk", 1.2, 1.4, 1.2, 0.9, SMALL, LONG, 50.0, true, &[]),
        template("Raccoon", 1.2, 1.7, 1.4, 0.7, SMALL, LONG, 5.0, true, &[]),
        template("Wild Pig", 1.32, 1.3, 1.5, 0.9, SMALL, LONG, 55.0, true, &[]),
        template("Fox", 1.7, 1.9, 1.0, 0.7, (3500, 1000), LONG, 35.0, false, &[0, 1, 2, 4]),
        template("Wolf", 1.25, 1.6, 1.0, 0.8, SMALL, LONG, 55.0, false, &[0, 1, 2, 3, 4, 6]),
        template(
            "Bear",
            1.2,
            1.2,
            1.0,
            1.0,
            SMALL,
            LONG,
            60.0,
            false,
            &[0, 1, 2, 3, 4, 5, 6, 7, 9],
        ),
        template("Lynx", 1.3, 1.8, 1.0, 0.8, SMALL, LONG, 20.0, false, &[0, 1, 2, 3, 4, 5, 6]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_food_chain_is_asymmetric() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 10);
        // Fox (6) eats Rabbit (0); Rabbit never eats Fox.
        assert!(preys_on(&catalog, 6, 0));
        assert!(!preys_on(&catalog, 0, 6));
        // Bear (8) eats Wolf (7) but not another Bear.
        assert!(preys_on(&catalog, 8, 7));
        assert!(!preys_on(&catalog, 8, 8));
    }

    #[test]
    fn preys_on_tolerates_unknown_indices() {
        let catalog = default_catalog();
        assert!(!preys_on(&catalog, 42, 0));
        assert!(!preys_on(&catalog, 6, 42));
    }

    #[test]
    fn herbivores_have_no_prey() {
        for species in default_catalog() {
            if species.herbivore {
                assert!(species.prey.is_empty(), "{} should graze only", species.name);
            }
        }
    }

    #[test]
    fn draws_stay_within_jitter_window() {
        use rand::SeedableRng;
        let mut rng = rand_chacha::ChaCha12Rng::seed_from_u64(5);
        let fox = &default_catalog()[6];
        for _ in 0..200 {
            let c = fox.draw_cooldown(&mut rng);
            assert!((3500..4500).contains(&c));
            let n = fox.draw_litter_size(&mut rng);
            assert_eq!(n, 1);
        }
        let fixed = SpeciesTemplate {
            lifespan_jitter: 0,
            ..SpeciesTemplate::default()
        };
        assert_eq!(fixed.draw_death_age(&mut rng), fixed.lifespan_base);
    }

    #[test]
    fn default_limits_are_ordered() {
        assert!(TraitLimits::default().is_ordered());
        let inverted = TraitLimits {
            min: Traits::new(2.0, 0.0, 0.0, 0.0),
            max: Traits::new(1.0, 10.0, 10.0, 10.0),
        };
        assert!(!inverted.is_ordered());
    }
}
