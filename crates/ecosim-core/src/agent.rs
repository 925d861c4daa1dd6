use crate::config::SimConfig;
use crate::constants::WANDER_TURN_TRIALS;
use crate::perception::Observer;
use crate::reproduction::{enqueue_litter, BirthQueue, Litter};
use crate::species::SpeciesTemplate;
use crate::traits::Traits;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use tracing::debug;

/// Behavioural state. `Idle` is only the initial rest state; the per-step
/// transition never selects it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorState {
    #[default]
    Idle,
    Wandering,
    LookingForFood,
    Fleeing,
    LookingForPartner,
}

impl BehaviorState {
    /// Added to the stealth trait while in this state.
    pub fn stealth_adjustment(self) -> f64 {
        match self {
            BehaviorState::Idle | BehaviorState::Wandering => 0.1,
            BehaviorState::LookingForFood | BehaviorState::Fleeing => -0.1,
            BehaviorState::LookingForPartner => 0.0,
        }
    }

    pub fn is_food_seeking(self) -> bool {
        self == BehaviorState::LookingForFood
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

/// Ceiling on the stealth an agent can show.
pub const MAX_CURRENT_STEALTH: f64 = 0.5;

#[derive(Clone, Debug)]
pub struct Agent {
    pub id: u32,
    /// Index into the configured species catalog.
    pub species: usize,
    pub position: [f64; 2],
    /// Heading in radians, kept in `[0, 2π)`.
    pub heading: f64,
    /// Last random turn, which biases the next one toward the same side.
    pub last_turn: f64,
    /// Traits after aging and gestation suppression.
    pub traits: Traits,
    pub current_speed: f64,
    pub current_stealth: f64,
    pub hunger: f64,
    pub max_hunger: f64,
    pub health: f64,
    pub max_health: f64,
    pub age: u32,
    pub death_age: u32,
    pub sex: Sex,
    /// Offspring carried while pregnant.
    pub pregnancy: Option<Litter>,
    /// Whether gestation suppression is currently applied to `traits`.
    pub stats_reduced: bool,
    /// Mating gate; doubles as the birth countdown while pregnant.
    pub reproduction_cooldown: u32,
    pub ready_to_reproduce: bool,
    pub state: BehaviorState,
    pub hunt_target: Option<u32>,
    pub detected_agents: Vec<u32>,
    pub detected_resources: Vec<usize>,
}

impl Agent {
    /// Create an agent with freshly drawn vitals, sex, and life history.
    pub fn spawn<R: Rng + ?Sized>(
        id: u32,
        species: usize,
        position: [f64; 2],
        traits: Traits,
        config: &SimConfig,
        template: &SpeciesTemplate,
        rng: &mut R,
    ) -> Self {
        let max_hunger = config.max_hunger;
        let hunger_fraction = config.initial_hunger_min
            + rng.random::<f64>() * (config.initial_hunger_max - config.initial_hunger_min);
        let max_health = config.base_max_health + rng.random::<f64>() * config.max_health_jitter;
        let sex = if rng.random_bool(0.5) {
            Sex::Male
        } else {
            Sex::Female
        };
        let state = BehaviorState::Idle;
        Self {
            id,
            species,
            position,
            heading: 0.0,
            last_turn: 0.0,
            traits,
            current_speed: traits.speed,
            current_stealth: (traits.stealth + state.stealth_adjustment())
                .clamp(0.0, MAX_CURRENT_STEALTH),
            hunger: hunger_fraction * max_hunger,
            max_hunger,
            health: max_health,
            max_health,
            age: 0,
            death_age: template.draw_death_age(rng),
            sex,
            pregnancy: None,
            stats_reduced: false,
            reproduction_cooldown: template.draw_cooldown(rng),
            ready_to_reproduce: false,
            state,
            hunt_target: None,
            detected_agents: Vec::new(),
            detected_resources: Vec::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn is_pregnant(&self) -> bool {
        self.pregnancy.is_some()
    }

    pub fn observer(&self) -> Observer {
        Observer {
            position: self.position,
            range: self.traits.detection_range,
            skill: self.traits.detection_skill,
        }
    }

    /// One step of senescence: max health decays, traits shrink.
    pub fn age_one_step(&mut self, config: &SimConfig, template: &SpeciesTemplate) {
        let decay = template.health_decay_rate(config.base_health_decay_rate);
        self.max_health = (self.max_health - decay).max(0.0);
        self.health = self.health.min(self.max_health);
        self.traits = self.traits.aged(template.aging_factor);
        if self.max_health <= 0.0 {
            self.health = 0.0;
        }
    }

    pub fn tick_cooldown(&mut self) {
        self.reproduction_cooldown = self.reproduction_cooldown.saturating_sub(1);
    }

    /// Apply gestation suppression and give birth once the countdown is over.
    /// Returns the number of offspring queued this step.
    pub fn advance_pregnancy<R: Rng + ?Sized>(
        &mut self,
        config: &SimConfig,
        template: &SpeciesTemplate,
        rng: &mut R,
        queue: &mut BirthQueue,
    ) -> u32 {
        let Some(litter) = self.pregnancy else {
            return 0;
        };
        let factor = config.gestation_trait_factor;
        if !self.stats_reduced {
            self.traits = self.traits.scaled(factor);
            self.stats_reduced = true;
        }
        if self.reproduction_cooldown > 0 {
            return 0;
        }

        self.traits = self.traits.scaled(1.0 / factor);
        let count = template.draw_litter_size(rng);
        enqueue_litter(queue, self.species, &litter, count);
        debug!(id = self.id, species = self.species, offspring = count, "gave birth");

        self.pregnancy = None;
        self.stats_reduced = false;
        self.reproduction_cooldown = 0;
        count
    }

    pub fn update_stealth(&mut self) {
        self.current_stealth =
            (self.traits.stealth + self.state.stealth_adjustment()).clamp(0.0, MAX_CURRENT_STEALTH);
    }

    pub fn clamp_vitals(&mut self) {
        self.max_health = self.max_health.max(0.0);
        self.health = self.health.clamp(0.0, self.max_health);
        self.hunger = self.hunger.clamp(0.0, self.max_hunger);
    }

    pub fn apply_starvation(&mut self, config: &SimConfig) {
        if self.hunger >= self.max_hunger {
            self.health -= config.starvation_damage;
        }
    }

    /// Forces death once the individual's lifespan is reached, then ages it a step.
    /// Returns whether old age killed it this step.
    pub fn check_old_age(&mut self) -> bool {
        let expired = self.age >= self.death_age;
        if expired {
            self.health = 0.0;
            self.max_health = 0.0;
        }
        self.age = self.age.saturating_add(1);
        expired
    }

    /// Hungrier agents move faster, from the base multiplier up to base plus scale.
    pub fn speed_multiplier(&self, config: &SimConfig) -> f64 {
        let fraction = if self.max_hunger > 0.0 {
            (self.hunger / self.max_hunger).clamp(0.0, 1.0)
        } else {
            0.0
        };
        config.speed_multiplier_base + fraction * config.speed_multiplier_hunger_scale
    }

    pub fn set_idle_speed(&mut self, config: &SimConfig) {
        self.current_speed = self.traits.speed * config.idle_speed * self.speed_multiplier(config);
    }

    pub fn set_boosted_speed(&mut self, config: &SimConfig) {
        self.current_speed =
            self.traits.speed * config.pursuit_speed * self.speed_multiplier(config);
    }

    /// Baseline hunger gain and health regeneration.
    pub fn idle_drift(&mut self, config: &SimConfig) {
        self.hunger += config.idle_hunger_rate;
        self.health += config.idle_health_gain;
    }

    /// Momentum-biased random turn: the turn in degrees is `Binomial(10, p) - 5`
    /// with `p` leaning toward the side of the previous turn.
    pub fn turn_randomly<R: Rng + ?Sized>(&mut self, rng: &mut R, max_turn_rate: f64) {
        let p = if self.last_turn > 0.0 {
            0.7
        } else if self.last_turn < 0.0 {
            0.3
        } else {
            0.5
        };
        let successes = (0..WANDER_TURN_TRIALS).filter(|_| rng.random_bool(p)).count() as f64;
        let half = f64::from(WANDER_TURN_TRIALS) / 2.0;
        let change = ((successes - half).to_radians()).clamp(-max_turn_rate, max_turn_rate);
        self.heading = wrap_heading(self.heading + change);
        self.last_turn = change;
    }

    /// Rate-limited turn toward `angle` along the shorter arc.
    pub fn turn_toward(&mut self, angle: f64, max_turn_rate: f64) {
        let mut diff = (angle - self.heading).rem_euclid(TAU);
        if diff > PI {
            diff -= TAU;
        }
        if diff.abs() > max_turn_rate {
            self.heading += max_turn_rate.copysign(diff);
        } else {
            self.heading = angle;
        }
        self.heading = wrap_heading(self.heading);
    }

    pub fn move_forward(&mut self) {
        self.position[0] += self.heading.cos() * self.current_speed;
        self.position[1] += self.heading.sin() * self.current_speed;
    }

    pub fn move_toward(&mut self, target: [f64; 2], max_turn_rate: f64) {
        let angle = (target[1] - self.position[1]).atan2(target[0] - self.position[0]);
        self.turn_toward(angle, max_turn_rate);
        self.move_forward();
    }

    pub fn wander<R: Rng + ?Sized>(&mut self, rng: &mut R, max_turn_rate: f64) {
        self.turn_randomly(rng, max_turn_rate);
        self.move_forward();
    }
}

/// Normalise an angle into `[0, 2π)`.
pub fn wrap_heading(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}
