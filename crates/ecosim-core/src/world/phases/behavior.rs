use super::super::World;
use crate::agent::{Agent, BehaviorState, Sex};
use crate::config::SimConfig;
use crate::perception::distance;
use crate::reproduction::{conceive, BirthQueue};
use crate::resource::Resource;
use crate::species::SpeciesTemplate;
use rand_chacha::ChaCha12Rng;
use std::collections::HashMap;
use tracing::debug;

/// Mutable state shared by every agent update within one behaviour pass.
struct PassContext<'a> {
    config: &'a SimConfig,
    index_of: &'a HashMap<u32, usize>,
    rng: &'a mut ChaCha12Rng,
    births: &'a mut BirthQueue,
    resources: &'a mut [Resource],
}

impl PassContext<'_> {
    fn lookup(&self, id: u32) -> Option<usize> {
        self.index_of.get(&id).copied()
    }
}

impl World {
    /// Run every agent's state machine once, in population order.
    ///
    /// Decisions read the detected sets from the previous perception pass.
    /// Agents killed earlier in this pass are skipped.
    pub(in crate::world) fn step_behavior_phase(&mut self) {
        let index_of: HashMap<u32, usize> = self
            .agents
            .iter()
            .enumerate()
            .map(|(idx, a)| (a.id, idx))
            .collect();
        let mut ctx = PassContext {
            config: &self.config,
            index_of: &index_of,
            rng: &mut self.rng,
            births: &mut self.birth_queue,
            resources: &mut self.resources,
        };
        for i in 0..self.agents.len() {
            if !self.agents[i].is_alive() {
                continue;
            }
            update_agent(&mut ctx, &mut self.agents, i);
        }
    }
}

fn update_agent(ctx: &mut PassContext<'_>, agents: &mut [Agent], i: usize) {
    let config = ctx.config;
    let Some(template) = config.species(agents[i].species) else {
        return;
    };

    agents[i].age_one_step(config, template);
    let state = choose_state(ctx, agents, i);
    let agent = &mut agents[i];
    agent.state = state;
    agent.tick_cooldown();
    agent.advance_pregnancy(config, template, ctx.rng, ctx.births);
    agent.update_stealth();
    agent.clamp_vitals();
    agent.apply_starvation(config);

    if agents[i].is_alive() {
        match state {
            BehaviorState::Idle | BehaviorState::Wandering => {
                let agent = &mut agents[i];
                agent.set_idle_speed(config);
                agent.wander(ctx.rng, config.max_turn_rate);
                agent.idle_drift(config);
            }
            BehaviorState::LookingForFood if template.herbivore => graze(ctx, &mut agents[i]),
            BehaviorState::LookingForFood => hunt(ctx, agents, i),
            BehaviorState::Fleeing => flee(ctx, agents, i),
            BehaviorState::LookingForPartner => court(ctx, agents, i, template),
        }
    }

    let agent = &mut agents[i];
    if agent.check_old_age() {
        debug!(id = agent.id, species = agent.species, age = agent.age, "reached lifespan");
    }
    agent.clamp_vitals();
}

/// A detected agent that hunts this one and is currently looking for food.
fn is_active_predator(config: &SimConfig, prey: &Agent, other: &Agent) -> bool {
    other.is_alive() && other.state.is_food_seeking() && config.preys_on(other.species, prey.species)
}

fn choose_state(ctx: &PassContext<'_>, agents: &mut [Agent], i: usize) -> BehaviorState {
    let config = ctx.config;
    let me = &agents[i];
    let threatened = me
        .detected_agents
        .iter()
        .filter_map(|&id| ctx.lookup(id))
        .any(|j| is_active_predator(config, me, &agents[j]));

    let me = &mut agents[i];
    me.ready_to_reproduce = false;
    if threatened {
        return BehaviorState::Fleeing;
    }
    if me.hunger < me.max_hunger * 0.5 && me.health > me.max_health * 0.6 {
        me.ready_to_reproduce = true;
        return BehaviorState::LookingForPartner;
    }
    if me.hunger >= me.max_hunger * 0.6 {
        BehaviorState::LookingForFood
    } else {
        BehaviorState::Wandering
    }
}

/// Head for the detected plant with the best yield net of travel cost and
/// take a bite when within reach.
fn graze(ctx: &mut PassContext<'_>, agent: &mut Agent) {
    let config = ctx.config;
    agent.set_idle_speed(config);
    let speed = agent.current_speed;

    let mut best: Option<(usize, f64)> = None;
    for &idx in &agent.detected_resources {
        let Some(plant) = ctx.resources.get(idx) else {
            continue;
        };
        let d = distance(agent.position, plant.position);
        let travel_cost = if d <= 0.0 {
            0.0
        } else if speed > 0.0 {
            d / speed * config.idle_hunger_rate
        } else {
            f64::INFINITY
        };
        let benefit = plant.current_yield - travel_cost;
        if benefit > best.map_or(0.0, |(_, b)| b) {
            best = Some((idx, benefit));
        }
    }

    match best.and_then(|(idx, _)| ctx.resources.get_mut(idx)) {
        Some(plant) => {
            if distance(agent.position, plant.position) <= config.eat_range {
                let eaten = plant.take(config.max_bite);
                agent.hunger -= eaten * config.bite_hunger_ratio;
            }
            agent.move_toward(plant.position, config.max_turn_rate);
        }
        None => agent.wander(ctx.rng, config.max_turn_rate),
    }
    agent.idle_drift(config);
}

/// Pick a prey once, then chase and strike it until it dies or escapes.
fn hunt(ctx: &mut PassContext<'_>, agents: &mut [Agent], i: usize) {
    let config = ctx.config;
    agents[i].set_idle_speed(config);

    if agents[i].hunt_target.is_none() {
        let chosen = choose_prey(ctx, agents, i);
        agents[i].hunt_target = chosen;
    }

    let target_idx = agents[i].hunt_target.and_then(|id| ctx.lookup(id));
    let target_idx = match target_idx {
        Some(j)
            if agents[j].is_alive()
                && distance(agents[i].position, agents[j].position)
                    <= agents[i].traits.detection_range =>
        {
            Some(j)
        }
        _ => {
            agents[i].hunt_target = None;
            None
        }
    };

    match target_idx {
        Some(j) => {
            let target_position = agents[j].position;
            if distance(agents[i].position, target_position) <= config.attack_range {
                let prey = &mut agents[j];
                prey.health = (prey.health - config.attack_damage).max(0.0);
                if !prey.is_alive() {
                    let nutrition = config
                        .species(prey.species)
                        .map_or(0.0, |t| t.nutritional_value);
                    let prey_id = prey.id;
                    let hunter = &mut agents[i];
                    hunter.hunger -= nutrition;
                    hunter.hunt_target = None;
                    debug!(hunter = hunter.id, prey = prey_id, "kill");
                }
            } else {
                let hunter = &mut agents[i];
                hunter.set_boosted_speed(config);
                hunter.move_toward(target_position, config.max_turn_rate);
            }
        }
        None => agents[i].wander(ctx.rng, config.max_turn_rate),
    }
    agents[i].idle_drift(config);
}

fn choose_prey(ctx: &PassContext<'_>, agents: &[Agent], i: usize) -> Option<u32> {
    let config = ctx.config;
    let hunter = &agents[i];
    let speed = hunter.current_speed;
    let mut best: Option<(u32, f64)> = None;
    for j in hunter.detected_agents.iter().filter_map(|&id| ctx.lookup(id)) {
        let prey = &agents[j];
        if !prey.is_alive() || !config.preys_on(hunter.species, prey.species) {
            continue;
        }
        let Some(template) = config.species(prey.species) else {
            continue;
        };
        let d = distance(hunter.position, prey.position);
        let chase_cost = if d <= 0.0 {
            0.0
        } else if speed > 0.0 {
            d / speed * config.exertion_hunger_rate
        } else {
            f64::INFINITY
        };
        let benefit = template.nutritional_value - chase_cost;
        if benefit > best.map_or(0.0, |(_, b)| b) {
            best = Some((prey.id, benefit));
        }
    }
    best.map(|(id, _)| id)
}

/// Run directly away from the centroid of active predators, weighted by
/// their speed over distance.
fn flee(ctx: &mut PassContext<'_>, agents: &mut [Agent], i: usize) {
    let config = ctx.config;
    let me = &agents[i];
    let mut weighted = [0.0f64; 2];
    let mut total_weight = 0.0;
    for j in me.detected_agents.iter().filter_map(|&id| ctx.lookup(id)) {
        let predator = &agents[j];
        if !is_active_predator(config, me, predator) {
            continue;
        }
        let d = distance(me.position, predator.position);
        if d > 0.0 {
            let weight = predator.current_speed / d;
            weighted[0] += predator.position[0] * weight;
            weighted[1] += predator.position[1] * weight;
            total_weight += weight;
        }
    }

    let agent = &mut agents[i];
    if total_weight > 0.0 {
        let centroid = [weighted[0] / total_weight, weighted[1] / total_weight];
        let away = (agent.position[1] - centroid[1]).atan2(agent.position[0] - centroid[0]);
        agent.turn_toward(away, config.max_turn_rate);
        agent.set_boosted_speed(config);
        agent.move_forward();
        agent.hunger += config.exertion_hunger_rate;
    } else {
        agent.set_idle_speed(config);
        agent.wander(ctx.rng, config.max_turn_rate);
        agent.idle_drift(config);
    }
}

/// Whether `a` and `b` may conceive together right now.
fn compatible_mates(a: &Agent, b: &Agent) -> bool {
    a.id != b.id
        && a.species == b.species
        && a.sex != b.sex
        && a.is_alive()
        && b.is_alive()
        && b.ready_to_reproduce
        && a.reproduction_cooldown == 0
        && b.reproduction_cooldown == 0
        && !a.is_pregnant()
        && !b.is_pregnant()
}

/// Approach the nearest compatible mate and conceive once close enough.
fn court(ctx: &mut PassContext<'_>, agents: &mut [Agent], i: usize, template: &SpeciesTemplate) {
    let config = ctx.config;
    let me = &agents[i];
    let mut nearest: Option<(usize, f64)> = None;
    for j in me.detected_agents.iter().filter_map(|&id| ctx.lookup(id)) {
        if !compatible_mates(me, &agents[j]) {
            continue;
        }
        let d = distance(me.position, agents[j].position);
        if nearest.is_none_or(|(_, best)| d < best) {
            nearest = Some((j, d));
        }
    }

    let Some((j, d)) = nearest else {
        let agent = &mut agents[i];
        agent.set_idle_speed(config);
        agent.wander(ctx.rng, config.max_turn_rate);
        agent.idle_drift(config);
        return;
    };

    let partner_position = agents[j].position;
    let agent = &mut agents[i];
    agent.set_idle_speed(config);
    agent.move_toward(partner_position, config.max_turn_rate);
    if d > config.mating_distance {
        return;
    }

    let (carrier, other) = if agents[i].sex == Sex::Female {
        (i, j)
    } else {
        (j, i)
    };
    let litter = conceive(
        ctx.rng,
        config,
        template,
        agents[carrier].position,
        &agents[carrier].traits,
        &agents[other].traits,
    );
    agents[carrier].pregnancy = Some(litter);
    for idx in [i, j] {
        let agent = &mut agents[idx];
        agent.reproduction_cooldown = template.draw_cooldown(ctx.rng);
        agent.ready_to_reproduce = false;
    }
    debug!(
        mother = agents[carrier].id,
        father = agents[other].id,
        species = agents[carrier].species,
        "conceived"
    );
}
