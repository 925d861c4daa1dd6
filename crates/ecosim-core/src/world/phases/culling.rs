use super::super::World;
use std::collections::HashSet;
use tracing::debug;

impl World {
    /// Remove agents with no health left and purge every reference to them.
    pub(in crate::world) fn step_culling_phase(&mut self) {
        let dead: HashSet<u32> = self
            .agents
            .iter()
            .filter(|a| !a.is_alive())
            .map(|a| a.id)
            .collect();
        if dead.is_empty() {
            return;
        }

        for agent in self.agents.iter().filter(|a| !a.is_alive()) {
            debug!(id = agent.id, species = agent.species, age = agent.age, "agent died");
            self.lifespans_last_step.push(agent.age);
        }
        self.agents.retain(|a| a.is_alive());

        for agent in &mut self.agents {
            agent.detected_agents.retain(|id| !dead.contains(id));
            if agent.hunt_target.is_some_and(|t| dead.contains(&t)) {
                agent.hunt_target = None;
            }
        }

        self.deaths_last_step += dead.len();
        self.total_deaths += dead.len();
    }
}
