use super::super::World;
use crate::perception::{perceive_agents, perceive_resources, Candidate};
use std::collections::HashMap;

impl World {
    /// Refresh every agent's detected sets from the freshly rebuilt indexes.
    ///
    /// All rolls read positions and stealth as they stand after the behaviour
    /// pass; nothing here moves an agent.
    pub(in crate::world) fn step_perception_phase(&mut self) {
        let lookup: HashMap<u32, ([f64; 2], f64)> = self
            .agents
            .iter()
            .map(|a| (a.id, (a.position, a.current_stealth)))
            .collect();

        for agent in &mut self.agents {
            let observer = agent.observer();
            let candidates = self
                .agent_index
                .query_radius(observer.position, observer.range, Some(agent.id))
                .into_iter()
                .filter_map(|id| {
                    lookup.get(&id).map(|&(position, stealth)| Candidate {
                        id,
                        position,
                        stealth,
                    })
                });
            agent.detected_agents =
                perceive_agents(&self.config, &mut self.rng, &observer, candidates);

            let plants = self
                .resource_index
                .query_radius(observer.position, observer.range, None)
                .into_iter()
                .filter_map(|idx| self.resources.get(idx).map(|r| (idx, r.position)));
            agent.detected_resources = perceive_resources(&observer, plants);
        }
    }
}
