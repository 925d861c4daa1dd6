use super::super::World;
use crate::agent::Agent;
use crate::metrics::BirthSnapshot;
use tracing::warn;

impl World {
    /// Admit every queued birth as a new agent with a fresh id.
    pub(in crate::world) fn step_births_phase(&mut self) {
        while let Some(record) = self.birth_queue.pop() {
            if self.config.species(record.species).is_none() {
                warn!(species = record.species, "birth for unknown species skipped");
                continue;
            }
            let Some(id) = self.next_agent_id_checked() else {
                self.total_agent_id_exhaustions += 1;
                warn!(species = record.species, "agent ids exhausted; birth skipped");
                continue;
            };
            let template = &self.config.species[record.species];
            let agent = Agent::spawn(
                id,
                record.species,
                record.position,
                record.traits,
                &self.config,
                template,
                &mut self.rng,
            );
            self.births_last_step.push(BirthSnapshot {
                id,
                species: record.species,
                traits: record.traits,
            });
            self.agents.push(agent);
            self.total_births += 1;
        }
    }
}
