use super::super::World;

impl World {
    /// Regrow plants, then wrap agents back into the arena.
    pub(in crate::world) fn step_environment_phase(&mut self) {
        let rate = self.config.resource_regrowth;
        for resource in &mut self.resources {
            resource.regrow(rate);
        }

        let width = self.config.arena_width;
        let height = self.config.arena_height;
        for agent in &mut self.agents {
            agent.position[0] = wrap_coordinate(agent.position[0], width);
            agent.position[1] = wrap_coordinate(agent.position[1], height);
        }
    }
}

fn wrap_coordinate(value: f64, extent: f64) -> f64 {
    let wrapped = value.rem_euclid(extent);
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}
