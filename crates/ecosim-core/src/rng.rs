use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Derive a separate stream for scenario generation so that changing the
/// population layout does not shift the simulation's own draws.
pub fn derive_scenario_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed.wrapping_add(crate::constants::SCENARIO_SEED_OFFSET))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_seed_same_stream() {
        let mut a = create_rng(9);
        let mut b = create_rng(9);
        for _ in 0..16 {
            assert_eq!(a.random::<u64>(), b.random::<u64>());
        }
    }

    #[test]
    fn scenario_stream_differs_from_simulation_stream() {
        let mut sim = create_rng(9);
        let mut scenario = derive_scenario_rng(9);
        assert_ne!(sim.random::<u64>(), scenario.random::<u64>());
    }
}
