use crate::config::SimConfig;
use crate::species::{SpeciesTemplate, TraitLimits};
use crate::traits::Traits;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Offspring fixed at conception and carried until birth.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Litter {
    pub position: [f64; 2],
    pub traits: Traits,
}

/// One offspring waiting to be admitted into the population.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BirthRecord {
    pub species: usize,
    pub position: [f64; 2],
    pub traits: Traits,
}

/// FIFO of pending births. Popping an empty queue is a no-op returning `None`.
#[derive(Clone, Debug, Default)]
pub struct BirthQueue {
    pending: VecDeque<BirthRecord>,
}

impl BirthQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: BirthRecord) {
        self.pending.push_back(record);
    }

    pub fn pop(&mut self) -> Option<BirthRecord> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Perturb `value` by at most `rate`, scaled down linearly to zero as the
/// value nears either limit. Values at or beyond a limit are only clamped.
pub fn mutate_bounded<R: Rng + ?Sized>(
    rng: &mut R,
    value: f64,
    min: f64,
    max: f64,
    rate: f64,
) -> f64 {
    let half = (max - min) / 2.0;
    if half <= 0.0 {
        return value.clamp(min, max);
    }
    let mid = (min + max) / 2.0;
    let limiter = 1.0 - (value - mid).abs() / half;
    let mut mutated = value;
    if limiter > 0.0 && limiter <= 1.0 {
        let step = rate.min(half) * limiter;
        mutated += rng.random_range(-1.0..1.0) * step;
    }
    mutated.clamp(min, max)
}

/// Average two parents. Speed, stealth, and detection skill then mutate within
/// the species' limits; detection range stays a plain average.
pub fn offspring_traits<R: Rng + ?Sized>(
    rng: &mut R,
    a: &Traits,
    b: &Traits,
    limits: &TraitLimits,
    rate: f64,
) -> Traits {
    let avg = |x: f64, y: f64| (x + y) / 2.0;
    Traits {
        speed: mutate_bounded(
            rng,
            avg(a.speed, b.speed),
            limits.min.speed,
            limits.max.speed,
            rate,
        ),
        detection_range: avg(a.detection_range, b.detection_range),
        stealth: mutate_bounded(
            rng,
            avg(a.stealth, b.stealth),
            limits.min.stealth,
            limits.max.stealth,
            rate,
        ),
        detection_skill: mutate_bounded(
            rng,
            avg(a.detection_skill, b.detection_skill),
            limits.min.detection_skill,
            limits.max.detection_skill,
            rate,
        ),
    }
}

/// Build the litter a carrier at `position` will bear.
pub fn conceive<R: Rng + ?Sized>(
    rng: &mut R,
    config: &SimConfig,
    template: &SpeciesTemplate,
    position: [f64; 2],
    a: &Traits,
    b: &Traits,
) -> Litter {
    let traits = offspring_traits(rng, a, b, &template.trait_limits, config.mutation_rate);
    let offset = config.offspring_spawn_offset;
    let mut jitter = || (rng.random::<f64>() * 2.0 - 1.0) * offset;
    let position = [position[0] + jitter(), position[1] + jitter()];
    Litter { position, traits }
}

/// Queue `count` identical offspring from one litter.
pub fn enqueue_litter(queue: &mut BirthQueue, species: usize, litter: &Litter, count: u32) {
    for _ in 0..count {
        queue.push(BirthRecord {
            species,
            position: litter.position,
            traits: litter.traits,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn queue_is_fifo_and_underflow_is_none() {
        let mut queue = BirthQueue::new();
        assert!(queue.pop().is_none());
        for species in 0..3 {
            queue.push(BirthRecord {
                species,
                position: [0.0, 0.0],
                traits: Traits::default(),
            });
        }
        assert_eq!(queue.len(), 3);
        let order: Vec<usize> = std::iter::from_fn(|| queue.pop()).map(|r| r.species).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn mutation_never_leaves_limits() {
        let mut rng = ChaCha12Rng::seed_from_u64(21);
        for i in 0..5_000 {
            let value = (i % 101) as f64 / 100.0;
            let out = mutate_bounded(&mut rng, value, 0.0, 1.0, 0.175);
            assert!((0.0..=1.0).contains(&out), "{value} -> {out}");
        }
        // Narrow band where the rate exceeds the half-width.
        for _ in 0..1_000 {
            let out = mutate_bounded(&mut rng, 0.51, 0.5, 0.55, 0.175);
            assert!((0.5..=0.55).contains(&out));
        }
    }

    #[test]
    fn mutation_is_frozen_at_limits_and_clamps_outliers() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        assert_eq!(mutate_bounded(&mut rng, 0.0, 0.0, 10.0, 0.175), 0.0);
        assert_eq!(mutate_bounded(&mut rng, 10.0, 0.0, 10.0, 0.175), 10.0);
        assert_eq!(mutate_bounded(&mut rng, 12.0, 0.0, 10.0, 0.175), 10.0);
        assert_eq!(mutate_bounded(&mut rng, 3.0, 4.0, 4.0, 0.175), 4.0);
    }

    #[test]
    fn mutation_moves_midpoint_values() {
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let moved = (0..100)
            .filter(|_| mutate_bounded(&mut rng, 5.0, 0.0, 10.0, 0.175) != 5.0)
            .count();
        assert!(moved > 90);
    }

    #[test]
    fn detection_range_is_plain_average() {
        let mut rng = ChaCha12Rng::seed_from_u64(8);
        let a = Traits::new(1.0, 30.0, 0.2, 0.1);
        let b = Traits::new(2.0, 50.0, 0.4, 0.3);
        let child = offspring_traits(&mut rng, &a, &b, &TraitLimits::default(), 0.175);
        assert_eq!(child.detection_range, 40.0);
        assert!((child.speed - 1.5).abs() <= 0.175);
        assert!((child.stealth - 0.3).abs() <= 0.175);
    }

    #[test]
    fn conceived_litter_spawns_near_carrier() {
        let mut rng = ChaCha12Rng::seed_from_u64(13);
        let config = SimConfig::default();
        let template = SpeciesTemplate::default();
        let t = Traits::new(1.0, 40.0, 0.2, 0.2);
        for _ in 0..100 {
            let litter = conceive(&mut rng, &config, &template, [100.0, 100.0], &t, &t);
            assert!((litter.position[0] - 100.0).abs() <= config.offspring_spawn_offset);
            assert!((litter.position[1] - 100.0).abs() <= config.offspring_spawn_offset);
        }
    }

    #[test]
    fn enqueue_litter_shares_one_trait_set() {
        let mut queue = BirthQueue::new();
        let litter = Litter {
            position: [3.0, 4.0],
            traits: Traits::new(1.1, 40.0, 0.2, 0.3),
        };
        enqueue_litter(&mut queue, 6, &litter, 3);
        assert_eq!(queue.len(), 3);
        while let Some(record) = queue.pop() {
            assert_eq!(record.species, 6);
            assert_eq!(record.traits, litter.traits);
        }
    }
}
