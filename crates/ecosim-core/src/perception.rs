use crate::config::SimConfig;
use rand::Rng;

pub fn distance_sq(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Euclidean distance. The arena wraps positions but distances are not toroidal.
pub fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    distance_sq(a, b).sqrt()
}

/// The observing side of a detection roll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observer {
    pub position: [f64; 2],
    pub range: f64,
    pub skill: f64,
}

/// A candidate returned by the agent index, with the stealth it currently shows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub id: u32,
    pub position: [f64; 2],
    pub stealth: f64,
}

/// Chance that an observer notices a candidate at `distance`.
///
/// Skill against stealth sets a base chance, clamped to `[0, 1]`, which then
/// falls off exponentially with distance over the observer's range.
pub fn detection_probability(
    config: &SimConfig,
    skill: f64,
    stealth: f64,
    distance: f64,
    range: f64,
) -> f64 {
    if range <= 0.0 {
        return 0.0;
    }
    let base = ((config.detection_base + skill - stealth) * config.detection_scale).clamp(0.0, 1.0);
    base * (-distance / range).exp()
}

/// Roll once per candidate and keep the ids that were noticed, in input order.
pub fn perceive_agents<R: Rng + ?Sized>(
    config: &SimConfig,
    rng: &mut R,
    observer: &Observer,
    candidates: impl IntoIterator<Item = Candidate>,
) -> Vec<u32> {
    let mut detected = Vec::new();
    if observer.range <= 0.0 {
        return detected;
    }
    for candidate in candidates {
        let d = distance(observer.position, candidate.position);
        let p = detection_probability(config, observer.skill, candidate.stealth, d, observer.range);
        if rng.random::<f64>() < p {
            detected.push(candidate.id);
        }
    }
    detected
}

/// Plants are seen deterministically: strictly inside the detection radius.
pub fn resource_visible(observer: &Observer, position: [f64; 2]) -> bool {
    distance_sq(observer.position, position) < observer.range * observer.range
}

pub fn perceive_resources(
    observer: &Observer,
    candidates: impl IntoIterator<Item = (usize, [f64; 2])>,
) -> Vec<usize> {
    candidates
        .into_iter()
        .filter(|(_, position)| resource_visible(observer, *position))
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn observer(range: f64, skill: f64) -> Observer {
        Observer {
            position: [0.0, 0.0],
            range,
            skill,
        }
    }

    #[test]
    fn probability_decays_with_distance() {
        let config = SimConfig::default();
        let near = detection_probability(&config, 0.2, 0.1, 1.0, 40.0);
        let far = detection_probability(&config, 0.2, 0.1, 30.0, 40.0);
        assert!(near > far);
        let expected = ((0.5 + 0.2 - 0.1) * 0.65) * (-1.0f64 / 40.0).exp();
        assert!((near - expected).abs() < 1e-12);
    }

    #[test]
    fn probability_base_is_clamped() {
        let config = SimConfig::default();
        assert_eq!(detection_probability(&config, 0.0, 5.0, 0.0, 40.0), 0.0);
        assert_eq!(detection_probability(&config, 5.0, 0.0, 0.0, 40.0), 1.0);
    }

    #[test]
    fn zero_range_detects_nothing() {
        let config = SimConfig::default();
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let candidates = [Candidate {
            id: 3,
            position: [0.0, 0.0],
            stealth: 0.0,
        }];
        assert!(perceive_agents(&config, &mut rng, &observer(0.0, 10.0), candidates).is_empty());
    }

    #[test]
    fn certain_detection_keeps_every_candidate() {
        let config = SimConfig::default();
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        // Skill saturates the base chance and distance zero removes the falloff.
        let candidates = (0..20).map(|id| Candidate {
            id,
            position: [0.0, 0.0],
            stealth: 0.0,
        });
        let seen = perceive_agents(&config, &mut rng, &observer(40.0, 5.0), candidates);
        assert_eq!(seen, (0..20).collect::<Vec<u32>>());
    }

    #[test]
    fn detection_rate_tracks_probability() {
        let config = SimConfig::default();
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let obs = observer(40.0, 0.3);
        let target = Candidate {
            id: 0,
            position: [20.0, 0.0],
            stealth: 0.1,
        };
        let p = detection_probability(&config, 0.3, 0.1, 20.0, 40.0);
        let trials = 20_000;
        let hits = (0..trials)
            .filter(|_| !perceive_agents(&config, &mut rng, &obs, [target]).is_empty())
            .count();
        let rate = hits as f64 / trials as f64;
        assert!((rate - p).abs() < 0.02, "rate {rate} vs p {p}");
    }

    #[test]
    fn resource_boundary_is_exclusive() {
        let obs = observer(10.0, 0.0);
        let seen = perceive_resources(&obs, [(0, [10.0, 0.0]), (1, [9.99, 0.0]), (2, [0.0, -3.0])]);
        assert_eq!(seen, vec![1, 2]);
    }
}
