use serde::{Deserialize, Serialize};

/// Heritable agent traits. Detection range is inherited as a plain average;
/// the other three go through bounded mutation at conception.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    pub speed: f64,
    pub detection_range: f64,
    pub stealth: f64,
    pub detection_skill: f64,
}

impl Traits {
    pub fn new(speed: f64, detection_range: f64, stealth: f64, detection_skill: f64) -> Self {
        Self {
            speed,
            detection_range,
            stealth,
            detection_skill,
        }
    }

    /// Multiply every trait by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            speed: self.speed * factor,
            detection_range: self.detection_range * factor,
            stealth: self.stealth * factor,
            detection_skill: self.detection_skill * factor,
        }
    }

    /// Shrink every trait by `fraction` of its value, flooring at zero.
    pub fn aged(self, fraction: f64) -> Self {
        let keep = 1.0 - fraction;
        Self {
            speed: (self.speed * keep).max(0.0),
            detection_range: (self.detection_range * keep).max(0.0),
            stealth: (self.stealth * keep).max(0.0),
            detection_skill: (self.detection_skill * keep).max(0.0),
        }
    }

    /// Component-wise product, used to apply species multipliers to seed values.
    pub fn times(self, other: Traits) -> Self {
        Self {
            speed: self.speed * other.speed,
            detection_range: self.detection_range * other.detection_range,
            stealth: self.stealth * other.stealth,
            detection_skill: self.detection_skill * other.detection_skill,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.speed.is_finite()
            && self.detection_range.is_finite()
            && self.stealth.is_finite()
            && self.detection_skill.is_finite()
    }

    pub fn is_non_negative(&self) -> bool {
        self.speed >= 0.0
            && self.detection_range >= 0.0
            && self.stealth >= 0.0
            && self.detection_skill >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aged_floors_at_zero() {
        let t = Traits::new(1.0, 40.0, 0.2, 0.3).aged(1.5);
        assert_eq!(t, Traits::new(0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn scaled_then_inverse_restores_values() {
        let t = Traits::new(1.2, 40.0, 0.25, 0.1);
        let restored = t.scaled(0.8).scaled(1.0 / 0.8);
        assert!((restored.speed - t.speed).abs() < 1e-12);
        assert!((restored.detection_range - t.detection_range).abs() < 1e-12);
        assert!((restored.stealth - t.stealth).abs() < 1e-12);
        assert!((restored.detection_skill - t.detection_skill).abs() < 1e-12);
    }
}
