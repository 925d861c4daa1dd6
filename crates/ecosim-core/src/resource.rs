use serde::{Deserialize, Serialize};

/// A stationary plant. Yield is bounded to `[0, max_yield]`, depleted by
/// grazing and regrown by a fixed increment each step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub position: [f64; 2],
    pub max_yield: f64,
    #[serde(rename = "yield")]
    pub current_yield: f64,
}

impl Resource {
    pub fn new(position: [f64; 2], max_yield: f64) -> Self {
        Self {
            position,
            max_yield,
            current_yield: 0.0,
        }
    }

    /// Regrow by `rate`, capped at `max_yield`. Plants already at or above
    /// the cap are unchanged.
    pub fn regrow(&mut self, rate: f64) {
        debug_assert!(rate >= 0.0, "regrowth rate cannot be negative");
        if self.current_yield < self.max_yield {
            self.current_yield = (self.current_yield + rate).min(self.max_yield);
        }
    }

    /// Remove up to `amount` and return the amount actually withdrawn.
    pub fn take(&mut self, amount: f64) -> f64 {
        let removed = self.current_yield.min(amount.max(0.0));
        self.current_yield -= removed;
        removed
    }

    pub fn is_valid(&self) -> bool {
        self.position[0].is_finite()
            && self.position[1].is_finite()
            && self.max_yield.is_finite()
            && self.max_yield >= 0.0
            && self.current_yield.is_finite()
            && (0.0..=self.max_yield).contains(&self.current_yield)
    }
}
