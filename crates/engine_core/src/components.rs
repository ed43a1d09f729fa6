//! Common components shared by gameplay systems.

/// Health pool clamped to `[0, max]`.
#[derive(Debug, Clone, Copy)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Apply a signed amount: positive damages, negative heals.
    pub fn apply(&mut self, amount: f32) {
        if amount.is_nan() {
            return;
        }
        self.current = (self.current - amount).clamp(0.0, self.max);
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.apply(amount.max(0.0));
    }

    pub fn heal(&mut self, amount: f32) {
        self.apply(-amount.max(0.0));
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    pub fn percentage(&self) -> f32 {
        self.current / self.max
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_stays_in_bounds() {
        let mut h = Health::new(100.0);
        for amount in [250.0, -30.0, -500.0, 99.5, f32::INFINITY, -f32::INFINITY, f32::NAN] {
            h.apply(amount);
            assert!(h.current >= 0.0 && h.current <= 100.0, "{amount} -> {}", h.current);
        }
    }

    #[test]
    fn negative_amount_heals() {
        let mut h = Health::new(100.0);
        h.apply(40.0);
        h.apply(-15.0);
        assert_eq!(h.current, 75.0);
    }
}
