use std::f64::consts::TAU;

/// Breath-only natural movement: `0.5 + 0.5 * sin(2π t / cycle)`.
/// Body and head sway are not produced at all.
#[derive(Debug, Clone, Copy)]
pub struct BreathOscillator {
    cycle_secs: f64,
}

impl BreathOscillator {
    pub fn new(cycle_secs: f64) -> Self {
        Self { cycle_secs }
    }

    pub fn value_at(&self, elapsed_ms: f64) -> f32 {
        let t = elapsed_ms / 1000.0;
        (0.5 + 0.5 * (TAU * t / self.cycle_secs).sin()) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_midpoint_and_peaks_at_quarter_cycle() {
        let b = BreathOscillator::new(3.2345);
        assert!((b.value_at(0.0) - 0.5).abs() < 1e-6);
        assert!((b.value_at(3234.5 / 4.0) - 1.0).abs() < 1e-5);
        assert!((b.value_at(3234.5 * 0.75) - 0.0).abs() < 1e-5);
        assert!((b.value_at(3234.5) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn stays_in_unit_range() {
        let b = BreathOscillator::new(3.2345);
        for i in 0..10_000 {
            let v = b.value_at(i as f64 * 7.3);
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
