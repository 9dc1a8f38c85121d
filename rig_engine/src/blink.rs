use fastrand::Rng;
use rig_shared::ControllerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkPhase {
    Idle,
    Closing,
    Closed,
    Opening,
}

impl BlinkPhase {
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::Closing,
            Self::Closing => Self::Closed,
            Self::Closed => Self::Opening,
            Self::Opening => Self::Idle,
        }
    }
}

/// Randomized blink cycle producing an eye openness in [0, 1].
///
/// At most one phase transition happens per `update`; a very large delta
/// finishes the current phase but does not run through the following ones.
#[derive(Debug, Clone)]
pub struct BlinkOscillator {
    phase: BlinkPhase,
    next_blink_in_ms: f64,
    phase_ms: f64,
    eye_value: f32,
    closing_ms: f64,
    closed_ms: f64,
    opening_ms: f64,
    window_ms: (f64, f64),
    rng: Rng,
}

impl BlinkOscillator {
    pub fn new(config: &ControllerConfig, rng: Rng) -> Self {
        Self {
            phase: BlinkPhase::Idle,
            next_blink_in_ms: config.first_blink_ms,
            phase_ms: 0.0,
            eye_value: 1.0,
            closing_ms: config.blink_closing_ms,
            closed_ms: config.blink_closed_ms,
            opening_ms: config.blink_opening_ms,
            window_ms: (config.blink_interval_min_ms, config.blink_interval_max_ms),
            rng,
        }
    }

    pub fn phase(&self) -> BlinkPhase {
        self.phase
    }

    pub fn eye_value(&self) -> f32 {
        self.eye_value
    }

    pub fn next_blink_in_ms(&self) -> f64 {
        self.next_blink_in_ms
    }

    /// Advance by `delta_ms`. Returns the phase entered, if any.
    /// Non-positive or non-finite deltas are ignored.
    pub fn update(&mut self, delta_ms: f64) -> Option<BlinkPhase> {
        if !(delta_ms.is_finite() && delta_ms > 0.0) {
            return None;
        }
        match self.phase {
            BlinkPhase::Idle => {
                self.next_blink_in_ms -= delta_ms;
                if self.next_blink_in_ms <= 0.0 {
                    return Some(self.enter(BlinkPhase::Closing));
                }
            }
            BlinkPhase::Closing => {
                self.phase_ms += delta_ms;
                let k = (self.phase_ms / self.closing_ms).min(1.0);
                self.eye_value = (1.0 - k) as f32;
                if k >= 1.0 {
                    return Some(self.enter(BlinkPhase::Closed));
                }
            }
            BlinkPhase::Closed => {
                self.phase_ms += delta_ms;
                self.eye_value = 0.0;
                if self.phase_ms >= self.closed_ms {
                    return Some(self.enter(BlinkPhase::Opening));
                }
            }
            BlinkPhase::Opening => {
                self.phase_ms += delta_ms;
                let k = (self.phase_ms / self.opening_ms).min(1.0);
                self.eye_value = k as f32;
                if k >= 1.0 {
                    // Half-open window: [min, max).
                    let (lo, hi) = self.window_ms;
                    self.next_blink_in_ms = lo + self.rng.f64() * (hi - lo);
                    return Some(self.enter(BlinkPhase::Idle));
                }
            }
        }
        None
    }

    fn enter(&mut self, phase: BlinkPhase) -> BlinkPhase {
        self.phase = phase;
        self.phase_ms = 0.0;
        phase
    }
}
