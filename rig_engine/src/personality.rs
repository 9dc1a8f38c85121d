use fastrand::Rng;
use rig_shared::{ModelSettings, RandomChoice};

/// Weighted towards neutral and light blush.
const CHEEK_POOL: [f32; 6] = [-1.0, 0.0, 0.0, 1.0, 1.0, 2.0];
const EYE_CLOSE_P: f64 = 0.3;
const MOUTH_OPEN_P: f64 = 0.5;
const TEAR_P: f64 = 0.15;
const SOUL_GEM_P: f64 = 0.2;

/// Outcome of one random draw.
#[derive(Debug, Clone, PartialEq)]
pub enum Pick {
    Choice(RandomChoice),
    /// No gesture qualifies; play the first motion of this group.
    Fallback { group: String },
}

/// Random "personality" one-shot: a gesture, an expression and a set of
/// facial overrides, drawn independently.
#[derive(Debug, Clone)]
pub struct Personality {
    rng: Rng,
}

impl Personality {
    pub fn new(rng: Rng) -> Self {
        Self { rng }
    }

    pub fn pick(&mut self, settings: &ModelSettings, dwell_ms: f64) -> Pick {
        let group = settings.default_group().to_string();
        let candidates = settings.gesture_indices();
        if candidates.is_empty() {
            return Pick::Fallback { group };
        }
        let motion_index = candidates[self.rng.usize(..candidates.len())];

        let (face_index, face_name) = if settings.expressions.is_empty() {
            (None, None)
        } else {
            let i = self.rng.usize(..settings.expressions.len());
            (Some(i), Some(settings.expressions[i].name.clone()))
        };

        let cheek = CHEEK_POOL[self.rng.usize(..CHEEK_POOL.len())];
        let eye_close = self.rng.f64() < EYE_CLOSE_P;
        let mouth_open = self.rng.f64() < MOUTH_OPEN_P;
        let tear = if self.rng.f64() < TEAR_P { 1.0 } else { 0.0 };
        let soul_gem = if self.rng.f64() < SOUL_GEM_P { 1.0 } else { 0.0 };

        Pick::Choice(RandomChoice {
            motion_group: group,
            motion_index,
            face_index,
            face_name,
            cheek,
            eye_close,
            eye_open: if eye_close { 0.0 } else { 1.0 },
            mouth_open,
            mouth: if mouth_open { 1.0 } else { 0.0 },
            tear,
            soul_gem,
            time_ms: dwell_ms,
        })
    }
}
