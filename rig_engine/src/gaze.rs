use rig_shared::RigResult;

use crate::model::DrawableSample;
use crate::scheduler::TimerId;

const FOCUS_LIMIT: f32 = 2.0;

/// Press-and-hold gaze follow state for one model.
#[derive(Debug, Default)]
pub struct GazeFollow {
    enabled: bool,
    /// Bumped on every enable/disable so stale retries go inert
    generation: u64,
    /// Model-local pointer position of the press, replayed by retries
    press_point: Option<(f32, f32)>,
    eye_norm_offset: f32,
    /// Per-model sensitivity; the configured global applies when unset
    sensitivity: Option<f32>,
    retry_timers: Vec<TimerId>,
}

impl GazeFollow {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn eye_norm_offset(&self) -> f32 {
        self.eye_norm_offset
    }

    pub fn set_eye_norm_offset(&mut self, offset: f32) {
        self.eye_norm_offset = if offset.is_finite() { offset } else { 0.0 };
    }

    pub fn sensitivity(&self) -> Option<f32> {
        self.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: Option<f32>) {
        self.sensitivity = sensitivity.filter(|s| s.is_finite() && *s != 0.0);
    }

    pub fn press_point(&self) -> Option<(f32, f32)> {
        self.press_point
    }

    /// Switch follow; returns the retry timers that must be cancelled.
    pub fn set_enabled(&mut self, enabled: bool, press_point: Option<(f32, f32)>) -> Vec<TimerId> {
        self.enabled = enabled;
        self.generation += 1;
        self.press_point = if enabled { press_point } else { None };
        std::mem::take(&mut self.retry_timers)
    }

    pub fn track_retry(&mut self, id: TimerId) {
        self.retry_timers.push(id);
    }

    pub fn accepts(&self, generation: u64) -> bool {
        self.enabled && generation == self.generation
    }
}

/// Focus target for a pointer at model-local `point` (original pixels).
///
/// X is relative to the model centre, Y to the eye line. The result is in
/// engine orientation (+y up), clamped to [-2, 2].
pub fn focus_target(
    point: (f32, f32),
    size: (f32, f32),
    eye_norm_offset: f32,
    sensitivity: f32,
) -> (f32, f32) {
    let w = if size.0 > 0.0 { size.0 } else { 1.0 };
    let h = if size.1 > 0.0 { size.1 } else { 1.0 };
    let raw_x = point.0 / w * 2.0 - 1.0;
    let raw_y = point.1 / h * 2.0 - 1.0;
    let x = (raw_x * sensitivity * 2.0).clamp(-FOCUS_LIMIT, FOCUS_LIMIT);
    let y = ((eye_norm_offset + raw_y * sensitivity) * 2.0).clamp(-FOCUS_LIMIT, FOCUS_LIMIT);
    (x, -y)
}

/// Eye-line offset from drawable geometry: median of the `top_n` highest
/// centroids, normalized to [-1, 1] and negated. `None` when there is no
/// usable geometry yet.
pub fn eye_norm_offset(
    samples: &[DrawableSample],
    original_height: f32,
    top_n: usize,
) -> Option<f32> {
    let h = if original_height > 0.0 { original_height } else { 1.0 };
    let mut ys: Vec<f32> =
        samples.iter().map(|s| s.vertical_centroid).filter(|y| y.is_finite()).collect();
    if ys.is_empty() {
        return None;
    }
    ys.sort_by(|a, b| a.total_cmp(b));
    ys.truncate(top_n.max(1));
    let mid = ys.len() / 2;
    let median = if ys.len() % 2 == 1 { ys[mid] } else { (ys[mid - 1] + ys[mid]) / 2.0 };
    Some(-(median / h * 2.0 - 1.0))
}

/// Calibration outcome for one attempt.
pub fn calibrate(
    samples: RigResult<Vec<DrawableSample>>,
    original_height: f32,
    top_n: usize,
) -> Option<f32> {
    samples.ok().and_then(|s| eye_norm_offset(&s, original_height, top_n))
}
