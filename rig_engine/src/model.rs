use rig_shared::{RigError, RigResult};

use crate::motion::FreezePolicy;

/// Anything that accepts `(parameter id, value)` writes.
pub trait ParameterSink {
    fn set_parameter(&mut self, id: &str, value: f32) -> RigResult<()>;
}

/// Vertical centroid of one drawable mesh, in original model pixels
/// (smaller is higher on screen).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawableSample {
    pub vertical_centroid: f32,
}

/// Callbacks the engine invokes while it advances one frame.
///
/// Order within a frame: `before_model_update`, clip playback,
/// `natural_movements`, `after_motion_update`. Each hook writes through the
/// sink it is handed, so a hook's write is the latest one for that stage.
pub trait FrameHooks {
    fn before_model_update(&mut self, sink: &mut dyn ParameterSink);

    /// Replaces the engine's own sway + breath update.
    fn natural_movements(&mut self, sink: &mut dyn ParameterSink, elapsed_ms: f64);

    fn after_motion_update(&mut self, sink: &mut dyn ParameterSink, delta_ms: f64);
}

/// The rendering/deformation engine as seen by the animation core.
///
/// Optional capabilities default to `CapabilityUnavailable`; callers treat
/// that as a no-op.
pub trait ModelEngine: ParameterSink {
    /// Advance playback by `delta_ms`, calling the hooks at their stage.
    fn update(&mut self, delta_ms: f64, hooks: &mut dyn FrameHooks) -> RigResult<()>;

    /// Policy every clip created from now on must be wrapped with.
    fn set_clip_policy(&mut self, policy: FreezePolicy);

    fn start_motion(&mut self, group: &str, index: usize, priority: u8) -> RigResult<()>;

    fn set_expression(&mut self, index: usize) -> RigResult<()>;

    fn stop_all_motions(&mut self) -> RigResult<()>;

    /// Clear reservation state so a frozen clip can be started again.
    fn reset_motion_reservation(&mut self) -> RigResult<()> {
        Ok(())
    }

    /// Gaze target, each axis in [-2, 2], +y up.
    fn focus(&mut self, _x: f32, _y: f32) -> RigResult<()> {
        Err(RigError::unavailable("focus"))
    }

    fn drawable_samples(&self) -> RigResult<Vec<DrawableSample>> {
        Err(RigError::unavailable("drawable_samples"))
    }

    /// Canvas size the rig was authored at, in pixels.
    fn original_size(&self) -> (f32, f32);
}
