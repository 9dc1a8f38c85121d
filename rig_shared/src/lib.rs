pub mod config;
pub mod error;
pub mod settings;
pub mod steps;

pub use config::ControllerConfig;
pub use error::{RigError, RigResult};
pub use settings::{ExpressionDefinition, ModelSettings, MotionDefinition, MotionGroup};
pub use steps::{RandomChoice, SequenceStep};

/// Parameter ids written by the override layer.
pub const PARAM_EYE_L_OPEN: &str = "ParamEyeLOpen";
pub const PARAM_EYE_R_OPEN: &str = "ParamEyeROpen";
pub const PARAM_CHEEK: &str = "ParamCheek";
/// Only the open amount. Mouth form (smile/frown) belongs to expressions.
pub const PARAM_MOUTH_OPEN_Y: &str = "ParamMouthOpenY";
pub const PARAM_TEAR: &str = "ParamTear";
// Lowercase g, as authored in the rig assets.
pub const PARAM_SOUL_GEM: &str = "ParamSoulgem";
pub const PARAM_BREATH: &str = "ParamBreath";

/// FORCE priority: replaces whatever is playing without waiting for it.
pub const PRIORITY_FORCE: u8 = 3;

pub const DEFAULT_MOTION_GROUP: &str = "Motion";

/// Clamp into [0, 1]; non-finite input maps to 0.
pub fn clamp01(v: f32) -> f32 {
    if !v.is_finite() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

/// Non-finite values collapse to 0, everything else passes through.
pub fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}
