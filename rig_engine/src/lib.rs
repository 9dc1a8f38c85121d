pub mod blink;
pub mod breath;
pub mod commands;
pub mod controller; // Controller lives here
pub mod gaze;
pub mod lipsync;
pub mod model;
pub mod motion;
pub mod overrides;
pub mod personality;
pub mod reconciler;
pub mod scheduler;
pub mod sequencer;
pub mod session;
pub mod sim;

// Re-exports
pub use commands::{ControllerCommand, Envelope};
pub use controller::Controller;
pub use lipsync::{SharedSpectrum, SpectrumSource};
pub use model::{DrawableSample, FrameHooks, ModelEngine, ParameterSink};
pub use motion::{FreezePolicy, MotionClip, NativeClip};
pub use overrides::Channel;
pub use session::Session;

#[cfg(test)]
mod tests_scenario;
