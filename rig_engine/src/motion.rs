//! Motion freeze policy.
//!
//! Every clip is forced to loop at the engine level with no fades, so the
//! engine never finishes it. Gesture clips are then pinned to their last frame
//! once their authored duration has elapsed; idle clips (`motion_0NN`) keep
//! looping through their full duration.

use rig_shared::{MotionDefinition, RigError, RigResult};
use tracing::{debug, warn};

use crate::model::ParameterSink;

/// Playback bookkeeping for one started clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueEntry {
    pub start_time: f64,
    /// `None` means the clip never concludes on its own.
    pub end_time: Option<f64>,
}

impl QueueEntry {
    pub fn new(start_time: f64, end_time: Option<f64>) -> Self {
        Self { start_time, end_time }
    }

    pub fn is_finished(&self, now: f64) -> bool {
        self.end_time.is_some_and(|end| now >= end)
    }
}

/// An engine-native clip.
pub trait NativeClip {
    /// Authored length in seconds, when the clip data carries one.
    fn duration(&self) -> Option<f64>;

    fn set_loop(&mut self, looped: bool) -> RigResult<()>;

    fn set_loop_fade_in(&mut self, fade_in: bool) -> RigResult<()>;

    fn set_fade_out_time(&mut self, secs: f64) -> RigResult<()>;

    /// Evaluate the pose at `time_secs` and write it to the sink.
    fn update_parameters(
        &mut self,
        sink: &mut dyn ParameterSink,
        time_secs: f64,
        weight: f32,
        entry: &mut QueueEntry,
    );
}

/// Authored duration in seconds, rejected unless finite and positive.
pub fn authored_duration(native: &dyn NativeClip) -> RigResult<f64> {
    match native.duration() {
        Some(d) if d.is_finite() && d > 0.0 => Ok(d),
        Some(d) => Err(RigError::MalformedClip(format!("duration {d}"))),
        None => Err(RigError::MalformedClip("no duration".into())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreezePolicy {
    pub epsilon_secs: f64,
}

impl Default for FreezePolicy {
    fn default() -> Self {
        Self { epsilon_secs: 0.001 }
    }
}

impl FreezePolicy {
    pub fn new(epsilon_secs: f64) -> Self {
        Self { epsilon_secs }
    }

    /// Configure `native` for endless playback and wrap it.
    pub fn wrap(&self, mut native: Box<dyn NativeClip>, def: &MotionDefinition) -> MotionClip {
        let name = def.display_name();
        let idle = def.is_idle_category();

        if let Err(e) = native.set_loop(true) {
            warn!(clip = %name, error = %e, "could not force loop");
        }
        if let Err(e) = native.set_loop_fade_in(false) {
            warn!(clip = %name, error = %e, "could not disable loop fade-in");
        }
        if let Err(e) = native.set_fade_out_time(0.0) {
            warn!(clip = %name, error = %e, "could not disable fade-out");
        }

        let duration = match authored_duration(native.as_ref()) {
            Ok(d) => Some(d),
            Err(e) => {
                warn!(clip = %name, error = %e, "playing unmodified");
                None
            }
        };
        debug!(clip = %name, idle, ?duration, "motion wrapped");

        MotionClip { native, name, idle, duration, epsilon: self.epsilon_secs }
    }
}

/// A native clip behind the freeze decorator.
pub struct MotionClip {
    native: Box<dyn NativeClip>,
    name: String,
    idle: bool,
    duration: Option<f64>,
    epsilon: f64,
}

impl MotionClip {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_idle_category(&self) -> bool {
        self.idle
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Time the native clip is actually evaluated at, or `None` for raw playback.
    pub fn frozen_time(&self, time_secs: f64, start_time: f64) -> Option<f64> {
        if self.idle {
            return None;
        }
        let duration = self.duration?;
        if time_secs - start_time >= duration {
            Some(start_time + duration - self.epsilon)
        } else {
            None
        }
    }

    pub fn update_parameters(
        &mut self,
        sink: &mut dyn ParameterSink,
        time_secs: f64,
        weight: f32,
        entry: &mut QueueEntry,
    ) {
        match self.frozen_time(time_secs, entry.start_time) {
            Some(freeze_at) => {
                entry.end_time = None;
                self.native.update_parameters(sink, freeze_at, weight, entry);
            }
            None => self.native.update_parameters(sink, time_secs, weight, entry),
        }
    }
}

impl std::fmt::Debug for MotionClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionClip")
            .field("name", &self.name)
            .field("idle", &self.idle)
            .field("duration", &self.duration)
            .finish()
    }
}
