//! Per-frame reconciliation of blink, breath, manual overrides and lip-sync
//! into the final parameter writes.

use rig_shared::{ControllerConfig, PARAM_BREATH};
use tracing::debug;

use crate::blink::BlinkOscillator;
use crate::breath::BreathOscillator;
use crate::lipsync::MicLipSync;
use crate::model::{FrameHooks, ParameterSink};
use crate::overrides::{Channel, EyeTween, OverrideStore};

pub struct FrameState {
    pub overrides: OverrideStore,
    pub blink: BlinkOscillator,
    pub breath: BreathOscillator,
    pub mic: MicLipSync,
    pub eye_tween: Option<EyeTween>,
}

impl FrameState {
    pub fn new(config: &ControllerConfig, rng: fastrand::Rng) -> Self {
        Self {
            overrides: OverrideStore::default(),
            blink: BlinkOscillator::new(config, rng),
            breath: BreathOscillator::new(config.breath_cycle_secs),
            mic: MicLipSync::new(config.mic_sensitivity),
            eye_tween: None,
        }
    }

    /// Start easing the manual eye value towards `target`. The eye is manual
    /// for the duration so blink cannot fight the tween.
    pub fn tween_eye(
        &mut self,
        target: f32,
        locked: bool,
        duration_ms: f64,
        release_to_auto: bool,
    ) {
        let target = rig_shared::clamp01(target);
        self.eye_tween = None;
        self.overrides.set_locked(Channel::Eye, locked);
        self.overrides.activate(Channel::Eye, self.overrides.cell(Channel::Eye).value);
        let from = self.overrides.cell(Channel::Eye).value;
        if (from - target).abs() < 1e-4 {
            self.overrides.set_value(Channel::Eye, target);
            self.finish_eye_tween(target, release_to_auto);
            return;
        }
        self.eye_tween = Some(EyeTween::new(from, target, duration_ms, release_to_auto));
    }

    fn finish_eye_tween(&mut self, target: f32, release_to_auto: bool) {
        if release_to_auto && target >= 0.999 && !self.overrides.cell(Channel::Eye).locked {
            self.overrides.release(Channel::Eye);
        }
    }

    fn advance_eye_tween(&mut self, delta_ms: f64) {
        let Some(tween) = self.eye_tween.as_mut() else { return };
        let (value, done) = tween.advance(delta_ms);
        self.overrides.set_value(Channel::Eye, value);
        if done {
            let (target, release) = (tween.target(), tween.releases_to_auto());
            self.eye_tween = None;
            self.finish_eye_tween(target, release);
        }
    }
}

/// A failed write skips that channel for this frame only.
fn write(sink: &mut dyn ParameterSink, id: &str, value: f32) {
    if let Err(e) = sink.set_parameter(id, value) {
        debug!(param = id, error = %e, "parameter write skipped");
    }
}

fn write_channel(sink: &mut dyn ParameterSink, channel: Channel, value: f32) {
    for id in channel.param_ids() {
        write(sink, id, value);
    }
}

impl FrameHooks for FrameState {
    fn before_model_update(&mut self, sink: &mut dyn ParameterSink) {
        if let Some(v) = self.overrides.output(Channel::Cheek) {
            write_channel(sink, Channel::Cheek, v);
        }
    }

    fn natural_movements(&mut self, sink: &mut dyn ParameterSink, elapsed_ms: f64) {
        write(sink, PARAM_BREATH, self.breath.value_at(elapsed_ms));
    }

    fn after_motion_update(&mut self, sink: &mut dyn ParameterSink, delta_ms: f64) {
        self.advance_eye_tween(delta_ms);

        // Blink only writes while it is mid-blink; at rest the clip owns the eyes.
        match self.overrides.output(Channel::Eye) {
            None => {
                self.blink.update(delta_ms);
                if self.blink.phase() != crate::blink::BlinkPhase::Idle {
                    write_channel(sink, Channel::Eye, self.blink.eye_value());
                }
            }
            Some(v) => write_channel(sink, Channel::Eye, v),
        }

        for channel in [Channel::Cheek, Channel::Tear, Channel::SoulGem] {
            if let Some(v) = self.overrides.output(channel) {
                write_channel(sink, channel, v);
            }
        }

        // The mic wins over a manual mouth without overwriting it. A failed
        // read leaves the mouth to the clip for this frame.
        match self.mic.sample() {
            Some(Ok(v)) => write_channel(sink, Channel::Mouth, v),
            Some(Err(e)) => debug!(error = %e, "mic read failed, mouth skipped"),
            None => {
                if let Some(v) = self.overrides.output(Channel::Mouth) {
                    write_channel(sink, Channel::Mouth, v);
                }
            }
        }
    }
}
