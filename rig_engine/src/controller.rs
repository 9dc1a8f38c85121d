//! Per-model controller: owns every piece of animation state for one loaded
//! model and exposes the operations UI and sequencing code call.

use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender};
use fastrand::Rng;
use rig_shared::{
    ControllerConfig, ModelSettings, PRIORITY_FORCE, RandomChoice, RigError, SequenceStep,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::blink::BlinkPhase;
use crate::commands::ControllerCommand;
use crate::gaze::{self, GazeFollow};
use crate::lipsync::SpectrumSource;
use crate::model::ModelEngine;
use crate::motion::FreezePolicy;
use crate::overrides::{Channel, OverrideCell};
use crate::personality::{Personality, Pick};
use crate::reconciler::FrameState;
use crate::scheduler::{Scheduler, TimerTask};
use crate::sequencer::Sequencer;

pub struct Controller<E: ModelEngine> {
    id: Uuid,
    engine: E,
    settings: ModelSettings,
    config: ControllerConfig,
    motion_numbers: HashMap<u32, usize>,
    frame: FrameState,
    scheduler: Scheduler,
    sequencer: Sequencer,
    personality: Personality,
    gaze: GazeFollow,
    observers: Vec<Sender<RandomChoice>>,
}

impl<E: ModelEngine> Controller<E> {
    pub fn new(engine: E, settings: ModelSettings, config: ControllerConfig) -> Self {
        Self::with_seed(engine, settings, config, fastrand::u64(..))
    }

    /// Deterministic blink timing and random personality.
    pub fn with_seed(
        mut engine: E,
        settings: ModelSettings,
        config: ControllerConfig,
        seed: u64,
    ) -> Self {
        engine.set_clip_policy(FreezePolicy::new(config.freeze_epsilon_secs));
        let mut rng = Rng::with_seed(seed);
        let frame = FrameState::new(&config, rng.fork());
        let personality = Personality::new(rng.fork());
        let motion_numbers = settings.motion_index_by_number();

        let mut controller = Self {
            id: Uuid::new_v4(),
            engine,
            settings,
            config,
            motion_numbers,
            frame,
            scheduler: Scheduler::new(),
            sequencer: Sequencer::new(),
            personality,
            gaze: GazeFollow::default(),
            observers: Vec::new(),
        };
        info!(
            id = %controller.id,
            default_group = controller.settings.default_group(),
            gestures = controller.settings.gesture_indices().len(),
            "controller created"
        );
        controller.calibrate(0);
        controller
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn default_motion_group(&self) -> &str {
        self.settings.default_group()
    }

    pub fn motion_index_by_number(&self) -> &HashMap<u32, usize> {
        &self.motion_numbers
    }

    pub fn override_cell(&self, channel: Channel) -> OverrideCell {
        *self.frame.overrides.cell(channel)
    }

    pub fn blink_phase(&self) -> BlinkPhase {
        self.frame.blink.phase()
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending_len()
    }

    /// Advance one render frame: run due timers, then let the engine update
    /// with the reconciler hooked in. Never fails; errors are logged.
    pub fn update_frame(&mut self, delta_ms: f64) {
        self.scheduler.advance(delta_ms);
        for task in self.scheduler.take_due() {
            self.run_task(task);
        }
        if let Err(e) = self.engine.update(delta_ms, &mut self.frame) {
            warn!(error = %e, "engine update failed");
        }
    }

    fn run_task(&mut self, task: TimerTask) {
        match task {
            TimerTask::SequenceStep { generation } => {
                if self.sequencer.accepts(generation) {
                    self.run_next_step();
                } else {
                    debug!(generation, "stale sequence timer dropped");
                }
            }
            TimerTask::FollowRetry { generation } => {
                if !self.gaze.accepts(generation) {
                    return;
                }
                if let Some(point) = self.gaze.press_point() {
                    self.apply_focus(point);
                }
            }
            TimerTask::Calibrate { attempt } => self.calibrate(attempt),
        }
    }

    // ---- motions ----

    /// Start at FORCE priority without stopping what runs; the engine blends.
    pub fn start_motion(&mut self, group: &str, index: usize) -> bool {
        let group = if group.is_empty() {
            self.settings.default_group().to_string()
        } else {
            group.to_string()
        };
        if let Err(e) = self.engine.reset_motion_reservation() {
            debug!(error = %e, "motion reservation reset skipped");
        }
        match self.engine.start_motion(&group, index, PRIORITY_FORCE) {
            Ok(()) => {
                debug!(group = %group, index, "motion started");
                true
            }
            Err(e) => {
                warn!(group = %group, index, error = %e, "start motion failed");
                false
            }
        }
    }

    pub fn stop_all(&mut self) {
        if let Err(e) = self.engine.stop_all_motions() {
            warn!(error = %e, "stop all motions failed");
        }
    }

    pub fn set_expression_by_index(&mut self, index: usize) -> bool {
        match self.engine.set_expression(index) {
            Ok(()) => true,
            Err(e) => {
                warn!(index, error = %e, "set expression failed");
                false
            }
        }
    }

    pub fn set_expression_by_name(&mut self, name: &str) -> bool {
        match self.settings.expression_index_by_name(name) {
            Some(index) => self.set_expression_by_index(index),
            None => {
                debug!(name, "no such expression");
                false
            }
        }
    }

    // ---- sequencing ----

    pub fn is_playing(&self) -> bool {
        self.sequencer.is_playing()
    }

    pub fn cancel_sequence(&mut self) {
        self.sequencer.cancel(&mut self.scheduler);
    }

    pub fn stop_sequence(&mut self) {
        self.cancel_sequence();
        self.stop_all();
    }

    /// Replace whatever sequence runs; the first step applies right away.
    pub fn play_steps(&mut self, steps: &[SequenceStep]) {
        if self.sequencer.load(steps, &mut self.scheduler) {
            debug!(steps = steps.len(), "sequence started");
            self.run_next_step();
        }
    }

    fn run_next_step(&mut self) {
        let Some(step) = self.sequencer.next_step() else {
            debug!("sequence finished");
            return;
        };
        self.apply_step(&step);
        self.sequencer.arm(&mut self.scheduler, step.dwell_ms());
    }

    fn apply_step(&mut self, step: &SequenceStep) {
        if let Some(cheek) = step.cheek {
            self.frame.overrides.activate(Channel::Cheek, cheek);
        }
        if let Some(eye) = step.eye_open {
            self.frame.eye_tween = None;
            self.frame.overrides.activate(Channel::Eye, eye);
        }
        if let Some(face) = step.face_index {
            self.set_expression_by_index(face);
        }
        if let Some(index) = step.motion_index {
            let group = step.motion_group.clone().unwrap_or_default();
            self.start_motion(&group, index);
        }
    }

    /// Cancel any running sequence and play one random personality step.
    pub fn click_play_random(&mut self) -> Option<RandomChoice> {
        self.sequencer.begin_single(&mut self.scheduler);
        let choice = self.play_random_once();
        self.sequencer.arm(&mut self.scheduler, self.config.random_dwell_ms);
        choice
    }

    /// Draw and apply one random personality choice. `None` means no gesture
    /// qualified and the first motion of the default group was started.
    pub fn play_random_once(&mut self) -> Option<RandomChoice> {
        let choice = match self.personality.pick(&self.settings, self.config.random_dwell_ms) {
            Pick::Choice(choice) => choice,
            Pick::Fallback { group } => {
                debug!(group = %group, "no gesture to pick, falling back to first motion");
                self.start_motion(&group, 0);
                return None;
            }
        };
        self.notify(&choice);

        if let Some(face) = choice.face_index {
            self.set_expression_by_index(face);
        }
        self.activate_and_write(Channel::Cheek, choice.cheek);
        self.frame.tween_eye(choice.eye_open, true, self.config.eye_tween_ms, false);
        self.activate_and_write(Channel::Mouth, choice.mouth);
        self.activate_and_write(Channel::Tear, choice.tear);
        self.activate_and_write(Channel::SoulGem, choice.soul_gem);
        self.start_motion(&choice.motion_group, choice.motion_index);
        Some(choice)
    }

    fn activate_and_write(&mut self, channel: Channel, value: f32) {
        self.frame.overrides.activate(channel, value);
        let value = self.frame.overrides.cell(channel).value;
        for id in channel.param_ids() {
            if let Err(e) = self.engine.set_parameter(id, value) {
                debug!(param = *id, error = %e, "immediate write skipped");
            }
        }
    }

    pub fn subscribe_random_choices(&mut self) -> Receiver<RandomChoice> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.observers.push(tx);
        rx
    }

    fn notify(&mut self, choice: &RandomChoice) {
        self.observers.retain(|tx| tx.send(choice.clone()).is_ok());
    }

    // ---- manual overrides ----

    pub fn set_cheek(&mut self, value: f32, locked: bool) {
        self.frame.overrides.set(Channel::Cheek, value, locked);
    }

    /// Ease the eyes shut or open. Opening unlocked hands the eyes back to
    /// blink once the tween lands.
    pub fn set_eye_closed(&mut self, closed: bool, locked: bool) {
        let target = if closed { 0.0 } else { 1.0 };
        let release_to_auto = !closed && !locked;
        self.frame.tween_eye(target, locked, self.config.eye_tween_ms, release_to_auto);
    }

    pub fn set_mouth(&mut self, value: f32, locked: bool) {
        self.frame.overrides.set(Channel::Mouth, value, locked);
    }

    pub fn set_tear(&mut self, value: f32, locked: bool) {
        self.frame.overrides.set(Channel::Tear, value, locked);
    }

    pub fn set_soul_gem(&mut self, value: f32, locked: bool) {
        self.frame.overrides.set(Channel::SoulGem, value, locked);
    }

    pub fn clear_mouth_manual_if_unlocked(&mut self) -> bool {
        self.frame.overrides.release_if_unlocked(Channel::Mouth)
    }

    // ---- lip-sync ----

    pub fn set_mic(
        &mut self,
        active: bool,
        source: Option<Box<dyn SpectrumSource>>,
        buffer: Vec<u8>,
        sensitivity: f32,
    ) {
        self.frame.mic.set(active, source, buffer, sensitivity);
        info!(
            active = self.frame.mic.is_active(),
            sensitivity = self.frame.mic.sensitivity(),
            "mic updated"
        );
    }

    pub fn set_mic_sensitivity(&mut self, sensitivity: f32) {
        self.frame.mic.set_sensitivity(sensitivity);
    }

    pub fn mic_active(&self) -> bool {
        self.frame.mic.is_active()
    }

    // ---- gaze follow ----

    pub fn is_following(&self) -> bool {
        self.gaze.is_enabled()
    }

    pub fn eye_norm_offset(&self) -> f32 {
        self.gaze.eye_norm_offset()
    }

    pub fn set_follow_sensitivity(&mut self, sensitivity: Option<f32>) {
        self.gaze.set_sensitivity(sensitivity);
    }

    /// Enable on press at `point`, disable on release. Enabling applies the
    /// press immediately and again after each configured retry delay.
    pub fn set_follow_enabled(&mut self, enabled: bool, point: Option<(f32, f32)>) {
        for id in self.gaze.set_enabled(enabled, point) {
            self.scheduler.cancel(id);
        }
        if !enabled {
            self.set_focus(0.0, 0.0);
            return;
        }
        let Some(point) = point else { return };
        self.apply_focus(point);
        let generation = self.gaze.generation();
        for delay in self.config.follow_retry_delays_ms.clone() {
            let id = self.scheduler.schedule(delay, TimerTask::FollowRetry { generation });
            self.gaze.track_retry(id);
        }
    }

    /// Pointer position in model-local pixels.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        if self.gaze.is_enabled() {
            self.apply_focus((x, y));
        }
    }

    fn apply_focus(&mut self, point: (f32, f32)) {
        let sensitivity = self.gaze.sensitivity().unwrap_or(self.config.follow_sensitivity);
        let (x, y) = gaze::focus_target(
            point,
            self.engine.original_size(),
            self.gaze.eye_norm_offset(),
            sensitivity,
        );
        self.set_focus(x, y);
    }

    fn set_focus(&mut self, x: f32, y: f32) {
        match self.engine.focus(x, y) {
            Ok(()) => {}
            Err(RigError::CapabilityUnavailable { .. }) => debug!("engine has no focus control"),
            Err(e) => warn!(error = %e, "focus failed"),
        }
    }

    fn calibrate(&mut self, attempt: u32) {
        let samples = self.engine.drawable_samples();
        if let Err(RigError::CapabilityUnavailable { .. }) = &samples {
            warn!("drawable geometry unavailable, eye offset stays 0");
            return;
        }
        let height = self.engine.original_size().1;
        match gaze::calibrate(samples, height, self.config.calibration_top_candidates) {
            Some(offset) => {
                self.gaze.set_eye_norm_offset(offset);
                debug!(offset, attempt, "eye line calibrated");
            }
            None if attempt + 1 < self.config.calibration_max_tries => {
                let task = TimerTask::Calibrate { attempt: attempt + 1 };
                self.scheduler.schedule(self.config.calibration_retry_ms, task);
            }
            None => warn!(attempts = attempt + 1, "eye line calibration gave up"),
        }
    }

    // ---- commands ----

    pub fn handle_command(&mut self, command: ControllerCommand) {
        match command {
            ControllerCommand::StartMotion { group, index } => {
                self.start_motion(&group, index);
            }
            ControllerCommand::StopAll => self.stop_all(),
            ControllerCommand::CancelSequence => self.cancel_sequence(),
            ControllerCommand::StopSequence => self.stop_sequence(),
            ControllerCommand::PlaySteps(steps) => self.play_steps(&steps),
            ControllerCommand::ClickPlayRandom => {
                self.click_play_random();
            }
            ControllerCommand::SetCheek { value, locked } => self.set_cheek(value, locked),
            ControllerCommand::SetEyeClosed { closed, locked } => {
                self.set_eye_closed(closed, locked)
            }
            ControllerCommand::SetMouth { value, locked } => self.set_mouth(value, locked),
            ControllerCommand::SetTear { value, locked } => self.set_tear(value, locked),
            ControllerCommand::SetSoulGem { value, locked } => self.set_soul_gem(value, locked),
            ControllerCommand::ClearMouthManualIfUnlocked => {
                self.clear_mouth_manual_if_unlocked();
            }
            ControllerCommand::SetMic { active, source, buffer, sensitivity } => {
                self.set_mic(active, source, buffer, sensitivity)
            }
            ControllerCommand::SetMicSensitivity(v) => self.set_mic_sensitivity(v),
            ControllerCommand::SetExpressionByName { name, response_tx } => {
                let found = self.set_expression_by_name(&name);
                if let Some(tx) = response_tx {
                    let _ = tx.send(found);
                }
            }
            ControllerCommand::SetExpressionByIndex(index) => {
                self.set_expression_by_index(index);
            }
            ControllerCommand::SetFollow { enabled, point } => {
                self.set_follow_enabled(enabled, point)
            }
            ControllerCommand::PointerMoved { x, y } => self.pointer_moved(x, y),
            ControllerCommand::SetFollowSensitivity(s) => self.set_follow_sensitivity(s),
            ControllerCommand::SubscribeRandomChoices { response_tx } => {
                let _ = response_tx.send(self.subscribe_random_choices());
            }
            ControllerCommand::GetOverride { channel, response_tx } => {
                let _ = response_tx.send(self.override_cell(channel));
            }
        }
    }
}
