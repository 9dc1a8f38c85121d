//! Headless reference model: keyframe clips, a parameter table and a single
//! FORCE-style playback slot. Enough engine to drive the controller without a
//! renderer, used by the tests and the headless runner.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use rig_shared::{ModelSettings, MotionDefinition, RigError, RigResult};
use tracing::debug;

use crate::model::{DrawableSample, FrameHooks, ModelEngine, ParameterSink};
use crate::motion::{FreezePolicy, MotionClip, NativeClip, QueueEntry};

/// Collects every write, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub writes: Vec<(String, f32)>,
}

impl ParameterSink for RecordingSink {
    fn set_parameter(&mut self, id: &str, value: f32) -> RigResult<()> {
        self.writes.push((id.to_string(), value));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipFlags {
    pub looped: bool,
    pub loop_fade_in: bool,
    pub fade_out_secs: f64,
}

/// Piecewise-linear curves over one parameter each.
#[derive(Debug, Clone)]
pub struct KeyframeClip {
    duration: Option<f64>,
    curves: Vec<(String, Vec<(f64, f32)>)>,
    flags: Rc<Cell<ClipFlags>>,
}

impl KeyframeClip {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            duration,
            curves: Vec::new(),
            flags: Rc::new(Cell::new(ClipFlags {
                looped: false,
                loop_fade_in: true,
                fade_out_secs: 1.0,
            })),
        }
    }

    pub fn with_curve(mut self, param: impl Into<String>, keys: Vec<(f64, f32)>) -> Self {
        self.curves.push((param.into(), keys));
        self
    }

    /// Handle that still observes the flags after the clip is boxed.
    pub fn flags(&self) -> Rc<Cell<ClipFlags>> {
        self.flags.clone()
    }

    /// Fresh copy with its own flags, as the engine does per start.
    fn instantiate(&self) -> Self {
        Self {
            duration: self.duration,
            curves: self.curves.clone(),
            flags: Rc::new(Cell::new(self.flags.get())),
        }
    }

    fn sample(keys: &[(f64, f32)], t: f64) -> f32 {
        let Some(&(t0, v0)) = keys.first() else { return 0.0 };
        if t <= t0 {
            return v0;
        }
        for pair in keys.windows(2) {
            let (a, va) = pair[0];
            let (b, vb) = pair[1];
            if t <= b {
                let k = if b > a { ((t - a) / (b - a)) as f32 } else { 1.0 };
                return va + (vb - va) * k;
            }
        }
        keys.last().map(|&(_, v)| v).unwrap_or(v0)
    }
}

impl NativeClip for KeyframeClip {
    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn set_loop(&mut self, looped: bool) -> RigResult<()> {
        let mut f = self.flags.get();
        f.looped = looped;
        self.flags.set(f);
        Ok(())
    }

    fn set_loop_fade_in(&mut self, fade_in: bool) -> RigResult<()> {
        let mut f = self.flags.get();
        f.loop_fade_in = fade_in;
        self.flags.set(f);
        Ok(())
    }

    fn set_fade_out_time(&mut self, secs: f64) -> RigResult<()> {
        let mut f = self.flags.get();
        f.fade_out_secs = secs;
        self.flags.set(f);
        Ok(())
    }

    fn update_parameters(
        &mut self,
        sink: &mut dyn ParameterSink,
        time_secs: f64,
        weight: f32,
        entry: &mut QueueEntry,
    ) {
        let mut t = (time_secs - entry.start_time).max(0.0);
        if let Some(d) = self.duration.filter(|d| *d > 0.0) {
            t = if self.flags.get().looped { t % d } else { t.min(d) };
        }
        for (param, keys) in &self.curves {
            let _ = sink.set_parameter(param, Self::sample(keys, t) * weight);
        }
    }
}

struct ActiveMotion {
    clip: MotionClip,
    entry: QueueEntry,
    priority: u8,
}

/// A renderer-free model.
pub struct HeadlessModel {
    params: HashMap<String, f32>,
    strict: bool,
    write_log: Vec<(String, f32)>,
    motions: Vec<(String, Vec<(MotionDefinition, KeyframeClip)>)>,
    expressions: usize,
    current_expression: Option<usize>,
    active: Option<ActiveMotion>,
    policy: FreezePolicy,
    time_secs: f64,
    elapsed_ms: f64,
    focus: (f32, f32),
    focus_supported: bool,
    drawables: Vec<DrawableSample>,
    size: (f32, f32),
    reservation_resets: usize,
}

impl HeadlessModel {
    pub fn new(size: (f32, f32)) -> Self {
        let params = [
            rig_shared::PARAM_EYE_L_OPEN,
            rig_shared::PARAM_EYE_R_OPEN,
            rig_shared::PARAM_CHEEK,
            rig_shared::PARAM_MOUTH_OPEN_Y,
            rig_shared::PARAM_TEAR,
            rig_shared::PARAM_SOUL_GEM,
            rig_shared::PARAM_BREATH,
            "ParamAngleX",
            "ParamAngleY",
            "ParamBodyAngleX",
        ]
        .into_iter()
        .map(|id| (id.to_string(), if id.ends_with("Open") { 1.0 } else { 0.0 }))
        .collect();

        Self {
            params,
            strict: false,
            write_log: Vec::new(),
            motions: Vec::new(),
            expressions: 0,
            current_expression: None,
            active: None,
            policy: FreezePolicy::default(),
            time_secs: 0.0,
            elapsed_ms: 0.0,
            focus: (0.0, 0.0),
            focus_supported: true,
            drawables: Vec::new(),
            size,
            reservation_resets: 0,
        }
    }

    /// Reject writes to parameters the rig does not declare.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_motion(mut self, group: &str, def: MotionDefinition, clip: KeyframeClip) -> Self {
        match self.motions.iter_mut().find(|(g, _)| g == group) {
            Some((_, list)) => list.push((def, clip)),
            None => self.motions.push((group.to_string(), vec![(def, clip)])),
        }
        self
    }

    pub fn with_expressions(mut self, count: usize) -> Self {
        self.expressions = count;
        self
    }

    pub fn with_drawables(mut self, drawables: Vec<DrawableSample>) -> Self {
        self.drawables = drawables;
        self
    }

    pub fn without_focus(mut self) -> Self {
        self.focus_supported = false;
        self
    }

    pub fn set_drawables(&mut self, drawables: Vec<DrawableSample>) {
        self.drawables = drawables;
    }

    /// Catalogue matching the registered motions.
    pub fn settings(&self, expression_names: &[&str]) -> ModelSettings {
        ModelSettings::new(
            self.motions
                .iter()
                .map(|(g, list)| rig_shared::MotionGroup {
                    name: g.clone(),
                    motions: list.iter().map(|(d, _)| d.clone()).collect(),
                })
                .collect(),
            expression_names.iter().map(|n| rig_shared::ExpressionDefinition::named(*n)).collect(),
        )
    }

    pub fn parameter(&self, id: &str) -> Option<f32> {
        self.params.get(id).copied()
    }

    pub fn time_secs(&self) -> f64 {
        self.time_secs
    }

    pub fn focus_target(&self) -> (f32, f32) {
        self.focus
    }

    pub fn current_expression(&self) -> Option<usize> {
        self.current_expression
    }

    pub fn active_motion(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.clip.name())
    }

    pub fn reservation_resets(&self) -> usize {
        self.reservation_resets
    }

    /// Writes since the last call, oldest first.
    pub fn take_writes(&mut self) -> Vec<(String, f32)> {
        std::mem::take(&mut self.write_log)
    }

    /// Pose of the active clip at an arbitrary time, without advancing.
    pub fn pose_at(&mut self, time_secs: f64) -> Vec<(String, f32)> {
        let mut sink = RecordingSink::default();
        if let Some(active) = self.active.as_mut() {
            let mut entry = active.entry;
            active.clip.update_parameters(&mut sink, time_secs, 1.0, &mut entry);
        }
        sink.writes
    }

    fn advance_motions(&mut self) {
        let Some(mut active) = self.active.take() else { return };
        let now = self.time_secs;
        active.clip.update_parameters(self, now, 1.0, &mut active.entry);
        if active.entry.is_finished(now) {
            debug!(clip = active.clip.name(), "motion finished");
        } else {
            self.active = Some(active);
        }
    }
}

impl ParameterSink for HeadlessModel {
    fn set_parameter(&mut self, id: &str, value: f32) -> RigResult<()> {
        if self.strict && !self.params.contains_key(id) {
            return Err(RigError::UnknownParameter(id.to_string()));
        }
        self.params.insert(id.to_string(), value);
        self.write_log.push((id.to_string(), value));
        Ok(())
    }
}

impl ModelEngine for HeadlessModel {
    fn update(&mut self, delta_ms: f64, hooks: &mut dyn FrameHooks) -> RigResult<()> {
        self.time_secs += delta_ms / 1000.0;
        self.elapsed_ms += delta_ms;
        hooks.before_model_update(self);
        self.advance_motions();
        let elapsed = self.elapsed_ms;
        hooks.natural_movements(self, elapsed);
        hooks.after_motion_update(self, delta_ms);
        Ok(())
    }

    fn set_clip_policy(&mut self, policy: FreezePolicy) {
        self.policy = policy;
    }

    fn start_motion(&mut self, group: &str, index: usize, priority: u8) -> RigResult<()> {
        if let Some(active) = &self.active {
            if priority < active.priority {
                return Ok(());
            }
        }
        let (def, template) = self
            .motions
            .iter()
            .find(|(g, _)| g == group)
            .and_then(|(_, list)| list.get(index))
            .ok_or_else(|| RigError::UnknownMotion { group: group.to_string(), index })?;
        let clip = self.policy.wrap(Box::new(template.instantiate()), def);
        let start = self.time_secs;
        let end = clip.duration().map(|d| start + d);
        self.active = Some(ActiveMotion { clip, entry: QueueEntry::new(start, end), priority });
        Ok(())
    }

    fn set_expression(&mut self, index: usize) -> RigResult<()> {
        if index >= self.expressions {
            return Err(RigError::UnknownExpression(index.to_string()));
        }
        self.current_expression = Some(index);
        Ok(())
    }

    fn stop_all_motions(&mut self) -> RigResult<()> {
        self.active = None;
        Ok(())
    }

    fn reset_motion_reservation(&mut self) -> RigResult<()> {
        self.reservation_resets += 1;
        Ok(())
    }

    fn focus(&mut self, x: f32, y: f32) -> RigResult<()> {
        if !self.focus_supported {
            return Err(RigError::unavailable("focus"));
        }
        self.focus = (x, y);
        Ok(())
    }

    fn drawable_samples(&self) -> RigResult<Vec<DrawableSample>> {
        Ok(self.drawables.clone())
    }

    fn original_size(&self) -> (f32, f32) {
        self.size
    }
}

/// The demo rig: an idle loop, two gestures and a few expressions.
pub fn demo_model() -> HeadlessModel {
    HeadlessModel::new((1000.0, 2000.0))
        .with_motion(
            "Motion",
            MotionDefinition::named("motion_000"),
            KeyframeClip::new(Some(3.0))
                .with_curve("ParamAngleX", vec![(0.0, 0.0), (1.5, 5.0), (3.0, 0.0)])
                .with_curve("ParamBodyAngleX", vec![(0.0, 0.0), (3.0, 0.0)]),
        )
        .with_motion(
            "Motion",
            MotionDefinition::named("motion_100"),
            KeyframeClip::new(Some(1.5))
                .with_curve("ParamAngleX", vec![(0.0, 0.0), (1.5, 30.0)])
                .with_curve("ParamAngleY", vec![(0.0, 0.0), (0.75, -10.0), (1.5, 12.0)]),
        )
        .with_motion(
            "Motion",
            MotionDefinition::named("motion_200"),
            KeyframeClip::new(Some(2.0))
                .with_curve("ParamBodyAngleX", vec![(0.0, 0.0), (2.0, -8.0)]),
        )
        .with_expressions(3)
        .with_drawables(
            [120.0, 300.0, 310.0, 320.0, 900.0, 1500.0]
                .into_iter()
                .map(|y| DrawableSample { vertical_centroid: y })
                .collect(),
        )
}
