//! Application context: the one current controller plus the command inbox
//! UI handlers post to.

use crossbeam_channel::{Receiver, Sender};
use rig_shared::{ControllerConfig, ModelSettings};
use tracing::{debug, info};
use uuid::Uuid;

use crate::commands::{ControllerCommand, Envelope};
use crate::controller::Controller;
use crate::model::ModelEngine;

pub struct Session<E: ModelEngine> {
    current: Option<Controller<E>>,
    command_tx: Sender<Envelope>,
    command_rx: Receiver<Envelope>,
    /// Whether the user is holding a press that should drive gaze
    follow_desired: bool,
}

impl<E: ModelEngine> Default for Session<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ModelEngine> Session<E> {
    pub fn new() -> Self {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        Self { current: None, command_tx, command_rx, follow_desired: false }
    }

    /// Sender for UI handlers. Commands carry the id of the controller they
    /// were meant for.
    pub fn channel(&self) -> Sender<Envelope> {
        self.command_tx.clone()
    }

    /// Replace the current model. Returns the new controller's id.
    pub fn load(&mut self, engine: E, settings: ModelSettings, config: ControllerConfig) -> Uuid {
        self.unload();
        let controller = Controller::new(engine, settings, config);
        let id = controller.id();
        info!(%id, "model loaded");
        self.current = Some(controller);
        id
    }

    /// Install an already-built controller, e.g. one with a fixed seed.
    pub fn install(&mut self, controller: Controller<E>) -> Uuid {
        self.unload();
        let id = controller.id();
        self.current = Some(controller);
        id
    }

    /// Drop the current controller together with its pending timers.
    pub fn unload(&mut self) -> Option<Controller<E>> {
        let mut old = self.current.take()?;
        old.cancel_sequence();
        old.set_follow_enabled(false, None);
        info!(id = %old.id(), "model unloaded");
        Some(old)
    }

    pub fn current(&self) -> Option<&Controller<E>> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Controller<E>> {
        self.current.as_mut()
    }

    pub fn current_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(|c| c.id())
    }

    pub fn follow_desired(&self) -> bool {
        self.follow_desired
    }

    /// One render frame: drain commands addressed to the current controller,
    /// then advance it.
    pub fn frame(&mut self, delta_ms: f64) {
        let pending: Vec<Envelope> = self.command_rx.try_iter().collect();
        let Some(controller) = self.current.as_mut() else {
            if !pending.is_empty() {
                debug!(dropped = pending.len(), "commands with no model loaded");
            }
            return;
        };
        for Envelope { target, command } in pending {
            if target == controller.id() {
                controller.handle_command(command);
            } else {
                debug!(%target, ?command, "command for a replaced model dropped");
            }
        }
        controller.update_frame(delta_ms);
    }

    /// Press on the model at a model-local point.
    pub fn press(&mut self, x: f32, y: f32) {
        self.follow_desired = true;
        if let Some(c) = self.current.as_mut() {
            c.set_follow_enabled(true, Some((x, y)));
        }
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        if !self.follow_desired {
            return;
        }
        if let Some(c) = self.current.as_mut() {
            c.pointer_moved(x, y);
        }
    }

    /// Release or cancel anywhere, on or off the model.
    pub fn release(&mut self) {
        self.follow_desired = false;
        if let Some(c) = self.current.as_mut() {
            if c.is_following() {
                c.set_follow_enabled(false, None);
            }
        }
    }

    /// Window lost focus; a held press can never be released now.
    pub fn blur(&mut self) {
        self.release();
    }

    /// Convenience for posting to the current controller from the owner side.
    pub fn post(&self, command: ControllerCommand) -> bool {
        match self.current_id() {
            Some(target) => self.command_tx.send(Envelope { target, command }).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overrides::Channel;
    use crate::sim::{HeadlessModel, demo_model};

    fn load(session: &mut Session<HeadlessModel>) -> Uuid {
        let model = demo_model();
        let settings = model.settings(&["f_01"]);
        session.load(model, settings, ControllerConfig::default())
    }

    #[test]
    fn commands_apply_on_next_frame() {
        let mut s = Session::new();
        load(&mut s);
        assert!(s.post(ControllerCommand::SetMouth { value: 0.4, locked: false }));
        assert!(!s.current().unwrap().override_cell(Channel::Mouth).manual_active);
        s.frame(16.0);
        assert_eq!(s.current().unwrap().override_cell(Channel::Mouth).value, 0.4);
    }

    #[test]
    fn commands_for_replaced_model_are_dropped() {
        let mut s = Session::new();
        let old = load(&mut s);
        let tx = s.channel();
        let new = load(&mut s);
        assert_ne!(old, new);
        let command = ControllerCommand::SetTear { value: 1.0, locked: true };
        tx.send(Envelope { target: old, command }).unwrap();
        s.frame(16.0);
        assert!(!s.current().unwrap().override_cell(Channel::Tear).manual_active);
    }

    #[test]
    fn blur_releases_follow_and_recenters() {
        let mut s = Session::new();
        load(&mut s);
        s.press(1000.0, 0.0);
        assert!(s.current().unwrap().is_following());
        assert_ne!(s.current().unwrap().engine().focus_target(), (0.0, 0.0));
        s.blur();
        assert!(!s.follow_desired());
        assert!(!s.current().unwrap().is_following());
        assert_eq!(s.current().unwrap().engine().focus_target(), (0.0, 0.0));
    }

    #[test]
    fn configured_freeze_epsilon_reaches_the_engine() {
        let mut s = Session::new();
        let model = demo_model();
        let settings = model.settings(&["f_01"]);
        let config = ControllerConfig { freeze_epsilon_secs: 0.05, ..Default::default() };
        s.load(model, settings, config);
        let c = s.current_mut().unwrap();
        c.start_motion("Motion", 1);
        let angle = |pose: Vec<(String, f32)>| {
            pose.into_iter().find(|(id, _)| id == "ParamAngleX").map(|(_, v)| v).unwrap()
        };
        let late = angle(c.engine_mut().pose_at(5.0));
        let pinned = angle(c.engine_mut().pose_at(1.45));
        assert!((late - 29.0).abs() < 1e-3, "angle {late}");
        assert!((late - pinned).abs() < 1e-6);
    }

    #[test]
    fn unload_returns_quiet_controller() {
        let mut s = Session::new();
        load(&mut s);
        let steps = [rig_shared::SequenceStep::wait(500.0), rig_shared::SequenceStep::wait(500.0)];
        s.current_mut().unwrap().play_steps(&steps);
        s.press(10.0, 10.0);
        let old = s.unload().unwrap();
        assert!(!old.is_playing());
        assert!(!old.is_following());
        assert_eq!(old.pending_timers(), 0);
        assert!(s.current().is_none());
        s.frame(16.0);
    }
}
