use std::collections::VecDeque;

use rig_shared::SequenceStep;

use crate::scheduler::{Scheduler, TimerId, TimerTask};

/// Linear step player. Steps are consumed front to back; each one is applied
/// by the controller, then the next is armed after the step's dwell.
#[derive(Debug, Default)]
pub struct Sequencer {
    /// Remaining steps, front is next
    steps: VecDeque<SequenceStep>,
    playing: bool,
    /// Bumped on every cancel so timers armed by an older run go inert
    generation: u64,
    /// Pending timer for the next step
    timer: Option<TimerId>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop, drop the queue and any pending timer. Safe when idle.
    pub fn cancel(&mut self, scheduler: &mut Scheduler) {
        self.playing = false;
        if let Some(id) = self.timer.take() {
            scheduler.cancel(id);
        }
        self.steps.clear();
        self.generation += 1;
    }

    /// Cancel whatever runs and queue `steps`. Returns false for an empty list.
    pub fn load(&mut self, steps: &[SequenceStep], scheduler: &mut Scheduler) -> bool {
        self.cancel(scheduler);
        self.steps = steps.iter().cloned().collect();
        self.playing = !self.steps.is_empty();
        self.playing
    }

    /// Mark playing with an empty queue; the run ends when the armed dwell elapses.
    pub fn begin_single(&mut self, scheduler: &mut Scheduler) {
        self.cancel(scheduler);
        self.playing = true;
    }

    /// Whether a fired timer still belongs to the current run.
    pub fn accepts(&self, generation: u64) -> bool {
        self.playing && generation == self.generation
    }

    /// Next step to apply. An exhausted queue ends the run.
    pub fn next_step(&mut self) -> Option<SequenceStep> {
        if !self.playing {
            return None;
        }
        self.timer = None;
        let step = self.steps.pop_front();
        if step.is_none() {
            self.playing = false;
        }
        step
    }

    /// Schedule the following step after `delay_ms`.
    pub fn arm(&mut self, scheduler: &mut Scheduler, delay_ms: f64) {
        if !self.playing {
            return;
        }
        let task = TimerTask::SequenceStep { generation: self.generation };
        let id = scheduler.schedule(delay_ms, task);
        self.timer = Some(id);
    }
}
