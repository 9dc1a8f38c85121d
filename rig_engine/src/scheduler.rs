/// Work that runs later on the frame thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Drain the next sequence step, if the sequence is still `generation`.
    SequenceStep { generation: u64 },
    /// Re-apply the press position while follow is still `generation`.
    FollowRetry { generation: u64 },
    /// Retry eye-centroid calibration.
    Calibrate { attempt: u32 },
}

pub type TimerId = u64;

#[derive(Debug, Clone, Copy)]
struct Timer {
    id: TimerId,
    due_ms: f64,
    task: TimerTask,
}

/// Delayed callbacks on a clock advanced by the frame loop.
///
/// Timers scheduled while due timers are being run only fire on the next
/// `take_due`, so a zero delay means "next tick", never "now".
#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: f64,
    next_id: TimerId,
    pending: Vec<Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, delta_ms: f64) {
        if delta_ms.is_finite() && delta_ms > 0.0 {
            self.now_ms += delta_ms;
        }
    }

    pub fn schedule(&mut self, delay_ms: f64, task: TimerTask) -> TimerId {
        let delay = if delay_ms.is_finite() { delay_ms.max(0.0) } else { 0.0 };
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(Timer { id, due_ms: self.now_ms + delay, task });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.id != id);
        self.pending.len() != before
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Remove and return every task due by now, earliest first.
    pub fn take_due(&mut self) -> Vec<TimerTask> {
        let now = self.now_ms;
        let mut due: Vec<Timer> = Vec::new();
        self.pending.retain(|t| {
            if t.due_ms <= now {
                due.push(*t);
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.id.cmp(&b.id)));
        due.into_iter().map(|t| t.task).collect()
    }
}
