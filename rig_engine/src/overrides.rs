use rig_shared::{clamp01, finite_or_zero};

/// A facial channel that UI or sequences can take over from automatic control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Cheek,
    Eye,
    Mouth,
    Tear,
    SoulGem,
}

impl Channel {
    pub const ALL: [Channel; 5] =
        [Channel::Cheek, Channel::Eye, Channel::Mouth, Channel::Tear, Channel::SoulGem];

    fn slot(self) -> usize {
        match self {
            Channel::Cheek => 0,
            Channel::Eye => 1,
            Channel::Mouth => 2,
            Channel::Tear => 3,
            Channel::SoulGem => 4,
        }
    }

    /// Cheek is a small signed scalar; the rest are [0, 1].
    pub fn normalize(self, value: f32) -> f32 {
        match self {
            Channel::Cheek => finite_or_zero(value),
            _ => clamp01(value),
        }
    }

    pub fn param_ids(self) -> &'static [&'static str] {
        match self {
            Channel::Cheek => &[rig_shared::PARAM_CHEEK],
            Channel::Eye => &[rig_shared::PARAM_EYE_L_OPEN, rig_shared::PARAM_EYE_R_OPEN],
            Channel::Mouth => &[rig_shared::PARAM_MOUTH_OPEN_Y],
            Channel::Tear => &[rig_shared::PARAM_TEAR],
            Channel::SoulGem => &[rig_shared::PARAM_SOUL_GEM],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverrideCell {
    pub value: f32,
    pub manual_active: bool,
    pub locked: bool,
}

/// One cell per channel. While a cell is manual its value is written last
/// every frame; otherwise automatic sources own the channel.
#[derive(Debug, Clone)]
pub struct OverrideStore {
    cells: [OverrideCell; 5],
}

impl Default for OverrideStore {
    fn default() -> Self {
        let mut cells = [OverrideCell { value: 0.0, manual_active: false, locked: false }; 5];
        cells[Channel::Eye.slot()].value = 1.0;
        Self { cells }
    }
}

impl OverrideStore {
    pub fn cell(&self, channel: Channel) -> &OverrideCell {
        &self.cells[channel.slot()]
    }

    /// UI set: value, lock flag, and take manual control.
    pub fn set(&mut self, channel: Channel, value: f32, locked: bool) {
        let cell = &mut self.cells[channel.slot()];
        cell.value = channel.normalize(value);
        cell.locked = locked;
        cell.manual_active = true;
    }

    /// Sequencer set: take manual control without touching the lock.
    pub fn activate(&mut self, channel: Channel, value: f32) {
        let cell = &mut self.cells[channel.slot()];
        cell.value = channel.normalize(value);
        cell.manual_active = true;
    }

    pub fn set_value(&mut self, channel: Channel, value: f32) {
        self.cells[channel.slot()].value = channel.normalize(value);
    }

    pub fn set_locked(&mut self, channel: Channel, locked: bool) {
        self.cells[channel.slot()].locked = locked;
    }

    /// Hand the channel back to automatic control unless it is pinned.
    pub fn release_if_unlocked(&mut self, channel: Channel) -> bool {
        let cell = &mut self.cells[channel.slot()];
        if cell.locked {
            return false;
        }
        cell.manual_active = false;
        true
    }

    /// Release unconditionally, resetting the value to its automatic rest.
    pub fn release(&mut self, channel: Channel) {
        let cell = &mut self.cells[channel.slot()];
        cell.manual_active = false;
        if channel == Channel::Eye {
            cell.value = 1.0;
        }
    }

    /// The value to write this frame, if the channel is manual.
    pub fn output(&self, channel: Channel) -> Option<f32> {
        let cell = self.cell(channel);
        cell.manual_active.then(|| channel.normalize(cell.value))
    }
}

pub fn ease_out_cubic(t: f64) -> f64 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    1.0 - (1.0 - t).powi(3)
}

/// Eased transition of the manual eye value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeTween {
    from: f32,
    to: f32,
    duration_ms: f64,
    elapsed_ms: f64,
    /// Give the eye back to blink once the tween lands on open.
    release_to_auto: bool,
}

impl EyeTween {
    pub fn new(from: f32, to: f32, duration_ms: f64, release_to_auto: bool) -> Self {
        Self { from, to, duration_ms: duration_ms.max(1.0), elapsed_ms: 0.0, release_to_auto }
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    pub fn releases_to_auto(&self) -> bool {
        self.release_to_auto
    }

    /// Advance and return `(value, done)`.
    pub fn advance(&mut self, delta_ms: f64) -> (f32, bool) {
        if delta_ms.is_finite() && delta_ms > 0.0 {
            self.elapsed_ms += delta_ms;
        }
        let k = (self.elapsed_ms / self.duration_ms).min(1.0);
        let v = self.from + (self.to - self.from) * ease_out_cubic(k) as f32;
        if k >= 1.0 { (self.to, true) } else { (clamp01(v), false) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_automatic() {
        let s = OverrideStore::default();
        for ch in Channel::ALL {
            assert!(!s.cell(ch).manual_active);
            assert_eq!(s.output(ch), None);
        }
        assert_eq!(s.cell(Channel::Eye).value, 1.0);
    }

    #[test]
    fn set_clamps_except_cheek() {
        let mut s = OverrideStore::default();
        s.set(Channel::Tear, 3.0, false);
        s.set(Channel::Cheek, -1.0, true);
        s.set(Channel::Mouth, f32::NAN, false);
        assert_eq!(s.output(Channel::Tear), Some(1.0));
        assert_eq!(s.output(Channel::Cheek), Some(-1.0));
        assert_eq!(s.output(Channel::Mouth), Some(0.0));
        assert!(s.cell(Channel::Cheek).locked);
    }

    #[test]
    fn release_respects_lock() {
        let mut s = OverrideStore::default();
        s.set(Channel::Mouth, 0.8, true);
        assert!(!s.release_if_unlocked(Channel::Mouth));
        assert_eq!(s.output(Channel::Mouth), Some(0.8));
        s.set_locked(Channel::Mouth, false);
        assert!(s.release_if_unlocked(Channel::Mouth));
        assert_eq!(s.output(Channel::Mouth), None);
        // The stored value survives for the next activation.
        assert_eq!(s.cell(Channel::Mouth).value, 0.8);
    }

    #[test]
    fn activate_keeps_lock() {
        let mut s = OverrideStore::default();
        s.set(Channel::Cheek, 1.0, true);
        s.activate(Channel::Cheek, 2.0);
        assert!(s.cell(Channel::Cheek).locked);
        assert_eq!(s.output(Channel::Cheek), Some(2.0));
    }

    #[test]
    fn tween_eases_to_target() {
        let mut t = EyeTween::new(1.0, 0.0, 300.0, false);
        let (v1, done1) = t.advance(100.0);
        assert!(!done1);
        assert!(v1 < 0.5, "ease-out front-loads the change: {v1}");
        let (v2, done2) = t.advance(250.0);
        assert!(done2);
        assert_eq!(v2, 0.0);
    }

    #[test]
    fn ease_out_cubic_bounds() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(5.0), 1.0);
        assert_eq!(ease_out_cubic(f64::NAN), 0.0);
    }
}
