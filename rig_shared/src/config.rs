use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::RigError;

/// Tuning knobs of the animation core. Every field has a default so a partial
/// TOML file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Idle time between blinks is drawn uniformly from [min, max).
    pub blink_interval_min_ms: f64,
    pub blink_interval_max_ms: f64,
    /// Countdown before the very first blink after load.
    pub first_blink_ms: f64,
    pub blink_closing_ms: f64,
    pub blink_closed_ms: f64,
    pub blink_opening_ms: f64,

    pub breath_cycle_secs: f64,

    /// How far before the authored end a frozen clip is evaluated.
    pub freeze_epsilon_secs: f64,

    pub eye_tween_ms: f64,
    pub random_dwell_ms: f64,

    pub follow_sensitivity: f32,
    pub follow_retry_delays_ms: Vec<f64>,

    pub calibration_max_tries: u32,
    pub calibration_retry_ms: f64,
    pub calibration_top_candidates: usize,

    pub mic_sensitivity: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            blink_interval_min_ms: 4500.0,
            blink_interval_max_ms: 8000.0,
            first_blink_ms: 6500.0,
            blink_closing_ms: 100.0,
            blink_closed_ms: 50.0,
            blink_opening_ms: 150.0,
            breath_cycle_secs: 3.2345,
            freeze_epsilon_secs: 0.001,
            eye_tween_ms: 300.0,
            random_dwell_ms: 4200.0,
            follow_sensitivity: 1.0,
            follow_retry_delays_ms: vec![50.0, 150.0, 350.0],
            calibration_max_tries: 20,
            calibration_retry_ms: 150.0,
            calibration_top_candidates: 50,
            mic_sensitivity: 1.0,
        }
    }
}

impl ControllerConfig {
    pub fn from_toml(raw: &str) -> Result<Self, RigError> {
        let cfg: Self = toml::from_str(raw).map_err(|e| RigError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults, then the file if present, then `RIG__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, RigError> {
        let mut cfg = match path {
            Some(p) if p.exists() => {
                let raw = fs::read_to_string(p)
                    .map_err(|e| RigError::Config(format!("{}: {e}", p.display())))?;
                toml::from_str(&raw).map_err(|e| RigError::Config(e.to_string()))?
            }
            _ => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply overrides from a key lookup (the environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let num = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f64>().ok());

        if let Some(v) = num("RIG__BLINK_INTERVAL_MIN_MS") {
            self.blink_interval_min_ms = v;
        }
        if let Some(v) = num("RIG__BLINK_INTERVAL_MAX_MS") {
            self.blink_interval_max_ms = v;
        }
        if let Some(v) = num("RIG__BREATH_CYCLE_SECS") {
            self.breath_cycle_secs = v;
        }
        if let Some(v) = num("RIG__FOLLOW_SENSITIVITY") {
            self.follow_sensitivity = v as f32;
        }
        if let Some(v) = num("RIG__MIC_SENSITIVITY") {
            self.mic_sensitivity = v as f32;
        }
        if let Some(v) = num("RIG__RANDOM_DWELL_MS") {
            self.random_dwell_ms = v;
        }
    }

    pub fn validate(&self) -> Result<(), RigError> {
        let (min, max) = (self.blink_interval_min_ms, self.blink_interval_max_ms);
        if !(min > 0.0 && min < max) {
            return Err(RigError::Config(format!(
                "blink interval window [{min}, {max}) is empty"
            )));
        }
        for (name, v) in [
            ("blink_closing_ms", self.blink_closing_ms),
            ("blink_closed_ms", self.blink_closed_ms),
            ("blink_opening_ms", self.blink_opening_ms),
            ("breath_cycle_secs", self.breath_cycle_secs),
        ] {
            if !(v > 0.0) {
                return Err(RigError::Config(format!("{name} must be positive, got {v}")));
            }
        }
        if !(self.freeze_epsilon_secs > 0.0 && self.freeze_epsilon_secs < 0.1) {
            return Err(RigError::Config(format!(
                "freeze_epsilon_secs out of range: {}",
                self.freeze_epsilon_secs
            )));
        }
        if !self.follow_sensitivity.is_finite() || self.follow_sensitivity == 0.0 {
            return Err(RigError::Config("follow_sensitivity must be finite and non-zero".into()));
        }
        Ok(())
    }
}
