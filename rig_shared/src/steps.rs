use serde::{Deserialize, Serialize};

/// One instruction of a scripted sequence.
///
/// Present fields are applied at once when the step is reached, then the
/// sequencer waits `time_ms` before moving on. Field names follow the scenario
/// JSON (`motionIndex`, `faceIndex`, `eyeOpen`, `timeMs`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cheek: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eye_open: Option<f32>,
    #[serde(default)]
    pub time_ms: f64,
}

impl SequenceStep {
    pub fn wait(time_ms: f64) -> Self {
        Self { time_ms, ..Default::default() }
    }

    pub fn motion(group: impl Into<String>, index: usize, time_ms: f64) -> Self {
        Self {
            motion_group: Some(group.into()),
            motion_index: Some(index),
            time_ms,
            ..Default::default()
        }
    }

    /// Dwell after this step; negative and NaN become 0.
    pub fn dwell_ms(&self) -> f64 {
        if self.time_ms.is_finite() { self.time_ms.max(0.0) } else { 0.0 }
    }

    /// Parse a scenario step list.
    pub fn list_from_json(raw: &str) -> Result<Vec<Self>, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Everything the random personality picked, mirrored to observers so a UI
/// can reflect the selection in its own controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomChoice {
    pub motion_group: String,
    pub motion_index: usize,
    pub face_index: Option<usize>,
    pub face_name: Option<String>,
    pub cheek: f32,
    pub eye_close: bool,
    pub eye_open: f32,
    pub mouth_open: bool,
    pub mouth: f32,
    pub tear: f32,
    pub soul_gem: f32,
    pub time_ms: f64,
}
