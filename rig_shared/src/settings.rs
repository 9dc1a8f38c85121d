use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RigError;
use crate::DEFAULT_MOTION_GROUP;

lazy_static::lazy_static! {
    /// `motion_0NN`, optionally followed by an extension or separator.
    static ref IDLE_MOTION: Regex = Regex::new(r"(?i)^motion_0\d\d\b").unwrap();
    static ref MOTION_NUMBER: Regex = Regex::new(r"(?i)^motion_(\d+)").unwrap();
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MotionDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub fade_in_time: Option<f32>,
    #[serde(default)]
    pub fade_out_time: Option<f32>,
}

impl MotionDefinition {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Default::default() }
    }

    /// Last path segment of the name, or of the file when unnamed.
    fn key(&self) -> &str {
        let raw = self
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.file.as_deref())
            .unwrap_or("");
        raw.rsplit('/').next().unwrap_or(raw)
    }

    /// Name shown to users: `Name`, else the file stem.
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => self.key().split('.').next().unwrap_or("").to_string(),
        }
    }

    /// Ambient loops are numbered `motion_000`..`motion_099`.
    pub fn is_idle_category(&self) -> bool {
        is_idle_motion_name(self.key())
    }
}

pub fn is_idle_motion_name(name: &str) -> bool {
    IDLE_MOTION.is_match(name)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpressionDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub file: Option<String>,
}

impl ExpressionDefinition {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), file: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionGroup {
    pub name: String,
    pub motions: Vec<MotionDefinition>,
}

/// The motion and expression catalogue of one model, in manifest order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSettings {
    pub groups: Vec<MotionGroup>,
    pub expressions: Vec<ExpressionDefinition>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawManifest {
    #[serde(default)]
    file_references: RawFileReferences,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawFileReferences {
    #[serde(default)]
    motions: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    expressions: Vec<ExpressionDefinition>,
}

impl ModelSettings {
    pub fn new(groups: Vec<MotionGroup>, expressions: Vec<ExpressionDefinition>) -> Self {
        Self { groups, expressions }
    }

    /// Parse the `FileReferences` block of a `model3.json`.
    pub fn from_json(raw: &str) -> Result<Self, RigError> {
        let manifest: RawManifest =
            serde_json::from_str(raw).map_err(|e| RigError::Manifest(e.to_string()))?;
        let mut groups = Vec::with_capacity(manifest.file_references.motions.len());
        for (name, value) in manifest.file_references.motions {
            let motions: Vec<MotionDefinition> = serde_json::from_value(value)
                .map_err(|e| RigError::Manifest(format!("motion group {name}: {e}")))?;
            groups.push(MotionGroup { name, motions });
        }
        Ok(Self { groups, expressions: manifest.file_references.expressions })
    }

    /// First group in manifest order.
    pub fn default_group(&self) -> &str {
        self.groups.first().map(|g| g.name.as_str()).unwrap_or(DEFAULT_MOTION_GROUP)
    }

    pub fn group(&self, name: &str) -> Option<&MotionGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn motion(&self, group: &str, index: usize) -> Option<&MotionDefinition> {
        self.group(group).and_then(|g| g.motions.get(index))
    }

    /// `motion_NNN` number -> index within the default group.
    pub fn motion_index_by_number(&self) -> HashMap<u32, usize> {
        let mut out = HashMap::new();
        let Some(group) = self.group(self.default_group()) else {
            return out;
        };
        for (i, def) in group.motions.iter().enumerate() {
            let name = def.display_name();
            if let Some(n) = MOTION_NUMBER
                .captures(&name)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
            {
                out.insert(n, i);
            }
        }
        out
    }

    /// Indices of the default group that are one-shot gestures.
    pub fn gesture_indices(&self) -> Vec<usize> {
        self.group(self.default_group())
            .map(|g| {
                g.motions
                    .iter()
                    .enumerate()
                    .filter(|(_, d)| !d.display_name().is_empty() && !d.is_idle_category())
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Match on the part before the first `.` so `face_01` finds `face_01.exp3.json`.
    pub fn expression_index_by_name(&self, name: &str) -> Option<usize> {
        let wanted = stem(name);
        self.expressions.iter().position(|e| stem(&e.name) == wanted)
    }
}

fn stem(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}
