use crossbeam_channel::{Receiver, Sender};
use rig_shared::{RandomChoice, SequenceStep};
use uuid::Uuid;

use crate::lipsync::SpectrumSource;
use crate::overrides::{Channel, OverrideCell};

/// Work posted by UI handlers, applied on the frame thread.
pub enum ControllerCommand {
    StartMotion { group: String, index: usize },
    StopAll,
    CancelSequence,
    StopSequence,
    PlaySteps(Vec<SequenceStep>),
    ClickPlayRandom,

    // Manual overrides
    SetCheek { value: f32, locked: bool },
    SetEyeClosed { closed: bool, locked: bool },
    SetMouth { value: f32, locked: bool },
    SetTear { value: f32, locked: bool },
    SetSoulGem { value: f32, locked: bool },
    ClearMouthManualIfUnlocked,

    // Lip-sync
    SetMic {
        active: bool,
        source: Option<Box<dyn SpectrumSource>>,
        buffer: Vec<u8>,
        sensitivity: f32,
    },
    SetMicSensitivity(f32),

    SetExpressionByName { name: String, response_tx: Option<Sender<bool>> },
    SetExpressionByIndex(usize),

    // Gaze follow, pointer in model-local pixels
    SetFollow { enabled: bool, point: Option<(f32, f32)> },
    PointerMoved { x: f32, y: f32 },
    SetFollowSensitivity(Option<f32>),

    SubscribeRandomChoices { response_tx: Sender<Receiver<RandomChoice>> },
    GetOverride { channel: Channel, response_tx: Sender<OverrideCell> },
}

impl std::fmt::Debug for ControllerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::StartMotion { .. } => "StartMotion",
            Self::StopAll => "StopAll",
            Self::CancelSequence => "CancelSequence",
            Self::StopSequence => "StopSequence",
            Self::PlaySteps(_) => "PlaySteps",
            Self::ClickPlayRandom => "ClickPlayRandom",
            Self::SetCheek { .. } => "SetCheek",
            Self::SetEyeClosed { .. } => "SetEyeClosed",
            Self::SetMouth { .. } => "SetMouth",
            Self::SetTear { .. } => "SetTear",
            Self::SetSoulGem { .. } => "SetSoulGem",
            Self::ClearMouthManualIfUnlocked => "ClearMouthManualIfUnlocked",
            Self::SetMic { .. } => "SetMic",
            Self::SetMicSensitivity(_) => "SetMicSensitivity",
            Self::SetExpressionByName { .. } => "SetExpressionByName",
            Self::SetExpressionByIndex(_) => "SetExpressionByIndex",
            Self::SetFollow { .. } => "SetFollow",
            Self::PointerMoved { .. } => "PointerMoved",
            Self::SetFollowSensitivity(_) => "SetFollowSensitivity",
            Self::SubscribeRandomChoices { .. } => "SubscribeRandomChoices",
            Self::GetOverride { .. } => "GetOverride",
        };
        f.write_str(name)
    }
}

/// A command addressed to one controller instance.
#[derive(Debug)]
pub struct Envelope {
    pub target: Uuid,
    pub command: ControllerCommand,
}
