use thiserror::Error;

/// Failures at the boundary between the animation core and the model engine,
/// plus the loading errors of manifests and tuning files.
///
/// None of these are fatal to a running frame: the reconciler skips the write,
/// the freeze policy falls back to raw playback, and the facade reports `false`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RigError {
    #[error("engine capability unavailable: {capability}")]
    CapabilityUnavailable { capability: &'static str },

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("unknown motion {group}[{index}]")]
    UnknownMotion { group: String, index: usize },

    #[error("unknown expression: {0}")]
    UnknownExpression(String),

    #[error("malformed clip: {0}")]
    MalformedClip(String),

    #[error("model manifest: {0}")]
    Manifest(String),

    #[error("config: {0}")]
    Config(String),
}

impl RigError {
    pub fn unavailable(capability: &'static str) -> Self {
        Self::CapabilityUnavailable { capability }
    }
}

pub type RigResult<T> = Result<T, RigError>;
