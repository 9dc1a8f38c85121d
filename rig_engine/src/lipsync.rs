use std::sync::Arc;

use arc_swap::ArcSwap;
use rig_shared::{clamp01, RigResult};

const BIN_STRIDE: usize = 100;
const MAX_BIN: usize = 700;
const NOISE_FLOOR: f32 = 20.0;
const RANGE: f32 = 60.0;

/// A live byte-valued frequency spectrum (0..=255 per bin).
pub trait SpectrumSource: Send {
    fn bin_count(&self) -> usize;

    /// Fill `buf` with the latest spectrum.
    fn byte_frequency_data(&mut self, buf: &mut [u8]) -> RigResult<()>;
}

/// Mouth openness from a spectrum: average every 100th bin up to bin 700,
/// then map `(avg - 20) / 60 * sensitivity` into [0, 1].
pub fn mouth_openness(buf: &[u8], sensitivity: f32) -> f32 {
    if buf.is_empty() {
        return 0.0;
    }
    let max_index = MAX_BIN.min(buf.len() - 1);
    let (sum, count) = (0..=max_index)
        .step_by(BIN_STRIDE)
        .fold((0u32, 0u32), |(s, c), i| (s + buf[i] as u32, c + 1));
    let avg = if count > 0 { sum as f32 / count as f32 } else { 0.0 };
    clamp01((avg - NOISE_FLOOR) / RANGE * sensitivity)
}

/// Sensitivity of 0 or non-finite falls back to 1.
pub fn sanitize_sensitivity(v: f32) -> f32 {
    if v.is_finite() && v != 0.0 { v } else { 1.0 }
}

/// Microphone-driven mouth channel. Never touches the manual mouth cell.
pub struct MicLipSync {
    active: bool,
    source: Option<Box<dyn SpectrumSource>>,
    buf: Vec<u8>,
    sensitivity: f32,
}

impl MicLipSync {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            active: false,
            source: None,
            buf: Vec::new(),
            sensitivity: sanitize_sensitivity(sensitivity),
        }
    }

    /// An empty `buf` is sized to the source's bin count.
    pub fn set(
        &mut self,
        active: bool,
        source: Option<Box<dyn SpectrumSource>>,
        mut buf: Vec<u8>,
        sensitivity: f32,
    ) {
        if buf.is_empty() {
            if let Some(source) = source.as_ref() {
                buf = vec![0; source.bin_count()];
            }
        }
        self.active = active;
        self.source = source;
        self.buf = buf;
        self.sensitivity = sanitize_sensitivity(sensitivity);
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sanitize_sensitivity(sensitivity);
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Active and wired to a source with somewhere to read into.
    pub fn is_active(&self) -> bool {
        self.active && self.source.is_some() && !self.buf.is_empty()
    }

    /// Mouth openness for this frame; `None` when inactive.
    pub fn sample(&mut self) -> Option<RigResult<f32>> {
        if !self.is_active() {
            return None;
        }
        let source = self.source.as_mut()?;
        Some(
            source
                .byte_frequency_data(&mut self.buf)
                .map(|()| mouth_openness(&self.buf, self.sensitivity)),
        )
    }
}

/// Spectrum shared between a capture thread (writer) and the render thread
/// (reader). Readers always see the latest complete snapshot.
#[derive(Clone)]
pub struct SharedSpectrum {
    latest: Arc<ArcSwap<Vec<u8>>>,
    bins: usize,
}

impl SharedSpectrum {
    pub fn new(bins: usize) -> Self {
        Self { latest: Arc::new(ArcSwap::from_pointee(vec![0; bins])), bins }
    }

    /// Publish a new spectrum from the capture side.
    pub fn publish(&self, spectrum: Vec<u8>) {
        self.latest.store(Arc::new(spectrum));
    }
}

impl SpectrumSource for SharedSpectrum {
    fn bin_count(&self) -> usize {
        self.bins
    }

    fn byte_frequency_data(&mut self, buf: &mut [u8]) -> RigResult<()> {
        let snapshot = self.latest.load();
        let n = buf.len().min(snapshot.len());
        buf[..n].copy_from_slice(&snapshot[..n]);
        buf[n..].fill(0);
        Ok(())
    }
}
