//! Broadcast voice chain: high-pass, presence peak, air shelf, compressor,
//! gain and a short echo, applied in that order after the pitch remap.

use crate::compressor::{Compressor, CompressorSettings};
use crate::delay::DelayLine;
use anyhow::{anyhow, Result};
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use std::fmt;

/// Resonance of the high-pass stage, 1 dB expressed as a linear Q.
const HIGH_PASS_Q: f32 = 1.122;
/// Shelf slope of 1.
const SHELF_Q: f32 = 0.707;

/// Literal parameters for every stage of the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSettings {
    pub high_pass_hz: f32,
    pub peak_hz: f32,
    pub peak_q: f32,
    pub peak_gain_db: f32,
    pub shelf_hz: f32,
    pub shelf_gain_db: f32,
    pub compressor: CompressorSettings,
    pub gain: f32,
    /// Seconds
    pub delay: f32,
}

impl Default for ChainSettings {
    /// The "station announcer" preset.
    fn default() -> Self {
        Self {
            high_pass_hz: 220.0,
            peak_hz: 1800.0,
            peak_q: 1.0,
            peak_gain_db: 6.0,
            shelf_hz: 3200.0,
            shelf_gain_db: 5.0,
            compressor: CompressorSettings::default(),
            gain: 1.6,
            delay: 0.08,
        }
    }
}

impl fmt::Display for ChainSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.compressor;
        write!(
            f,
            "high-pass {} Hz -> peak {} Hz Q{} {:+} dB -> high-shelf {} Hz {:+} dB -> \
             compressor {} dB knee {} dB {}:1 {} ms/{} ms -> gain x{} -> delay {} ms",
            self.high_pass_hz,
            self.peak_hz,
            self.peak_q,
            self.peak_gain_db,
            self.shelf_hz,
            self.shelf_gain_db,
            c.threshold_db,
            c.knee_db,
            c.ratio,
            c.attack * 1000.0,
            c.release * 1000.0,
            self.gain,
            self.delay * 1000.0,
        )
    }
}

/// Per-channel filter and delay state.
struct ChannelStages {
    high_pass: DirectForm2Transposed<f32>,
    peak: DirectForm2Transposed<f32>,
    shelf: DirectForm2Transposed<f32>,
    delay: DelayLine,
}

impl ChannelStages {
    fn new(settings: &ChainSettings, sample_rate: f32) -> Result<Self> {
        let fs = sample_rate.hz();

        let hp_coeffs = Coefficients::<f32>::from_params(
            Type::HighPass,
            fs,
            settings.high_pass_hz.hz(),
            HIGH_PASS_Q,
        )
        .map_err(|e| anyhow!("Failed to create high-pass filter: {:?}", e))?;

        let peak_coeffs = Coefficients::<f32>::from_params(
            Type::PeakingEQ(settings.peak_gain_db),
            fs,
            settings.peak_hz.hz(),
            settings.peak_q,
        )
        .map_err(|e| anyhow!("Failed to create peaking filter: {:?}", e))?;

        let shelf_coeffs = Coefficients::<f32>::from_params(
            Type::HighShelf(settings.shelf_gain_db),
            fs,
            settings.shelf_hz.hz(),
            SHELF_Q,
        )
        .map_err(|e| anyhow!("Failed to create high shelf filter: {:?}", e))?;

        Ok(Self {
            high_pass: DirectForm2Transposed::<f32>::new(hp_coeffs),
            peak: DirectForm2Transposed::<f32>::new(peak_coeffs),
            shelf: DirectForm2Transposed::<f32>::new(shelf_coeffs),
            delay: DelayLine::from_seconds(settings.delay, sample_rate),
        })
    }

    #[inline]
    fn filter(&mut self, sample: f32) -> f32 {
        let h = self.high_pass.run(sample);
        let p = self.peak.run(h);
        self.shelf.run(p)
    }

    fn reset(&mut self) {
        self.high_pass.reset_state();
        self.peak.reset_state();
        self.shelf.reset_state();
        self.delay.reset();
    }
}

/// The full chain for a fixed channel count. The compressor is linked so all
/// channels duck together.
pub struct EffectChain {
    stages: Vec<ChannelStages>,
    compressor: Compressor,
    gain: f32,
}

impl EffectChain {
    pub fn new(channels: usize, sample_rate: f32, settings: &ChainSettings) -> Result<Self> {
        let stages = (0..channels)
            .map(|_| ChannelStages::new(settings, sample_rate))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            stages,
            compressor: Compressor::new(&settings.compressor, sample_rate),
            gain: settings.gain,
        })
    }

    pub fn channels(&self) -> usize {
        self.stages.len()
    }

    /// Runs every stage over the block in place. Extra channels beyond the
    /// configured count are left untouched.
    pub fn process_block(&mut self, frames: &mut [&mut [f32]]) {
        let channels = self.stages.len().min(frames.len());
        let frames = &mut frames[..channels];

        for (stage, channel) in self.stages.iter_mut().zip(frames.iter_mut()) {
            for sample in channel.iter_mut() {
                *sample = stage.filter(*sample);
            }
        }

        self.compressor.process_block(frames);

        for (stage, channel) in self.stages.iter_mut().zip(frames.iter_mut()) {
            for sample in channel.iter_mut() {
                *sample = stage.delay.process(*sample * self.gain);
            }
        }
    }

    /// Clears filter memory, compressor envelope and echo buffers.
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        self.compressor.reset();
    }
}
