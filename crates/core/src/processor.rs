use crate::chain::{ChainSettings, EffectChain};
use crate::pitch::{self, DEFAULT_PITCH_RATIO};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Per-block voice pipeline: pitch remap, then the broadcast chain.
///
/// Owned by the processing thread. Controls are shared through the public
/// atomics and picked up once per block, so a control thread can update them
/// at any time.
pub struct VoiceProcessor {
    chain: EffectChain,
    channels: usize,

    // Locally cached to avoid atomic loads per sample
    current_effects_enabled: bool,

    // Shared Atomics (Control Interface)
    pub pitch_ratio: Arc<AtomicU32>,
    pub effects_enabled: Arc<AtomicBool>,
    pub volume_level: Arc<AtomicU32>,
}

impl VoiceProcessor {
    pub fn new(channels: usize, sample_rate: f32, settings: &ChainSettings) -> Result<Self> {
        Ok(Self {
            chain: EffectChain::new(channels, sample_rate, settings)?,
            channels,
            current_effects_enabled: true,
            pitch_ratio: Arc::new(AtomicU32::new(DEFAULT_PITCH_RATIO.to_bits())),
            effects_enabled: Arc::new(AtomicBool::new(true)),
            volume_level: Arc::new(AtomicU32::new(0)),
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Stores a new ratio, clamped into the supported range.
    pub fn set_pitch_ratio(&self, ratio: f32) {
        self.pitch_ratio
            .store(pitch::clamp_ratio(ratio).to_bits(), Ordering::Relaxed);
    }

    pub fn process_updates(&mut self) {
        let enabled = self.effects_enabled.load(Ordering::Relaxed);
        if enabled && !self.current_effects_enabled {
            // Re-applied chain starts from silence
            self.chain.reset();
        }
        self.current_effects_enabled = enabled;
    }

    /// Processes one block. Returns `false` when no output was produced this
    /// cycle (empty input, or a channel layout this processor was not built for).
    pub fn process_block(&mut self, input: &[&[f32]], output: &mut [&mut [f32]]) -> bool {
        if input.first().map_or(true, |ch| ch.is_empty()) {
            return false;
        }

        let channels = self.channels;
        if input.len() != channels || output.len() != channels {
            // Mismatch: output silence rather than crashing the host
            log::error!(
                "Channel count mismatch: expected {}, got input={} output={}",
                channels,
                input.len(),
                output.len()
            );
            for out_ch in output.iter_mut() {
                out_ch.fill(0.0);
            }
            return false;
        }

        let ratio = f32::from_bits(self.pitch_ratio.load(Ordering::Relaxed));
        pitch::remap_into(input, output, ratio);

        if self.current_effects_enabled {
            self.chain.process_block(output);
        }

        let mut sum_sq = 0.0f32;
        let mut count = 0usize;
        for out_ch in output.iter_mut() {
            for sample in out_ch.iter_mut() {
                *sample = sample.clamp(-1.0, 1.0);
                sum_sq += *sample * *sample;
            }
            count += out_ch.len();
        }
        let rms = (sum_sq / count.max(1) as f32).sqrt();
        self.volume_level.store(rms.to_bits(), Ordering::Relaxed);

        true
    }
}
