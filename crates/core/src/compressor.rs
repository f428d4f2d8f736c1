//! Soft-knee downward compressor with linked detection.
//!
//! Gain is computed in the dB domain from the peak across channels and then
//! smoothed with separate attack/release time constants. Makeup gain follows
//! the usual broadcast-compressor convention of restoring part of the
//! reduction a full-scale signal would get.

/// Compressor parameters in user units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    pub threshold_db: f32,
    pub knee_db: f32,
    pub ratio: f32,
    /// Seconds
    pub attack: f32,
    /// Seconds
    pub release: f32,
    pub auto_makeup: bool,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold_db: -35.0,
            knee_db: 25.0,
            ratio: 4.0,
            attack: 0.005,
            release: 0.3,
            auto_makeup: true,
        }
    }
}

const MAKEUP_EXPONENT: f32 = 0.6;
const LEVEL_FLOOR: f32 = 1e-6;

pub struct Compressor {
    threshold_db: f32,
    knee_db: f32,
    ratio: f32,
    attack_coeff: f32,
    release_coeff: f32,
    makeup_gain: f32,
    // Smoothed gain change, always <= 0 dB
    gain_db: f32,
}

impl Compressor {
    pub fn new(settings: &CompressorSettings, sample_rate: f32) -> Self {
        let mut comp = Self {
            threshold_db: settings.threshold_db,
            knee_db: settings.knee_db.max(0.0),
            ratio: settings.ratio.max(1.0),
            attack_coeff: time_coeff(settings.attack, sample_rate),
            release_coeff: time_coeff(settings.release, sample_rate),
            makeup_gain: 1.0,
            gain_db: 0.0,
        };
        if settings.auto_makeup {
            let full_scale_db = comp.static_curve_db(0.0);
            comp.makeup_gain = db_to_gain(-full_scale_db * MAKEUP_EXPONENT);
        }
        comp
    }

    /// Output level for a steady input level, both in dBFS, before makeup.
    pub fn static_curve_db(&self, input_db: f32) -> f32 {
        let over = input_db - self.threshold_db;
        let half_knee = self.knee_db / 2.0;

        if over <= -half_knee {
            input_db
        } else if over < half_knee {
            let x = over + half_knee;
            input_db + (1.0 / self.ratio - 1.0) * x * x / (2.0 * self.knee_db)
        } else {
            self.threshold_db + over / self.ratio
        }
    }

    /// Current smoothed gain change in dB (zero or negative).
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_db
    }

    pub fn makeup_gain(&self) -> f32 {
        self.makeup_gain
    }

    pub fn reset(&mut self) {
        self.gain_db = 0.0;
    }

    /// Compresses all channels in place with one shared gain envelope.
    pub fn process_block(&mut self, frames: &mut [&mut [f32]]) {
        let Some(frame_len) = frames.iter().map(|ch| ch.len()).min() else {
            return;
        };

        for k in 0..frame_len {
            let mut peak = 0.0f32;
            for channel in frames.iter() {
                peak = peak.max(channel[k].abs());
            }

            let level_db = gain_to_db(peak.max(LEVEL_FLOOR));
            let target_db = self.static_curve_db(level_db) - level_db;
            let coeff = if target_db < self.gain_db {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.gain_db = target_db + coeff * (self.gain_db - target_db);

            let gain = db_to_gain(self.gain_db) * self.makeup_gain;
            for channel in frames.iter_mut() {
                channel[k] *= gain;
            }
        }
    }
}

/// One-pole smoothing coefficient reaching ~63% of a step in `seconds`.
fn time_coeff(seconds: f32, sample_rate: f32) -> f32 {
    if seconds <= 0.0 || sample_rate <= 0.0 {
        return 0.0;
    }
    (-1.0 / (seconds * sample_rate)).exp()
}

#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

#[inline]
pub fn gain_to_db(gain: f32) -> f32 {
    20.0 * gain.log10()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SAMPLE_RATE;

    fn no_makeup() -> CompressorSettings {
        CompressorSettings {
            auto_makeup: false,
            ..CompressorSettings::default()
        }
    }

    fn run_constant(comp: &mut Compressor, level: f32, frames: usize) -> f32 {
        let mut data = vec![level; frames];
        let mut chans: Vec<&mut [f32]> = vec![data.as_mut_slice()];
        comp.process_block(&mut chans);
        data[frames - 1]
    }

    #[test]
    fn test_static_curve_regions() {
        let comp = Compressor::new(&no_makeup(), SAMPLE_RATE as f32);
        // Well below the knee: untouched
        assert_eq!(comp.static_curve_db(-60.0), -60.0);
        // Knee edges are continuous with both straight segments
        assert!((comp.static_curve_db(-47.5) - -47.5).abs() < 1e-4);
        assert!((comp.static_curve_db(-22.5) - (-35.0 + 12.5 / 4.0)).abs() < 1e-4);
        // Above the knee: 4:1 slope
        assert!((comp.static_curve_db(-15.0) - -30.0).abs() < 1e-4);
    }

    #[test]
    fn test_quiet_signal_passes_unchanged() {
        let mut comp = Compressor::new(&no_makeup(), SAMPLE_RATE as f32);
        let quiet = db_to_gain(-60.0);
        let out = run_constant(&mut comp, quiet, 4800);
        assert!(
            (out - quiet).abs() < 1e-6,
            "Signal below the knee should not be reduced: got {}",
            out
        );
    }

    #[test]
    fn test_loud_signal_settles_on_curve() {
        let mut comp = Compressor::new(&no_makeup(), SAMPLE_RATE as f32);
        let out = run_constant(&mut comp, db_to_gain(-15.0), 48000);
        let out_db = gain_to_db(out);
        assert!(
            (out_db - -30.0).abs() < 0.5,
            "Expected about -30 dBFS after settling: got {}",
            out_db
        );
    }

    #[test]
    fn test_attack_is_faster_than_release() {
        let sr = SAMPLE_RATE as f32;
        let mut comp = Compressor::new(&no_makeup(), sr);

        // 5 ms of loud signal gets most of the way down
        run_constant(&mut comp, 1.0, (0.005 * sr) as usize * 3);
        let reduced = comp.gain_reduction_db();
        assert!(reduced < -20.0, "Attack too slow: {}", reduced);

        // 5 ms of silence recovers only a little
        run_constant(&mut comp, 0.0, (0.005 * sr) as usize);
        let recovering = comp.gain_reduction_db();
        assert!(
            recovering < reduced * 0.9,
            "Release should be slow: {} -> {}",
            reduced,
            recovering
        );
    }

    #[test]
    fn test_auto_makeup_gain() {
        let comp = Compressor::new(&CompressorSettings::default(), SAMPLE_RATE as f32);
        // Full scale is reduced by 26.25 dB; 60% of that comes back
        let expected = db_to_gain(26.25 * 0.6);
        assert!(
            (comp.makeup_gain() - expected).abs() < 1e-3,
            "Makeup gain: expected {} got {}",
            expected,
            comp.makeup_gain()
        );
    }

    #[test]
    fn test_linked_channels_share_gain() {
        let mut comp = Compressor::new(&no_makeup(), SAMPLE_RATE as f32);
        let mut loud = vec![0.9f32; 2400];
        let mut quiet = vec![0.01f32; 2400];
        let mut chans: Vec<&mut [f32]> = vec![loud.as_mut_slice(), quiet.as_mut_slice()];
        comp.process_block(&mut chans);

        let loud_gain = loud[2399] / 0.9;
        let quiet_gain = quiet[2399] / 0.01;
        assert!((loud_gain - quiet_gain).abs() < 1e-4);
        assert!(quiet_gain < 1.0, "Quiet channel should duck with the loud one");
    }

    #[test]
    fn test_empty_frames_no_panic() {
        let mut comp = Compressor::new(&CompressorSettings::default(), SAMPLE_RATE as f32);
        let mut frames: Vec<&mut [f32]> = vec![];
        comp.process_block(&mut frames);
    }
}
