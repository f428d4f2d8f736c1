//! Nearest-neighbour pitch remap.
//!
//! Each block is stretched or compressed on its own time axis by a fixed
//! ratio: output sample `i` is taken from input sample `floor(i * ratio) mod N`.
//! Nothing is carried between blocks, so every block boundary produces a small
//! discontinuity. That artifact is part of the effect.
//!
//! The ratio must already be inside [`MIN_PITCH_RATIO`, `MAX_PITCH_RATIO`];
//! use [`clamp_ratio`] on anything that comes from a user.

use crate::block::AudioBlock;

/// About one whole tone up.
pub const DEFAULT_PITCH_RATIO: f32 = 1.12;
pub const MIN_PITCH_RATIO: f32 = 0.8;
pub const MAX_PITCH_RATIO: f32 = 1.5;

/// Clamps a requested ratio into the supported range. NaN maps to the default.
pub fn clamp_ratio(ratio: f32) -> f32 {
    if ratio.is_nan() {
        return DEFAULT_PITCH_RATIO;
    }
    ratio.clamp(MIN_PITCH_RATIO, MAX_PITCH_RATIO)
}

/// Source position for output index `i` in a channel of `len` samples.
///
/// Wraps past the end of the block instead of clamping. Returns 0 for an
/// empty channel.
#[inline]
pub fn source_index(i: usize, ratio: f32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let scaled = (i as f64 * f64::from(ratio)).floor() as usize;
    scaled % len
}

/// Remaps one channel. Only the first `input.len()` output samples are written.
pub fn remap_channel(input: &[f32], output: &mut [f32], ratio: f32) {
    let len = input.len();
    for (i, sample) in output.iter_mut().take(len).enumerate() {
        *sample = input[source_index(i, ratio, len)];
    }
}

/// Real-time form: remaps every input channel into the matching output channel.
///
/// Returns `false` without touching `output` when there is nothing to process
/// (no channels, or an empty first channel). Does not allocate.
pub fn remap_into(input: &[&[f32]], output: &mut [&mut [f32]], ratio: f32) -> bool {
    match input.first() {
        Some(first) if !first.is_empty() => {}
        _ => return false,
    }

    for (in_ch, out_ch) in input.iter().zip(output.iter_mut()) {
        remap_channel(in_ch, out_ch, ratio);
    }
    true
}

/// Pure form: returns a new block of the same shape, or `None` for an empty block.
pub fn remap(block: &AudioBlock, ratio: f32) -> Option<AudioBlock> {
    if block.is_empty() {
        return None;
    }

    let channels = block
        .channels()
        .map(|in_ch| {
            let mut out_ch = vec![0.0; in_ch.len()];
            remap_channel(in_ch, &mut out_ch, ratio);
            out_ch
        })
        .collect();
    Some(AudioBlock::from_channels(channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32 / len as f32).collect()
    }

    // ── Scenarios ─────────────────────────────────────────────────

    #[test]
    fn test_default_ratio_is_identity_on_four_samples() {
        let block = AudioBlock::from_channels(vec![vec![0.1, 0.2, 0.3, 0.4]]);
        let out = remap(&block, DEFAULT_PITCH_RATIO).unwrap();
        assert_eq!(out.channel(0), Some(&[0.1, 0.2, 0.3, 0.4][..]));
    }

    #[test]
    fn test_visible_reordering_at_ratio_one_and_a_half() {
        let indices: Vec<usize> = (0..10).map(|i| source_index(i, 1.5, 10)).collect();
        assert_eq!(indices, vec![0, 1, 3, 4, 6, 7, 9, 0, 2, 3]);

        let block = AudioBlock::from_channels(vec![ramp(10)]);
        let out = remap(&block, 1.5).unwrap();
        let expected: Vec<f32> = indices.iter().map(|&i| i as f32 / 10.0).collect();
        assert_eq!(out.channel(0), Some(expected.as_slice()));
    }

    #[test]
    fn test_wraps_instead_of_clamping() {
        // floor(9 * 1.5) = 13 -> 3
        assert_eq!(source_index(9, 1.5, 10), 3);
        // floor(127 * 1.5) = 190 -> 62
        assert_eq!(source_index(127, 1.5, 128), 62);
    }

    #[test]
    fn test_lower_ratio_never_wraps() {
        for i in 0..128 {
            let idx = source_index(i, MIN_PITCH_RATIO, 128);
            assert!(idx <= i, "index {} mapped forward to {}", i, idx);
        }
    }

    // ── Properties ────────────────────────────────────────────────

    #[test]
    fn test_shape_is_preserved() {
        for channels in 1..=4 {
            for len in [1, 2, 7, 64, 128, 441] {
                for ratio in [0.8, 0.93, 1.0, 1.12, 1.37, 1.5] {
                    let block = AudioBlock::new(channels, len);
                    let out = remap(&block, ratio).unwrap();
                    assert_eq!(out.channel_count(), channels);
                    assert!(out.channels().all(|ch| ch.len() == len));
                }
            }
        }
    }

    #[test]
    fn test_unit_ratio_is_identity() {
        let block = AudioBlock::from_channels(vec![ramp(128), ramp(128)]);
        let out = remap(&block, 1.0).unwrap();
        assert_eq!(out, block);
    }

    #[test]
    fn test_deterministic() {
        let block = AudioBlock::from_channels(vec![ramp(128)]);
        let first = remap(&block, 1.37).unwrap();
        for _ in 0..5 {
            assert_eq!(remap(&block, 1.37).unwrap(), first);
        }
    }

    #[test]
    fn test_channels_are_independent() {
        let left = ramp(32);
        let right: Vec<f32> = ramp(32).iter().map(|s| -s).collect();
        let before = remap(&AudioBlock::from_channels(vec![left, right.clone()]), 1.25).unwrap();

        let noisy_left = vec![0.99; 32];
        let after = remap(&AudioBlock::from_channels(vec![noisy_left, right]), 1.25).unwrap();

        assert_eq!(before.channel(1), after.channel(1));
        assert_ne!(before.channel(0), after.channel(0));
    }

    // ── Empty input ───────────────────────────────────────────────

    #[test]
    fn test_empty_block_produces_nothing() {
        assert!(remap(&AudioBlock::default(), 1.12).is_none());
        assert!(remap(&AudioBlock::new(2, 0), 1.12).is_none());
    }

    #[test]
    fn test_remap_into_skips_empty_cycle() {
        let mut out = [0.5f32; 4];
        assert!(!remap_into(&[], &mut [&mut out], 1.12));
        assert!(!remap_into(&[&[]], &mut [&mut out], 1.12));
        assert_eq!(out, [0.5; 4], "skipped cycle must leave output untouched");
    }

    #[test]
    fn test_remap_into_matches_pure_form() {
        let input = ramp(10);
        let mut out = [0.0f32; 10];
        assert!(remap_into(&[&input], &mut [&mut out], 1.5));

        let pure = remap(&AudioBlock::from_channels(vec![input]), 1.5).unwrap();
        assert_eq!(pure.channel(0), Some(&out[..]));
    }

    // ── Clamping ──────────────────────────────────────────────────

    #[test]
    fn test_clamp_ratio() {
        assert_eq!(clamp_ratio(0.2), MIN_PITCH_RATIO);
        assert_eq!(clamp_ratio(3.0), MAX_PITCH_RATIO);
        assert_eq!(clamp_ratio(1.2), 1.2);
        assert_eq!(clamp_ratio(f32::NAN), DEFAULT_PITCH_RATIO);
    }
}
