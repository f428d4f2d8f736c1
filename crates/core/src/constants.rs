//! Shared constants for StationVoice audio processing.

/// Sample rate used throughout StationVoice (48kHz)
pub const SAMPLE_RATE: u32 = 48000;

/// Block size in frames per channel (one 128-sample render quantum, ~2.7ms at 48kHz)
pub const BLOCK_SIZE: usize = 128;

/// Most channels the block adapter will carry (mono or stereo)
pub const MAX_CHANNELS: usize = 2;
