//! Owned multi-channel block of samples.

/// A group of samples per channel processed together in one cycle.
///
/// All channels are expected to share the same length. `len()` reports the
/// length of the first channel; a block with no channels is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBlock {
    channels: Vec<Vec<f32>>,
}

impl AudioBlock {
    /// Creates a silent block with `channels` channels of `len` samples.
    pub fn new(channels: usize, len: usize) -> Self {
        Self {
            channels: vec![vec![0.0; len]; channels],
        }
    }

    pub fn from_channels(channels: Vec<Vec<f32>>) -> Self {
        Self { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// True when there are no samples to process this cycle.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        self.channels.get_mut(index).map(Vec::as_mut_slice)
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }
}
