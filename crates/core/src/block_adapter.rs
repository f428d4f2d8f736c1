//! Block adapter for bridging variable-size host buffers to fixed-size processor blocks.
//!
//! Audio backends hand over interleaved buffers of whatever size they like;
//! `VoiceProcessor` wants planar `BLOCK_SIZE` blocks.

use crate::constants::{BLOCK_SIZE, MAX_CHANNELS};
use crate::processor::VoiceProcessor;
use ringbuf::traits::{Consumer, Observer, Producer};
use ringbuf::HeapRb;

/// Accumulates interleaved samples, runs complete blocks through a
/// `VoiceProcessor` and queues the interleaved results.
///
/// Internally uses two ring buffers (input and output) plus fixed planar
/// scratch blocks, so nothing is allocated after construction.
pub struct BlockAdapter {
    channels: usize,
    rb_in: HeapRb<f32>,
    rb_out: HeapRb<f32>,
    planar_in: [[f32; BLOCK_SIZE]; MAX_CHANNELS],
    planar_out: [[f32; BLOCK_SIZE]; MAX_CHANNELS],
}

impl BlockAdapter {
    /// Creates an adapter for `channels` interleaved channels (clamped to 1..=2).
    pub fn new(channels: usize) -> Self {
        let channels = channels.clamp(1, MAX_CHANNELS);
        let buffer_size = BLOCK_SIZE * 8 * channels;
        Self {
            channels,
            rb_in: HeapRb::<f32>::new(buffer_size),
            rb_out: HeapRb::<f32>::new(buffer_size),
            planar_in: [[0.0; BLOCK_SIZE]; MAX_CHANNELS],
            planar_out: [[0.0; BLOCK_SIZE]; MAX_CHANNELS],
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Queues interleaved samples. Returns how many were accepted; the rest
    /// are dropped when the input buffer is full.
    pub fn push_interleaved(&mut self, samples: &[f32]) -> usize {
        self.rb_in.push_slice(samples)
    }

    /// Samples waiting for a complete block.
    pub fn pending_input(&self) -> usize {
        self.rb_in.occupied_len()
    }

    /// Processed samples ready to be popped.
    pub fn pending_output(&self) -> usize {
        self.rb_out.occupied_len()
    }

    /// Processes every complete block in the input buffer. Returns the number
    /// of blocks that produced output.
    pub fn process_available(&mut self, processor: &mut VoiceProcessor) -> usize {
        let channels = self.channels;
        let block_samples = BLOCK_SIZE * channels;
        let mut produced = 0;

        while self.rb_in.occupied_len() >= block_samples
            && self.rb_out.vacant_len() >= block_samples
        {
            for j in 0..BLOCK_SIZE {
                for ch in 0..channels {
                    self.planar_in[ch][j] = self.rb_in.try_pop().unwrap_or(0.0);
                }
            }

            let [in_l, in_r] = &self.planar_in;
            let [out_l, out_r] = &mut self.planar_out;
            let inputs: [&[f32]; MAX_CHANNELS] = [in_l, in_r];
            let mut outputs: [&mut [f32]; MAX_CHANNELS] = [out_l, out_r];

            if !processor.process_block(&inputs[..channels], &mut outputs[..channels]) {
                continue;
            }

            for j in 0..BLOCK_SIZE {
                for ch in 0..channels {
                    let _ = self.rb_out.try_push(self.planar_out[ch][j]);
                }
            }
            produced += 1;
        }
        produced
    }

    /// Pops processed interleaved samples into `out`. Returns the number
    /// written; the rest of `out` is left as it was.
    pub fn pop_interleaved(&mut self, out: &mut [f32]) -> usize {
        self.rb_out.pop_slice(out)
    }
}
