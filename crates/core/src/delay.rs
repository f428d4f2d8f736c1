//! Fixed delay line ("station echo").
//!
//! Outputs only the delayed signal. The buffer is allocated once at
//! construction so processing never allocates.

pub struct DelayLine {
    buffer: Vec<f32>,
    pos: usize,
}

impl DelayLine {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples],
            pos: 0,
        }
    }

    /// Builds a delay of `seconds` at `sample_rate`, rounded to whole samples.
    pub fn from_seconds(seconds: f32, sample_rate: f32) -> Self {
        let samples = (seconds.max(0.0) * sample_rate).round() as usize;
        Self::new(samples)
    }

    pub fn delay_samples(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        if self.buffer.is_empty() {
            return sample;
        }
        let out = self.buffer[self.pos];
        self.buffer[self.pos] = sample;
        self.pos = (self.pos + 1) % self.buffer.len();
        out
    }

    pub fn process_block(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}
