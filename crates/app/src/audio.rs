use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{info, warn};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use stationvoice_core::constants::{BLOCK_SIZE, SAMPLE_RATE};
use stationvoice_core::pitch::clamp_ratio;
use stationvoice_core::{BlockAdapter, ChainSettings, VoiceProcessor};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// What a session should open and how it starts out.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub input_device: String,
    pub output_device: String,
    pub pitch_ratio: f32,
    pub effects_enabled: bool,
    pub channels: u16,
    pub chain: ChainSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            input_device: "default".to_string(),
            output_device: "default".to_string(),
            pitch_ratio: stationvoice_core::pitch::DEFAULT_PITCH_RATIO,
            effects_enabled: true,
            channels: 1,
            chain: ChainSettings::default(),
        }
    }
}

/// A live capture -> voice processor -> playback session.
///
/// Owns both streams and the processing thread. Dropping the session (or
/// calling [`VoiceSession::stop`]) ends it.
pub struct VoiceSession {
    _input_stream: cpal::Stream,
    _output_stream: cpal::Stream,
    is_running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,

    // Shared state for the control console
    pitch_ratio: Arc<AtomicU32>,
    effects_enabled: Arc<AtomicBool>,
    volume_level: Arc<AtomicU32>,
    input_name: String,
    output_name: String,
}

impl VoiceSession {
    /// Opens the devices and starts processing.
    ///
    /// Fails without starting anything if either device can't be acquired.
    pub fn start(settings: &SessionSettings) -> Result<Self> {
        let host = cpal::default_host();
        info!("Audio host: {}", host.id().name());

        let input_device = find_input_device(&host, &settings.input_device)?;
        let input_name = input_device.name().unwrap_or_default();
        info!("Using input device: {}", input_name);

        let output_device = find_output_device(&host, &settings.output_device)?;
        let output_name = output_device.name().unwrap_or_default();
        info!("Using output device: {}", output_name);

        let channels = settings.channels.max(1);
        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let mut processor = VoiceProcessor::new(
            usize::from(channels),
            SAMPLE_RATE as f32,
            &settings.chain,
        )
        .context("Failed to build effect chain")?;
        processor.set_pitch_ratio(settings.pitch_ratio);
        processor
            .effects_enabled
            .store(settings.effects_enabled, Ordering::Relaxed);
        info!("Effect chain: {}", settings.chain);

        let mut adapter = BlockAdapter::new(usize::from(channels));
        if adapter.channels() != usize::from(channels) {
            anyhow::bail!("Unsupported channel count: {}", channels);
        }

        // Latency management (100ms buffer)
        let buffer_size = (SAMPLE_RATE as usize) / 10 * usize::from(channels);

        let rb_in = HeapRb::<f32>::new(buffer_size);
        let (mut prod_in, mut cons_in) = rb_in.split();

        let rb_out = HeapRb::<f32>::new(buffer_size);
        let (mut prod_out, mut cons_out) = rb_out.split();

        let input_stream = input_device
            .build_input_stream(
                &config,
                move |data: &[f32], _| {
                    let _ = prod_in.push_slice(data);
                },
                |err| warn!("Input error: {}", err),
                None,
            )
            .context("Failed to open microphone stream")?;

        let output_stream = output_device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _| {
                    let read = cons_out.pop_slice(data);
                    for sample in data.iter_mut().skip(read) {
                        *sample = 0.0;
                    }
                },
                |err| warn!("Output error: {}", err),
                None,
            )
            .context("Failed to open playback stream")?;

        let pitch_ratio = processor.pitch_ratio.clone();
        let effects_enabled = processor.effects_enabled.clone();
        let volume_level = processor.volume_level.clone();

        let is_running = Arc::new(AtomicBool::new(true));
        let run_flag = is_running.clone();

        let worker = thread::Builder::new()
            .name("stationvoice-audio".into())
            .spawn(move || {
                let block_samples = BLOCK_SIZE * usize::from(channels);
                let mut capture = vec![0.0f32; block_samples];
                let mut playback = vec![0.0f32; block_samples];

                while run_flag.load(Ordering::Relaxed) {
                    processor.process_updates();

                    let captured = cons_in.pop_slice(&mut capture);
                    if captured > 0 {
                        adapter.push_interleaved(&capture[..captured]);
                        adapter.process_available(&mut processor);
                    }

                    // Playback full: leave blocks queued, the adapter drops input once it fills
                    while adapter.pending_output() > 0 && prod_out.vacant_len() > 0 {
                        let room = prod_out.vacant_len().min(playback.len());
                        let n = adapter.pop_interleaved(&mut playback[..room]);
                        prod_out.push_slice(&playback[..n]);
                    }

                    if captured == 0 {
                        thread::sleep(Duration::from_micros(200));
                    }
                }
            })
            .context("Failed to spawn audio processing thread")?;

        input_stream.play()?;
        output_stream.play()?;

        Ok(Self {
            _input_stream: input_stream,
            _output_stream: output_stream,
            is_running,
            worker: Some(worker),
            pitch_ratio,
            effects_enabled,
            volume_level,
            input_name,
            output_name,
        })
    }

    /// Sets the pitch ratio, clamped to the supported range. Returns the value used.
    pub fn set_pitch_ratio(&self, ratio: f32) -> f32 {
        let ratio = clamp_ratio(ratio);
        self.pitch_ratio.store(ratio.to_bits(), Ordering::Relaxed);
        ratio
    }

    pub fn pitch_ratio(&self) -> f32 {
        f32::from_bits(self.pitch_ratio.load(Ordering::Relaxed))
    }

    /// Switches the announcer chain on (apply) or off (pitch shift only).
    pub fn set_effects_enabled(&self, enabled: bool) {
        self.effects_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn effects_enabled(&self) -> bool {
        self.effects_enabled.load(Ordering::Relaxed)
    }

    /// RMS of the most recent output block.
    pub fn output_level(&self) -> f32 {
        f32::from_bits(self.volume_level.load(Ordering::Relaxed))
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Stops processing and waits for the worker thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.is_running.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Audio processing thread panicked");
            }
        }
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn find_input_device(host: &cpal::Host, name: &str) -> Result<cpal::Device> {
    if name == "default" {
        host.default_input_device()
            .context("No default input found (is a microphone connected and permitted?)")
    } else {
        host.input_devices()?
            .find(|d| d.name().ok().as_deref() == Some(name))
            .with_context(|| format!("Input device '{}' not found", name))
    }
}

fn find_output_device(host: &cpal::Host, name: &str) -> Result<cpal::Device> {
    if name == "default" {
        host.default_output_device()
            .context("No default output found")
    } else {
        host.output_devices()?
            .find(|d| d.name().ok().as_deref() == Some(name))
            .with_context(|| format!("Output device '{}' not found", name))
    }
}

/// Prints the audio host and every input/output device.
pub fn list_devices() -> Result<()> {
    let host = cpal::default_host();
    println!("Audio Host: {}", host.id().name());
    println!("\nInput Devices:");
    for device in host.input_devices()? {
        println!("  - {}", device.name().unwrap_or("Unknown".to_string()));
    }
    println!("\nOutput Devices:");
    for device in host.output_devices()? {
        println!("  - {}", device.name().unwrap_or("Unknown".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_settings() {
        let settings = SessionSettings::default();
        assert_eq!(settings.input_device, "default");
        assert_eq!(settings.output_device, "default");
        assert_eq!(settings.pitch_ratio, 1.12);
        assert!(settings.effects_enabled);
        assert_eq!(settings.channels, 1);
        assert_eq!(settings.chain, ChainSettings::default());
    }
}
