//! Pass-through playback
//!
//! Replays the metered blocks on an output device exactly as captured. No
//! gain, mute or mixing is applied: the meter only observes the signal.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::audio::buffer::SharedRingBuffer;
use crate::audio::device::output_device;
use crate::audio::report_setup_failure;
use crate::error::AudioError;

/// Output stream fed from the pass-through ring buffer
pub struct AudioPlayback {
    /// Device identifier
    device_id: String,

    /// Whether playback is running
    running: Arc<AtomicBool>,

    /// Blocks to play
    input_buffer: SharedRingBuffer,

    /// Stream thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Channel for stream errors
    error_rx: Option<Receiver<AudioError>>,

    /// Total samples played
    samples_played: Arc<AtomicU64>,

    /// Buffer underruns
    underruns: Arc<AtomicU32>,

    /// Stream configuration
    config: StreamConfig,
}

impl AudioPlayback {
    /// Create a playback for the given output device (system default when `None`)
    pub fn new(
        device_id: Option<&str>,
        sample_rate: u32,
        channels: u16,
        buffer_size: Option<u32>,
        input_buffer: SharedRingBuffer,
    ) -> Result<Self, AudioError> {
        let device = output_device(device_id)?;

        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: match buffer_size {
                Some(size) => cpal::BufferSize::Fixed(size),
                None => cpal::BufferSize::Default,
            },
        };

        Ok(Self {
            device_id: device.id().to_string(),
            running: Arc::new(AtomicBool::new(false)),
            input_buffer,
            thread_handle: None,
            error_rx: None,
            samples_played: Arc::new(AtomicU64::new(0)),
            underruns: Arc::new(AtomicU32::new(0)),
            config,
        })
    }

    /// Output channel count the device offers by default
    pub fn default_channels(device_id: Option<&str>) -> Result<u16, AudioError> {
        let device = output_device(device_id)?;
        Ok(device.device().default_output_config()?.channels())
    }

    /// Start playback
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let device = output_device(Some(&self.device_id))?;
        let (error_tx, error_rx) = bounded::<AudioError>(16);
        self.error_rx = Some(error_rx);

        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let input_buffer = self.input_buffer.clone();
        let samples_played = self.samples_played.clone();
        let underruns = self.underruns.clone();
        let config = self.config.clone();
        let setup_error_tx = error_tx.clone();

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name(format!("playback-{}", self.device_id))
            .spawn(move || {
                let cpal_device = device.into_inner();

                let mut sample_buffer: Vec<f32> = Vec::new();
                let mut sample_pos = 0;

                let stream = cpal_device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        if !running.load(Ordering::Relaxed) {
                            data.fill(0.0);
                            return;
                        }

                        for sample in data.iter_mut() {
                            if sample_pos >= sample_buffer.len() {
                                if let Some(block) = input_buffer.pop() {
                                    sample_buffer = block.samples;
                                    sample_pos = 0;
                                } else {
                                    // Underrun - output silence
                                    underruns.fetch_add(1, Ordering::Relaxed);
                                    *sample = 0.0;
                                    continue;
                                }
                            }

                            *sample = sample_buffer[sample_pos];
                            sample_pos += 1;
                        }

                        samples_played.fetch_add(data.len() as u64, Ordering::Relaxed);
                    },
                    move |err| {
                        let _ = error_tx.try_send(AudioError::StreamError(err.to_string()));
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            report_setup_failure(
                                "start playback",
                                e.into(),
                                &setup_error_tx,
                                &running_for_loop,
                            );
                            return;
                        }

                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(std::time::Duration::from_millis(10));
                        }
                    }
                    Err(e) => {
                        report_setup_failure(
                            "build playback",
                            e.into(),
                            &setup_error_tx,
                            &running_for_loop,
                        );
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);
        tracing::info!(
            "Pass-through playback started on '{}': {} Hz, {} channel(s)",
            self.device_id,
            self.config.sample_rate.0,
            self.config.channels
        );
        Ok(())
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get total samples played
    pub fn samples_played(&self) -> u64 {
        self.samples_played.load(Ordering::Relaxed)
    }

    /// Get underrun count
    pub fn underruns(&self) -> u32 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Blocks the capture side dropped because playback fell behind
    pub fn overflows(&self) -> usize {
        self.input_buffer.overflow_count()
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Check for errors
    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.as_ref().and_then(|rx| rx.try_recv().ok())
    }
}

impl Drop for AudioPlayback {
    fn drop(&mut self) {
        self.stop();
    }
}
