//! Audio capture from input devices
//!
//! Opens an input stream, meters every callback block and optionally forwards
//! the untouched block to a ring buffer for pass-through playback.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::audio::buffer::{AudioBlock, SharedRingBuffer};
use crate::audio::device::input_device;
use crate::audio::report_setup_failure;
use crate::error::AudioError;
use crate::meter::{LevelDetector, ReadingHandle, ReadingPublisher};

/// Metered input stream
pub struct AudioCapture {
    /// Device identifier
    device_id: String,

    /// Whether capture is running
    running: Arc<AtomicBool>,

    /// Where the detector publishes its readings
    publisher: Arc<ReadingPublisher>,

    /// Pass-through destination, if any
    output_buffer: Option<SharedRingBuffer>,

    /// Stream thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Channel for stream errors
    error_rx: Option<Receiver<AudioError>>,

    /// Total frames metered
    frames_metered: Arc<AtomicU64>,

    /// Stream configuration
    config: StreamConfig,
}

impl AudioCapture {
    /// Create a capture for the given input device (system default when `None`)
    pub fn new(
        device_id: Option<&str>,
        sample_rate: Option<u32>,
        buffer_size: Option<u32>,
        output_buffer: Option<SharedRingBuffer>,
    ) -> Result<Self, AudioError> {
        let device = input_device(device_id)?;
        let default_config = device_default_config(&device)?;

        let config = StreamConfig {
            channels: default_config.channels(),
            sample_rate: cpal::SampleRate(sample_rate.unwrap_or(default_config.sample_rate().0)),
            buffer_size: match buffer_size {
                Some(size) => cpal::BufferSize::Fixed(size),
                None => cpal::BufferSize::Default,
            },
        };

        Ok(Self {
            device_id: device.id().to_string(),
            running: Arc::new(AtomicBool::new(false)),
            publisher: Arc::new(ReadingPublisher::new()),
            output_buffer,
            thread_handle: None,
            error_rx: None,
            frames_metered: Arc::new(AtomicU64::new(0)),
            config,
        })
    }

    /// Start capturing and metering.
    ///
    /// The detector is reset for the stream's rate before the stream exists,
    /// so the callback never races a reset.
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let device = input_device(Some(&self.device_id))?;

        let mut detector = LevelDetector::with_publisher(self.publisher.clone());
        detector.reset_for_stream(self.config.sample_rate.0 as f64, self.config.channels)?;

        let (error_tx, error_rx) = bounded::<AudioError>(16);
        self.error_rx = Some(error_rx);

        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let frames_metered = self.frames_metered.clone();
        let output_buffer = self.output_buffer.clone();
        let config = self.config.clone();
        let channels = self.config.channels as usize;
        let setup_error_tx = error_tx.clone();

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name(format!("capture-{}", self.device_id))
            .spawn(move || {
                let cpal_device = device.into_inner();
                let mut sequence: u32 = 0;

                let stream = cpal_device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if !running.load(Ordering::Relaxed) {
                            return;
                        }

                        detector.process_interleaved(data, channels);

                        if let Some(buffer) = &output_buffer {
                            buffer.push(AudioBlock::new(data.to_vec(), channels as u16, sequence));
                            sequence = sequence.wrapping_add(1);
                        }

                        if channels > 0 {
                            frames_metered.fetch_add((data.len() / channels) as u64, Ordering::Relaxed);
                        }
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
                                "start capture",
                                e.into(),
                                &setup_error_tx,
                                &running_for_loop,
                            );
                            return;
                        }

                        // Keep the stream alive while running
                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(std::time::Duration::from_millis(10));
                        }
                    }
                    Err(e) => {
                        report_setup_failure(
                            "build capture",
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
            "Capture started on '{}': {} Hz, {} channel(s)",
            self.device_id,
            self.config.sample_rate.0,
            self.config.channels
        );
        Ok(())
    }

    /// Stop capture
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Check if capture is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Read-side handle for consumers of the meter reading
    pub fn reading_handle(&self) -> ReadingHandle {
        ReadingHandle::new(self.publisher.clone())
    }

    /// Total frames metered since creation
    pub fn frames_metered(&self) -> u64 {
        self.frames_metered.load(Ordering::Relaxed)
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Check for errors
    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.as_ref().and_then(|rx| rx.try_recv().ok())
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn device_default_config(
    device: &crate::audio::device::DeviceHandle,
) -> Result<cpal::SupportedStreamConfig, AudioError> {
    let config = device.device().default_input_config()?;
    if config.sample_format() != SampleFormat::F32 {
        return Err(AudioError::UnsupportedFormat(format!(
            "{:?} (only f32 input is metered)",
            config.sample_format()
        )));
    }
    Ok(config)
}
