//! Audio host glue
//!
//! Input capture driving the level detector, pass-through playback and
//! device handling.

pub mod buffer;
pub mod capture;
pub mod device;
pub mod playback;

use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::AudioError;

pub use buffer::{create_shared_buffer, AudioBlock, RingBuffer, SharedRingBuffer};
pub use capture::AudioCapture;
pub use device::{get_device_by_id, is_layout_supported, list_devices, negotiate_layout, AudioDevice};
pub use playback::AudioPlayback;

/// Report a stream that could not be built or started and mark it stopped
pub(crate) fn report_setup_failure(
    stage: &str,
    error: AudioError,
    error_tx: &Sender<AudioError>,
    running: &AtomicBool,
) {
    tracing::error!("Failed to {} stream: {}", stage, error);
    let _ = error_tx.try_send(error);
    running.store(false, Ordering::SeqCst);
}
