//! Level detection and reading handoff
//!
//! The engine runs on the audio thread and writes one [`Reading`] per block;
//! consumers poll it through a [`ReadingHandle`] at their own rate.

pub mod engine;
pub mod publisher;

pub use engine::{is_peak, reading_for_level, vu_from_level, EngineConfig, LevelDetector};
pub use publisher::{Reading, ReadingHandle, ReadingPublisher};
