//! VU loudness meter
//!
//! A level detection engine that runs inside an audio callback, integrates
//! the rectified signal with classic 300 ms VU ballistics and hands a
//! `{ vu_value, peak_hit }` reading to consumers on other threads without
//! locking.
//!
//! ```
//! use vu_meter::meter::{EngineConfig, LevelDetector};
//!
//! let mut detector = LevelDetector::new();
//! detector.reset(EngineConfig::new(48_000.0)).unwrap();
//! let handle = detector.handle();
//!
//! let left = vec![0.0f32; 480];
//! let right = vec![0.0f32; 480];
//! detector.process_block(&[&left[..], &right[..]], 480);
//!
//! assert_eq!(handle.get().vu_value, -20.0);
//! ```

pub mod audio;
pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod meter;
pub mod ui;

pub use error::{Error, Result};
pub use meter::{EngineConfig, LevelDetector, Reading, ReadingHandle};
