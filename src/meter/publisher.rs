//! Lock-free handoff of the latest reading from the audio thread
//!
//! The VU value and the peak flag live in two independent atomics. A
//! consumer can observe a VU value from one block paired with the peak flag
//! of a neighbouring block; that staleness is bounded to a single block and
//! only affects cosmetic rendering.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::constants::VU_FLOOR;

/// One meter reading, produced once per processed block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Smoothed level in VU units, always within [-20, +3]
    pub vu_value: f32,

    /// Whether `vu_value` reached the peak threshold
    pub peak_hit: bool,
}

impl Reading {
    /// Reading published after a reset
    pub const FLOOR: Reading = Reading {
        vu_value: VU_FLOOR,
        peak_hit: false,
    };
}

impl Default for Reading {
    fn default() -> Self {
        Self::FLOOR
    }
}

/// Two-word atomic snapshot written by the engine and polled by consumers
#[derive(Debug)]
pub struct ReadingPublisher {
    /// `f32` bit pattern of the VU value
    vu_bits: AtomicU32,
    peak_hit: AtomicBool,
}

impl ReadingPublisher {
    pub fn new() -> Self {
        Self {
            vu_bits: AtomicU32::new(VU_FLOOR.to_bits()),
            peak_hit: AtomicBool::new(false),
        }
    }

    /// Store a new reading. Never blocks.
    #[inline]
    pub fn publish(&self, reading: Reading) {
        self.vu_bits.store(reading.vu_value.to_bits(), Ordering::Release);
        self.peak_hit.store(reading.peak_hit, Ordering::Release);
    }

    /// Load the most recent reading. Never blocks.
    #[inline]
    pub fn load(&self) -> Reading {
        // Peak first: a flag from block k guarantees a VU value from k or later.
        let peak_hit = self.peak_hit.load(Ordering::Acquire);
        let vu_value = f32::from_bits(self.vu_bits.load(Ordering::Acquire));
        Reading { vu_value, peak_hit }
    }

    /// Current VU value only
    pub fn vu_value(&self) -> f32 {
        f32::from_bits(self.vu_bits.load(Ordering::Acquire))
    }

    /// Current peak flag only
    pub fn is_peak_hit(&self) -> bool {
        self.peak_hit.load(Ordering::Acquire)
    }
}

impl Default for ReadingPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable read-side handle for consumers on other threads
#[derive(Debug, Clone)]
pub struct ReadingHandle {
    inner: Arc<ReadingPublisher>,
}

impl ReadingHandle {
    pub(crate) fn new(inner: Arc<ReadingPublisher>) -> Self {
        Self { inner }
    }

    /// Most recently published reading
    pub fn get(&self) -> Reading {
        self.inner.load()
    }
}
