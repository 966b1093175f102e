//! Lock-free ring buffer for the pass-through path
//!
//! Single-producer single-consumer: the capture callback pushes each block it
//! has metered, the playback callback pops it. Blocks are moved, never
//! rewritten, so the output is bit-identical to the input.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One callback block of interleaved samples
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    /// Interleaved audio samples (f32)
    pub samples: Vec<f32>,
    /// Number of channels
    pub channels: u16,
    /// Block sequence number
    pub sequence: u32,
}

impl AudioBlock {
    pub fn new(samples: Vec<f32>, channels: u16, sequence: u32) -> Self {
        Self {
            samples,
            channels,
            sequence,
        }
    }
}

/// Lock-free ring buffer for audio blocks
pub struct RingBuffer {
    queue: ArrayQueue<AudioBlock>,
    overflow_count: AtomicUsize,
}

impl RingBuffer {
    /// Create a new ring buffer with the specified capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            overflow_count: AtomicUsize::new(0),
        }
    }

    /// Push a block into the buffer
    /// Returns false if buffer is full (overflow); the block is dropped
    pub fn push(&self, block: AudioBlock) -> bool {
        match self.queue.push(block) {
            Ok(()) => true,
            Err(_) => {
                self.overflow_count.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Pop the oldest block, if any
    pub fn pop(&self) -> Option<AudioBlock> {
        self.queue.pop()
    }

    /// Blocks dropped because playback fell behind
    pub fn overflow_count(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }
}

/// Thread-safe handle to a ring buffer
pub type SharedRingBuffer = Arc<RingBuffer>;

/// Create a new shared ring buffer
pub fn create_shared_buffer(capacity: usize) -> SharedRingBuffer {
    Arc::new(RingBuffer::new(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_fifo() {
        let buffer = RingBuffer::new(4);

        assert!(buffer.push(AudioBlock::new(vec![0.0; 480], 2, 0)));
        assert!(buffer.push(AudioBlock::new(vec![1.0; 480], 2, 1)));

        assert_eq!(buffer.pop().unwrap().sequence, 0);
        assert_eq!(buffer.pop().unwrap().sequence, 1);
        assert!(buffer.pop().is_none());
    }

    #[test]
    fn test_full_buffer_drops_and_counts_overflow() {
        let buffer = create_shared_buffer(1);
        assert!(buffer.push(AudioBlock::new(vec![0.5], 1, 0)));
        assert!(!buffer.push(AudioBlock::new(vec![0.25], 1, 1)));
        assert!(!buffer.push(AudioBlock::new(vec![0.125], 1, 2)));
        assert_eq!(buffer.overflow_count(), 2);

        // The queued block survives, the late ones are gone
        assert_eq!(buffer.pop().unwrap().sequence, 0);
        assert!(buffer.pop().is_none());
        assert_eq!(buffer.overflow_count(), 2);
    }

    #[test]
    fn test_block_is_moved_unchanged() {
        let samples: Vec<f32> = vec![0.1, -0.2, f32::MIN_POSITIVE, -0.0];
        let buffer = RingBuffer::new(2);
        buffer.push(AudioBlock::new(samples.clone(), 2, 7));

        let out = buffer.pop().unwrap();
        let bits_in: Vec<u32> = samples.iter().map(|s| s.to_bits()).collect();
        let bits_out: Vec<u32> = out.samples.iter().map(|s| s.to_bits()).collect();
        assert_eq!(bits_in, bits_out);
        assert_eq!(out.channels, 2);
    }
}
