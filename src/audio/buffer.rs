//! Audio frames and the lock-free frame queue
//!
//! The queue is a single-producer single-consumer hand-off between the
//! thread that submits playback units and the real-time output callback.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Block of mono audio samples tagged with their rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Always 1 on the wire
    pub channels: u16,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, sample_rate, 1)
    }

    /// Get number of samples per channel
    pub fn samples_per_channel(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Get frame duration in microseconds
    pub fn duration_us(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples_per_channel() as u64 * 1_000_000) / self.sample_rate as u64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Bounded lock-free queue of frames
pub struct RingBuffer {
    queue: ArrayQueue<AudioFrame>,
    overflow_count: AtomicUsize,
    underrun_count: AtomicUsize,
}

impl RingBuffer {
    /// Create a new ring buffer with the specified capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            overflow_count: AtomicUsize::new(0),
            underrun_count: AtomicUsize::new(0),
        }
    }

    /// Push a frame into the buffer
    /// Returns false if buffer is full (overflow)
    pub fn push(&self, frame: AudioFrame) -> bool {
        match self.queue.push(frame) {
            Ok(()) => true,
            Err(_) => {
                self.overflow_count.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Pop a frame, counting an underrun when empty
    pub fn pop(&self) -> Option<AudioFrame> {
        match self.queue.pop() {
            Some(frame) => Some(frame),
            None => {
                self.underrun_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Pop without counting an underrun
    pub fn try_pop(&self) -> Option<AudioFrame> {
        self.queue.pop()
    }

    /// Drop everything queued
    pub fn clear(&self) {
        while self.queue.pop().is_some() {}
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn overflow_count(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }

    pub fn underrun_count(&self) -> usize {
        self.underrun_count.load(Ordering::Relaxed)
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
    fn test_frame_duration() {
        let frame = AudioFrame::mono(vec![0.0; 1600], 16000);
        assert_eq!(frame.duration_us(), 100_000);
        assert_eq!(frame.samples_per_channel(), 1600);
    }

    #[test]
    fn test_ring_buffer_order_and_overflow() {
        let buffer = RingBuffer::new(2);

        assert!(buffer.push(AudioFrame::mono(vec![0.1], 16000)));
        assert!(buffer.push(AudioFrame::mono(vec![0.2], 16000)));
        assert!(!buffer.push(AudioFrame::mono(vec![0.3], 16000)));
        assert_eq!(buffer.overflow_count(), 1);

        assert_eq!(buffer.pop().unwrap().samples, vec![0.1]);
        assert_eq!(buffer.pop().unwrap().samples, vec![0.2]);
        assert!(buffer.pop().is_none());
        assert_eq!(buffer.underrun_count(), 1);
    }

    #[test]
    fn test_clear() {
        let buffer = create_shared_buffer(4);
        buffer.push(AudioFrame::mono(vec![0.0; 10], 16000));
        buffer.push(AudioFrame::mono(vec![0.0; 10], 16000));
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
