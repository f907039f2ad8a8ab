//! Bounded multi-producer ring buffer backing local-queue sinks.
//!
//! Producers reserve a sequence with [`RingBuffer::next`] (blocking) or
//! [`RingBuffer::try_next`] (fails fast when full), write the slot returned by
//! [`RingBuffer::get`], then make it visible with [`RingBuffer::publish`].
//! A single [`QueueReader`] drains published frames in sequence order.
//!
//! A reserved sequence must always be published. The reader stops at the
//! first unpublished sequence, so a producer that reserves and never
//! publishes stalls every frame behind it.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

use crate::error::{MessagingError, Result};

/// Number of busy spins before a blocked producer starts yielding.
const SPIN_LIMIT: u32 = 64;

/// Exclusive access to one slot, held between reservation and publish.
pub type SlotGuard = ArcMutexGuard<RawMutex, Frame>;

/// Fixed-size byte slot.
#[derive(Debug)]
pub struct Frame {
    len: usize,
    data: Box<[u8]>,
}

impl Frame {
    fn with_capacity(slot_size: usize) -> Self {
        Self {
            len: 0,
            data: vec![0u8; slot_size].into_boxed_slice(),
        }
    }

    /// Slot size in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes written by the producer.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Replace the frame contents with `buf`.
    ///
    /// Callers check `buf.len() <= capacity()` beforehand.
    pub fn write(&mut self, buf: &[u8]) {
        self.data[..buf.len()].copy_from_slice(buf);
        self.len = buf.len();
    }

    /// Writable region of `len` bytes, which becomes the frame's payload.
    pub fn region_mut(&mut self, len: usize) -> &mut [u8] {
        self.len = len;
        &mut self.data[..len]
    }

    /// Mark the frame as carrying no payload.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

/// Bounded multi-producer, single-consumer sequence ring.
#[derive(Debug)]
pub struct RingBuffer {
    slots: Box<[Arc<Mutex<Frame>>]>,
    /// Last sequence published into each slot, -1 when never published.
    available: Box<[AtomicI64]>,
    /// Highest reserved sequence.
    cursor: AtomicI64,
    /// Highest sequence released by the reader.
    consumed: AtomicI64,
    slot_size: usize,
    reader_taken: AtomicBool,
}

impl RingBuffer {
    /// Create a ring with `slots` frames of `slot_size` bytes each.
    pub fn new(slots: usize, slot_size: usize) -> Result<Self> {
        if slots == 0 {
            return Err(MessagingError::config("ring buffer needs at least one slot"));
        }
        if slot_size == 0 {
            return Err(MessagingError::config("ring buffer slot size must be positive"));
        }

        Ok(Self {
            slots: (0..slots)
                .map(|_| Arc::new(Mutex::new(Frame::with_capacity(slot_size))))
                .collect(),
            available: (0..slots).map(|_| AtomicI64::new(-1)).collect(),
            cursor: AtomicI64::new(-1),
            consumed: AtomicI64::new(-1),
            slot_size,
            reader_taken: AtomicBool::new(false),
        })
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Largest payload a slot can carry.
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Slots not currently reserved or awaiting consumption.
    pub fn remaining_capacity(&self) -> usize {
        let in_flight = self.cursor.load(Ordering::Acquire) - self.consumed.load(Ordering::Acquire);
        self.capacity().saturating_sub(in_flight.max(0) as usize)
    }

    fn index(&self, sequence: i64) -> usize {
        (sequence as u64 % self.slots.len() as u64) as usize
    }

    /// Reserve the next sequence, or `None` if every slot is in flight.
    pub fn try_next(&self) -> Option<i64> {
        let capacity = self.capacity() as i64;
        let mut current = self.cursor.load(Ordering::Acquire);
        loop {
            let next = current + 1;
            if next - capacity > self.consumed.load(Ordering::Acquire) {
                return None;
            }
            match self.cursor.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Reserve the next sequence, waiting for the reader to free a slot.
    pub fn next(&self) -> i64 {
        self.next_observed(|| {})
    }

    /// Like [`next`](Self::next), calling `on_wait` once per failed attempt.
    pub fn next_observed(&self, mut on_wait: impl FnMut()) -> i64 {
        let mut spins = 0u32;
        loop {
            if let Some(sequence) = self.try_next() {
                return sequence;
            }
            on_wait();
            if spins < SPIN_LIMIT {
                spins += 1;
                std::hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
        }
    }

    /// Lock the slot backing a reserved sequence.
    pub fn get(&self, sequence: i64) -> SlotGuard {
        self.slots[self.index(sequence)].lock_arc()
    }

    /// Make a reserved sequence visible to the reader.
    pub fn publish(&self, sequence: i64) {
        self.available[self.index(sequence)].store(sequence, Ordering::Release);
    }

    /// Whether `sequence` has been published and not yet overwritten.
    pub fn is_published(&self, sequence: i64) -> bool {
        self.available[self.index(sequence)].load(Ordering::Acquire) == sequence
    }

    /// Take the single reader of this ring.
    pub fn reader(self: &Arc<Self>) -> Result<QueueReader> {
        if self.reader_taken.swap(true, Ordering::AcqRel) {
            return Err(MessagingError::config("ring buffer already has a reader"));
        }
        Ok(QueueReader {
            ring: Arc::clone(self),
        })
    }
}

/// Consumer side of a [`RingBuffer`].
#[derive(Debug)]
pub struct QueueReader {
    ring: Arc<RingBuffer>,
}

impl QueueReader {
    /// Hand every contiguous published frame to `handler`, releasing each slot
    /// afterwards. Returns the number of frames handled.
    pub fn poll(&mut self, mut handler: impl FnMut(i64, &[u8])) -> usize {
        let mut handled = 0;
        let mut next = self.ring.consumed.load(Ordering::Acquire) + 1;
        while self.ring.is_published(next) {
            {
                let frame = self.ring.get(next);
                handler(next, frame.payload());
            }
            self.ring.consumed.store(next, Ordering::Release);
            handled += 1;
            next += 1;
        }
        handled
    }

    /// Drain everything currently published into owned buffers.
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        self.poll(|_, payload| frames.push(payload.to_vec()));
        frames
    }

    /// The ring this reader consumes.
    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }
}

impl Drop for QueueReader {
    fn drop(&mut self) {
        self.ring.reader_taken.store(false, Ordering::Release);
    }
}
