//! Fixed-capacity single-producer/single-consumer sample queue.
//!
//! One instance exists per analog channel. The conversion-complete interrupt
//! is the only writer of the write index and the drain loop is the only
//! writer of the read index; each side observes the other's index through
//! acquire loads, so neither path needs a critical section.
//!
//! One slot is always kept empty so a full queue and an empty queue have
//! distinct index states: `count = (write - read) mod N`, `space = N - 1 - count`.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Raw sample as stored in the queue: a 12-bit converter code shifted and
/// offset to signed 16-bit full scale (see [`crate::hal::scale_sample`]).
pub type Sample = i16;

pub struct SampleRing<const N: usize> {
    slots: UnsafeCell<[Sample; N]>,
    write: AtomicUsize,
    read: AtomicUsize,
}

// Safety: `write` is stored only by the single producer and `read` only by
// the single consumer; slot accesses never alias under that discipline.
unsafe impl<const N: usize> Sync for SampleRing<N> {}

impl<const N: usize> SampleRing<N> {
    pub const fn new() -> Self {
        Self {
            slots: UnsafeCell::new([0; N]),
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    /// Raw pointer to the slot array. Slots are accessed individually through
    /// this pointer, never through an array reference, so the producer and
    /// consumer never hold overlapping references to the storage.
    fn slot_ptr(&self) -> *mut Sample {
        self.slots.get().cast::<Sample>()
    }

    /// Number of samples currently queued.
    pub fn len(&self) -> usize {
        let w = self.write.load(Ordering::Acquire);
        let r = self.read.load(Ordering::Acquire);
        (w + N - r) % N
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free slots remaining. One slot is reserved, so an empty queue reports
    /// `N - 1`.
    pub fn space(&self) -> usize {
        N - 1 - self.len()
    }

    /// Producer side. Returns `false` and drops the sample when no space is
    /// left; never blocks, never retries.
    pub fn push(&self, sample: Sample) -> bool {
        let w = self.write.load(Ordering::Relaxed);
        let r = self.read.load(Ordering::Acquire);
        let next = (w + 1) % N;
        if next == r {
            return false;
        }
        unsafe {
            self.slot_ptr().add(w).write(sample);
        }
        self.write.store(next, Ordering::Release);
        true
    }

    /// Producer side bulk insert. Accepts `min(samples.len(), space())` and
    /// performs at most one wraparound split copy. Returns the accepted count.
    pub fn push_bulk(&self, samples: &[Sample]) -> usize {
        let w = self.write.load(Ordering::Relaxed);
        let r = self.read.load(Ordering::Acquire);
        let space = (r + N - w - 1) % N;
        let accepted = samples.len().min(space);
        if accepted == 0 {
            return 0;
        }
        let first = accepted.min(N - w);
        unsafe {
            core::ptr::copy_nonoverlapping(samples.as_ptr(), self.slot_ptr().add(w), first);
            core::ptr::copy_nonoverlapping(
                samples.as_ptr().add(first),
                self.slot_ptr(),
                accepted - first,
            );
        }
        self.write.store((w + accepted) % N, Ordering::Release);
        accepted
    }

    /// Consumer side.
    pub fn pop(&self) -> Option<Sample> {
        let r = self.read.load(Ordering::Relaxed);
        let w = self.write.load(Ordering::Acquire);
        if r == w {
            return None;
        }
        let sample = unsafe { self.slot_ptr().add(r).read() };
        self.read.store((r + 1) % N, Ordering::Release);
        Some(sample)
    }

    /// Consumer side, non-destructive read of the oldest sample.
    pub fn peek(&self) -> Option<Sample> {
        let r = self.read.load(Ordering::Relaxed);
        let w = self.write.load(Ordering::Acquire);
        if r == w {
            return None;
        }
        Some(unsafe { self.slot_ptr().add(r).read() })
    }

    /// Consumer side. Discards everything queued by advancing the read index
    /// to the write index. The producer must be stopped first: a conversion
    /// interrupt landing mid-clear would push into the region being dropped.
    pub fn clear(&self) {
        self.read
            .store(self.write.load(Ordering::Acquire), Ordering::Release);
    }
}

impl<const N: usize> Default for SampleRing<N> {
    fn default() -> Self {
        Self::new()
    }
}
