//! Shared device context.
//!
//! The one explicit structure holding everything the three execution contexts
//! exchange: per-channel rings, the sampling state word, sweep and rate
//! configuration, the requested start frame, the first-sample timestamp, the
//! overflow counter, and the last-frame snapshot. Fields crossed between
//! contexts are atomics; the snapshot is the single critical-section-guarded
//! value (read consistency for the `u` command).

use core::cell::Cell;
use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::config::{DEFAULT_RATE_INDEX, DEFAULT_SWEEP_CHANNELS, MAX_CHANNELS, RING_CAPACITY, SAMPLE_RATES};
use crate::ring::SampleRing;
use crate::state::{Event, SamplingState, transition};

/// Sentinel in the start-frame word meaning "start on any frame".
const NO_START_FRAME: u32 = u32::MAX;

/// The contiguous channel range cycled by the multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sweep {
    pub first: u8,
    pub count: u8,
}

impl Sweep {
    /// Absolute channel index following `channel`, wrapping to the first
    /// channel after the last.
    pub fn next_channel(&self, channel: u8) -> u8 {
        if channel + 1 < self.first + self.count {
            channel + 1
        } else {
            self.first
        }
    }

    /// Iterate the sweep's absolute channel indices in conversion order.
    pub fn channels(&self) -> impl Iterator<Item = u8> {
        self.first..self.first + self.count
    }
}

/// Number and edge timestamp of the most recent frame marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub number: u16,
    pub ticks: u32,
}

pub struct DeviceContext {
    rings: [SampleRing<RING_CAPACITY>; MAX_CHANNELS],
    state: AtomicU8,
    sweep_first: AtomicU8,
    sweep_count: AtomicU8,
    rate_index: AtomicU8,
    start_frame: AtomicU32,
    first_sample_ticks: AtomicU32,
    overflow_count: AtomicU32,
    last_frame: Mutex<CriticalSectionRawMutex, Cell<FrameSnapshot>>,
}

impl DeviceContext {
    pub const fn new() -> Self {
        Self {
            rings: [const { SampleRing::new() }; MAX_CHANNELS],
            state: AtomicU8::new(SamplingState::Idle as u8),
            sweep_first: AtomicU8::new(0),
            sweep_count: AtomicU8::new(DEFAULT_SWEEP_CHANNELS),
            rate_index: AtomicU8::new(DEFAULT_RATE_INDEX),
            start_frame: AtomicU32::new(NO_START_FRAME),
            first_sample_ticks: AtomicU32::new(0),
            overflow_count: AtomicU32::new(0),
            last_frame: Mutex::new(Cell::new(FrameSnapshot { number: 0, ticks: 0 })),
        }
    }

    pub fn state(&self) -> SamplingState {
        SamplingState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Run `event` through the transition table; returns whether the state
    /// changed. Illegal events leave the state untouched.
    pub fn apply(&self, event: Event) -> bool {
        let current = self.state();
        match transition(current, event) {
            Some(next) => {
                self.state.store(next as u8, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub fn sweep(&self) -> Sweep {
        Sweep {
            first: self.sweep_first.load(Ordering::Relaxed),
            count: self.sweep_count.load(Ordering::Relaxed),
        }
    }

    /// Reconfigure the sweep. Only legal while the trigger is stopped.
    pub fn set_sweep(&self, first: u8, count: u8) {
        let count = count.clamp(1, MAX_CHANNELS as u8);
        let first = first.min(MAX_CHANNELS as u8 - count);
        self.sweep_first.store(first, Ordering::Relaxed);
        self.sweep_count.store(count, Ordering::Relaxed);
    }

    pub fn rate_index(&self) -> u8 {
        self.rate_index.load(Ordering::Relaxed)
    }

    pub fn set_rate_index(&self, index: u8) {
        if (index as usize) < SAMPLE_RATES.len() {
            self.rate_index.store(index, Ordering::Relaxed);
        }
    }

    /// Per-channel sample rate currently selected.
    pub fn sample_rate_hz(&self) -> u32 {
        SAMPLE_RATES[self.rate_index() as usize]
    }

    /// Frame number sampling must start on, if one was requested.
    pub fn start_frame(&self) -> Option<u16> {
        match self.start_frame.load(Ordering::Acquire) {
            NO_START_FRAME => None,
            frame => Some(frame as u16),
        }
    }

    pub fn set_start_frame(&self, frame: Option<u16>) {
        let word = match frame {
            Some(frame) => frame as u32,
            None => NO_START_FRAME,
        };
        self.start_frame.store(word, Ordering::Release);
    }

    /// Ring buffer for an absolute channel index.
    pub fn ring(&self, channel: u8) -> Option<&SampleRing<RING_CAPACITY>> {
        self.rings.get(channel as usize)
    }

    /// Clear every ring from the consumer side. The caller must have stopped
    /// the conversion trigger first.
    pub fn clear_rings(&self) {
        for ring in &self.rings {
            ring.clear();
        }
    }

    /// Producer-side drop accounting for the conversion interrupt.
    pub fn note_overflow(&self) {
        self.overflow_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn overflow_count(&self) -> u32 {
        self.overflow_count.load(Ordering::Relaxed)
    }

    pub fn set_first_sample_ticks(&self, ticks: u32) {
        self.first_sample_ticks.store(ticks, Ordering::Release);
    }

    pub fn first_sample_ticks(&self) -> u32 {
        self.first_sample_ticks.load(Ordering::Acquire)
    }

    /// Record the latest frame marker. Called from the frame interrupt.
    pub fn record_frame(&self, snapshot: FrameSnapshot) {
        self.last_frame.lock(|cell| cell.set(snapshot));
    }

    /// Consistent number/timestamp pair of the latest frame marker. The lock
    /// is a brief interrupt-disabled section; this is the only true critical
    /// section in the core.
    pub fn latest_frame(&self) -> FrameSnapshot {
        self.last_frame.lock(|cell| cell.get())
    }

    /// Reset per-run bookkeeping at the start of a sampling run. The caller
    /// must have stopped the conversion trigger first.
    pub fn reset_session(&self) {
        self.clear_rings();
        self.overflow_count.store(0, Ordering::Relaxed);
        self.first_sample_ticks.store(0, Ordering::Release);
    }
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self::new()
    }
}
