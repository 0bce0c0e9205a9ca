//! Simulated target hardware.
//!
//! Models the pieces the core's [`Hardware`] trait abstracts: a tick counter
//! driven by an imperfect local oscillator whose rate responds to the trim
//! register, a 1 ms frame-marker source on the reference timebase, the
//! conversion trigger and multiplexer, and a loopback serial link.

use std::collections::VecDeque;
use std::convert::Infallible;

use framelock_core::config::TICKS_PER_FRAME;
use framelock_core::hal::{Conversion, FrameEvent, Hardware};

/// The simulated tick counter wraps at a multiple of the frame period, as
/// the HAL contract requires.
const TICK_WRAP: f64 = TICKS_PER_FRAME as f64 * 65_536.0;

/// What the simulated converter digitizes.
#[derive(Debug, Clone, Copy)]
pub enum SignalSource {
    /// Deterministic per-channel ramp, convenient for assertions.
    Ramp,
    /// Per-channel sine waves, nicer to look at in the demo.
    Sine,
}

pub struct SimulatedHardware {
    /// Free-running oscillator error relative to the reference, in ppm.
    pub oscillator_offset_ppm: f64,
    /// Oscillator rate change per trim LSB, in ppm.
    pub trim_ppm_per_lsb: f64,
    pub source: SignalSource,
    trim: i16,
    local_ticks: f64,
    frame_number: u16,
    last_frame: FrameEvent,
    trigger_rate: Option<u32>,
    mux: u8,
    conversion_credit: f64,
    latched: Conversion,
    sequence: u32,
}

impl SimulatedHardware {
    pub fn new(oscillator_offset_ppm: f64) -> Self {
        Self {
            oscillator_offset_ppm,
            trim_ppm_per_lsb: 3.0,
            source: SignalSource::Ramp,
            trim: 0,
            local_ticks: 0.0,
            frame_number: 0,
            last_frame: FrameEvent { number: 0, ticks: 0 },
            trigger_rate: None,
            mux: 0,
            conversion_credit: 0.0,
            latched: Conversion { value: 0, channel: 0 },
            sequence: 0,
        }
    }

    /// Advance the simulation by one reference frame period (1 ms) and latch
    /// the frame-marker event for the interrupt handler.
    pub fn advance_frame(&mut self) {
        let error_ppm = self.oscillator_offset_ppm + self.trim as f64 * self.trim_ppm_per_lsb;
        self.local_ticks = (self.local_ticks + TICKS_PER_FRAME as f64 * (1.0 + error_ppm * 1e-6))
            % TICK_WRAP;
        self.frame_number = self.frame_number.wrapping_add(1);
        self.last_frame = FrameEvent {
            number: self.frame_number,
            ticks: self.local_ticks as u32,
        };
    }

    /// Conversions the trigger fires during this frame period. Fractional
    /// periods carry over so slow rates still fire on schedule.
    pub fn conversions_due(&mut self) -> u32 {
        let Some(rate) = self.trigger_rate else {
            self.conversion_credit = 0.0;
            return 0;
        };
        self.conversion_credit += rate as f64 / 1_000.0;
        let due = self.conversion_credit as u32;
        self.conversion_credit -= due as f64;
        due
    }

    /// Digitize the channel the multiplexer points at, making the result
    /// available to `read_conversion`.
    pub fn latch_conversion(&mut self) {
        let value = match self.source {
            SignalSource::Ramp => (self.mux as u32 * 512 + self.sequence) % 4_096,
            SignalSource::Sine => {
                let t = self.sequence as f64 / 200.0;
                let phase = t * (self.mux as f64 + 1.0);
                (2_048.0 + 1_024.0 * phase.sin()) as u32
            }
        };
        self.latched = Conversion {
            value: value as u16,
            channel: self.mux,
        };
        self.sequence += 1;
    }

    pub fn frame_number(&self) -> u16 {
        self.frame_number
    }

    pub fn trigger_running(&self) -> bool {
        self.trigger_rate.is_some()
    }
}

impl Hardware for SimulatedHardware {
    fn start_trigger(&mut self, rate_hz: u32) {
        self.trigger_rate = Some(rate_hz);
    }

    fn stop_trigger(&mut self) {
        self.trigger_rate = None;
        self.conversion_credit = 0.0;
    }

    fn read_conversion(&mut self) -> Conversion {
        self.latched
    }

    fn advance_mux(&mut self, channel: u8) {
        self.mux = channel;
    }

    fn ticks_now(&self) -> u32 {
        self.local_ticks as u32
    }

    fn trim(&self) -> i16 {
        self.trim
    }

    fn set_trim(&mut self, trim: i16) {
        self.trim = trim;
    }

    fn frame_event(&mut self) -> FrameEvent {
        self.last_frame
    }
}

/// Loopback serial link between the simulated host and the firmware: the
/// host feeds commands in and collects the packet stream out.
#[derive(Default)]
pub struct SerialLink {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
}

impl SerialLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host side: queue command bytes for the firmware.
    pub fn host_send(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    /// Host side: take everything the firmware has written so far.
    pub fn host_take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }
}

impl embedded_io::ErrorType for SerialLink {
    type Error = Infallible;
}

impl embedded_io::Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < buf.len() {
            match self.inbound.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

impl embedded_io::ReadReady for SerialLink {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.inbound.is_empty())
    }
}

impl embedded_io::Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
