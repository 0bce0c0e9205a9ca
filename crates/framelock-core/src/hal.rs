//! Abstract hardware-access contract.
//!
//! This trait is the only seam that varies per silicon family (ADC, timer,
//! event system, USB peripheral). The core never touches registers; it states
//! behavioral requirements here and the target crate (or the simulator)
//! fulfills them.
//!
//! Tick counter contract: a free-running 32-bit counter at the nominal rate
//! of [`crate::config::TICKS_PER_FRAME`] ticks per frame period, wrapping at
//! a multiple of the frame period so that `ticks % TICKS_PER_FRAME` is a
//! stable phase reference across the wrap.

use crate::ring::Sample;

/// A completed analog conversion and the channel it was taken on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    /// Raw 12-bit converter code, `0..=4095`.
    pub value: u16,
    /// Absolute channel index the multiplexer was on.
    pub channel: u8,
}

/// A detected external frame marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEvent {
    /// Bus frame sequence number.
    pub number: u16,
    /// Local tick counter captured at the marker edge.
    pub ticks: u32,
}

/// Capabilities the core requires from the target hardware.
///
/// All operations must be non-blocking and callable from interrupt context.
pub trait Hardware {
    /// Start the periodic conversion trigger, firing `rate_hz` conversions
    /// per second. Callers pass the per-channel sample rate multiplied by
    /// the sweep length, so one full sweep completes per sample period.
    fn start_trigger(&mut self, rate_hz: u32);

    /// Stop the conversion trigger and suppress further conversion-complete
    /// interrupts. Must take effect before returning.
    fn stop_trigger(&mut self);

    /// Read the just-completed conversion result and its channel.
    fn read_conversion(&mut self) -> Conversion;

    /// Point the input multiplexer at `channel` for the next conversion.
    fn advance_mux(&mut self, channel: u8);

    /// Current value of the free-running tick counter.
    fn ticks_now(&self) -> u32;

    /// Last value written to the oscillator trim register.
    fn trim(&self) -> i16;

    /// Write the oscillator trim register. Values are pre-clamped by the PLL
    /// to the representable range.
    fn set_trim(&mut self, trim: i16);

    /// Sequence number and edge timestamp of the frame marker that raised
    /// the current frame interrupt.
    fn frame_event(&mut self) -> FrameEvent;
}

/// Scale a raw 12-bit converter code to the signed 16-bit full-scale
/// convention used on the wire: left-shifted four bits, offset so mid-scale
/// input reads as zero.
pub const fn scale_sample(raw: u16) -> Sample {
    (((raw as i32) << 4) - 32_768) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_covers_signed_full_range() {
        assert_eq!(scale_sample(0), i16::MIN);
        assert_eq!(scale_sample(2048), 0);
        assert_eq!(scale_sample(4095), 32_752);
    }
}
