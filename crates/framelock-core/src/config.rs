//! Compile-time configuration for the acquisition core.
//!
//! Everything here is a build-time constant: the memory budget is fixed, the
//! supported sample rates are a closed table, and the PLL gains are tuned for
//! the nominal 48 MHz tick clock / 1 ms frame reference pair.

/// Nominal local ticks per external frame period (48 MHz / 1 kHz frames).
pub const TICKS_PER_FRAME: u32 = 48_000;

/// Half a frame period in ticks; phase errors are wrapped into
/// `[-HALF_FRAME_TICKS, +HALF_FRAME_TICKS)`.
pub const HALF_FRAME_TICKS: i32 = (TICKS_PER_FRAME / 2) as i32;

/// Number of per-channel ring buffers compiled in.
pub const MAX_CHANNELS: usize = 8;

/// Default sweep length when no explicit configuration has been applied.
pub const DEFAULT_SWEEP_CHANNELS: u8 = 2;

/// Capacity of each per-channel ring buffer, in samples. One slot is always
/// kept empty, so the usable depth is one less.
pub const RING_CAPACITY: usize = 256;

/// Supported per-channel sample rates in Hz, indexed by the `~` command's
/// single digit argument.
pub const SAMPLE_RATES: [u32; 8] = [8_000, 4_000, 2_000, 1_000, 500, 250, 100, 50];

/// Rate-table index selected at boot (100 Hz).
pub const DEFAULT_RATE_INDEX: u8 = 6;

/// Rates above this use multi-point data packets to keep the drain cadence
/// ahead of production; at or below it every packet carries a single point.
pub const MULTI_POINT_THRESHOLD_HZ: u32 = 100;

/// Points carried by one multi-point (`'M'`) data packet.
pub const MULTI_PACKET_POINTS: usize = 10;

/// Upper bound on samples in one data packet (points x channels).
pub const MAX_POINT_SAMPLES: usize = MULTI_PACKET_POINTS * MAX_CHANNELS;

/// Largest encoded packet, sized for the version descriptor and the widest
/// multi-point data payload.
pub const MAX_PACKET_LEN: usize = 256;

/// Maximum accepted command line length, terminator included.
pub const COMMAND_MAX_LEN: usize = 64;

/// Ticks after the first byte of a line before a partial command is dropped
/// (100 ms at the nominal tick rate).
pub const COMMAND_TIMEOUT_TICKS: u32 = TICKS_PER_FRAME * 100;

/// Oscillator trim clamp. The DCO trim register on this family is a signed
/// 8-bit value; other families widen this to 10 bits.
pub const TRIM_RANGE: i32 = 127;

/// Leaky-accumulator time constant of the PLL's proportional path, in frames.
pub const PLL_LEAD_TC: i32 = 16;

/// Gain denominator applied to the low-pass lead term.
pub const PLL_LEAD_DIV: i32 = 4;

/// Magnitude of the sign-only "clipped lead" contribution.
pub const PLL_CLIP_GAIN: i32 = 8;

/// Gain denominator applied to the free integral accumulator.
pub const PLL_INTEGRAL_DIV: i32 = 64;

/// Common fixed-point scale dividing the summed terms into trim units.
pub const PLL_OUTPUT_SCALE: i32 = 16;

/// Anti-windup clamp on the integral accumulator: twice what is needed to
/// hold the trim register at either end of its range.
pub const PLL_INTEGRAL_LIMIT: i32 = 2 * TRIM_RANGE * PLL_INTEGRAL_DIV * PLL_OUTPUT_SCALE;

/// Device class reported in the version descriptor.
pub const DEVICE_CLASS: &str = "frame_locked_daq";

/// Human-readable device name reported in the version descriptor.
pub const DEVICE_NAME: &str = "FrameLock Analog DAQ";

/// Serial number reported in the version descriptor.
pub const SERIAL_NUMBER: &str = "FL-000001";

/// Points per data packet for a given per-channel rate.
pub const fn points_per_packet(rate_hz: u32) -> usize {
    if rate_hz > MULTI_POINT_THRESHOLD_HZ {
        MULTI_PACKET_POINTS
    } else {
        1
    }
}
