//! Software phase-locked loop tracking the external frame reference.
//!
//! The local oscillator and the bus host's oscillator drift independently;
//! this loop measures, every frame marker, where the marker edge landed in
//! the local tick cycle and steers the oscillator trim register so the edge
//! converges on a fixed reference point. Three fixed-point paths feed the
//! trim word:
//!
//! * a leaky accumulator low-passing the phase error (lead term),
//! * a sign-only "clipped lead" that reacts instantly but only with unit
//!   magnitude, keeping the response noise-insensitive,
//! * a free integrator removing the steady-state frequency offset.
//!
//! The loop runs on every frame marker regardless of sampling state, so lock
//! is already acquired by the time a run starts. Integer arithmetic only;
//! bounded work per update.

use crate::config::{
    HALF_FRAME_TICKS, PLL_CLIP_GAIN, PLL_INTEGRAL_DIV, PLL_INTEGRAL_LIMIT, PLL_LEAD_DIV,
    PLL_LEAD_TC, PLL_OUTPUT_SCALE, TICKS_PER_FRAME, TRIM_RANGE,
};
use crate::context::{DeviceContext, FrameSnapshot};
use crate::hal::Hardware;
use crate::state::{Event, SamplingState};

pub struct FramePll {
    /// Leaky accumulator of the proportional path.
    lead_accum: i32,
    /// Free integrator for the steady-state frequency offset.
    integral: i32,
    /// Last trim value produced.
    trim: i16,
    /// Last measured phase error, kept for queries and diagnostics.
    phase: i32,
}

impl FramePll {
    pub const fn new() -> Self {
        Self {
            lead_accum: 0,
            integral: 0,
            trim: 0,
            phase: 0,
        }
    }

    /// Filter one frame-marker edge timestamp into a new trim value.
    ///
    /// The returned value is already clamped to the trim register range; the
    /// caller writes it to the hardware unconditionally.
    pub fn update(&mut self, edge_ticks: u32) -> i16 {
        // Zero-centered phase of the marker edge within the tick cycle.
        let mut phase = (edge_ticks % TICKS_PER_FRAME) as i32;
        if phase >= HALF_FRAME_TICKS {
            phase -= TICKS_PER_FRAME as i32;
        }
        self.phase = phase;

        // Leaky integrator: accumulate, leak the output back out. Unity DC
        // gain with a time constant of PLL_LEAD_TC frames.
        self.lead_accum = self.lead_accum.saturating_add(phase);
        let lead = self.lead_accum / PLL_LEAD_TC;
        self.lead_accum -= lead;

        let clip = phase.signum() * PLL_CLIP_GAIN;

        self.integral = self
            .integral
            .saturating_add(phase)
            .clamp(-PLL_INTEGRAL_LIMIT, PLL_INTEGRAL_LIMIT);

        let combined = lead / PLL_LEAD_DIV + clip + self.integral / PLL_INTEGRAL_DIV;

        // Positive phase means the local clock runs fast, so the correction
        // is inverted, then clamped to what the trim register can hold.
        let trim = (-(combined / PLL_OUTPUT_SCALE)).clamp(-TRIM_RANGE, TRIM_RANGE) as i16;
        self.trim = trim;
        trim
    }

    pub fn trim(&self) -> i16 {
        self.trim
    }

    /// Last measured phase error in ticks, zero-centered.
    pub fn phase(&self) -> i32 {
        self.phase
    }
}

impl Default for FramePll {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame-marker interrupt handler.
///
/// Updates the PLL, writes the trim register, records the last-frame
/// snapshot, and gates the start of sampling: when a run is waiting for
/// frame sync and this marker qualifies (no specific start frame requested,
/// or the number matches), the conversion trigger is armed.
pub fn on_frame_marker<H: Hardware>(pll: &mut FramePll, ctx: &DeviceContext, hw: &mut H) {
    let event = hw.frame_event();

    let trim = pll.update(event.ticks);
    hw.set_trim(trim);

    ctx.record_frame(FrameSnapshot {
        number: event.number,
        ticks: event.ticks,
    });

    if ctx.state() == SamplingState::WaitingForFrameSync {
        let qualifies = match ctx.start_frame() {
            Some(frame) => frame == event.number,
            None => true,
        };
        if qualifies {
            let sweep = ctx.sweep();
            hw.start_trigger(ctx.sample_rate_hz() * sweep.count as u32);
            ctx.apply(Event::FrameSyncArrived);
        }
    }
}
