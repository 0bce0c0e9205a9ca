//! Conversion-complete interrupt handler.
//!
//! Runs once per completed analog conversion: scales and queues the result,
//! detects the first sample of a run, and advances the multiplexer to the
//! next channel of the sweep so the following trigger converts it. Bounded
//! work, no blocking, no allocation; a full ring drops the sample and bumps
//! the overflow counter.

use crate::context::DeviceContext;
use crate::hal::{Hardware, scale_sample};
use crate::state::{Event, SamplingState};

pub fn on_conversion_complete<H: Hardware>(ctx: &DeviceContext, hw: &mut H) {
    let conversion = hw.read_conversion();
    let sweep = ctx.sweep();

    if let Some(ring) = ctx.ring(conversion.channel)
        && !ring.push(scale_sample(conversion.value))
    {
        ctx.note_overflow();
    }

    // The first completed conversion on the sweep's first channel marks the
    // start of the run; its timestamp answers the `f` command.
    if conversion.channel == sweep.first && ctx.state() == SamplingState::StartingSampling {
        ctx.set_first_sample_ticks(hw.ticks_now());
        ctx.apply(Event::FirstSampleCaptured);
    }

    hw.advance_mux(sweep.next_channel(conversion.channel));
}
