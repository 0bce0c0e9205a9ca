//! Simulation harness wiring the core to the simulated target.
//!
//! Each step models one reference frame period the way firmware experiences
//! it: the frame-marker interrupt fires, any due conversion-complete
//! interrupts fire, then the main loop gets one drain iteration.

use framelock_core::acquisition::on_conversion_complete;
use framelock_core::context::DeviceContext;
use framelock_core::drain::DrainLoop;
use framelock_core::pll::{FramePll, on_frame_marker};

use crate::hardware::{SerialLink, SimulatedHardware};

pub struct Simulation {
    pub hw: SimulatedHardware,
    pub ctx: DeviceContext,
    pub pll: FramePll,
    pub drain: DrainLoop,
    pub serial: SerialLink,
}

impl Simulation {
    pub fn new(oscillator_offset_ppm: f64) -> Self {
        Self {
            hw: SimulatedHardware::new(oscillator_offset_ppm),
            ctx: DeviceContext::new(),
            pll: FramePll::new(),
            drain: DrainLoop::new(),
            serial: SerialLink::new(),
        }
    }

    /// Queue host command bytes on the serial link.
    pub fn send(&mut self, bytes: &[u8]) {
        self.serial.host_send(bytes);
    }

    /// Collect everything the firmware wrote since the last call.
    pub fn take_output(&mut self) -> Vec<u8> {
        self.serial.host_take()
    }

    /// Run whole frame periods.
    pub fn run_frames(&mut self, frames: u32) {
        for _ in 0..frames {
            self.hw.advance_frame();
            on_frame_marker(&mut self.pll, &self.ctx, &mut self.hw);

            for _ in 0..self.hw.conversions_due() {
                self.hw.latch_conversion();
                on_conversion_complete(&self.ctx, &mut self.hw);
            }

            if let Err(error) = self.drain.poll(&self.ctx, &mut self.hw, &mut self.serial) {
                log::error!("drain iteration failed: {error}");
            }
        }
    }
}
