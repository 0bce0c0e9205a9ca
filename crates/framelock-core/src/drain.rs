//! Cooperative main-loop drain.
//!
//! One iteration services at most one command line, then empties the ring
//! buffers in lock-step across the sweep: a point is only emitted once every
//! channel has produced its sample, so multi-channel tuples stay aligned.
//! Nothing here blocks; backpressure exists only as producer-side drops.

use embedded_io::{Read, ReadReady, Write};
use heapless::Vec;
use log::warn;

use crate::command::{CommandProcessor, write_packet};
use crate::config::MAX_POINT_SAMPLES;
use crate::context::DeviceContext;
use crate::error::Error;
use crate::hal::Hardware;
use crate::protocol::PacketBuf;
use crate::ring::Sample;
use crate::state::{Event, SamplingState};

pub struct DrainLoop {
    commands: CommandProcessor,
    /// Overflow total already reported, for change-only logging.
    reported_overflow: u32,
}

impl DrainLoop {
    pub const fn new() -> Self {
        Self {
            commands: CommandProcessor::new(),
            reported_overflow: 0,
        }
    }

    pub fn commands(&self) -> &CommandProcessor {
        &self.commands
    }

    /// Run one drain iteration. Called from the main busy-poll loop.
    pub fn poll<H, S>(
        &mut self,
        ctx: &DeviceContext,
        hw: &mut H,
        serial: &mut S,
    ) -> Result<(), Error>
    where
        H: Hardware,
        S: Read + ReadReady + Write,
    {
        self.commands.service(ctx, hw, serial)?;

        let dropped = ctx.overflow_count();
        if dropped != self.reported_overflow {
            warn!("ring overflow, {} sample(s) dropped so far", dropped);
            self.reported_overflow = dropped;
        }

        match ctx.state() {
            SamplingState::Idle
            | SamplingState::WaitingForFrameSync
            | SamplingState::StartingSampling => return Ok(()),
            SamplingState::HadFirstSample => {
                // The run just produced its first sample; answer a pending
                // `f` request before any data goes out.
                if self.commands.take_first_time_request() {
                    let mut buf = PacketBuf::new();
                    self.commands
                        .encoder
                        .encode_first_sample_time(&mut buf, ctx.first_sample_ticks())?;
                    write_packet(serial, &buf)?;
                }
                ctx.apply(Event::DrainObservedFirstSample);
            }
            SamplingState::Sampling => {}
        }

        let sweep = ctx.sweep();
        let points_per_packet = self.commands.points_per_packet();

        // Lock-step across channels: only complete tuples are drained.
        let mut points = usize::MAX;
        for channel in sweep.channels() {
            if let Some(ring) = ctx.ring(channel) {
                points = points.min(ring.len());
            }
        }

        while points >= points_per_packet {
            let mut samples: Vec<Sample, MAX_POINT_SAMPLES> = Vec::new();
            for _ in 0..points_per_packet {
                for channel in sweep.channels() {
                    let sample = ctx.ring(channel).and_then(|ring| ring.pop()).unwrap_or(0);
                    samples.push(sample).map_err(|_| Error::PacketTooLarge)?;
                }
            }
            let mut buf = PacketBuf::new();
            self.commands
                .encoder
                .encode_data(&mut buf, &samples, points_per_packet)?;
            write_packet(serial, &buf)?;
            points -= points_per_packet;
        }

        Ok(())
    }
}

impl Default for DrainLoop {
    fn default() -> Self {
        Self::new()
    }
}
