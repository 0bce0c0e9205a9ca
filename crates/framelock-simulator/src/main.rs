//! Demo scenario for the framelock acquisition core.
//!
//! Boots a simulated device whose oscillator free-runs 80 ppm fast, queries
//! its version descriptor, starts a two-channel run, and streams for a few
//! seconds while logging how the frame PLL pulls the phase error in and how
//! many packets the host recovered.

use framelock_simulator::hardware::SignalSource;
use framelock_simulator::parse::{HostPacket, PacketParser, split_version_response};
use framelock_simulator::sim::Simulation;
use log::info;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut sim = Simulation::new(80.0);
    sim.hw.source = SignalSource::Sine;
    let channels = sim.ctx.sweep().count as usize;

    sim.send(b"v\n");
    sim.run_frames(1);
    if let Some((json, _)) = split_version_response(&sim.take_output()) {
        info!("device descriptor: {json}");
    }

    // Let the PLL acquire lock before sampling, as a host would.
    sim.run_frames(500);
    info!(
        "after 500 frames: phase {} ticks, trim {}",
        sim.pll.phase(),
        sim.pll.trim()
    );

    sim.send(b"f\n");
    sim.send(b"b\n");

    let mut parser = PacketParser::new(channels);
    let mut data_packets = 0usize;
    let mut first_sample_ticks = None;

    for second in 1..=3 {
        sim.run_frames(1_000);
        for packet in parser.push(&sim.take_output()) {
            match packet {
                HostPacket::Data { .. } => data_packets += 1,
                HostPacket::FirstSampleTime { ticks } => first_sample_ticks = Some(ticks),
                _ => {}
            }
        }
        info!(
            "t={second}s: {data_packets} data packets, phase {} ticks, trim {}, {} drop(s)",
            sim.pll.phase(),
            sim.pll.trim(),
            sim.ctx.overflow_count()
        );
    }

    sim.send(b"s\n");
    sim.run_frames(2);

    if let Some(ticks) = first_sample_ticks {
        info!("first sample at tick {ticks}");
    }
    info!(
        "run complete: {data_packets} data packets, {} counter gap(s)",
        parser.counter_gaps
    );
}
