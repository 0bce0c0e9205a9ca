//! End-to-end scenarios running the full core against the simulated target.

use framelock_core::state::SamplingState;
use framelock_simulator::parse::{HostPacket, PacketParser, split_version_response};
use framelock_simulator::sim::Simulation;

#[test]
fn two_channel_100hz_run_streams_single_point_packets() {
    let mut sim = Simulation::new(0.0);
    assert_eq!(sim.ctx.sample_rate_hz(), 100);
    assert_eq!(sim.ctx.sweep().count, 2);

    sim.send(b"b\n");
    sim.run_frames(1_000);

    let mut parser = PacketParser::new(2);
    let packets = parser.push(&sim.take_output());
    assert!(!packets.is_empty());

    // 100 Hz for ~1 s of frames produces on the order of 100 points, each in
    // its own 'D' packet of one 2-sample tuple.
    for packet in &packets {
        match packet {
            HostPacket::Data { points } => {
                assert_eq!(points.len(), 1);
                assert_eq!(points[0].len(), 2);
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }
    assert!(packets.len() >= 90, "got {} packets", packets.len());

    // Counter increments by exactly one per packet, no gaps.
    assert_eq!(parser.counter_gaps, 0);
    assert_eq!(sim.ctx.overflow_count(), 0);
}

#[test]
fn version_query_then_run_restarts_the_counter() {
    let mut sim = Simulation::new(0.0);

    sim.send(b"v\n");
    sim.run_frames(1);
    let (json, rest) = split_version_response(&sim.take_output()).expect("version response");
    assert!(json.contains("\"class\":\"frame_locked_daq\""));
    assert!(json.contains("\"channels\":2"));
    assert!(rest.is_empty());

    sim.send(b"b\n");
    sim.run_frames(50);
    let out = sim.take_output();
    // First framed packet of the new session carries counter zero.
    assert_eq!(&out[..2], &[0x50, 0xA0]);
    assert_eq!(out[2], b'D');
    assert_eq!(out[3], 0);
}

#[test]
fn rate_change_switches_to_multi_point_packets() {
    let mut sim = Simulation::new(0.0);

    sim.send(b"~3\n");
    sim.send(b"b\n");
    sim.run_frames(200);

    let mut parser = PacketParser::new(2);
    let packets = parser.push(&sim.take_output());
    assert!(!packets.is_empty());
    for packet in &packets {
        match packet {
            HostPacket::Data { points } => {
                assert_eq!(points.len(), 10, "1 kHz uses 10-point packets");
                for point in points {
                    assert_eq!(point.len(), 2);
                }
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }
    assert_eq!(parser.counter_gaps, 0);
}

#[test]
fn begin_then_stop_leaves_buffers_empty_and_idle() {
    let mut sim = Simulation::new(0.0);

    sim.send(b"b\n");
    sim.run_frames(137);
    sim.send(b"s\n");
    sim.run_frames(1);

    assert_eq!(sim.ctx.state(), SamplingState::Idle);
    assert!(!sim.hw.trigger_running());
    for channel in 0..2 {
        assert_eq!(sim.ctx.ring(channel).unwrap().len(), 0);
    }

    // Nothing more is emitted once idle.
    sim.take_output();
    sim.run_frames(100);
    assert!(sim.take_output().is_empty());
}

#[test]
fn begin_mid_run_restarts_streaming() {
    let mut sim = Simulation::new(0.0);

    sim.send(b"b\n");
    sim.run_frames(500);
    assert!(!sim.take_output().is_empty());

    // Restart without an intervening stop.
    sim.send(b"b\n");
    sim.run_frames(1_000);

    assert!(sim.hw.trigger_running(), "trigger re-armed after restart");
    assert_eq!(sim.ctx.state(), SamplingState::Sampling);
    let mut parser = PacketParser::new(2);
    let packets = parser.push(&sim.take_output());
    assert!(packets.len() >= 90, "restarted run streams, got {}", packets.len());
}

#[test]
fn first_sample_time_precedes_data() {
    let mut sim = Simulation::new(0.0);

    sim.send(b"f\n");
    sim.send(b"b\n");
    sim.run_frames(1_000);

    let mut parser = PacketParser::new(2);
    let packets = parser.push(&sim.take_output());
    assert!(matches!(packets[0], HostPacket::FirstSampleTime { .. }));
    assert!(matches!(packets[1], HostPacket::Data { .. }));
    let HostPacket::FirstSampleTime { ticks } = packets[0] else {
        unreachable!()
    };
    assert_eq!(ticks, sim.ctx.first_sample_ticks());
}

#[test]
fn latest_frame_time_reflects_the_marker_stream() {
    let mut sim = Simulation::new(0.0);

    sim.run_frames(250);
    sim.send(b"uZ\n");
    sim.run_frames(1);

    let mut parser = PacketParser::new(2);
    let packets = parser.push(&sim.take_output());
    let HostPacket::LatestFrameTime {
        request_id,
        frame_number,
        frame_ticks,
        ..
    } = packets[0]
    else {
        panic!("expected latest-frame-time, got {:?}", packets[0]);
    };
    assert_eq!(request_id, b'Z');
    assert_eq!(frame_number, sim.hw.frame_number());
    assert_eq!(frame_ticks, sim.ctx.latest_frame().ticks);
}

#[test]
fn start_on_requested_frame_waits_for_it() {
    let mut sim = Simulation::new(0.0);

    // Ask to start on frame 120 while only ~2 frames have elapsed.
    sim.send(b"bo\x78\x00\n");
    sim.run_frames(10);
    assert_eq!(sim.ctx.state(), SamplingState::WaitingForFrameSync);
    assert!(!sim.hw.trigger_running());

    sim.run_frames(200);
    assert!(sim.hw.trigger_running());
    assert!(matches!(
        sim.ctx.state(),
        SamplingState::StartingSampling | SamplingState::HadFirstSample | SamplingState::Sampling
    ));
}

#[test]
fn pll_locks_against_drifting_oscillator_end_to_end() {
    let mut sim = Simulation::new(120.0);

    sim.send(b"b\n");
    sim.run_frames(8_000);

    // Locked: bounded phase oscillation around zero, trim inside its range,
    // and the stream kept flowing the whole time.
    assert!(sim.pll.phase().abs() < 500, "phase {}", sim.pll.phase());
    assert!(sim.pll.trim().unsigned_abs() <= 127);
    let mut parser = PacketParser::new(2);
    let packets = parser.push(&sim.take_output());
    assert!(packets.len() > 700);
    assert_eq!(parser.counter_gaps, 0);
}
