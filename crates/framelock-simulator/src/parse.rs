//! Host-side packet parser.
//!
//! Mirror of the firmware encoder's binary framing: magic
//! header, type tag, shared wrapping counter, little-endian payload. The
//! parser is incremental so tests can feed it whatever chunk boundaries the
//! serial link produced, and it tracks counter continuity the way a real
//! host detects loss.

use framelock_core::config::MULTI_PACKET_POINTS;
use framelock_core::protocol::{
    PACKET_MAGIC, TAG_DATA_MULTI, TAG_DATA_SINGLE, TAG_FIRST_SAMPLE_TIME, TAG_LATEST_FRAME_TIME,
    TAG_NOW_TIME, VERSION_SENTINEL,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPacket {
    /// Sample tuples; outer index point, inner index channel.
    Data { points: Vec<Vec<i16>> },
    NowTime { request_id: u8, ticks: i32 },
    LatestFrameTime {
        request_id: u8,
        ticks: i32,
        frame_number: u16,
        frame_ticks: u32,
    },
    FirstSampleTime { ticks: u32 },
}

pub struct PacketParser {
    channels: usize,
    buf: Vec<u8>,
    last_counter: Option<u8>,
    /// Number of counter discontinuities observed.
    pub counter_gaps: usize,
}

impl PacketParser {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            buf: Vec::new(),
            last_counter: None,
            counter_gaps: 0,
        }
    }

    /// Feed raw serial bytes; returns every packet completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<HostPacket> {
        self.buf.extend_from_slice(bytes);
        let mut packets = Vec::new();
        loop {
            // Resynchronize on the magic header.
            while self.buf.len() >= 2 && self.buf[..2] != PACKET_MAGIC {
                self.buf.remove(0);
            }
            if self.buf.len() < 4 {
                break;
            }
            let tag = self.buf[2];
            let Some(payload_len) = self.payload_len(tag) else {
                // Unknown tag: false magic match, skip a byte and resync.
                self.buf.remove(0);
                continue;
            };
            if self.buf.len() < 4 + payload_len {
                break;
            }

            let counter = self.buf[3];
            if let Some(last) = self.last_counter
                && counter != last.wrapping_add(1)
            {
                self.counter_gaps += 1;
            }
            self.last_counter = Some(counter);

            let payload: Vec<u8> = self.buf.drain(..4 + payload_len).skip(4).collect();
            packets.push(self.decode(tag, &payload));
        }
        packets
    }

    fn payload_len(&self, tag: u8) -> Option<usize> {
        match tag {
            t if t == TAG_DATA_SINGLE => Some(2 * self.channels),
            t if t == TAG_DATA_MULTI => Some(2 * self.channels * MULTI_PACKET_POINTS),
            t if t == TAG_NOW_TIME => Some(5),
            t if t == TAG_LATEST_FRAME_TIME => Some(11),
            t if t == TAG_FIRST_SAMPLE_TIME => Some(4),
            _ => None,
        }
    }

    fn decode(&self, tag: u8, payload: &[u8]) -> HostPacket {
        match tag {
            t if t == TAG_DATA_SINGLE || t == TAG_DATA_MULTI => {
                let points = payload
                    .chunks_exact(2 * self.channels)
                    .map(|point| {
                        point
                            .chunks_exact(2)
                            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                            .collect()
                    })
                    .collect();
                HostPacket::Data { points }
            }
            t if t == TAG_NOW_TIME => HostPacket::NowTime {
                request_id: payload[0],
                ticks: i32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]),
            },
            t if t == TAG_LATEST_FRAME_TIME => HostPacket::LatestFrameTime {
                request_id: payload[0],
                ticks: i32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]),
                frame_number: u16::from_le_bytes([payload[5], payload[6]]),
                frame_ticks: u32::from_le_bytes([payload[7], payload[8], payload[9], payload[10]]),
            },
            _ => HostPacket::FirstSampleTime {
                ticks: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            },
        }
    }
}

/// Split a version response off the front of a byte stream: the JSON text
/// and whatever followed the `$$$` sentinel.
pub fn split_version_response(bytes: &[u8]) -> Option<(String, Vec<u8>)> {
    let end = bytes
        .windows(VERSION_SENTINEL.len())
        .position(|window| window == VERSION_SENTINEL)?;
    let json = String::from_utf8(bytes[..end].to_vec()).ok()?;
    let rest = bytes[end + VERSION_SENTINEL.len()..].to_vec();
    Some((json, rest))
}
