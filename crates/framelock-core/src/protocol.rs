//! Binary wire protocol.
//!
//! Every packet opens with a two-byte magic header, a one-byte type tag and
//! a one-byte wrapping counter shared across all packet kinds so the host
//! can detect loss regardless of traffic mix. Payloads are little-endian.
//! The version/capability response is the one exception: a JSON object
//! terminated by a literal `$$$` sentinel, read by the host before it knows
//! the binary framing.

use heapless::Vec;
use serde::Serialize;

use crate::config::{MAX_PACKET_LEN, MULTI_PACKET_POINTS};
use crate::error::Error;
use crate::ring::Sample;

pub const PACKET_MAGIC: [u8; 2] = [0x50, 0xA0];

pub const TAG_DATA_SINGLE: u8 = b'D';
pub const TAG_DATA_MULTI: u8 = b'M';
pub const TAG_NOW_TIME: u8 = b'N';
pub const TAG_LATEST_FRAME_TIME: u8 = b'L';
pub const TAG_FIRST_SAMPLE_TIME: u8 = b'F';

pub const VERSION_SENTINEL: &[u8] = b"$$$";

/// Synchronization-capability bits advertised in the version descriptor.
pub const SYNC_ROUND_TRIP: u8 = 0x01;
pub const SYNC_FRAME_TIME: u8 = 0x02;
pub const SYNC_FRAME_LOCKED: u8 = 0x04;
pub const SYNC_START_ON_FRAME: u8 = 0x08;

/// Everything this firmware supports.
pub const SYNC_CAPABILITIES: u8 =
    SYNC_ROUND_TRIP | SYNC_FRAME_TIME | SYNC_FRAME_LOCKED | SYNC_START_ON_FRAME;

/// Capability descriptor serialized as the `v` response.
#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub class: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub channels: u8,
    pub sync: u8,
    pub serial: &'static str,
}

/// Scratch buffer a packet is encoded into before the serial write.
pub type PacketBuf = Vec<u8, MAX_PACKET_LEN>;

fn put(buf: &mut PacketBuf, bytes: &[u8]) -> Result<(), Error> {
    buf.extend_from_slice(bytes).map_err(|_| Error::PacketTooLarge)
}

/// Serializer for outgoing packets, owning the shared packet counter.
///
/// The counter starts at zero, wraps at 256, and is reset only by a new
/// session (`v` command).
pub struct PacketEncoder {
    counter: u8,
}

impl PacketEncoder {
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Counter value the next packet will carry.
    pub fn counter(&self) -> u8 {
        self.counter
    }

    /// Start a new session: the next packet is numbered zero again.
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    fn header(&mut self, buf: &mut PacketBuf, tag: u8) -> Result<(), Error> {
        put(buf, &PACKET_MAGIC)?;
        put(buf, &[tag, self.counter])?;
        self.counter = self.counter.wrapping_add(1);
        Ok(())
    }

    /// Encode a data packet: `points` tuples of one sample per sweep channel,
    /// channel order within each point, points in arrival order. A single
    /// point is tagged `'D'`, a full [`MULTI_PACKET_POINTS`] load `'M'`;
    /// those are the only two sizes the wire format defines, since the host
    /// infers the `'M'` payload length from the tag alone.
    pub fn encode_data(
        &mut self,
        buf: &mut PacketBuf,
        samples: &[Sample],
        points: usize,
    ) -> Result<(), Error> {
        debug_assert!(points == 1 || points == MULTI_PACKET_POINTS);
        let tag = if points == 1 { TAG_DATA_SINGLE } else { TAG_DATA_MULTI };
        self.header(buf, tag)?;
        for sample in samples {
            put(buf, &sample.to_le_bytes())?;
        }
        Ok(())
    }

    /// Encode the response to `n`: echoed request id plus the current tick.
    pub fn encode_now_time(
        &mut self,
        buf: &mut PacketBuf,
        request_id: u8,
        ticks: i32,
    ) -> Result<(), Error> {
        self.header(buf, TAG_NOW_TIME)?;
        put(buf, &[request_id])?;
        put(buf, &ticks.to_le_bytes())
    }

    /// Encode the response to `u`: echoed request id, current tick, and the
    /// last frame marker's number and edge timestamp.
    pub fn encode_latest_frame_time(
        &mut self,
        buf: &mut PacketBuf,
        request_id: u8,
        ticks: i32,
        frame_number: u16,
        frame_ticks: u32,
    ) -> Result<(), Error> {
        self.header(buf, TAG_LATEST_FRAME_TIME)?;
        put(buf, &[request_id])?;
        put(buf, &ticks.to_le_bytes())?;
        put(buf, &frame_number.to_le_bytes())?;
        put(buf, &frame_ticks.to_le_bytes())
    }

    /// Encode the deferred response to `f`: timestamp of the run's first
    /// sample. Carries no request id.
    pub fn encode_first_sample_time(&mut self, buf: &mut PacketBuf, ticks: u32) -> Result<(), Error> {
        self.header(buf, TAG_FIRST_SAMPLE_TIME)?;
        put(buf, &ticks.to_le_bytes())
    }

    /// Encode the version descriptor: unframed JSON plus the `$$$` sentinel.
    pub fn encode_version(&mut self, buf: &mut PacketBuf, info: &VersionInfo) -> Result<(), Error> {
        let mut json = [0u8; MAX_PACKET_LEN];
        let written = serde_json_core::to_slice(info, &mut json).map_err(|_| Error::Version)?;
        put(buf, &json[..written])?;
        put(buf, VERSION_SENTINEL)
    }
}

impl Default for PacketEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_packet_layout_and_tag_selection() {
        let mut encoder = PacketEncoder::new();
        let mut buf = PacketBuf::new();
        encoder.encode_data(&mut buf, &[-1, 0x1234], 1).unwrap();

        assert_eq!(&buf[..2], &PACKET_MAGIC);
        assert_eq!(buf[2], TAG_DATA_SINGLE);
        assert_eq!(buf[3], 0);
        assert_eq!(&buf[4..6], &(-1i16).to_le_bytes());
        assert_eq!(&buf[6..8], &0x1234i16.to_le_bytes());
        assert_eq!(buf.len(), 8);

        let mut buf = PacketBuf::new();
        encoder.encode_data(&mut buf, &[0; 20], 10).unwrap();
        assert_eq!(buf[2], TAG_DATA_MULTI);
        assert_eq!(buf[3], 1);
        assert_eq!(buf.len(), 4 + 40);
    }

    #[test]
    fn data_round_trip_recovers_values_in_order() {
        // 3 channels x a full multi-point load of distinct values.
        let channels = 3;
        let points = MULTI_PACKET_POINTS as i16;
        let mut samples: heapless::Vec<Sample, 30> = heapless::Vec::new();
        for point in 0..points {
            for ch in 0..channels {
                samples.push((point * 100 + ch) as i16 - 150).unwrap();
            }
        }

        let mut encoder = PacketEncoder::new();
        let mut buf = PacketBuf::new();
        encoder.encode_data(&mut buf, &samples, points as usize).unwrap();

        let payload = &buf[4..];
        assert_eq!(payload.len(), channels as usize * points as usize * 2);
        for (i, expected) in samples.iter().enumerate() {
            let value = i16::from_le_bytes([payload[2 * i], payload[2 * i + 1]]);
            assert_eq!(value, *expected);
        }
    }

    #[test]
    fn counter_is_shared_across_packet_kinds_and_wraps() {
        let mut encoder = PacketEncoder::new();
        let mut buf = PacketBuf::new();
        encoder.encode_now_time(&mut buf, 1, 0).unwrap();
        assert_eq!(buf[3], 0);

        buf.clear();
        encoder.encode_first_sample_time(&mut buf, 0).unwrap();
        assert_eq!(buf[3], 1);

        for _ in 0..254 {
            buf.clear();
            encoder.encode_now_time(&mut buf, 0, 0).unwrap();
        }
        buf.clear();
        encoder.encode_now_time(&mut buf, 0, 0).unwrap();
        assert_eq!(buf[3], 0, "counter wraps at 256");
    }

    #[test]
    fn latest_frame_time_layout() {
        let mut encoder = PacketEncoder::new();
        let mut buf = PacketBuf::new();
        encoder
            .encode_latest_frame_time(&mut buf, 0xAB, -5, 0x0102, 0xDEADBEEF)
            .unwrap();

        assert_eq!(buf[2], TAG_LATEST_FRAME_TIME);
        assert_eq!(buf[4], 0xAB);
        assert_eq!(&buf[5..9], &(-5i32).to_le_bytes());
        assert_eq!(&buf[9..11], &0x0102u16.to_le_bytes());
        assert_eq!(&buf[11..15], &0xDEADBEEFu32.to_le_bytes());
        assert_eq!(buf.len(), 15);
    }

    #[test]
    fn version_descriptor_is_json_with_sentinel() {
        let info = VersionInfo {
            class: "frame_locked_daq",
            name: "FrameLock Analog DAQ",
            version: "0.1.0",
            channels: 2,
            sync: SYNC_CAPABILITIES,
            serial: "FL-000001",
        };
        let mut encoder = PacketEncoder::new();
        encoder.encode_now_time(&mut PacketBuf::new(), 0, 0).unwrap();
        let mut buf = PacketBuf::new();
        encoder.encode_version(&mut buf, &info).unwrap();

        assert!(buf.ends_with(VERSION_SENTINEL));
        let json = core::str::from_utf8(&buf[..buf.len() - VERSION_SENTINEL.len()]).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.contains("\"class\":\"frame_locked_daq\""));
        assert!(json.contains("\"channels\":2"));
        assert!(json.contains("\"sync\":15"));
        // The version response itself is unframed and does not consume a
        // counter value.
        encoder.reset();
        assert_eq!(encoder.counter(), 0);
    }
}
