//! Serial command processor.
//!
//! Polled from the drain loop, never interrupt-driven. Reads one
//! newline-terminated line (bounded length, bounded wait) from the serial
//! link and dispatches on its first byte. Unknown commands are silently
//! ignored; malformed or unterminated lines are discarded once the read
//! timeout expires.

use embedded_io::{Read, ReadReady, Write};
use heapless::Vec;
use log::debug;

use crate::config::{
    COMMAND_MAX_LEN, COMMAND_TIMEOUT_TICKS, DEFAULT_RATE_INDEX, DEVICE_CLASS, DEVICE_NAME,
    SAMPLE_RATES, SERIAL_NUMBER, points_per_packet,
};
use crate::context::DeviceContext;
use crate::error::Error;
use crate::hal::Hardware;
use crate::protocol::{PacketBuf, PacketEncoder, SYNC_CAPABILITIES, VersionInfo};
use crate::state::Event;

pub type CommandLine = Vec<u8, COMMAND_MAX_LEN>;

/// Accumulates serial bytes into newline-terminated lines.
///
/// A line that outgrows the buffer is discarded up to its terminator; a line
/// that stalls is discarded after [`COMMAND_TIMEOUT_TICKS`].
pub struct LineReader {
    buf: CommandLine,
    /// Tick timestamp of the first byte of the pending line.
    started: Option<u32>,
    /// Set when the pending line overflowed and must be discarded.
    overflowed: bool,
}

impl LineReader {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            started: None,
            overflowed: false,
        }
    }

    /// Pull available bytes without blocking; returns a complete line (minus
    /// the terminator) when one arrives.
    pub fn poll<S: Read + ReadReady>(&mut self, serial: &mut S, now: u32) -> Option<CommandLine> {
        while serial.read_ready().unwrap_or(false) {
            let mut byte = [0u8; 1];
            match serial.read(&mut byte) {
                Ok(1..) => {}
                _ => break,
            }
            if byte[0] == b'\n' {
                let complete = !self.overflowed;
                self.started = None;
                self.overflowed = false;
                let line = core::mem::take(&mut self.buf);
                if complete {
                    return Some(line);
                }
                continue;
            }
            if self.started.is_none() {
                self.started = Some(now);
            }
            if self.buf.push(byte[0]).is_err() {
                self.overflowed = true;
            }
        }

        // Drop a stalled partial line; tick arithmetic wraps.
        if let Some(started) = self.started
            && now.wrapping_sub(started) > COMMAND_TIMEOUT_TICKS
        {
            self.buf.clear();
            self.started = None;
            self.overflowed = false;
        }
        None
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses command lines and drives the sampling state machine. Owns the
/// packet encoder so the shared counter covers command responses and data
/// packets alike.
pub struct CommandProcessor {
    reader: LineReader,
    pub(crate) encoder: PacketEncoder,
    points_per_packet: usize,
    pending_first_time: bool,
}

impl CommandProcessor {
    pub const fn new() -> Self {
        Self {
            reader: LineReader::new(),
            encoder: PacketEncoder::new(),
            points_per_packet: points_per_packet(SAMPLE_RATES[DEFAULT_RATE_INDEX as usize]),
            pending_first_time: false,
        }
    }

    /// Points each data packet carries at the selected rate.
    pub fn points_per_packet(&self) -> usize {
        self.points_per_packet
    }

    /// Consume a pending `f` request, if one is outstanding.
    pub fn take_first_time_request(&mut self) -> bool {
        core::mem::take(&mut self.pending_first_time)
    }

    /// Service at most one pending command line.
    pub fn service<H, S>(
        &mut self,
        ctx: &DeviceContext,
        hw: &mut H,
        serial: &mut S,
    ) -> Result<(), Error>
    where
        H: Hardware,
        S: Read + ReadReady + Write,
    {
        let Some(line) = self.reader.poll(serial, hw.ticks_now()) else {
            return Ok(());
        };
        self.execute(&line, ctx, hw, serial)
    }

    fn execute<H, S>(
        &mut self,
        line: &[u8],
        ctx: &DeviceContext,
        hw: &mut H,
        serial: &mut S,
    ) -> Result<(), Error>
    where
        H: Hardware,
        S: Write,
    {
        match line.first() {
            Some(b'b') => self.begin(line, ctx, hw),
            Some(b's') => self.stop(ctx, hw),
            Some(b'f') => {
                self.pending_first_time = true;
                Ok(())
            }
            Some(b'n') => {
                let request_id = line.get(1).copied().unwrap_or(0);
                let mut buf = PacketBuf::new();
                self.encoder
                    .encode_now_time(&mut buf, request_id, hw.ticks_now() as i32)?;
                write_packet(serial, &buf)
            }
            Some(b'u') => {
                let request_id = line.get(1).copied().unwrap_or(0);
                let snapshot = ctx.latest_frame();
                let mut buf = PacketBuf::new();
                self.encoder.encode_latest_frame_time(
                    &mut buf,
                    request_id,
                    hw.ticks_now() as i32,
                    snapshot.number,
                    snapshot.ticks,
                )?;
                write_packet(serial, &buf)
            }
            Some(b'v') => {
                let info = VersionInfo {
                    class: DEVICE_CLASS,
                    name: DEVICE_NAME,
                    version: env!("CARGO_PKG_VERSION"),
                    channels: ctx.sweep().count,
                    sync: SYNC_CAPABILITIES,
                    serial: SERIAL_NUMBER,
                };
                let mut buf = PacketBuf::new();
                self.encoder.encode_version(&mut buf, &info)?;
                write_packet(serial, &buf)?;
                // A version query opens a new host session.
                self.encoder.reset();
                Ok(())
            }
            Some(b'~') => {
                if let Some(digit @ b'0'..=b'9') = line.get(1).copied() {
                    let index = digit - b'0';
                    if (index as usize) < SAMPLE_RATES.len() {
                        ctx.set_rate_index(index);
                        self.points_per_packet = points_per_packet(ctx.sample_rate_hz());
                        debug!(
                            "sample rate {} Hz, {} point(s)/packet",
                            ctx.sample_rate_hz(),
                            self.points_per_packet
                        );
                    }
                }
                Ok(())
            }
            // Unknown or empty commands are silently ignored.
            _ => Ok(()),
        }
    }

    /// `b`: begin sampling, optionally on a specific frame number encoded as
    /// `b` `o` lo hi. A begin during an active run restarts it: the current
    /// run is stopped and the device waits for frame sync again.
    fn begin<H: Hardware>(&mut self, line: &[u8], ctx: &DeviceContext, hw: &mut H) -> Result<(), Error> {
        let start_frame = match line {
            [b'b', b'o', lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        };

        // No conversions may land while the rings are being reset.
        hw.stop_trigger();
        ctx.apply(Event::StopRequested);
        ctx.reset_session();
        ctx.set_start_frame(start_frame);
        hw.advance_mux(ctx.sweep().first);
        ctx.apply(Event::BeginRequested);
        debug!("begin sampling, start frame {start_frame:?}");
        Ok(())
    }

    /// `s`: stop sampling. Trigger and interrupts are disabled before the
    /// rings are cleared so no pending conversion writes into the clear.
    fn stop<H: Hardware>(&mut self, ctx: &DeviceContext, hw: &mut H) -> Result<(), Error> {
        hw.stop_trigger();
        ctx.apply(Event::StopRequested);
        ctx.clear_rings();
        self.pending_first_time = false;
        debug!("stop sampling");
        Ok(())
    }
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn write_packet<S: Write>(serial: &mut S, buf: &[u8]) -> Result<(), Error> {
    serial.write_all(buf).map_err(|_| Error::Serial)
}
