//! Shared test doubles: a scripted hardware implementation and an in-memory
//! serial pipe. Test-only; real targets implement [`crate::hal::Hardware`]
//! against their peripherals.

use core::convert::Infallible;

use heapless::{Deque, Vec};

use crate::hal::{Conversion, FrameEvent, Hardware};

pub struct MockHardware {
    pub ticks: u32,
    pub trim: i16,
    /// `Some(rate)` while the conversion trigger runs.
    pub trigger_rate: Option<u32>,
    pub mux: u8,
    pub next_conversion: Conversion,
    pub frame: FrameEvent,
}

impl MockHardware {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            trim: 0,
            trigger_rate: None,
            mux: 0,
            next_conversion: Conversion { value: 0, channel: 0 },
            frame: FrameEvent { number: 0, ticks: 0 },
        }
    }
}

impl Hardware for MockHardware {
    fn start_trigger(&mut self, rate_hz: u32) {
        self.trigger_rate = Some(rate_hz);
    }

    fn stop_trigger(&mut self) {
        self.trigger_rate = None;
    }

    fn read_conversion(&mut self) -> Conversion {
        self.next_conversion
    }

    fn advance_mux(&mut self, channel: u8) {
        self.mux = channel;
    }

    fn ticks_now(&self) -> u32 {
        self.ticks
    }

    fn trim(&self) -> i16 {
        self.trim
    }

    fn set_trim(&mut self, trim: i16) {
        self.trim = trim;
    }

    fn frame_event(&mut self) -> FrameEvent {
        self.frame
    }
}

/// Loopback serial link: `feed` plays the host side, `output` collects what
/// the firmware wrote.
pub struct PipeSerial {
    input: Deque<u8, 1024>,
    output: Vec<u8, 4096>,
}

impl PipeSerial {
    pub fn new() -> Self {
        Self {
            input: Deque::new(),
            output: Vec::new(),
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        for byte in bytes {
            let _ = self.input.push_back(*byte);
        }
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }
}

impl embedded_io::ErrorType for PipeSerial {
    type Error = Infallible;
}

impl embedded_io::Read for PipeSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < buf.len() {
            match self.input.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

impl embedded_io::ReadReady for PipeSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.input.is_empty())
    }
}

impl embedded_io::Write for PipeSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let _ = self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
