//! Error types for the main-loop context.
//!
//! Interrupt-context code never returns errors (samples are dropped, trim is
//! clamped); only encoding and serial writes in the drain loop can fail.

use thiserror_no_std::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A packet did not fit the encode buffer.
    #[error("packet exceeds encode buffer")]
    PacketTooLarge,
    /// The version descriptor could not be serialized.
    #[error("version descriptor serialization failed")]
    Version,
    /// The serial link rejected a write.
    #[error("serial link write failed")]
    Serial,
}
