//! Hardware-independent core library for the framelock acquisition firmware.
//!
//! This crate contains all platform-agnostic logic for a multi-channel analog
//! sampling device whose conversion clock is phase-locked to an external USB
//! frame reference: the hardware-access contract, per-channel sample queues,
//! the sampling state machine, the frame PLL, the binary wire protocol, and
//! the cooperative drain loop.
//!
//! It is `#![no_std]` so it compiles on both embedded targets and desktop
//! hosts (for the simulator and tests). Per-silicon register access lives
//! behind the [`hal::Hardware`] trait and is out of scope here.

#![no_std]

pub mod acquisition;
pub mod command;
pub mod config;
pub mod context;
pub mod drain;
pub mod error;
pub mod hal;
pub mod pll;
pub mod protocol;
pub mod ring;
pub mod state;

#[cfg(test)]
pub(crate) mod testutil;
