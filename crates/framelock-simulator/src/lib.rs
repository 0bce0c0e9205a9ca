//! Desktop simulator for the framelock acquisition core.
//!
//! Runs the `no_std` core against a simulated target: a local oscillator
//! with a configurable ppm offset and trim sensitivity, frame markers
//! derived from "true" time, a conversion trigger, and a loopback serial
//! link. Integration tests and the demo binary both drive the core through
//! this crate exactly as firmware would, one frame period at a time.

pub mod hardware;
pub mod parse;
pub mod sim;
