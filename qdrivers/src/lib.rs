//! # qdrivers
//!
//! Drivers for lab instruments used in quantum device measurements: the Keysight SD1
//! [`digitizer`] and [`hvi`] sequencer, and the QuTech [`spirack`] S5k AWG.
//!
//! Every driver is generic over the handle it talks to, so they run against real hardware
//! bindings or the simulated modules in [`sd1::mock`] and [`spirack::mock`] alike.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod core;
pub mod digitizer;
pub mod error;
pub mod hvi;
pub mod prelude;
pub mod spirack;

pub use error::{
    Error,
    Result,
};
