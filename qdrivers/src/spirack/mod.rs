//! Modules living in a QuTech SPI rack
//!
//! The rack controller speaks to its modules over a serial link, so module handles report
//! failures as [`std::io::Error`]s.

pub mod mock;
pub mod s5k;

pub use s5k::S5k;

use serde::{
    Deserialize,
    Serialize,
};
use std::io;

/// Number of DACs on an S5k
pub const S5K_DACS: u8 = 16;

/// Reference clock of an S5k
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockSource {
    #[default]
    Internal,
    External,
}

/// What a DAC plays
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveformMode {
    /// The uploaded waveform
    #[default]
    Awg,
    Noise,
    Dc,
}

/// The calls a driver makes on an S5k module handle. DACs are numbered from 1.
pub trait S5kModule {
    fn set_clock_source(&mut self, source: ClockSource) -> io::Result<()>;
    /// The reference clock currently in use
    fn clock_source(&self) -> ClockSource;
    /// Divide the sample clock of `dac` by `division`
    fn set_clock_division(&mut self, dac: u8, division: u32) -> io::Result<()>;
    fn set_waveform_mode(&mut self, dac: u8, mode: WaveformMode) -> io::Result<()>;
    fn set_digital_gain(&mut self, dac: u8, gain: f64) -> io::Result<()>;
    /// The last gain set on every DAC, DAC 1 first
    fn digital_gains(&self) -> &[f64];
    /// Start (`true`) or stop (`false`) playback on every DAC
    fn run_module(&mut self, run: bool) -> io::Result<()>;
}
