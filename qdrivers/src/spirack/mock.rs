//! A simulated S5k module

use super::{
    ClockSource,
    S5kModule,
    WaveformMode,
    S5K_DACS,
};
use std::io;

/// A record of one call made against a [`MockS5k`]
#[derive(Debug, Clone, PartialEq)]
pub enum S5kCall {
    SetClockSource(ClockSource),
    SetClockDivision { dac: u8, division: u32 },
    SetWaveformMode { dac: u8, mode: WaveformMode },
    SetDigitalGain { dac: u8, gain: f64 },
    RunModule(bool),
}

/// A simulated S5k that remembers its settings and every call made on it
#[derive(Debug)]
pub struct MockS5k {
    clock_source: ClockSource,
    divisions: Vec<u32>,
    modes: Vec<WaveformMode>,
    gains: Vec<f64>,
    running: bool,
    calls: Vec<S5kCall>,
}

impl Default for MockS5k {
    fn default() -> Self {
        let n = usize::from(S5K_DACS);
        Self {
            clock_source: ClockSource::Internal,
            divisions: vec![1; n],
            modes: vec![WaveformMode::Awg; n],
            gains: vec![1.0; n],
            running: false,
            calls: vec![],
        }
    }
}

impl MockS5k {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> &[S5kCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// The clock division of every DAC, DAC 1 first
    #[must_use]
    pub fn divisions(&self) -> &[u32] {
        &self.divisions
    }

    /// The waveform mode of every DAC, DAC 1 first
    #[must_use]
    pub fn modes(&self) -> &[WaveformMode] {
        &self.modes
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn dac(dac: u8) -> io::Result<usize> {
        if dac == 0 || dac > S5K_DACS {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("DAC {dac} doesn't exist"),
            ));
        }
        Ok(usize::from(dac) - 1)
    }
}

impl S5kModule for MockS5k {
    fn set_clock_source(&mut self, source: ClockSource) -> io::Result<()> {
        self.calls.push(S5kCall::SetClockSource(source));
        self.clock_source = source;
        Ok(())
    }

    fn clock_source(&self) -> ClockSource {
        self.clock_source
    }

    fn set_clock_division(&mut self, dac: u8, division: u32) -> io::Result<()> {
        self.calls.push(S5kCall::SetClockDivision { dac, division });
        let i = Self::dac(dac)?;
        self.divisions[i] = division;
        Ok(())
    }

    fn set_waveform_mode(&mut self, dac: u8, mode: WaveformMode) -> io::Result<()> {
        self.calls.push(S5kCall::SetWaveformMode { dac, mode });
        let i = Self::dac(dac)?;
        self.modes[i] = mode;
        Ok(())
    }

    fn set_digital_gain(&mut self, dac: u8, gain: f64) -> io::Result<()> {
        self.calls.push(S5kCall::SetDigitalGain { dac, gain });
        let i = Self::dac(dac)?;
        self.gains[i] = gain;
        Ok(())
    }

    fn digital_gains(&self) -> &[f64] {
        &self.gains
    }

    fn run_module(&mut self, run: bool) -> io::Result<()> {
        self.calls.push(S5kCall::RunModule(run));
        self.running = run;
        Ok(())
    }
}
