//! Driver for the S5k, a 16 channel AWG module for the SPI rack

use super::{
    ClockSource,
    S5kModule,
    WaveformMode,
    S5K_DACS,
};
use crate::{
    core::{
        check_channel,
        param,
        ParameterInfo,
    },
    error::Result,
};
use tracing::{
    debug,
    info,
    warn,
};

/// Largest clock division the module supports
pub const MAX_CLOCK_DIVISION: u32 = 510;
/// Digital gain every DAC starts with
pub const DEFAULT_GAIN: f64 = 0.2;

/// Module level parameters
pub const PARAMETERS: &[ParameterInfo] = &[param!(
    "clock_source",
    "Clock source",
    "",
    Hardware,
    GetSet,
    "The reference clock of the module, internal or external"
)];

/// Parameters every DAC `n` has, named `ch{n}_<name>`
pub const DAC_PARAMETERS: &[ParameterInfo] = &[
    param!("gain", "Digital gain", "", Hardware, GetSet, "The digital gain of the DAC"),
    param!("clock_div", "Clock division", "", Hardware, Set, "The sample clock division of the DAC, even and at most 510"),
];

/// An S5k AWG module
#[derive(Debug)]
pub struct S5k<T> {
    name: String,
    module: T,
}

impl<T> S5k<T>
where
    T: S5kModule,
{
    /// Take control of `module`. DACs 1-8 get a clock division of 4, DACs 9-16 one of 400, and
    /// every DAC plays its AWG waveform at a gain of 0.2.
    /// # Errors
    /// Returns an error if the module doesn't accept the initial settings
    pub fn new(name: impl Into<String>, mut module: T) -> Result<Self> {
        let name = name.into();
        for dac in 1..=8 {
            module.set_clock_division(dac, 4)?;
        }
        for dac in 9..=S5K_DACS {
            module.set_clock_division(dac, 400)?;
        }
        for dac in 1..=S5K_DACS {
            module.set_waveform_mode(dac, WaveformMode::Awg)?;
            module.set_digital_gain(dac, DEFAULT_GAIN)?;
        }
        info!(%name, "Initialized S5k");
        Ok(Self { name, module })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying module handle
    #[must_use]
    pub fn module(&self) -> &T {
        &self.module
    }

    #[must_use]
    pub fn clock_source(&self) -> ClockSource {
        self.module.clock_source()
    }

    /// # Errors
    /// Returns an error if the module can't be reached
    pub fn set_clock_source(&mut self, source: ClockSource) -> Result<()> {
        self.module.set_clock_source(source)?;
        debug!(?source, "Set clock source");
        Ok(())
    }

    /// The digital gain of `dac`, as last set on the module
    /// # Errors
    /// Returns an error if `dac` isn't in 1..=16
    pub fn gain(&self, dac: u8) -> Result<f64> {
        let dac = check_channel(dac, S5K_DACS)?;
        Ok(self
            .module
            .digital_gains()
            .get(usize::from(dac) - 1)
            .copied()
            .unwrap_or(DEFAULT_GAIN))
    }

    /// # Errors
    /// Returns an error if `dac` isn't in 1..=16 or the module can't be reached
    pub fn set_gain(&mut self, dac: u8, gain: f64) -> Result<()> {
        let dac = check_channel(dac, S5K_DACS)?;
        self.module.set_digital_gain(dac, gain)?;
        debug!(dac, gain, "Set digital gain");
        Ok(())
    }

    /// Divide the sample clock of `dac`. The module only supports even divisions up to 510.
    /// Anything else is still sent, with a warning, and the module has the final say.
    /// # Errors
    /// Returns an error if `dac` isn't in 1..=16 or the module can't be reached
    pub fn set_clock_division(&mut self, dac: u8, division: u32) -> Result<()> {
        let dac = check_channel(dac, S5K_DACS)?;
        if division % 2 != 0 || division > MAX_CLOCK_DIVISION {
            warn!(dac, division, "Clock division must be an even number between 2-510");
        }
        self.module.set_clock_division(dac, division)?;
        debug!(dac, division, "Set clock division");
        Ok(())
    }

    /// Start playback
    /// # Errors
    /// Returns an error if the module can't be reached
    pub fn run(&mut self) -> Result<()> {
        Ok(self.module.run_module(true)?)
    }

    /// Stop playback
    /// # Errors
    /// Returns an error if the module can't be reached
    pub fn stop(&mut self) -> Result<()> {
        Ok(self.module.run_module(false)?)
    }
}
