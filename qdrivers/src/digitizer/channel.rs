//! One analog input of a digitizer and its configuration.
//!
//! The SD1 library configures inputs through calls that take several settings at once
//! (`channelInputConfig` takes full scale, impedance and coupling). The channel caches every
//! setting, and a set forwards the whole group with the cached values of its siblings.
//! The cache only changes once the vendor call succeeded.

use super::acquisition::Shape;
use crate::{
    core::{
        lock,
        param,
        upgrade,
        ParameterInfo,
    },
    error::{
        Error,
        Result,
    },
};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use sd1::Ain;
use serde::{
    Deserialize,
    Serialize,
};
use std::sync::{
    Mutex,
    Weak,
};
use tracing::debug;

/// Largest prescaler the hardware accepts
pub const MAX_PRESCALER: u16 = 4095;
/// Largest analog trigger mode
pub const MAX_TRIGGER_MODE: u8 = 7;
/// Analog trigger on a rising edge
pub const TRIGGER_RISING_EDGE: u8 = 1;
/// Trigger thresholds are limited to +/- this many volts
pub const MAX_TRIGGER_THRESHOLD: f64 = 3.0;
/// `daq_trigger_mode` value that waits for an external (hardware) trigger
pub const DAQ_TRIGGER_EXTERNAL: i32 = 2;

/// Input impedance of an analog input
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Default, FromPrimitive, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Impedance {
    #[default]
    HighZ = 0,
    FiftyOhm = 1,
}

/// Input coupling of an analog input
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Default, FromPrimitive, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Coupling {
    #[default]
    Dc = 0,
    Ac = 1,
}

/// Cached configuration of one input
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSettings {
    pub full_scale: f64,
    pub impedance: Impedance,
    pub coupling: Coupling,
    pub prescaler: u16,
    pub trigger_mode: u8,
    pub trigger_threshold: f64,
    pub points_per_cycle: u32,
    pub n_cycles: u32,
    pub daq_trigger_delay: i32,
    pub daq_trigger_mode: i32,
    pub digital_trigger_mode: i32,
    pub digital_trigger_source: i32,
    pub analog_trigger_mask: i32,
    pub ext_trigger_source: i32,
    pub ext_trigger_behaviour: i32,
    /// Timeout (ms) handed to direct `DAQread` calls, -1 for none
    pub timeout: i32,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            full_scale: 1.0,
            impedance: Impedance::HighZ,
            coupling: Coupling::Dc,
            prescaler: 0,
            trigger_mode: TRIGGER_RISING_EDGE,
            trigger_threshold: 0.0,
            points_per_cycle: 1,
            n_cycles: 1,
            daq_trigger_delay: 0,
            daq_trigger_mode: 0,
            digital_trigger_mode: 0,
            digital_trigger_source: 0,
            analog_trigger_mask: 0,
            ext_trigger_source: 0,
            ext_trigger_behaviour: 0,
            timeout: -1,
        }
    }
}

/// Parameters of every digitizer channel
pub const PARAMETERS: &[ParameterInfo] = &[
    param!("full_scale", "Full scale range for channel", "V", Hardware, GetSet, "The full scale voltage for channel"),
    param!("impedance", "Impedance for channel", "", Hardware, GetSet, "The input impedance of channel, 0 (Hi-Z) or 1 (50 Ohm)"),
    param!("coupling", "Coupling for channel", "", Hardware, GetSet, "The coupling of channel, 0 (DC) or 1 (AC)"),
    param!("prescaler", "Prescaler for channel", "", Hardware, GetSet, "The sampling frequency prescaler for channel, 0..=4095"),
    param!("trigger_mode", "Trigger mode for channel", "", Memory, GetSet, "The analog trigger mode for channel, 0..=7"),
    param!("trigger_threshold", "Trigger threshold for channel", "V", Memory, GetSet, "The analog trigger threshold for channel, -3..=3"),
    param!("points_per_cycle", "Points per cycle for channel", "", Memory, GetSet, "The number of points per cycle for DAQ"),
    param!("n_cycles", "n cycles for DAQ", "", Memory, GetSet, "The number of cycles to collect on DAQ"),
    param!("DAQ_trigger_delay", "Trigger delay for DAQ", "", Memory, GetSet, "The trigger delay for DAQ"),
    param!("DAQ_trigger_mode", "Trigger mode for DAQ", "", Memory, GetSet, "The trigger mode for DAQ"),
    param!("digital_trigger_mode", "Digital trigger mode for DAQ", "", Memory, GetSet, "The digital trigger mode for DAQ"),
    param!("digital_trigger_source", "Digital trigger source for DAQ", "", Memory, GetSet, "The digital trigger source for DAQ"),
    param!("analog_trigger_mask", "Analog trigger mask for DAQ", "", Memory, GetSet, "The analog trigger mask for DAQ"),
    param!("ext_trigger_source", "External trigger source for DAQ", "", Memory, GetSet, "The external trigger source for DAQ"),
    param!("ext_trigger_behaviour", "External trigger behaviour for DAQ", "", Memory, GetSet, "The external trigger behaviour for DAQ"),
    param!("timeout", "timeout for DAQ", "ms", Memory, GetSet, "The read timeout for direct DAQ reads"),
];

/// One analog input of a [`super::Digitizer`]
#[derive(Debug)]
pub struct Channel<T> {
    /// Upwards pointer to the parent instrument's SDK handle
    sdk: Weak<Mutex<T>>,
    /// 1-based input number
    index: u8,
    settings: ChannelSettings,
}

fn to_i32(parameter: &'static str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::out_of_range(parameter, value, "1..=2147483647"))
}

pub(crate) fn check_full_scale(full_scale: f64) -> Result<()> {
    if full_scale.is_finite() && full_scale > 0.0 {
        Ok(())
    } else {
        Err(Error::out_of_range("full_scale", full_scale, "a positive voltage"))
    }
}

pub(crate) fn check_prescaler(prescaler: u16) -> Result<()> {
    if prescaler > MAX_PRESCALER {
        return Err(Error::out_of_range("prescaler", prescaler, "0..=4095"));
    }
    Ok(())
}

pub(crate) fn check_trigger(mode: u8, threshold: f64) -> Result<()> {
    if mode > MAX_TRIGGER_MODE {
        return Err(Error::out_of_range("trigger_mode", mode, "0..=7"));
    }
    if !(threshold.is_finite() && threshold.abs() <= MAX_TRIGGER_THRESHOLD) {
        return Err(Error::out_of_range("trigger_threshold", threshold, "-3..=3 V"));
    }
    Ok(())
}

/// Both dimensions as the `i32`s `DAQconfig` takes
pub(crate) fn check_daq_shape(points_per_cycle: u32, n_cycles: u32) -> Result<(i32, i32)> {
    if points_per_cycle == 0 {
        return Err(Error::out_of_range("points_per_cycle", 0, "at least 1"));
    }
    if n_cycles == 0 {
        return Err(Error::out_of_range("n_cycles", 0, "at least 1"));
    }
    Ok((
        to_i32("points_per_cycle", points_per_cycle)?,
        to_i32("n_cycles", n_cycles)?,
    ))
}

impl<T> Channel<T>
where
    T: Ain,
{
    pub(crate) fn new(sdk: Weak<Mutex<T>>, index: u8) -> Self {
        Self {
            sdk,
            index,
            settings: ChannelSettings::default(),
        }
    }

    /// Run `f` against the parent's SDK handle
    fn with_sdk<R>(&self, f: impl FnOnce(&mut T) -> sd1::Result<R>) -> Result<R> {
        let sdk = upgrade(&self.sdk)?;
        let mut sdk = lock(&sdk)?;
        Ok(f(&mut sdk)?)
    }

    /// The 1-based input number
    #[must_use]
    pub fn index(&self) -> u8 {
        self.index
    }

    /// The cached settings. Hardware-backed values are as of their last get or set.
    #[must_use]
    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    // channelInputConfig

    pub(crate) fn input_config(
        &mut self,
        full_scale: f64,
        impedance: Impedance,
        coupling: Coupling,
    ) -> Result<()> {
        check_full_scale(full_scale)?;
        let index = self.index;
        self.with_sdk(|sdk| {
            sdk.channel_input_config(index, full_scale, impedance as i32, coupling as i32)
        })?;
        debug!(channel = index, full_scale, ?impedance, ?coupling, "channelInputConfig");
        self.settings.full_scale = full_scale;
        self.settings.impedance = impedance;
        self.settings.coupling = coupling;
        Ok(())
    }

    /// Read the full scale input voltage from the hardware
    /// # Errors
    /// Returns an error on SDK failures
    pub fn full_scale(&mut self) -> Result<f64> {
        let index = self.index;
        let value = self.with_sdk(|sdk| sdk.channel_full_scale(index))?;
        self.settings.full_scale = value;
        Ok(value)
    }

    /// Set the full scale input voltage
    /// # Errors
    /// Returns an error if `full_scale` isn't positive or on SDK failures
    pub fn set_full_scale(&mut self, full_scale: f64) -> Result<()> {
        self.input_config(full_scale, self.settings.impedance, self.settings.coupling)
    }

    /// Read the input impedance from the hardware
    /// # Errors
    /// Returns an error on SDK failures or an impedance we don't know
    pub fn impedance(&mut self) -> Result<Impedance> {
        let index = self.index;
        let raw = self.with_sdk(|sdk| sdk.channel_impedance(index))?;
        let value = Impedance::from_i32(raw)
            .ok_or_else(|| Error::out_of_range("impedance", raw, "0 or 1"))?;
        self.settings.impedance = value;
        Ok(value)
    }

    /// Set the input impedance
    /// # Errors
    /// Returns an error on SDK failures
    pub fn set_impedance(&mut self, impedance: Impedance) -> Result<()> {
        self.input_config(self.settings.full_scale, impedance, self.settings.coupling)
    }

    /// Read the input coupling from the hardware
    /// # Errors
    /// Returns an error on SDK failures or a coupling we don't know
    pub fn coupling(&mut self) -> Result<Coupling> {
        let index = self.index;
        let raw = self.with_sdk(|sdk| sdk.channel_coupling(index))?;
        let value = Coupling::from_i32(raw)
            .ok_or_else(|| Error::out_of_range("coupling", raw, "0 or 1"))?;
        self.settings.coupling = value;
        Ok(value)
    }

    /// Set the input coupling
    /// # Errors
    /// Returns an error on SDK failures
    pub fn set_coupling(&mut self, coupling: Coupling) -> Result<()> {
        self.input_config(self.settings.full_scale, self.settings.impedance, coupling)
    }

    // channelPrescalerConfig

    /// Read the sampling frequency prescaler from the hardware
    /// # Errors
    /// Returns an error on SDK failures
    pub fn prescaler(&mut self) -> Result<u16> {
        let index = self.index;
        let raw = self.with_sdk(|sdk| sdk.channel_prescaler(index))?;
        let value = u16::try_from(raw)
            .ok()
            .filter(|p| *p <= MAX_PRESCALER)
            .ok_or_else(|| Error::out_of_range("prescaler", raw, "0..=4095"))?;
        self.settings.prescaler = value;
        Ok(value)
    }

    /// Set the sampling frequency prescaler
    /// # Errors
    /// Returns an error if `prescaler` is above 4095 or on SDK failures
    pub fn set_prescaler(&mut self, prescaler: u16) -> Result<()> {
        check_prescaler(prescaler)?;
        let index = self.index;
        self.with_sdk(|sdk| sdk.channel_prescaler_config(index, prescaler.into()))?;
        debug!(channel = index, prescaler, "channelPrescalerConfig");
        self.settings.prescaler = prescaler;
        Ok(())
    }

    // channelTriggerConfig

    pub(crate) fn trigger_config(&mut self, mode: u8, threshold: f64) -> Result<()> {
        check_trigger(mode, threshold)?;
        let index = self.index;
        self.with_sdk(|sdk| sdk.channel_trigger_config(index, mode.into(), threshold))?;
        debug!(channel = index, mode, threshold, "channelTriggerConfig");
        self.settings.trigger_mode = mode;
        self.settings.trigger_threshold = threshold;
        Ok(())
    }

    /// The analog trigger mode. Not read back from the hardware.
    #[must_use]
    pub fn trigger_mode(&self) -> u8 {
        self.settings.trigger_mode
    }

    /// Set the analog trigger mode
    /// # Errors
    /// Returns an error if `mode` is above 7 or on SDK failures
    pub fn set_trigger_mode(&mut self, mode: u8) -> Result<()> {
        self.trigger_config(mode, self.settings.trigger_threshold)
    }

    /// The analog trigger threshold in volts. Not read back from the hardware.
    #[must_use]
    pub fn trigger_threshold(&self) -> f64 {
        self.settings.trigger_threshold
    }

    /// Set the analog trigger threshold in volts
    /// # Errors
    /// Returns an error if `threshold` is outside +/- 3 V or on SDK failures
    pub fn set_trigger_threshold(&mut self, threshold: f64) -> Result<()> {
        self.trigger_config(self.settings.trigger_mode, threshold)
    }

    // DAQconfig

    pub(crate) fn daq_config(
        &mut self,
        points_per_cycle: u32,
        n_cycles: u32,
        delay: i32,
        mode: i32,
    ) -> Result<()> {
        let (ppc, cycles) = check_daq_shape(points_per_cycle, n_cycles)?;
        let index = self.index;
        self.with_sdk(|sdk| sdk.daq_config(index, ppc, cycles, delay, mode))?;
        debug!(channel = index, points_per_cycle, n_cycles, delay, mode, "DAQconfig");
        self.settings.points_per_cycle = points_per_cycle;
        self.settings.n_cycles = n_cycles;
        self.settings.daq_trigger_delay = delay;
        self.settings.daq_trigger_mode = mode;
        Ok(())
    }

    /// Points collected per trigger
    #[must_use]
    pub fn points_per_cycle(&self) -> u32 {
        self.settings.points_per_cycle
    }

    /// Set the number of points collected per trigger
    /// # Errors
    /// Returns an error if `points` is zero or on SDK failures
    pub fn set_points_per_cycle(&mut self, points: u32) -> Result<()> {
        let s = self.settings.clone();
        self.daq_config(points, s.n_cycles, s.daq_trigger_delay, s.daq_trigger_mode)
    }

    /// Number of triggers collected per acquisition
    #[must_use]
    pub fn n_cycles(&self) -> u32 {
        self.settings.n_cycles
    }

    /// Set the number of triggers collected per acquisition
    /// # Errors
    /// Returns an error if `n_cycles` is zero or on SDK failures
    pub fn set_n_cycles(&mut self, n_cycles: u32) -> Result<()> {
        let s = self.settings.clone();
        self.daq_config(s.points_per_cycle, n_cycles, s.daq_trigger_delay, s.daq_trigger_mode)
    }

    #[must_use]
    pub fn daq_trigger_delay(&self) -> i32 {
        self.settings.daq_trigger_delay
    }

    /// Set the acquisition trigger delay
    /// # Errors
    /// Returns an error on SDK failures
    pub fn set_daq_trigger_delay(&mut self, delay: i32) -> Result<()> {
        let s = self.settings.clone();
        self.daq_config(s.points_per_cycle, s.n_cycles, delay, s.daq_trigger_mode)
    }

    #[must_use]
    pub fn daq_trigger_mode(&self) -> i32 {
        self.settings.daq_trigger_mode
    }

    /// Set what starts the acquisition (auto, software, hardware...)
    /// # Errors
    /// Returns an error on SDK failures
    pub fn set_daq_trigger_mode(&mut self, mode: i32) -> Result<()> {
        let s = self.settings.clone();
        self.daq_config(s.points_per_cycle, s.n_cycles, s.daq_trigger_delay, mode)
    }

    /// The shape of the next acquisition on this channel
    /// # Errors
    /// Returns an error if either dimension is zero
    pub fn shape(&self) -> Result<Shape> {
        let s = &self.settings;
        if s.points_per_cycle == 0 || s.n_cycles == 0 {
            return Err(Error::InvalidShape {
                channel: self.index,
                n_cycles: s.n_cycles,
                points_per_cycle: s.points_per_cycle,
            });
        }
        Ok(Shape {
            n_cycles: s.n_cycles as usize,
            points_per_cycle: s.points_per_cycle as usize,
        })
    }

    // DAQdigitalTriggerConfig

    pub(crate) fn digital_trigger_config(&mut self, source: i32, mode: i32) -> Result<()> {
        let index = self.index;
        self.with_sdk(|sdk| sdk.daq_digital_trigger_config(index, source, mode))?;
        debug!(channel = index, source, mode, "DAQdigitalTriggerConfig");
        self.settings.digital_trigger_source = source;
        self.settings.digital_trigger_mode = mode;
        Ok(())
    }

    #[must_use]
    pub fn digital_trigger_mode(&self) -> i32 {
        self.settings.digital_trigger_mode
    }

    /// Set the digital trigger behaviour
    /// # Errors
    /// Returns an error on SDK failures
    pub fn set_digital_trigger_mode(&mut self, mode: i32) -> Result<()> {
        self.digital_trigger_config(self.settings.digital_trigger_source, mode)
    }

    #[must_use]
    pub fn digital_trigger_source(&self) -> i32 {
        self.settings.digital_trigger_source
    }

    /// Set the digital trigger source
    /// # Errors
    /// Returns an error on SDK failures
    pub fn set_digital_trigger_source(&mut self, source: i32) -> Result<()> {
        self.digital_trigger_config(source, self.settings.digital_trigger_mode)
    }

    // DAQtriggerConfig

    #[must_use]
    pub fn analog_trigger_mask(&self) -> i32 {
        self.settings.analog_trigger_mask
    }

    /// Set which analog trigger blocks start the acquisition
    /// # Errors
    /// Returns an error on SDK failures
    pub fn set_analog_trigger_mask(&mut self, mask: i32) -> Result<()> {
        let index = self.index;
        let (mode, source) = (
            self.settings.digital_trigger_mode,
            self.settings.digital_trigger_source,
        );
        self.with_sdk(|sdk| sdk.daq_trigger_config(index, mode, source, mask))?;
        debug!(channel = index, mode, source, mask, "DAQtriggerConfig");
        self.settings.analog_trigger_mask = mask;
        Ok(())
    }

    // DAQtriggerExternalConfig

    pub(crate) fn external_trigger_config(&mut self, source: i32, behaviour: i32) -> Result<()> {
        let index = self.index;
        self.with_sdk(|sdk| sdk.daq_trigger_external_config(index, source, behaviour))?;
        debug!(channel = index, source, behaviour, "DAQtriggerExternalConfig");
        self.settings.ext_trigger_source = source;
        self.settings.ext_trigger_behaviour = behaviour;
        Ok(())
    }

    #[must_use]
    pub fn ext_trigger_source(&self) -> i32 {
        self.settings.ext_trigger_source
    }

    /// Set the external trigger source
    /// # Errors
    /// Returns an error on SDK failures
    pub fn set_ext_trigger_source(&mut self, source: i32) -> Result<()> {
        self.external_trigger_config(source, self.settings.ext_trigger_behaviour)
    }

    #[must_use]
    pub fn ext_trigger_behaviour(&self) -> i32 {
        self.settings.ext_trigger_behaviour
    }

    /// Set the external trigger behaviour
    /// # Errors
    /// Returns an error on SDK failures
    pub fn set_ext_trigger_behaviour(&mut self, behaviour: i32) -> Result<()> {
        self.external_trigger_config(self.settings.ext_trigger_source, behaviour)
    }

    /// Timeout (ms) for direct DAQ reads
    #[must_use]
    pub fn timeout(&self) -> i32 {
        self.settings.timeout
    }

    /// Set the timeout (ms) for direct DAQ reads. This is only handed to the SDK by
    /// [`super::Digitizer::daq_read`], it does not bound a measurement.
    pub fn set_timeout(&mut self, timeout: i32) {
        self.settings.timeout = timeout;
    }

    // Convenience

    /// Set the input range (V), impedance, coupling and prescaler in one go
    /// # Errors
    /// Returns an error on invalid values or SDK failures
    pub fn set_channel_properties(
        &mut self,
        v_range: f64,
        impedance: Impedance,
        coupling: Coupling,
        prescaler: u16,
    ) -> Result<()> {
        self.input_config(v_range, impedance, coupling)?;
        self.set_prescaler(prescaler)
    }

    /// Acquire on the external digital trigger, `delay` after it fires.
    /// `mode` is 1 (high), 2 (low), 3 (rising edge) or 4 (falling edge).
    /// # Errors
    /// Returns an error on SDK failures
    pub fn set_ext_digital_trigger(&mut self, delay: i32, mode: i32) -> Result<()> {
        // The trigger port has to be an input for the external trigger to reach the DAQ
        self.with_sdk(|sdk| sdk.trigger_io_config(super::TriggerDirection::In as i32))?;
        self.set_daq_trigger_mode(DAQ_TRIGGER_EXTERNAL)?;
        self.set_daq_trigger_delay(delay)?;
        self.set_digital_trigger_source(0)?;
        self.set_digital_trigger_mode(mode)
    }

    pub(crate) fn cache_full_scale(&mut self, full_scale: f64) {
        self.settings.full_scale = full_scale;
    }
}
