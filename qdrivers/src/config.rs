//! TOML descriptions of instruments
//!
//! ```toml
//! name = "dig"
//! chassis = 0
//! slot = 2
//! data_mode = 1
//! measure = [1, 3]
//! timeout_ms = 5000
//!
//! [[channel]]
//! index = 1
//! full_scale = 2.0
//! impedance = "fifty_ohm"
//! points_per_cycle = 100
//! n_cycles = 10
//! ```

use crate::{
    digitizer::{
        channel::{
            check_daq_shape,
            check_full_scale,
            check_prescaler,
            check_trigger,
        },
        AcquisitionMode,
        Channel,
        ChannelSelection,
        ChannelSettings,
        Coupling,
        Impedance,
    },
    error::{
        Error,
        Result,
    },
};
use sd1::{
    Ain,
    Slot,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    path::Path,
    str::FromStr,
};

const fn default_channels() -> u8 {
    4
}

const fn default_triggers() -> u8 {
    8
}

/// Everything needed to open and set up a [`crate::digitizer::Digitizer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DigitizerConfig {
    pub name: String,
    pub chassis: u8,
    pub slot: u8,
    #[serde(default = "default_channels")]
    pub channels: u8,
    #[serde(default = "default_triggers")]
    pub triggers: u8,
    #[serde(default)]
    pub data_mode: AcquisitionMode,
    /// Channel, or list of channels, read by a measurement
    #[serde(default)]
    pub measure: Option<ChannelSelection>,
    /// Give up on a channel's acquisition after this many milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub channel: Vec<ChannelConfig>,
}

/// Settings for one input. Anything left out keeps its current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    pub index: u8,
    pub full_scale: Option<f64>,
    pub impedance: Option<Impedance>,
    pub coupling: Option<Coupling>,
    pub prescaler: Option<u16>,
    pub trigger_mode: Option<u8>,
    pub trigger_threshold: Option<f64>,
    pub points_per_cycle: Option<u32>,
    pub n_cycles: Option<u32>,
    pub daq_trigger_delay: Option<i32>,
    pub daq_trigger_mode: Option<i32>,
    pub digital_trigger_mode: Option<i32>,
    pub digital_trigger_source: Option<i32>,
    pub analog_trigger_mask: Option<i32>,
    pub ext_trigger_source: Option<i32>,
    pub ext_trigger_behaviour: Option<i32>,
    pub timeout: Option<i32>,
}

impl DigitizerConfig {
    #[must_use]
    pub fn slot(&self) -> Slot {
        Slot::new(self.chassis, self.slot)
    }

    /// Read a configuration from a TOML file
    /// # Errors
    /// Returns an error if the file can't be read or isn't a valid configuration
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        std::fs::read_to_string(path)?.parse()
    }
}

impl FromStr for DigitizerConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl ChannelConfig {
    /// Check every value present here against the limits its setter enforces, filling in the
    /// rest of each settings group from `current`. Touches no hardware.
    /// # Errors
    /// Returns the first out of range value
    pub fn validate(&self, current: &ChannelSettings) -> Result<()> {
        if let Some(full_scale) = self.full_scale {
            check_full_scale(full_scale)?;
        }
        if let Some(prescaler) = self.prescaler {
            check_prescaler(prescaler)?;
        }
        if self.trigger_mode.is_some() || self.trigger_threshold.is_some() {
            check_trigger(
                self.trigger_mode.unwrap_or(current.trigger_mode),
                self.trigger_threshold.unwrap_or(current.trigger_threshold),
            )?;
        }
        if self.points_per_cycle.is_some() || self.n_cycles.is_some() {
            check_daq_shape(
                self.points_per_cycle.unwrap_or(current.points_per_cycle),
                self.n_cycles.unwrap_or(current.n_cycles),
            )?;
        }
        Ok(())
    }

    /// Send the settings present here to `ch`, one vendor call per settings group
    pub(crate) fn apply<T>(&self, ch: &mut Channel<T>) -> Result<()>
    where
        T: Ain,
    {
        let s = ch.settings().clone();
        if self.full_scale.is_some() || self.impedance.is_some() || self.coupling.is_some() {
            ch.input_config(
                self.full_scale.unwrap_or(s.full_scale),
                self.impedance.unwrap_or(s.impedance),
                self.coupling.unwrap_or(s.coupling),
            )?;
        }
        if let Some(prescaler) = self.prescaler {
            ch.set_prescaler(prescaler)?;
        }
        if self.trigger_mode.is_some() || self.trigger_threshold.is_some() {
            ch.trigger_config(
                self.trigger_mode.unwrap_or(s.trigger_mode),
                self.trigger_threshold.unwrap_or(s.trigger_threshold),
            )?;
        }
        if self.points_per_cycle.is_some()
            || self.n_cycles.is_some()
            || self.daq_trigger_delay.is_some()
            || self.daq_trigger_mode.is_some()
        {
            ch.daq_config(
                self.points_per_cycle.unwrap_or(s.points_per_cycle),
                self.n_cycles.unwrap_or(s.n_cycles),
                self.daq_trigger_delay.unwrap_or(s.daq_trigger_delay),
                self.daq_trigger_mode.unwrap_or(s.daq_trigger_mode),
            )?;
        }
        if self.digital_trigger_source.is_some() || self.digital_trigger_mode.is_some() {
            ch.digital_trigger_config(
                self.digital_trigger_source.unwrap_or(s.digital_trigger_source),
                self.digital_trigger_mode.unwrap_or(s.digital_trigger_mode),
            )?;
        }
        if let Some(mask) = self.analog_trigger_mask {
            ch.set_analog_trigger_mask(mask)?;
        }
        if self.ext_trigger_source.is_some() || self.ext_trigger_behaviour.is_some() {
            ch.external_trigger_config(
                self.ext_trigger_source.unwrap_or(s.ext_trigger_source),
                self.ext_trigger_behaviour.unwrap_or(s.ext_trigger_behaviour),
            )?;
        }
        if let Some(timeout) = self.timeout {
            ch.set_timeout(timeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digitizer::Digitizer;
    use sd1::mock::{
        Call,
        MockAin,
    };
    use std::time::Duration;

    const FULL: &str = r#"
        name = "dig"
        chassis = 1
        slot = 5
        data_mode = 1
        measure = [1, 3]
        timeout_ms = 250

        [[channel]]
        index = 1
        full_scale = 2.0
        impedance = "fifty_ohm"
        points_per_cycle = 100
        n_cycles = 10

        [[channel]]
        index = 3
        coupling = "ac"
        trigger_mode = 3
        timeout = 1000
    "#;

    #[test]
    fn test_parse_full() {
        let config: DigitizerConfig = FULL.parse().unwrap();
        assert_eq!(config.slot(), Slot::new(1, 5));
        assert_eq!(config.channels, 4);
        assert_eq!(config.triggers, 8);
        assert_eq!(config.data_mode, AcquisitionMode::CycleAverage);
        assert_eq!(config.measure, Some(ChannelSelection::List(vec![1, 3])));
        assert_eq!(config.timeout_ms, Some(250));
        assert_eq!(config.channel.len(), 2);
        assert_eq!(config.channel[0].impedance, Some(Impedance::FiftyOhm));
        assert_eq!(config.channel[1].coupling, Some(Coupling::Ac));
        assert_eq!(config.channel[1].full_scale, None);
    }

    #[test]
    fn test_parse_minimal() {
        let config: DigitizerConfig = "name = \"d\"\nchassis = 0\nslot = 2\nmeasure = 4"
            .parse()
            .unwrap();
        assert_eq!(config.measure, Some(ChannelSelection::Single(4)));
        assert_eq!(config.data_mode, AcquisitionMode::Raw);
        assert!(config.channel.is_empty());
    }

    #[test]
    fn test_parse_rejects() {
        let bad_mode = "name = \"d\"\nchassis = 0\nslot = 2\ndata_mode = 3";
        assert!(matches!(
            bad_mode.parse::<DigitizerConfig>(),
            Err(Error::Config(_))
        ));
        let unknown = "name = \"d\"\nchassis = 0\nslot = 2\nbogus = 1";
        assert!(unknown.parse::<DigitizerConfig>().is_err());
        let bad_impedance =
            "name = \"d\"\nchassis = 0\nslot = 2\n[[channel]]\nindex = 1\nimpedance = \"1M\"";
        assert!(bad_impedance.parse::<DigitizerConfig>().is_err());
    }

    #[test]
    fn test_from_config() {
        let config: DigitizerConfig = FULL.parse().unwrap();
        let dig = Digitizer::from_config(MockAin::new(4), &config).unwrap();
        assert_eq!(dig.name(), "dig");
        assert_eq!(dig.meas_channel(), [1, 3]);
        assert_eq!(dig.data_mode(), AcquisitionMode::CycleAverage);
        assert_eq!(dig.read_policy().timeout, Some(Duration::from_millis(250)));
        assert_eq!(dig.channel(1).unwrap().points_per_cycle(), 100);
        assert_eq!(dig.channel(3).unwrap().timeout(), 1000);

        let sdk = dig.sdk().lock().unwrap();
        let state = sdk.channel(1);
        assert!((state.full_scale - 2.0).abs() < f64::EPSILON);
        assert_eq!(state.impedance, 1);
        assert_eq!(state.n_cycles, 10);
        assert_eq!(sdk.channel(3).trigger_mode, 3);
        // One input config call for channel 1, covering both values
        let input_configs = sdk
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::ChannelInputConfig { channel: 1, .. }))
            .count();
        assert_eq!(input_configs, 1);
    }

    #[test]
    fn test_apply_checks_indices_first() {
        let mut config: DigitizerConfig = FULL.parse().unwrap();
        config.channel[1].index = 9;
        let mut dig = Digitizer::open("dig", MockAin::new(4), config.slot(), 4, 8).unwrap();
        dig.sdk().lock().unwrap().clear_calls();
        assert!(matches!(
            dig.apply_config(&config),
            Err(Error::ChannelOutOfRange { channel: 9, .. })
        ));
        assert!(dig.sdk().lock().unwrap().calls().is_empty());
    }

    #[test]
    fn test_validate() {
        let current = ChannelSettings::default();
        let ok = ChannelConfig {
            index: 1,
            full_scale: Some(2.0),
            trigger_threshold: Some(-3.0),
            ..Default::default()
        };
        assert!(ok.validate(&current).is_ok());
        let bad = [
            ChannelConfig {
                full_scale: Some(0.0),
                ..Default::default()
            },
            ChannelConfig {
                prescaler: Some(4096),
                ..Default::default()
            },
            ChannelConfig {
                trigger_mode: Some(8),
                ..Default::default()
            },
            ChannelConfig {
                trigger_threshold: Some(3.5),
                ..Default::default()
            },
            ChannelConfig {
                points_per_cycle: Some(0),
                ..Default::default()
            },
            ChannelConfig {
                n_cycles: Some(0),
                ..Default::default()
            },
        ];
        for config in bad {
            let err = config.validate(&current).unwrap_err();
            assert!(matches!(err, Error::OutOfRange { .. }), "{config:?}: {err}");
        }
    }

    #[test]
    fn test_apply_checks_values_first() {
        let config: DigitizerConfig = r#"
            name = "dig"
            chassis = 0
            slot = 2
            data_mode = 1

            [[channel]]
            index = 1
            full_scale = 2.0

            [[channel]]
            index = 2
            prescaler = 5000
        "#
        .parse()
        .unwrap();
        let mut dig = Digitizer::open("dig", MockAin::new(4), config.slot(), 4, 8).unwrap();
        dig.sdk().lock().unwrap().clear_calls();
        let err = dig.apply_config(&config).unwrap_err();
        assert!(err.is_configuration(), "{err}");
        assert!(dig.sdk().lock().unwrap().calls().is_empty());
        assert!((dig.channel(1).unwrap().settings().full_scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(dig.data_mode(), AcquisitionMode::Raw);
    }

    #[test]
    fn test_from_path() {
        let path =
            std::env::temp_dir().join(format!("qdrivers-config-{}.toml", std::process::id()));
        std::fs::write(&path, FULL).unwrap();
        let config = DigitizerConfig::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.name, "dig");
        assert!(matches!(
            DigitizerConfig::from_path(&path),
            Err(Error::Io(_))
        ));
    }
}
