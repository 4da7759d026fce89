//! Driver for the Keysight M31xx/M33xx digitizer cards
//!
//! A [`Digitizer`] owns the SDK handle and a set of [`Channel`]s that point back at it. The
//! multi-channel read, [`Digitizer::measure`], arms and triggers every selected input in one
//! masked call and then drains them one after another.

pub mod acquisition;
pub mod channel;

pub use acquisition::{
    AcquisitionMode,
    CancelToken,
    ChannelMask,
    ReadPolicy,
    Shape,
    Trace,
    TraceData,
};
pub use channel::{
    Channel,
    ChannelSettings,
    Coupling,
    Impedance,
};

use crate::{
    config::DigitizerConfig,
    core::{
        check_channel,
        lock,
        param,
        ParameterInfo,
    },
    error::{
        Error,
        Result,
    },
};
use acquisition::read_channel;
use sd1::{
    Ain,
    Slot,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};
use tracing::{
    debug,
    info,
};

/// Direction of the front panel trigger port
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TriggerDirection {
    Out = 0,
    In = 1,
}

/// The channels a measurement reads, either one input or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelSelection {
    Single(u8),
    List(Vec<u8>),
}

impl ChannelSelection {
    fn into_vec(self) -> Vec<u8> {
        match self {
            ChannelSelection::Single(ch) => vec![ch],
            ChannelSelection::List(chs) => chs,
        }
    }
}

impl From<u8> for ChannelSelection {
    fn from(value: u8) -> Self {
        ChannelSelection::Single(value)
    }
}

impl From<Vec<u8>> for ChannelSelection {
    fn from(value: Vec<u8>) -> Self {
        ChannelSelection::List(value)
    }
}

impl From<&[u8]> for ChannelSelection {
    fn from(value: &[u8]) -> Self {
        ChannelSelection::List(value.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for ChannelSelection {
    fn from(value: [u8; N]) -> Self {
        ChannelSelection::List(value.to_vec())
    }
}

/// Instrument level parameters
pub const PARAMETERS: &[ParameterInfo] = &[
    param!("trigger_direction", "Trigger direction for trigger port", "", Hardware, Set, "The trigger direction for digitizer trigger port"),
    param!("sys_frequency", "CLKsys frequency", "Hz", Hardware, GetSet, "The frequency of internal CLKsys in Hz"),
    param!("sync_frequency", "CLKsync frequency", "Hz", Hardware, Get, "The frequency of internal CLKsync in Hz"),
    param!("trigger_io", "Trigger input", "", Hardware, GetSet, "The trigger input value, 0 (OFF) or 1 (ON)"),
    param!("data_mode", "Data mode", "", Memory, GetSet, "0 raw, 1 average over cycles, 2 average over everything"),
    param!("meas_channel", "Measurement channel", "", Memory, Set, "The channel(s) read by a measurement"),
    param!("measure", "Measured traces", "mV", Hardware, Get, "Arm, trigger and read every selected channel"),
];

/// A digitizer card in a PXI chassis
#[derive(Debug)]
pub struct Digitizer<T> {
    name: String,
    slot: Slot,
    n_triggers: u8,
    sdk: Arc<Mutex<T>>,
    channels: Vec<Channel<T>>,
    data_mode: AcquisitionMode,
    selection: Vec<u8>,
    policy: ReadPolicy,
}

impl<T> Digitizer<T>
where
    T: Ain,
{
    /// Find and open the digitizer at `slot`
    /// # Errors
    /// Returns an error if no module sits in `slot` or it refuses to open
    pub fn open(
        name: impl Into<String>,
        mut sdk: T,
        slot: Slot,
        n_channels: u8,
        n_triggers: u8,
    ) -> Result<Self> {
        let name = name.into();
        let product = sdk.product_name_by_slot(slot).map_err(|e| {
            debug!(%slot, error = %e, "No product name");
            Error::NotFound(slot)
        })?;
        match sdk.open_with_slot(&product, slot) {
            Ok(code) if code > 0 => (),
            Ok(code) => return Err(Error::Open { slot, code }),
            Err(e) => {
                return Err(Error::Open {
                    slot,
                    code: e.code().unwrap_or_default(),
                })
            }
        }
        info!(%name, %product, %slot, "Opened digitizer");
        let sdk = Arc::new(Mutex::new(sdk));
        let channels = (1..=n_channels)
            .map(|i| Channel::new(Arc::downgrade(&sdk), i))
            .collect();
        Ok(Self {
            name,
            slot,
            n_triggers,
            sdk,
            channels,
            data_mode: AcquisitionMode::default(),
            selection: vec![],
            policy: ReadPolicy::default(),
        })
    }

    /// Open the digitizer described by `config` and apply it
    /// # Errors
    /// Returns an error if opening fails or the configuration is invalid
    pub fn from_config(sdk: T, config: &DigitizerConfig) -> Result<Self> {
        let mut dig = Self::open(
            config.name.clone(),
            sdk,
            config.slot(),
            config.channels,
            config.triggers,
        )?;
        dig.apply_config(config)?;
        Ok(dig)
    }

    /// Push every setting in `config` through the normal setters.
    /// Channel indices, channel values and the measurement selection are checked before
    /// anything is sent.
    /// # Errors
    /// Returns an error on invalid values or SDK failures
    pub fn apply_config(&mut self, config: &DigitizerConfig) -> Result<()> {
        let n = self.n_channels();
        for ch in &config.channel {
            check_channel(ch.index, n)?;
            ch.validate(self.channel(ch.index)?.settings())?;
        }
        let selection = config
            .measure
            .clone()
            .map(|s| self.validate_selection(s))
            .transpose()?;
        for ch in &config.channel {
            ch.apply(self.channel_mut(ch.index)?)?;
        }
        self.data_mode = config.data_mode;
        if let Some(selection) = selection {
            self.selection = selection;
        }
        if let Some(ms) = config.timeout_ms {
            self.policy.timeout = Some(Duration::from_millis(ms));
        }
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        self.slot
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn n_channels(&self) -> u8 {
        self.channels.len() as u8
    }

    #[must_use]
    pub fn n_triggers(&self) -> u8 {
        self.n_triggers
    }

    /// The shared SDK handle
    #[must_use]
    pub fn sdk(&self) -> &Arc<Mutex<T>> {
        &self.sdk
    }

    /// Get a channel by its 1-based index
    /// # Errors
    /// Returns an error if the channel doesn't exist
    pub fn channel(&self, channel: u8) -> Result<&Channel<T>> {
        let ch = check_channel(channel, self.n_channels())?;
        Ok(&self.channels[usize::from(ch) - 1])
    }

    /// Get a channel by its 1-based index
    /// # Errors
    /// Returns an error if the channel doesn't exist
    pub fn channel_mut(&mut self, channel: u8) -> Result<&mut Channel<T>> {
        let ch = check_channel(channel, self.n_channels())?;
        Ok(&mut self.channels[usize::from(ch) - 1])
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel<T>> {
        self.channels.iter()
    }

    /// Set the direction of the trigger port
    /// # Errors
    /// Returns an error on SDK failures
    pub fn set_trigger_direction(&mut self, direction: TriggerDirection) -> Result<()> {
        lock(&self.sdk)?.trigger_io_config(direction as i32)?;
        debug!(?direction, "triggerIOconfig");
        Ok(())
    }

    /// The CLKsys frequency in Hz
    /// # Errors
    /// Returns an error on SDK failures
    pub fn sys_frequency(&self) -> Result<f64> {
        Ok(lock(&self.sdk)?.clock_get_frequency()?)
    }

    /// Set the CLKsys frequency, returning the frequency the card actually settled on
    /// # Errors
    /// Returns an error on SDK failures
    pub fn set_sys_frequency(&mut self, frequency: f64) -> Result<f64> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(Error::out_of_range("sys_frequency", frequency, "a positive frequency"));
        }
        let actual = lock(&self.sdk)?.clock_set_frequency(frequency)?;
        debug!(frequency, actual, "clockSetFrequency");
        Ok(actual)
    }

    /// The CLKsync frequency in Hz
    /// # Errors
    /// Returns an error on SDK failures
    pub fn sync_frequency(&self) -> Result<f64> {
        Ok(lock(&self.sdk)?.clock_get_sync_frequency()?.into())
    }

    /// The level on the trigger port
    /// # Errors
    /// Returns an error on SDK failures
    pub fn trigger_io(&self) -> Result<bool> {
        Ok(lock(&self.sdk)?.trigger_io_read()? != 0)
    }

    /// Drive the trigger port
    /// # Errors
    /// Returns an error on SDK failures
    pub fn set_trigger_io(&mut self, value: bool) -> Result<()> {
        lock(&self.sdk)?.trigger_io_write(value.into())?;
        debug!(value, "triggerIOwrite");
        Ok(())
    }

    #[must_use]
    pub fn data_mode(&self) -> AcquisitionMode {
        self.data_mode
    }

    /// Set how measured data is reduced, from its integer code
    /// # Errors
    /// Returns an error if `mode` isn't 0, 1 or 2
    pub fn set_data_mode(&mut self, mode: i32) -> Result<()> {
        self.data_mode = AcquisitionMode::try_from(mode)?;
        Ok(())
    }

    #[must_use]
    pub fn read_policy(&self) -> &ReadPolicy {
        &self.policy
    }

    /// Bound how long [`Self::measure`] waits on each channel
    pub fn set_read_policy(&mut self, policy: ReadPolicy) {
        self.policy = policy;
    }

    fn validate_selection(&self, selection: ChannelSelection) -> Result<Vec<u8>> {
        let channels = selection.into_vec();
        for (i, &ch) in channels.iter().enumerate() {
            check_channel(ch, self.n_channels())?;
            if channels[..i].contains(&ch) {
                return Err(Error::out_of_range("meas_channel", ch, "each channel at most once"));
            }
        }
        Ok(channels)
    }

    /// The channels [`Self::measure`] reads, in order
    #[must_use]
    pub fn meas_channel(&self) -> &[u8] {
        &self.selection
    }

    /// Select the channels [`Self::measure`] reads. The traces come back in this order.
    /// # Errors
    /// Returns an error naming the first channel that doesn't exist or is repeated
    pub fn set_meas_channel(&mut self, channels: impl Into<ChannelSelection>) -> Result<()> {
        self.selection = self.validate_selection(channels.into())?;
        debug!(selection = ?self.selection, "Selected channels");
        Ok(())
    }

    /// Shapes of the next measurement's traces, in selection order
    /// # Errors
    /// Returns an error if a selected channel has a zero-sized acquisition
    pub fn shapes(&self) -> Result<Vec<Vec<usize>>> {
        self.selection
            .iter()
            .map(|&ch| Ok(self.data_mode.output_shape(self.channel(ch)?.shape()?)))
            .collect()
    }

    /// Arm and trigger every selected channel, then read them back in selection order.
    /// Blocks until every channel has delivered its samples or the read policy gives up.
    /// # Errors
    /// Returns a configuration error before touching hardware if nothing is selected or a
    /// selected channel is misconfigured. Otherwise returns SDK and read policy errors.
    pub fn measure(&mut self) -> Result<Vec<Trace>> {
        if self.selection.is_empty() {
            return Err(Error::NoChannelsSelected);
        }
        let mode = self.data_mode;
        let mask = ChannelMask::new(&self.selection, self.n_channels())?;
        let shapes = self
            .selection
            .iter()
            .map(|&ch| self.channel(ch)?.shape())
            .collect::<Result<Vec<_>>>()?;

        let mut sdk = lock(&self.sdk)?;
        sdk.daq_start_multiple(mask.bits())?;
        sdk.daq_trigger_multiple(mask.bits())?;
        debug!(mask = %format!("{mask:#b}"), ?mode, "Armed and triggered");

        let mut traces = Vec::with_capacity(shapes.len());
        for (&channel, shape) in self.selection.iter().zip(shapes) {
            let full_scale = sdk.channel_full_scale(channel)?;
            let data = read_channel(&mut *sdk, channel, shape, full_scale, mode, &self.policy)?;
            traces.push((
                full_scale,
                Trace {
                    name: format!("{}_ch{}", self.name, channel),
                    channel,
                    label: "Voltage",
                    unit: "mV",
                    data,
                },
            ));
        }
        drop(sdk);

        Ok(traces
            .into_iter()
            .map(|(full_scale, trace)| {
                self.channels[usize::from(trace.channel) - 1].cache_full_scale(full_scale);
                trace
            })
            .collect())
    }

    // DAQ pass-throughs

    /// # Errors
    /// Returns an error on SDK failures
    pub fn daq_start(&mut self, channel: u8) -> Result<()> {
        let ch = check_channel(channel, self.n_channels())?;
        Ok(lock(&self.sdk)?.daq_start(ch)?)
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn daq_start_multiple(&mut self, mask: u32) -> Result<()> {
        Ok(lock(&self.sdk)?.daq_start_multiple(mask)?)
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn daq_stop(&mut self, channel: u8) -> Result<()> {
        let ch = check_channel(channel, self.n_channels())?;
        Ok(lock(&self.sdk)?.daq_stop(ch)?)
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn daq_stop_multiple(&mut self, mask: u32) -> Result<()> {
        Ok(lock(&self.sdk)?.daq_stop_multiple(mask)?)
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn daq_trigger(&mut self, channel: u8) -> Result<()> {
        let ch = check_channel(channel, self.n_channels())?;
        Ok(lock(&self.sdk)?.daq_trigger(ch)?)
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn daq_trigger_multiple(&mut self, mask: u32) -> Result<()> {
        Ok(lock(&self.sdk)?.daq_trigger_multiple(mask)?)
    }

    /// Throw away everything buffered on `channel`
    /// # Errors
    /// Returns an error on SDK failures
    pub fn daq_flush(&mut self, channel: u8) -> Result<()> {
        let ch = check_channel(channel, self.n_channels())?;
        Ok(lock(&self.sdk)?.daq_flush(ch)?)
    }

    /// # Errors
    /// Returns an error on SDK failures
    pub fn daq_flush_multiple(&mut self, mask: u32) -> Result<()> {
        Ok(lock(&self.sdk)?.daq_flush_multiple(mask)?)
    }

    /// Read one acquisition worth of raw ADC words from `channel` in a single `DAQread`, with the
    /// channel's timeout. Returns however many words the card handed over.
    /// # Errors
    /// Returns an error on SDK failures or a zero-sized acquisition
    pub fn daq_read(&mut self, channel: u8) -> Result<Vec<i16>> {
        let ch = self.channel(channel)?;
        let total = ch.shape()?.total();
        let timeout = ch.timeout();
        let mut buffer = vec![0i16; total];
        let n = lock(&self.sdk)?.daq_read(channel, &mut buffer, timeout)?;
        buffer.truncate(n);
        debug!(channel, requested = total, read = n, "DAQread");
        Ok(buffer)
    }

    /// Reset the phase of CLKsync and CLKsys on the next trigger
    /// # Errors
    /// Returns an error on SDK failures
    pub fn reset_clock_phase(
        &mut self,
        trigger_behaviour: i32,
        trigger_source: i32,
        skew: f64,
    ) -> Result<()> {
        lock(&self.sdk)?.clock_reset_phase(trigger_behaviour, trigger_source, skew)?;
        debug!(trigger_behaviour, trigger_source, skew, "clockResetPhase");
        Ok(())
    }

    /// Release the module
    /// # Errors
    /// Returns an error on SDK failures
    pub fn close(self) -> Result<()> {
        lock(&self.sdk)?.close()?;
        info!(name = %self.name, slot = %self.slot, "Closed digitizer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::find_parameter;
    use sd1::mock::{
        Call,
        MockAin,
    };

    fn digitizer() -> Digitizer<MockAin> {
        Digitizer::open("dig", MockAin::new(4), Slot::new(0, 2), 4, 8).unwrap()
    }

    #[test]
    fn test_open() {
        let dig = digitizer();
        assert_eq!(dig.n_channels(), 4);
        assert_eq!(dig.n_triggers(), 8);
        let sdk = dig.sdk().lock().unwrap();
        assert!(sdk.is_open());
        assert_eq!(
            sdk.calls(),
            [
                Call::ProductNameBySlot(Slot::new(0, 2)),
                Call::OpenWithSlot(Slot::new(0, 2))
            ]
        );
    }

    #[test]
    fn test_open_empty_slot() {
        let err =
            Digitizer::open("dig", MockAin::new(4).without_module(), Slot::new(1, 7), 4, 8)
                .unwrap_err();
        assert!(matches!(err, Error::NotFound(s) if s == Slot::new(1, 7)));
        assert!(err.to_string().contains("chassis 1, slot 7"));
    }

    #[test]
    fn test_open_refused() {
        let err = Digitizer::open(
            "dig",
            MockAin::new(4).with_open_status(0),
            Slot::new(0, 2),
            4,
            8,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Open { code: 0, .. }));
        let err = Digitizer::open(
            "dig",
            MockAin::new(4).with_open_status(-8000),
            Slot::new(0, 2),
            4,
            8,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Open { code: -8000, .. }));
    }

    #[test]
    fn test_channel_lookup() {
        let mut dig = digitizer();
        assert_eq!(dig.channel(1).unwrap().index(), 1);
        assert_eq!(dig.channel_mut(4).unwrap().index(), 4);
        assert!(matches!(
            dig.channel(5),
            Err(Error::ChannelOutOfRange {
                channel: 5,
                channels: 4
            })
        ));
        assert!(dig.channel(0).is_err());
        assert_eq!(dig.channels().count(), 4);
    }

    #[test]
    fn test_meas_channel_forms() {
        let mut dig = digitizer();
        dig.set_meas_channel(2u8).unwrap();
        assert_eq!(dig.meas_channel(), [2]);
        dig.set_meas_channel([3u8, 1]).unwrap();
        assert_eq!(dig.meas_channel(), [3, 1]);
        dig.set_meas_channel(vec![4u8]).unwrap();
        assert_eq!(dig.meas_channel(), [4]);
    }

    #[test]
    fn test_meas_channel_rejects() {
        let mut dig = digitizer();
        dig.set_meas_channel(1u8).unwrap();
        assert!(matches!(
            dig.set_meas_channel([1u8, 5]),
            Err(Error::ChannelOutOfRange { channel: 5, .. })
        ));
        assert!(dig.set_meas_channel([2u8, 2]).unwrap_err().is_configuration());
        // A failed selection leaves the old one alone
        assert_eq!(dig.meas_channel(), [1]);
    }

    #[test]
    fn test_data_mode() {
        let mut dig = digitizer();
        assert_eq!(dig.data_mode(), AcquisitionMode::Raw);
        dig.set_data_mode(2).unwrap();
        assert_eq!(dig.data_mode(), AcquisitionMode::TotalAverage);
        assert!(matches!(dig.set_data_mode(3), Err(Error::InvalidMode(3))));
        assert_eq!(dig.data_mode(), AcquisitionMode::TotalAverage);
    }

    #[test]
    fn test_shapes() {
        let mut dig = digitizer();
        dig.channel_mut(1).unwrap().set_points_per_cycle(10).unwrap();
        dig.channel_mut(1).unwrap().set_n_cycles(3).unwrap();
        dig.set_meas_channel([1u8, 2]).unwrap();
        assert_eq!(dig.shapes().unwrap(), [vec![3, 10], vec![1, 1]]);
        dig.set_data_mode(1).unwrap();
        assert_eq!(dig.shapes().unwrap(), [vec![10], vec![1]]);
        dig.set_data_mode(2).unwrap();
        assert_eq!(dig.shapes().unwrap(), [Vec::<usize>::new(), vec![]]);
    }

    #[test]
    fn test_clock_and_trigger_port() {
        let mut dig = digitizer();
        assert!((dig.set_sys_frequency(200e6).unwrap() - 200e6).abs() < 1.0);
        assert!((dig.sys_frequency().unwrap() - 200e6).abs() < 1.0);
        assert!((dig.sync_frequency().unwrap() - 10e6).abs() < 1.0);
        dig.set_trigger_io(true).unwrap();
        assert!(dig.trigger_io().unwrap());
        dig.set_trigger_direction(TriggerDirection::In).unwrap();
        assert_eq!(dig.sdk().lock().unwrap().trigger_direction(), 1);
        assert!(dig.set_sys_frequency(-1.0).is_err());
    }

    #[test]
    fn test_daq_read_single_call() {
        let mut dig = digitizer();
        dig.channel_mut(3).unwrap().set_points_per_cycle(4).unwrap();
        dig.channel_mut(3).unwrap().set_timeout(100);
        dig.sdk().lock().unwrap().push_samples(3, &[1, 2, 3]);
        assert_eq!(dig.daq_read(3).unwrap(), [1, 2, 3]);
        assert_eq!(
            dig.sdk().lock().unwrap().calls().last().unwrap(),
            &Call::DaqRead {
                channel: 3,
                requested: 4,
                timeout_ms: 100
            }
        );
    }

    #[test]
    fn test_pass_throughs() {
        let mut dig = digitizer();
        dig.daq_start(1).unwrap();
        dig.daq_stop_multiple(0b0011).unwrap();
        dig.daq_flush(2).unwrap();
        dig.reset_clock_phase(1, 0, 0.5).unwrap();
        assert!(dig.daq_trigger(9).unwrap_err().is_configuration());
        let sdk = dig.sdk().lock().unwrap();
        assert_eq!(
            sdk.calls()[2..],
            [
                Call::DaqStart(1),
                Call::DaqStopMultiple(0b0011),
                Call::DaqFlush(2),
                Call::ClockResetPhase {
                    behaviour: 1,
                    source: 0,
                    skew: 0.5
                }
            ]
        );
    }

    #[test]
    fn test_close() {
        let dig = digitizer();
        let sdk = Arc::clone(dig.sdk());
        dig.close().unwrap();
        assert!(!sdk.lock().unwrap().is_open());
    }

    #[test]
    fn test_parameter_table() {
        let p = find_parameter(PARAMETERS, "sync_frequency").unwrap();
        assert!(p.access.gettable() && !p.access.settable());
        assert_eq!(
            find_parameter(PARAMETERS, "data_mode").unwrap().origin,
            crate::core::Origin::Memory
        );
    }
}
