//! Simulated SD1 modules, useful for testing drivers without hardware

use crate::{
    check,
    Ain,
    ErrorCode,
    Hvi,
    Result,
    Slot,
};
use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    path::{
        Path,
        PathBuf,
    },
};

/// A record of one call made against a [`MockAin`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ProductNameBySlot(Slot),
    OpenWithSlot(Slot),
    Close,
    ChannelInputConfig {
        channel: u8,
        full_scale: f64,
        impedance: i32,
        coupling: i32,
    },
    ChannelFullScale(u8),
    ChannelImpedance(u8),
    ChannelCoupling(u8),
    ChannelPrescalerConfig {
        channel: u8,
        prescaler: i32,
    },
    ChannelPrescaler(u8),
    ChannelTriggerConfig {
        channel: u8,
        mode: i32,
        threshold: f64,
    },
    DaqConfig {
        channel: u8,
        points_per_cycle: i32,
        n_cycles: i32,
        trigger_delay: i32,
        trigger_mode: i32,
    },
    DaqDigitalTriggerConfig {
        channel: u8,
        source: i32,
        behaviour: i32,
    },
    DaqTriggerConfig {
        channel: u8,
        digital_mode: i32,
        digital_source: i32,
        analog_mask: i32,
    },
    DaqTriggerExternalConfig {
        channel: u8,
        source: i32,
        behaviour: i32,
    },
    DaqCounterRead(u8),
    DaqRead {
        channel: u8,
        requested: usize,
        timeout_ms: i32,
    },
    DaqStart(u8),
    DaqStop(u8),
    DaqTrigger(u8),
    DaqFlush(u8),
    DaqStartMultiple(u32),
    DaqStopMultiple(u32),
    DaqTriggerMultiple(u32),
    DaqFlushMultiple(u32),
    TriggerIoConfig(i32),
    TriggerIoWrite(i32),
    TriggerIoRead,
    ClockSetFrequency(f64),
    ClockGetFrequency,
    ClockGetSyncFrequency,
    ClockResetPhase {
        behaviour: i32,
        source: i32,
        skew: f64,
    },
}

impl Call {
    /// The SD1 function name of this call
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Call::ProductNameBySlot(_) => "getProductNameBySlot",
            Call::OpenWithSlot(_) => "openWithSlot",
            Call::Close => "close",
            Call::ChannelInputConfig { .. } => "channelInputConfig",
            Call::ChannelFullScale(_) => "channelFullScale",
            Call::ChannelImpedance(_) => "channelImpedance",
            Call::ChannelCoupling(_) => "channelCoupling",
            Call::ChannelPrescalerConfig { .. } => "channelPrescalerConfig",
            Call::ChannelPrescaler(_) => "channelPrescaler",
            Call::ChannelTriggerConfig { .. } => "channelTriggerConfig",
            Call::DaqConfig { .. } => "DAQconfig",
            Call::DaqDigitalTriggerConfig { .. } => "DAQdigitalTriggerConfig",
            Call::DaqTriggerConfig { .. } => "DAQtriggerConfig",
            Call::DaqTriggerExternalConfig { .. } => "DAQtriggerExternalConfig",
            Call::DaqCounterRead(_) => "DAQcounterRead",
            Call::DaqRead { .. } => "DAQread",
            Call::DaqStart(_) => "DAQstart",
            Call::DaqStop(_) => "DAQstop",
            Call::DaqTrigger(_) => "DAQtrigger",
            Call::DaqFlush(_) => "DAQflush",
            Call::DaqStartMultiple(_) => "DAQstartMultiple",
            Call::DaqStopMultiple(_) => "DAQstopMultiple",
            Call::DaqTriggerMultiple(_) => "DAQtriggerMultiple",
            Call::DaqFlushMultiple(_) => "DAQflushMultiple",
            Call::TriggerIoConfig(_) => "triggerIOconfig",
            Call::TriggerIoWrite(_) => "triggerIOwrite",
            Call::TriggerIoRead => "triggerIOread",
            Call::ClockSetFrequency(_) => "clockSetFrequency",
            Call::ClockGetFrequency => "clockGetFrequency",
            Call::ClockGetSyncFrequency => "clockGetSyncFrequency",
            Call::ClockResetPhase { .. } => "clockResetPhase",
        }
    }
}

/// The simulated state of one digitizer input
#[derive(Debug, Clone, PartialEq)]
pub struct MockChannel {
    pub full_scale: f64,
    pub impedance: i32,
    pub coupling: i32,
    pub prescaler: i32,
    pub trigger_mode: i32,
    pub trigger_threshold: f64,
    pub points_per_cycle: i32,
    pub n_cycles: i32,
    pub trigger_delay: i32,
    pub daq_trigger_mode: i32,
    pub digital_source: i32,
    pub digital_behaviour: i32,
    pub digital_mode: i32,
    pub analog_mask: i32,
    pub external_source: i32,
    pub external_behaviour: i32,
    /// Chunks of samples waiting to be read, in delivery order
    buffer: VecDeque<Vec<i16>>,
    /// Number of upcoming counter reads that will report nothing available
    idle_polls: usize,
}

impl Default for MockChannel {
    fn default() -> Self {
        Self {
            full_scale: 1.0,
            impedance: 0,
            coupling: 0,
            prescaler: 0,
            trigger_mode: 1,
            trigger_threshold: 0.0,
            points_per_cycle: 1,
            n_cycles: 1,
            trigger_delay: 0,
            daq_trigger_mode: 0,
            digital_source: 0,
            digital_behaviour: 0,
            digital_mode: 0,
            analog_mask: 0,
            external_source: 0,
            external_behaviour: 0,
            buffer: VecDeque::new(),
            idle_polls: 0,
        }
    }
}

/// A simulated digitizer that records every call and serves samples from per-channel queues
#[derive(Debug)]
pub struct MockAin {
    product: Option<String>,
    open_status: i32,
    opened: bool,
    channels: Vec<MockChannel>,
    calls: Vec<Call>,
    failures: HashMap<&'static str, i32>,
    max_transfer: Option<usize>,
    trigger_io: i32,
    trigger_direction: i32,
    clock: f64,
    sync_clock: i32,
}

impl MockAin {
    /// Construct a new simulated digitizer with `channels` inputs
    #[must_use]
    pub fn new(channels: u8) -> Self {
        Self {
            product: Some("M3102A".to_owned()),
            open_status: 1,
            opened: false,
            channels: vec![MockChannel::default(); channels.into()],
            calls: vec![],
            failures: HashMap::new(),
            max_transfer: None,
            trigger_io: 0,
            trigger_direction: 0,
            clock: 100e6,
            sync_clock: 10_000_000,
        }
    }

    /// Pretend the slot is empty
    #[must_use]
    pub fn without_module(mut self) -> Self {
        self.product = None;
        self
    }

    /// Make `openWithSlot` return `status`
    #[must_use]
    pub fn with_open_status(mut self, status: i32) -> Self {
        self.open_status = status;
        self
    }

    /// Cap the number of points a single `DAQread` hands back
    #[must_use]
    pub fn with_max_transfer(mut self, points: usize) -> Self {
        self.max_transfer = Some(points);
        self
    }

    /// Make every future call of the SD1 function `call` fail with `code`
    pub fn fail(&mut self, call: &'static str, code: i32) {
        self.failures.insert(call, code);
    }

    /// Queue a chunk of samples on `channel`. Each chunk is reported by `DAQcounterRead` on its
    /// own, so the chunking here is the chunking the reader sees.
    /// # Panics
    /// Panics if `channel` doesn't exist
    pub fn push_samples(&mut self, channel: u8, chunk: &[i16]) {
        self.channels[usize::from(channel) - 1]
            .buffer
            .push_back(chunk.to_vec());
    }

    /// Make the next `polls` counter reads on `channel` report an empty buffer
    /// # Panics
    /// Panics if `channel` doesn't exist
    pub fn push_idle_polls(&mut self, channel: u8, polls: usize) {
        self.channels[usize::from(channel) - 1].idle_polls += polls;
    }

    /// Number of samples still queued on `channel`
    #[must_use]
    pub fn pending(&self, channel: u8) -> usize {
        self.channels[usize::from(channel) - 1]
            .buffer
            .iter()
            .map(Vec::len)
            .sum()
    }

    /// The simulated state of `channel`
    #[must_use]
    pub fn channel(&self, channel: u8) -> &MockChannel {
        &self.channels[usize::from(channel) - 1]
    }

    /// Every call made so far, in order
    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.opened
    }

    #[must_use]
    pub fn trigger_direction(&self) -> i32 {
        self.trigger_direction
    }

    /// Record `call` and apply any injected failure
    fn enter(&mut self, call: Call) -> Result<()> {
        let name = call.name();
        self.calls.push(call);
        match self.failures.get(name) {
            Some(code) => check(name, *code).map(|_| ()),
            None => Ok(()),
        }
    }

    fn chan(&mut self, call: &'static str, channel: u8) -> Result<&mut MockChannel> {
        if channel == 0 || usize::from(channel) > self.channels.len() {
            check(call, ErrorCode::InvalidChannel as i32)?;
        }
        Ok(&mut self.channels[usize::from(channel) - 1])
    }

    fn mask(&mut self, call: &'static str, mask: u32) -> Result<()> {
        if u64::from(mask) >> self.channels.len() != 0 {
            check(call, ErrorCode::InvalidValue as i32)?;
        }
        Ok(())
    }
}

impl Ain for MockAin {
    fn product_name_by_slot(&mut self, slot: Slot) -> Result<String> {
        self.enter(Call::ProductNameBySlot(slot))?;
        self.product.clone().ok_or(crate::Error::NoModule(slot))
    }

    fn open_with_slot(&mut self, _product: &str, slot: Slot) -> Result<i32> {
        self.enter(Call::OpenWithSlot(slot))?;
        let status = check("openWithSlot", self.open_status)?;
        self.opened = status > 0;
        Ok(status)
    }

    fn close(&mut self) -> Result<()> {
        self.enter(Call::Close)?;
        self.opened = false;
        Ok(())
    }

    fn channel_input_config(
        &mut self,
        channel: u8,
        full_scale: f64,
        impedance: i32,
        coupling: i32,
    ) -> Result<()> {
        self.enter(Call::ChannelInputConfig {
            channel,
            full_scale,
            impedance,
            coupling,
        })?;
        let ch = self.chan("channelInputConfig", channel)?;
        ch.full_scale = full_scale;
        ch.impedance = impedance;
        ch.coupling = coupling;
        Ok(())
    }

    fn channel_full_scale(&mut self, channel: u8) -> Result<f64> {
        self.enter(Call::ChannelFullScale(channel))?;
        Ok(self.chan("channelFullScale", channel)?.full_scale)
    }

    fn channel_impedance(&mut self, channel: u8) -> Result<i32> {
        self.enter(Call::ChannelImpedance(channel))?;
        Ok(self.chan("channelImpedance", channel)?.impedance)
    }

    fn channel_coupling(&mut self, channel: u8) -> Result<i32> {
        self.enter(Call::ChannelCoupling(channel))?;
        Ok(self.chan("channelCoupling", channel)?.coupling)
    }

    fn channel_prescaler_config(&mut self, channel: u8, prescaler: i32) -> Result<()> {
        self.enter(Call::ChannelPrescalerConfig { channel, prescaler })?;
        self.chan("channelPrescalerConfig", channel)?.prescaler = prescaler;
        Ok(())
    }

    fn channel_prescaler(&mut self, channel: u8) -> Result<i32> {
        self.enter(Call::ChannelPrescaler(channel))?;
        Ok(self.chan("channelPrescaler", channel)?.prescaler)
    }

    fn channel_trigger_config(&mut self, channel: u8, mode: i32, threshold: f64) -> Result<()> {
        self.enter(Call::ChannelTriggerConfig {
            channel,
            mode,
            threshold,
        })?;
        let ch = self.chan("channelTriggerConfig", channel)?;
        ch.trigger_mode = mode;
        ch.trigger_threshold = threshold;
        Ok(())
    }

    fn daq_config(
        &mut self,
        channel: u8,
        points_per_cycle: i32,
        n_cycles: i32,
        trigger_delay: i32,
        trigger_mode: i32,
    ) -> Result<()> {
        self.enter(Call::DaqConfig {
            channel,
            points_per_cycle,
            n_cycles,
            trigger_delay,
            trigger_mode,
        })?;
        let ch = self.chan("DAQconfig", channel)?;
        ch.points_per_cycle = points_per_cycle;
        ch.n_cycles = n_cycles;
        ch.trigger_delay = trigger_delay;
        ch.daq_trigger_mode = trigger_mode;
        Ok(())
    }

    fn daq_digital_trigger_config(
        &mut self,
        channel: u8,
        source: i32,
        behaviour: i32,
    ) -> Result<()> {
        self.enter(Call::DaqDigitalTriggerConfig {
            channel,
            source,
            behaviour,
        })?;
        let ch = self.chan("DAQdigitalTriggerConfig", channel)?;
        ch.digital_source = source;
        ch.digital_behaviour = behaviour;
        Ok(())
    }

    fn daq_trigger_config(
        &mut self,
        channel: u8,
        digital_mode: i32,
        digital_source: i32,
        analog_mask: i32,
    ) -> Result<()> {
        self.enter(Call::DaqTriggerConfig {
            channel,
            digital_mode,
            digital_source,
            analog_mask,
        })?;
        let ch = self.chan("DAQtriggerConfig", channel)?;
        ch.digital_mode = digital_mode;
        ch.digital_source = digital_source;
        ch.analog_mask = analog_mask;
        Ok(())
    }

    fn daq_trigger_external_config(
        &mut self,
        channel: u8,
        source: i32,
        behaviour: i32,
    ) -> Result<()> {
        self.enter(Call::DaqTriggerExternalConfig {
            channel,
            source,
            behaviour,
        })?;
        let ch = self.chan("DAQtriggerExternalConfig", channel)?;
        ch.external_source = source;
        ch.external_behaviour = behaviour;
        Ok(())
    }

    fn daq_counter_read(&mut self, channel: u8) -> Result<usize> {
        self.enter(Call::DaqCounterRead(channel))?;
        let ch = self.chan("DAQcounterRead", channel)?;
        if ch.idle_polls > 0 {
            ch.idle_polls -= 1;
            return Ok(0);
        }
        Ok(ch.buffer.front().map_or(0, Vec::len))
    }

    fn daq_read(&mut self, channel: u8, buffer: &mut [i16], timeout_ms: i32) -> Result<usize> {
        self.enter(Call::DaqRead {
            channel,
            requested: buffer.len(),
            timeout_ms,
        })?;
        let max_transfer = self.max_transfer.unwrap_or(usize::MAX);
        let ch = self.chan("DAQread", channel)?;
        let Some(front) = ch.buffer.front_mut() else {
            return Ok(0);
        };
        let n = buffer.len().min(front.len()).min(max_transfer);
        buffer[..n].copy_from_slice(&front[..n]);
        front.drain(..n);
        if front.is_empty() {
            ch.buffer.pop_front();
        }
        Ok(n)
    }

    fn daq_start(&mut self, channel: u8) -> Result<()> {
        self.enter(Call::DaqStart(channel))?;
        self.chan("DAQstart", channel).map(|_| ())
    }

    fn daq_stop(&mut self, channel: u8) -> Result<()> {
        self.enter(Call::DaqStop(channel))?;
        self.chan("DAQstop", channel).map(|_| ())
    }

    fn daq_trigger(&mut self, channel: u8) -> Result<()> {
        self.enter(Call::DaqTrigger(channel))?;
        self.chan("DAQtrigger", channel).map(|_| ())
    }

    fn daq_flush(&mut self, channel: u8) -> Result<()> {
        self.enter(Call::DaqFlush(channel))?;
        self.chan("DAQflush", channel)?.buffer.clear();
        Ok(())
    }

    fn daq_start_multiple(&mut self, mask: u32) -> Result<()> {
        self.enter(Call::DaqStartMultiple(mask))?;
        self.mask("DAQstartMultiple", mask)
    }

    fn daq_stop_multiple(&mut self, mask: u32) -> Result<()> {
        self.enter(Call::DaqStopMultiple(mask))?;
        self.mask("DAQstopMultiple", mask)
    }

    fn daq_trigger_multiple(&mut self, mask: u32) -> Result<()> {
        self.enter(Call::DaqTriggerMultiple(mask))?;
        self.mask("DAQtriggerMultiple", mask)
    }

    fn daq_flush_multiple(&mut self, mask: u32) -> Result<()> {
        self.enter(Call::DaqFlushMultiple(mask))?;
        self.mask("DAQflushMultiple", mask)?;
        let n = self.channels.len();
        for (i, ch) in self.channels.iter_mut().enumerate() {
            if u64::from(mask) & (1 << (n - 1 - i)) != 0 {
                ch.buffer.clear();
            }
        }
        Ok(())
    }

    fn trigger_io_config(&mut self, direction: i32) -> Result<()> {
        self.enter(Call::TriggerIoConfig(direction))?;
        self.trigger_direction = direction;
        Ok(())
    }

    fn trigger_io_write(&mut self, value: i32) -> Result<()> {
        self.enter(Call::TriggerIoWrite(value))?;
        self.trigger_io = value;
        Ok(())
    }

    fn trigger_io_read(&mut self) -> Result<i32> {
        self.enter(Call::TriggerIoRead)?;
        Ok(self.trigger_io)
    }

    fn clock_set_frequency(&mut self, frequency: f64) -> Result<f64> {
        self.enter(Call::ClockSetFrequency(frequency))?;
        self.clock = frequency;
        Ok(frequency)
    }

    fn clock_get_frequency(&mut self) -> Result<f64> {
        self.enter(Call::ClockGetFrequency)?;
        Ok(self.clock)
    }

    fn clock_get_sync_frequency(&mut self) -> Result<i32> {
        self.enter(Call::ClockGetSyncFrequency)?;
        Ok(self.sync_clock)
    }

    fn clock_reset_phase(&mut self, behaviour: i32, source: i32, skew: f64) -> Result<()> {
        self.enter(Call::ClockResetPhase {
            behaviour,
            source,
            skew,
        })
    }
}

/// Run state of a simulated HVI sequencer
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HviState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// A simulated HVI sequencer
#[derive(Debug)]
pub struct MockHvi {
    assign_status: i32,
    file: Option<PathBuf>,
    compiled: bool,
    loaded: bool,
    state: HviState,
    modules: Vec<String>,
    compile_errors: Vec<String>,
    int_constants: HashMap<(String, String), i32>,
    double_constants: HashMap<(String, String), f64>,
    calls: Vec<&'static str>,
}

impl MockHvi {
    /// Construct a simulated sequencer controlling `modules`
    #[must_use]
    pub fn new<S: Into<String>>(modules: impl IntoIterator<Item = S>) -> Self {
        Self {
            assign_status: 1,
            file: None,
            compiled: false,
            loaded: false,
            state: HviState::Idle,
            modules: modules.into_iter().map(Into::into).collect(),
            compile_errors: vec![],
            int_constants: HashMap::new(),
            double_constants: HashMap::new(),
            calls: vec![],
        }
    }

    /// Make `assignHardwareWithIndexAndSlot` return `status`
    #[must_use]
    pub fn with_assign_status(mut self, status: i32) -> Self {
        self.assign_status = status;
        self
    }

    /// Make the next compilation report `errors`
    #[must_use]
    pub fn with_compile_errors<S: Into<String>>(
        mut self,
        errors: impl IntoIterator<Item = S>,
    ) -> Self {
        self.compile_errors = errors.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn state(&self) -> HviState {
        self.state
    }

    #[must_use]
    pub fn calls(&self) -> &[&'static str] {
        &self.calls
    }

    fn require_open(&self, call: &'static str) -> Result<()> {
        if self.file.is_none() {
            check(call, ErrorCode::HviNotOpened as i32)?;
        }
        Ok(())
    }

    fn require_loaded(&self, call: &'static str) -> Result<()> {
        self.require_open(call)?;
        if !self.loaded {
            check(call, ErrorCode::NotValidParameters as i32)?;
        }
        Ok(())
    }

    fn require_module(&self, call: &'static str, module: &str) -> Result<()> {
        if !self.modules.iter().any(|m| m == module) {
            check(call, ErrorCode::InvalidModuleUserName as i32)?;
        }
        Ok(())
    }
}

impl Hvi for MockHvi {
    fn assign_hardware_with_index_and_slot(&mut self, _index: i32, _slot: Slot) -> Result<i32> {
        self.calls.push("assignHardwareWithIndexAndSlot");
        check("assignHardwareWithIndexAndSlot", self.assign_status)
    }

    fn is_open(&mut self) -> Result<bool> {
        self.calls.push("isOpen");
        Ok(self.file.is_some())
    }

    fn open(&mut self, file: &Path) -> Result<()> {
        self.calls.push("open");
        self.file = Some(file.to_path_buf());
        self.compiled = false;
        self.loaded = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.calls.push("close");
        self.require_open("close")?;
        self.file = None;
        self.state = HviState::Idle;
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.calls.push("start");
        self.require_loaded("start")?;
        self.state = HviState::Running;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.calls.push("pause");
        self.require_loaded("pause")?;
        self.state = HviState::Paused;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.calls.push("resume");
        self.require_loaded("resume")?;
        self.state = HviState::Running;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.calls.push("stop");
        self.require_loaded("stop")?;
        self.state = HviState::Stopped;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.calls.push("reset");
        self.require_loaded("reset")?;
        self.state = HviState::Idle;
        Ok(())
    }

    fn compile(&mut self) -> Result<usize> {
        self.calls.push("compile");
        self.require_open("compile")?;
        self.compiled = self.compile_errors.is_empty();
        Ok(self.compile_errors.len())
    }

    fn compilation_error_message(&mut self, index: usize) -> Result<String> {
        self.calls.push("compilationErrorMessage");
        match self.compile_errors.get(index) {
            Some(msg) => Ok(msg.clone()),
            None => check("compilationErrorMessage", ErrorCode::InvalidValue as i32)
                .map(|_| String::new()),
        }
    }

    fn load(&mut self) -> Result<()> {
        self.calls.push("load");
        self.require_open("load")?;
        if !self.compiled {
            check("load", ErrorCode::NotValidParameters as i32)?;
        }
        self.loaded = true;
        Ok(())
    }

    fn number_of_modules(&mut self) -> Result<usize> {
        self.calls.push("getNumberOfModules");
        Ok(self.modules.len())
    }

    fn module_name(&mut self, index: usize) -> Result<String> {
        self.calls.push("getModuleName");
        match self.modules.get(index) {
            Some(name) => Ok(name.clone()),
            None => check("getModuleName", ErrorCode::InvalidModuleId as i32)
                .map(|_| String::new()),
        }
    }

    fn module_index(&mut self, name: &str) -> Result<usize> {
        self.calls.push("getModuleIndex");
        self.require_module("getModuleIndex", name)?;
        Ok(self.modules.iter().position(|m| m == name).unwrap_or_default())
    }

    fn write_integer_constant(&mut self, module: &str, constant: &str, value: i32) -> Result<()> {
        self.calls.push("writeIntegerConstantWithUserName");
        self.require_module("writeIntegerConstantWithUserName", module)?;
        self.int_constants
            .insert((module.to_owned(), constant.to_owned()), value);
        Ok(())
    }

    fn read_integer_constant(&mut self, module: &str, constant: &str) -> Result<i32> {
        self.calls.push("readIntegerConstantWithUserName");
        self.require_module("readIntegerConstantWithUserName", module)?;
        match self
            .int_constants
            .get(&(module.to_owned(), constant.to_owned()))
        {
            Some(v) => Ok(*v),
            None => check(
                "readIntegerConstantWithUserName",
                ErrorCode::NotValidParameters as i32,
            ),
        }
    }

    fn write_double_constant(
        &mut self,
        module: &str,
        constant: &str,
        value: f64,
        _unit: &str,
    ) -> Result<()> {
        self.calls.push("writeDoubleConstantWithUserName");
        self.require_module("writeDoubleConstantWithUserName", module)?;
        self.double_constants
            .insert((module.to_owned(), constant.to_owned()), value);
        Ok(())
    }

    fn read_double_constant(&mut self, module: &str, constant: &str) -> Result<f64> {
        self.calls.push("readDoubleConstantWithUserName");
        self.require_module("readDoubleConstantWithUserName", module)?;
        match self
            .double_constants
            .get(&(module.to_owned(), constant.to_owned()))
        {
            Some(v) => Ok(*v),
            None => check(
                "readDoubleConstantWithUserName",
                ErrorCode::NotValidParameters as i32,
            )
            .map(f64::from),
        }
    }
}
