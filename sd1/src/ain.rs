//! The `SD_AIN` (analog input / digitizer) portion of the SD1 API

use crate::{
    Result,
    Slot,
};

/// Value to pass as a `timeout_ms` to wait until every requested point has been read
pub const WAIT_FOREVER: i32 = 0;

/// The set of SD1 digitizer calls a driver needs.
///
/// Channels are the 1-based input numbers printed on the front panel. Multi-channel calls take a
/// bitmask. Implementations are expected to run each call through [`crate::check`] so that vendor
/// status codes come back as errors.
pub trait Ain {
    /// Look up the product name of the module at `slot`
    fn product_name_by_slot(&mut self, slot: Slot) -> Result<String>;

    /// Open the module `product` at `slot`, returning the module ID
    fn open_with_slot(&mut self, product: &str, slot: Slot) -> Result<i32>;

    /// Release the module
    fn close(&mut self) -> Result<()>;

    /// Set full scale (V), impedance and coupling together
    fn channel_input_config(
        &mut self,
        channel: u8,
        full_scale: f64,
        impedance: i32,
        coupling: i32,
    ) -> Result<()>;

    /// Read back the full scale (V) of `channel`
    fn channel_full_scale(&mut self, channel: u8) -> Result<f64>;

    /// Read back the input impedance of `channel`
    fn channel_impedance(&mut self, channel: u8) -> Result<i32>;

    /// Read back the input coupling of `channel`
    fn channel_coupling(&mut self, channel: u8) -> Result<i32>;

    /// Set the sampling frequency prescaler of `channel`
    fn channel_prescaler_config(&mut self, channel: u8, prescaler: i32) -> Result<()>;

    /// Read back the sampling frequency prescaler of `channel`
    fn channel_prescaler(&mut self, channel: u8) -> Result<i32>;

    /// Configure the analog trigger block of `channel`
    fn channel_trigger_config(&mut self, channel: u8, mode: i32, threshold: f64) -> Result<()>;

    /// Configure the acquisition of `channel`
    fn daq_config(
        &mut self,
        channel: u8,
        points_per_cycle: i32,
        n_cycles: i32,
        trigger_delay: i32,
        trigger_mode: i32,
    ) -> Result<()>;

    /// Configure the digital hardware trigger of `channel`
    fn daq_digital_trigger_config(&mut self, channel: u8, source: i32, behaviour: i32)
        -> Result<()>;

    /// Configure which triggers (digital and analog) start the acquisition of `channel`
    fn daq_trigger_config(
        &mut self,
        channel: u8,
        digital_mode: i32,
        digital_source: i32,
        analog_mask: i32,
    ) -> Result<()>;

    /// Configure the external hardware trigger of `channel`
    fn daq_trigger_external_config(
        &mut self,
        channel: u8,
        source: i32,
        behaviour: i32,
    ) -> Result<()>;

    /// Number of acquired points waiting in the buffer of `channel`
    fn daq_counter_read(&mut self, channel: u8) -> Result<usize>;

    /// Read up to `buffer.len()` points from `channel` into `buffer`, returning how many were
    /// actually written. The hardware may return fewer than requested.
    fn daq_read(&mut self, channel: u8, buffer: &mut [i16], timeout_ms: i32) -> Result<usize>;

    fn daq_start(&mut self, channel: u8) -> Result<()>;
    fn daq_stop(&mut self, channel: u8) -> Result<()>;
    fn daq_trigger(&mut self, channel: u8) -> Result<()>;
    fn daq_flush(&mut self, channel: u8) -> Result<()>;

    fn daq_start_multiple(&mut self, mask: u32) -> Result<()>;
    fn daq_stop_multiple(&mut self, mask: u32) -> Result<()>;
    fn daq_trigger_multiple(&mut self, mask: u32) -> Result<()>;
    fn daq_flush_multiple(&mut self, mask: u32) -> Result<()>;

    /// Set the direction of the front panel trigger port
    fn trigger_io_config(&mut self, direction: i32) -> Result<()>;

    /// Drive the trigger port
    fn trigger_io_write(&mut self, value: i32) -> Result<()>;

    /// Sample the trigger port
    fn trigger_io_read(&mut self) -> Result<i32>;

    /// Set CLKsys, returning the frequency actually applied (Hz)
    fn clock_set_frequency(&mut self, frequency: f64) -> Result<f64>;

    /// Get CLKsys (Hz)
    fn clock_get_frequency(&mut self) -> Result<f64>;

    /// Get CLKsync (Hz)
    fn clock_get_sync_frequency(&mut self) -> Result<i32>;

    /// Reset the phase between CLKsync and CLKsys. `skew` is in multiples of 10 ns.
    fn clock_reset_phase(&mut self, behaviour: i32, source: i32, skew: f64) -> Result<()>;
}
