//! Errors returned by the instrument drivers

use sd1::Slot;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid data mode {0}, expected 0 (raw), 1 (cycle average) or 2 (total average)")]
    InvalidMode(i32),
    #[error("No channels selected, select some with `meas_channel` first")]
    NoChannelsSelected,
    #[error("Channel {channel} doesn't exist, valid channels are 1..={channels}")]
    ChannelOutOfRange { channel: u8, channels: u8 },
    #[error("{value} is not a valid {parameter}, expected {expected}")]
    OutOfRange {
        parameter: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error(
        "Channel {channel} is configured for {n_cycles} cycles of {points_per_cycle} points, both \
         must be at least 1"
    )]
    InvalidShape {
        channel: u8,
        n_cycles: u32,
        points_per_cycle: u32,
    },
    #[error("No module found at {0}")]
    NotFound(Slot),
    #[error("Could not open module at {slot}, error code {code}")]
    Open { slot: Slot, code: i32 },
    #[error(
        "Acquisition on channel {channel} timed out after {timeout:?} with {collected} of \
         {expected} samples"
    )]
    AcquisitionTimeout {
        channel: u8,
        timeout: Duration,
        collected: usize,
        expected: usize,
    },
    #[error(
        "Acquisition on channel {channel} was cancelled with {collected} of {expected} samples"
    )]
    Cancelled {
        channel: u8,
        collected: usize,
        expected: usize,
    },
    #[error("{0} is not supported by this driver")]
    Unsupported(&'static str),
    #[error("The instrument owning this channel was dropped")]
    Orphaned,
    #[error("The instrument handle lock was poisoned")]
    Poisoned,
    #[error(transparent)]
    Sdk(#[from] sd1::Error),
    #[error("Malformed configuration")]
    Config(#[from] toml::de::Error),
    #[error("File IO error")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn out_of_range(
        parameter: &'static str,
        value: impl ToString,
        expected: &'static str,
    ) -> Self {
        Error::OutOfRange {
            parameter,
            value: value.to_string(),
            expected,
        }
    }

    /// Whether this error was raised by validation, before any hardware was touched
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidMode(_)
                | Error::NoChannelsSelected
                | Error::ChannelOutOfRange { .. }
                | Error::OutOfRange { .. }
                | Error::InvalidShape { .. }
        )
    }
}
