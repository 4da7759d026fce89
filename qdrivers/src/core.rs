//! The core types and functions shared by every driver
use crate::error::{
    Error,
    Result,
};
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    Weak,
};

/// Where the value returned by a parameter's get comes from
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Read back from the instrument on every get
    Hardware,
    /// Held by the driver. Sets are forwarded to the instrument, gets never touch it.
    Memory,
}

/// Which operations a parameter supports
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Get,
    Set,
    GetSet,
}

impl Access {
    #[must_use]
    pub fn gettable(self) -> bool {
        matches!(self, Access::Get | Access::GetSet)
    }

    #[must_use]
    pub fn settable(self) -> bool {
        matches!(self, Access::Set | Access::GetSet)
    }
}

/// Static description of one driver parameter, for discovery by a measurement framework
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub origin: Origin,
    pub access: Access,
    pub doc: &'static str,
}

/// Look up a parameter by name in a driver's parameter table
#[must_use]
pub fn find_parameter<'a>(table: &'a [ParameterInfo], name: &str) -> Option<&'a ParameterInfo> {
    table.iter().find(|p| p.name == name)
}

/// Build a [`ParameterInfo`] table entry
macro_rules! param {
    ($name:literal, $label:literal, $unit:literal, $origin:ident, $access:ident, $doc:literal) => {
        $crate::core::ParameterInfo {
            name: $name,
            label: $label,
            unit: $unit,
            origin: $crate::core::Origin::$origin,
            access: $crate::core::Access::$access,
            doc: $doc,
        }
    };
}

pub(crate) use param;

/// Lock the shared SDK handle of an instrument
pub(crate) fn lock<T>(sdk: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    sdk.lock().map_err(|_| Error::Poisoned)
}

/// Grab the parent instrument's SDK handle from a child
pub(crate) fn upgrade<T>(sdk: &Weak<Mutex<T>>) -> Result<Arc<Mutex<T>>> {
    sdk.upgrade().ok_or(Error::Orphaned)
}

/// Make sure `channel` is a valid 1-based index on an instrument with `channels` channels
pub(crate) fn check_channel(channel: u8, channels: u8) -> Result<u8> {
    if channel == 0 || channel > channels {
        Err(Error::ChannelOutOfRange { channel, channels })
    } else {
        Ok(channel)
    }
}
