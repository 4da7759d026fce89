//! A typed interface to the Keysight SD1 module API.
//!
//! The vendor library is a closed, hardware-bound shared object. Everything here is expressed as
//! the [`Ain`] (digitizer) and [`Hvi`] (sequencer) traits, so drivers can be written against the
//! trait and run against either a real binding or the simulated modules in [`mock`].
//!
//! Every SD1 call reports failure the same way: a negative status code. [`check`] turns those
//! codes into [`Error`]s.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ain;
pub mod hvi;
pub mod mock;
pub mod status;

pub use ain::Ain;
pub use hvi::Hvi;
pub use status::ErrorCode;

use num_traits::FromPrimitive;
use std::fmt::Display;

/// Errors that can be returned from SD1 calls
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{call} failed with status {code} ({})", describe(*.kind))]
    Vendor {
        /// The vendor function that reported the failure
        call: &'static str,
        /// The raw status code
        code: i32,
        /// The decoded status, if it is one we know about
        kind: Option<ErrorCode>,
    },
    #[error("No module was found at {0}")]
    NoModule(Slot),
}

pub type Result<T> = std::result::Result<T, Error>;

fn describe(kind: Option<ErrorCode>) -> String {
    kind.map_or_else(|| "unknown error".to_owned(), |k| k.to_string())
}

impl Error {
    /// The raw vendor status code, if this error came from one
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Vendor { code, .. } => Some(*code),
            Error::NoModule(_) => None,
        }
    }
}

/// The chassis and slot a PXI module lives in
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    pub chassis: u8,
    pub slot: u8,
}

impl Slot {
    #[must_use]
    pub fn new(chassis: u8, slot: u8) -> Self {
        Self { chassis, slot }
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chassis {}, slot {}", self.chassis, self.slot)
    }
}

/// Interpret the integer status returned by the SD1 function `call`.
/// Non-negative values are results and are passed through.
/// # Errors
/// Returns [`Error::Vendor`] for negative status codes
pub fn check(call: &'static str, code: i32) -> Result<i32> {
    if code < 0 {
        tracing::debug!(call, code, "SD1 call failed");
        Err(Error::Vendor {
            call,
            code,
            kind: ErrorCode::from_i32(code),
        })
    } else {
        Ok(code)
    }
}

/// Same as [`check`], for SD1 functions that return a double (negative on failure)
/// # Errors
/// Returns [`Error::Vendor`] for negative values
#[allow(clippy::cast_possible_truncation)]
pub fn check_f64(call: &'static str, value: f64) -> Result<f64> {
    if value < 0.0 {
        check(call, value.round() as i32).map(f64::from)
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_passthrough() {
        assert_eq!(check("DAQcounterRead", 0).unwrap(), 0);
        assert_eq!(check("DAQcounterRead", 1024).unwrap(), 1024);
    }

    #[test]
    fn test_check_known_code() {
        let err = check("openWithSlot", -8000).unwrap_err();
        assert_eq!(
            err,
            Error::Vendor {
                call: "openWithSlot",
                code: -8000,
                kind: Some(ErrorCode::OpeningModule),
            }
        );
        assert_eq!(err.code(), Some(-8000));
        assert!(err.to_string().contains("openWithSlot"));
    }

    #[test]
    fn test_check_unknown_code() {
        let err = check("DAQread", -1).unwrap_err();
        assert!(err.to_string().contains("unknown error"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(None), "unknown error");
        assert_eq!(
            describe(Some(ErrorCode::OpeningModule)),
            ErrorCode::OpeningModule.to_string()
        );
    }

    #[test]
    fn test_check_f64() {
        assert!((check_f64("channelFullScale", 2.5).unwrap() - 2.5).abs() < f64::EPSILON);
        let err = check_f64("channelFullScale", -8013.0).unwrap_err();
        assert_eq!(err.code(), Some(-8013));
    }

    #[test]
    fn test_slot_display() {
        assert_eq!(Slot::new(1, 6).to_string(), "chassis 1, slot 6");
    }
}
