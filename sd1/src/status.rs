//! Status codes returned by the SD1 library

use num_derive::{
    FromPrimitive,
    ToPrimitive,
};

#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum ErrorCode {
    #[error("Error opening module")]
    OpeningModule = -8000,
    #[error("Error closing module")]
    ClosingModule = -8001,
    #[error("Error opening HVI")]
    OpeningHvi = -8002,
    #[error("Error closing HVI")]
    ClosingHvi = -8003,
    #[error("Module not opened")]
    ModuleNotOpened = -8004,
    #[error("Module not opened by user")]
    ModuleNotOpenedByUser = -8005,
    #[error("Module already opened")]
    ModuleAlreadyOpened = -8006,
    #[error("HVI not opened")]
    HviNotOpened = -8007,
    #[error("Invalid object ID")]
    InvalidObjectId = -8008,
    #[error("Invalid module ID")]
    InvalidModuleId = -8009,
    #[error("Invalid module user name")]
    InvalidModuleUserName = -8010,
    #[error("Invalid HVI ID")]
    InvalidHviId = -8011,
    #[error("Invalid object")]
    InvalidObject = -8012,
    #[error("Invalid channel number")]
    InvalidChannel = -8013,
    #[error("Bus doesn't exist")]
    BusDoesntExist = -8014,
    #[error("Any input assigned to the bitmap does not exist")]
    BitmapAssignedDoesntExist = -8015,
    #[error("Input size does not fit on this bus")]
    BusInvalidSize = -8016,
    #[error("Input data does not fit on this bus")]
    BusInvalidData = -8017,
    #[error("Invalid value")]
    InvalidValue = -8018,
    #[error("Error creating waveform")]
    CreatingWave = -8019,
    #[error("Invalid parameters")]
    NotValidParameters = -8020,
    #[error("AWG function failed")]
    AwgFunctionFailed = -8021,
    #[error("Invalid DAQ functionality")]
    IllegalDaqFunctionality = -8022,
    #[error("DAQ buffer pointer is not valid")]
    IllegalPointer = -8023,
}
