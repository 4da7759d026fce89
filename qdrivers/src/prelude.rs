//! Prelude (helpful reexports) for this package

pub use crate::{
    config::{
        ChannelConfig,
        DigitizerConfig,
    },
    digitizer::{
        AcquisitionMode,
        CancelToken,
        ChannelSelection,
        Digitizer,
        ReadPolicy,
        Trace,
        TraceData,
        TriggerDirection,
    },
    error::{
        Error,
        Result,
    },
    hvi::Sequencer,
    spirack::{
        ClockSource,
        S5kModule,
        WaveformMode,
        S5k,
    },
};
pub use sd1::{
    Ain,
    Hvi,
    Slot,
};
