//! Buffered acquisition: draining the per-channel DAQ buffers, scaling raw ADC words to millivolts
//! and reducing the result according to the selected [`AcquisitionMode`].

use crate::{
    core::check_channel,
    error::{
        Error,
        Result,
    },
};
use ndarray::{
    Array1,
    Array2,
    Axis,
};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use sd1::{
    ain::WAIT_FOREVER,
    Ain,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    sync::{
        atomic::{
            AtomicBool,
            Ordering,
        },
        Arc,
    },
    time::{
        Duration,
        Instant,
    },
};
use tracing::{
    debug,
    trace,
};

/// Magnitude of the most negative signed 16 bit ADC word, i.e. relative full scale
pub const ADC_FULL_SCALE: f64 = 32768.0;

/// How the samples of one acquisition are reduced before being handed back
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Default, Hash, FromPrimitive, Serialize, Deserialize,
)]
#[serde(try_from = "i32", into = "i32")]
pub enum AcquisitionMode {
    /// The full `n_cycles x points_per_cycle` matrix
    #[default]
    Raw = 0,
    /// Average over cycles, one value per point in the cycle
    CycleAverage = 1,
    /// Average over everything, a single value
    TotalAverage = 2,
}

impl TryFrom<i32> for AcquisitionMode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        Self::from_i32(value).ok_or(Error::InvalidMode(value))
    }
}

impl From<AcquisitionMode> for i32 {
    fn from(mode: AcquisitionMode) -> Self {
        mode as i32
    }
}

impl AcquisitionMode {
    /// The shape of the data this mode produces for an acquisition of `shape`
    #[must_use]
    pub fn output_shape(self, shape: Shape) -> Vec<usize> {
        match self {
            AcquisitionMode::Raw => vec![shape.n_cycles, shape.points_per_cycle],
            AcquisitionMode::CycleAverage => vec![shape.points_per_cycle],
            AcquisitionMode::TotalAverage => vec![],
        }
    }
}

/// The number of trigger cycles and points per cycle of one channel's acquisition
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Shape {
    pub n_cycles: usize,
    pub points_per_cycle: usize,
}

impl Shape {
    /// Number of samples the acquisition has to collect
    #[must_use]
    pub fn total(self) -> usize {
        self.n_cycles * self.points_per_cycle
    }
}

/// Bitmask selecting several DAQs for the `*_multiple` calls.
///
/// Channel `c` of an `n` channel card sets bit `n - c`, so the highest channel is the least
/// significant bit. On a 4 channel card `{1, 3}` is `0b1010`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ChannelMask(u32);

impl ChannelMask {
    /// Widest card a mask can address
    pub const MAX_CHANNELS: u8 = 32;

    /// Build the mask for `channels` on a card with `width` channels
    /// # Errors
    /// Returns an error if any channel is outside `1..=width` or the card is too wide
    pub fn new(channels: &[u8], width: u8) -> Result<Self> {
        if width == 0 || width > Self::MAX_CHANNELS {
            return Err(Error::out_of_range("channel count", width, "1..=32"));
        }
        let mut bits = 0u32;
        for &channel in channels {
            check_channel(channel, width)?;
            bits |= 1 << (width - channel);
        }
        Ok(Self(bits))
    }

    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Binary for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}

/// A flag another thread can raise to abort a running acquisition
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Bounds on how long a buffer drain may take. The default has neither a deadline nor a cancel
/// token, so a buffer that never fills blocks forever.
#[derive(Debug, Clone, Default)]
pub struct ReadPolicy {
    /// Give up on a channel after this long
    pub timeout: Option<Duration>,
    /// Give up as soon as this is cancelled
    pub cancel: Option<CancelToken>,
}

impl ReadPolicy {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Reduced acquisition data, in millivolts
#[derive(Debug, Clone, PartialEq)]
pub enum TraceData {
    Raw(Array2<f64>),
    CycleAverage(Array1<f64>),
    TotalAverage(f64),
}

impl TraceData {
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        match self {
            TraceData::Raw(a) => a.shape().to_vec(),
            TraceData::CycleAverage(a) => a.shape().to_vec(),
            TraceData::TotalAverage(_) => vec![],
        }
    }

    #[must_use]
    pub fn mode(&self) -> AcquisitionMode {
        match self {
            TraceData::Raw(_) => AcquisitionMode::Raw,
            TraceData::CycleAverage(_) => AcquisitionMode::CycleAverage,
            TraceData::TotalAverage(_) => AcquisitionMode::TotalAverage,
        }
    }
}

/// One channel's result of a measurement
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// `<measurement>_ch<channel>`
    pub name: String,
    pub channel: u8,
    pub label: &'static str,
    pub unit: &'static str,
    pub data: TraceData,
}

/// Convert a raw ADC word to millivolts for an input range of `full_scale` volts
#[must_use]
pub fn to_millivolts(raw: i32, full_scale: f64) -> f64 {
    f64::from(raw) / ADC_FULL_SCALE * (full_scale * 1000.0)
}

/// Poll the DAQ buffer of `channel` until exactly `total` samples have been collected.
///
/// Empty polls are retried immediately. Every read asks for at most what is available and
/// what is still missing, and the cursor advances by what the hardware actually returned.
/// # Errors
/// Returns an error on SDK failures, when the policy's deadline passes or when it is cancelled
pub fn drain<T>(sdk: &mut T, channel: u8, total: usize, policy: &ReadPolicy) -> Result<Vec<i16>>
where
    T: Ain + ?Sized,
{
    let mut raw = vec![0i16; total];
    let mut filled = 0usize;
    let started = Instant::now();
    while filled < total {
        if let Some(token) = &policy.cancel {
            if token.is_cancelled() {
                return Err(Error::Cancelled {
                    channel,
                    collected: filled,
                    expected: total,
                });
            }
        }
        if let Some(timeout) = policy.timeout {
            if started.elapsed() >= timeout {
                return Err(Error::AcquisitionTimeout {
                    channel,
                    timeout,
                    collected: filled,
                    expected: total,
                });
            }
        }
        let available = sdk.daq_counter_read(channel)?;
        if available == 0 {
            std::hint::spin_loop();
            continue;
        }
        let want = available.min(total - filled);
        let got = sdk
            .daq_read(channel, &mut raw[filled..filled + want], WAIT_FOREVER)?
            .min(want);
        trace!(channel, available, got, filled, total, "Drained DAQ chunk");
        filled += got;
    }
    Ok(raw)
}

/// Scale raw ADC words to millivolts
#[must_use]
pub fn scale(raw: &[i16], full_scale: f64) -> Vec<f64> {
    raw.iter()
        .map(|&x| to_millivolts(x.into(), full_scale))
        .collect()
}

/// Reshape a flat, row-major buffer into `shape` and reduce it according to `mode`
/// # Errors
/// Returns an error if the number of samples doesn't match the shape
pub fn reduce(samples: Vec<f64>, shape: Shape, mode: AcquisitionMode) -> Result<TraceData> {
    let n = samples.len();
    let matrix = Array2::from_shape_vec((shape.n_cycles, shape.points_per_cycle), samples)
        .map_err(|_| Error::out_of_range("sample count", n, "n_cycles * points_per_cycle"))?;
    let empty = || Error::out_of_range("sample count", n, "at least one sample");
    Ok(match mode {
        AcquisitionMode::Raw => TraceData::Raw(matrix),
        AcquisitionMode::CycleAverage => {
            TraceData::CycleAverage(matrix.mean_axis(Axis(0)).ok_or_else(empty)?)
        }
        AcquisitionMode::TotalAverage => TraceData::TotalAverage(matrix.mean().ok_or_else(empty)?),
    })
}

/// Acquire, scale and reduce one channel
/// # Errors
/// Returns an error on SDK failures or when the read policy gives up
pub fn read_channel<T>(
    sdk: &mut T,
    channel: u8,
    shape: Shape,
    full_scale: f64,
    mode: AcquisitionMode,
    policy: &ReadPolicy,
) -> Result<TraceData>
where
    T: Ain + ?Sized,
{
    debug!(channel, ?shape, full_scale, ?mode, "Reading channel");
    let raw = drain(sdk, channel, shape.total(), policy)?;
    reduce(scale(&raw, full_scale), shape, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use paste::paste;
    use sd1::mock::{
        Call,
        MockAin,
    };

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_conversion_extremes() {
        assert!(close(to_millivolts(32768, 1.0), 1000.0));
        assert!(close(to_millivolts(-32768, 1.0), -1000.0));
        assert!(close(to_millivolts(0, 1.0), 0.0));
        assert!(close(to_millivolts(16384, 2.0), 1000.0));
    }

    #[test]
    fn test_mode_from_int() {
        assert_eq!(AcquisitionMode::try_from(0).unwrap(), AcquisitionMode::Raw);
        assert_eq!(
            AcquisitionMode::try_from(1).unwrap(),
            AcquisitionMode::CycleAverage
        );
        assert_eq!(
            AcquisitionMode::try_from(2).unwrap(),
            AcquisitionMode::TotalAverage
        );
        assert!(matches!(
            AcquisitionMode::try_from(3),
            Err(Error::InvalidMode(3))
        ));
        assert!(matches!(
            AcquisitionMode::try_from(-1),
            Err(Error::InvalidMode(-1))
        ));
    }

    #[test]
    fn test_output_shape() {
        let shape = Shape {
            n_cycles: 3,
            points_per_cycle: 5,
        };
        assert_eq!(AcquisitionMode::Raw.output_shape(shape), [3, 5]);
        assert_eq!(AcquisitionMode::CycleAverage.output_shape(shape), [5]);
        assert!(AcquisitionMode::TotalAverage.output_shape(shape).is_empty());
    }

    #[test]
    fn test_mask_four_channels() {
        assert_eq!(ChannelMask::new(&[1, 3], 4).unwrap().bits(), 0b1010);
        assert_eq!(ChannelMask::new(&[1], 4).unwrap().bits(), 0b1000);
        assert_eq!(ChannelMask::new(&[4], 4).unwrap().bits(), 0b0001);
        assert_eq!(ChannelMask::new(&[1, 2, 3, 4], 4).unwrap().bits(), 0b1111);
        assert_eq!(format!("{:#b}", ChannelMask::new(&[2], 4).unwrap()), "0b100");
    }

    #[test]
    fn test_mask_other_widths() {
        assert_eq!(ChannelMask::new(&[1, 8], 8).unwrap().bits(), 0b1000_0001);
        assert_eq!(ChannelMask::new(&[2], 2).unwrap().bits(), 0b1);
        assert!(ChannelMask::new(&[5], 4).is_err());
        assert!(ChannelMask::new(&[0], 4).is_err());
        assert!(ChannelMask::new(&[1], 33).is_err());
        assert!(ChannelMask::new(&[], 4).unwrap().is_empty());
    }

    macro_rules! test_chunking {
        ($name:ident, [$($chunk:expr),+]) => {
            paste! {
                #[test]
                fn [<test_drain_chunks_ $name>]() {
                    let expected: Vec<i16> = (0..10).map(|x| x * 100 - 400).collect();
                    let mut ain = MockAin::new(4);
                    let mut start = 0;
                    $(
                        ain.push_idle_polls(2, 1);
                        ain.push_samples(2, &expected[start..start + $chunk]);
                        start += $chunk;
                    )+
                    assert_eq!(start, expected.len());
                    let raw = drain(&mut ain, 2, expected.len(), &ReadPolicy::default()).unwrap();
                    assert_eq!(raw, expected);
                    assert_eq!(ain.pending(2), 0);
                }
            }
        };
    }

    test_chunking!(single, [10]);
    test_chunking!(three_five_two, [3, 5, 2]);
    test_chunking!(ones, [1, 1, 1, 1, 1, 1, 1, 1, 1, 1]);
    test_chunking!(uneven, [7, 3]);

    #[test]
    fn test_drain_short_reads() {
        let expected: Vec<i16> = (1..=8).collect();
        let mut ain = MockAin::new(1).with_max_transfer(3);
        ain.push_samples(1, &expected);
        let raw = drain(&mut ain, 1, 8, &ReadPolicy::default()).unwrap();
        assert_eq!(raw, expected);
        let reads = ain
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::DaqRead { .. }))
            .count();
        assert_eq!(reads, 3);
    }

    #[test]
    fn test_drain_stops_at_quota() {
        let mut ain = MockAin::new(1);
        ain.push_samples(1, &[1, 2, 3, 4, 5, 6]);
        let raw = drain(&mut ain, 1, 4, &ReadPolicy::default()).unwrap();
        assert_eq!(raw, [1, 2, 3, 4]);
        assert_eq!(ain.pending(1), 2);
        assert!(ain.calls().contains(&Call::DaqRead {
            channel: 1,
            requested: 4,
            timeout_ms: WAIT_FOREVER,
        }));
    }

    #[test]
    fn test_drain_timeout() {
        let mut ain = MockAin::new(1);
        ain.push_samples(1, &[1, 2]);
        let policy = ReadPolicy::default().with_timeout(Duration::from_millis(20));
        let err = drain(&mut ain, 1, 4, &policy).unwrap_err();
        assert!(matches!(
            err,
            Error::AcquisitionTimeout {
                channel: 1,
                collected: 2,
                expected: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_drain_cancelled() {
        let mut ain = MockAin::new(1);
        let token = CancelToken::new();
        token.cancel();
        let policy = ReadPolicy::default().with_cancel(token);
        let err = drain(&mut ain, 1, 4, &policy).unwrap_err();
        assert!(matches!(
            err,
            Error::Cancelled {
                channel: 1,
                collected: 0,
                expected: 4
            }
        ));
    }

    #[test]
    fn test_cancel_from_other_thread() {
        let mut ain = MockAin::new(1);
        let token = CancelToken::new();
        let remote = token.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            remote.cancel();
        });
        let policy = ReadPolicy::default().with_cancel(token);
        assert!(matches!(
            drain(&mut ain, 1, 1, &policy),
            Err(Error::Cancelled { .. })
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_drain_propagates_sdk_errors() {
        let mut ain = MockAin::new(1);
        ain.fail("DAQcounterRead", -8022);
        assert!(matches!(
            drain(&mut ain, 1, 4, &ReadPolicy::default()),
            Err(Error::Sdk(_))
        ));
    }

    #[test]
    fn test_raw_preserves_order() {
        let shape = Shape {
            n_cycles: 2,
            points_per_cycle: 3,
        };
        let samples: Vec<f64> = (0..6u8).map(f64::from).collect();
        let TraceData::Raw(m) = reduce(samples.clone(), shape, AcquisitionMode::Raw).unwrap() else {
            panic!("Wrong mode");
        };
        assert_eq!(m.shape(), [2, 3]);
        assert_eq!(m.iter().copied().collect::<Vec<_>>(), samples);
        assert!(close(m[[1, 0]], 3.0));
    }

    #[test]
    fn test_cycle_average_is_column_mean() {
        let shape = Shape {
            n_cycles: 3,
            points_per_cycle: 2,
        };
        let samples = vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0];
        let TraceData::CycleAverage(v) =
            reduce(samples, shape, AcquisitionMode::CycleAverage).unwrap()
        else {
            panic!("Wrong mode");
        };
        assert_eq!(v.len(), 2);
        assert!(close(v[0], 2.0));
        assert!(close(v[1], 20.0));
    }

    #[test]
    fn test_total_average() {
        let shape = Shape {
            n_cycles: 2,
            points_per_cycle: 2,
        };
        let data = reduce(vec![1.0, 2.0, 3.0, 6.0], shape, AcquisitionMode::TotalAverage).unwrap();
        assert_eq!(data.shape(), Vec::<usize>::new());
        let TraceData::TotalAverage(x) = data else {
            panic!("Wrong mode");
        };
        assert!(close(x, 3.0));
    }

    #[test]
    fn test_reduce_rejects_mismatch() {
        let shape = Shape {
            n_cycles: 2,
            points_per_cycle: 2,
        };
        assert!(reduce(vec![1.0; 3], shape, AcquisitionMode::Raw).is_err());
    }

    #[test]
    fn test_read_channel() {
        let mut ain = MockAin::new(4);
        ain.push_samples(3, &[-32768, 32767]);
        let shape = Shape {
            n_cycles: 1,
            points_per_cycle: 2,
        };
        let data = read_channel(
            &mut ain,
            3,
            shape,
            1.0,
            AcquisitionMode::CycleAverage,
            &ReadPolicy::default(),
        )
        .unwrap();
        let TraceData::CycleAverage(v) = data else {
            panic!("Wrong mode");
        };
        assert!(close(v[0], -1000.0));
        assert!((v[1] - 999.969_482).abs() < 1e-5);
    }
}
