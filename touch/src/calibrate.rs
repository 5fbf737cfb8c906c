//! No-touch baseline capture.

use heapless::Vec;

use crate::correlate::{cross_correlate, CorrelationVector};
use crate::cycle::{run_cycle, DriveSchedule};
use crate::error::{Error, SenseError};
use crate::prbs::BitSequence;
use crate::{AnalogSampler, DriveLineOutput, SenseConfig};

/// The uncorrected correlation of every channel with nothing touching the panel
#[derive(Clone, Debug, PartialEq)]
pub struct BaselineSet<const N: usize, const CH: usize> {
    channels: [CorrelationVector<N>; CH],
}

impl<const N: usize, const CH: usize> BaselineSet<N, CH> {
    pub fn get(&self, channel: usize) -> Result<&CorrelationVector<N>, Error> {
        self.channels
            .get(channel)
            .ok_or(Error::ChannelOutOfRange(channel))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CorrelationVector<N>> {
        self.channels.iter()
    }
}

/// Capture a baseline for all `CH` channels.
///
/// Each channel's baseline is the mean of `config.calibration_passes` cycles.
/// The set is built from scratch and returned only when every channel
/// succeeded, so a failed calibration never yields a partial baseline.
pub fn calibrate<D, S, const N: usize, const CH: usize, const LINES: usize>(
    reference: &BitSequence<N>,
    schedule: &DriveSchedule<LINES>,
    config: &SenseConfig,
    drive: &mut D,
    sampler: &mut S,
) -> Result<BaselineSet<N, CH>, SenseError<D::Error, S::Error>>
where
    D: DriveLineOutput,
    S: AnalogSampler,
{
    let passes = config.calibration_passes.max(1);
    let n = reference.len();
    let mut channels: [CorrelationVector<N>; CH] = core::array::from_fn(|_| Vec::new());

    for (channel, baseline) in channels.iter_mut().enumerate() {
        baseline.resize(n, 0.0).map_err(|_| Error::Capacity {
            required: n,
            capacity: N,
        })?;

        for _ in 0..passes {
            let sample = run_cycle(channel, reference, schedule, config, drive, sampler)?;
            let xcorr = cross_correlate(&sample, reference)?;
            for (b, x) in baseline.iter_mut().zip(xcorr.iter()) {
                *b += x;
            }
        }

        for b in baseline.iter_mut() {
            *b /= passes as f32;
        }
    }

    Ok(BaselineSet { channels })
}
