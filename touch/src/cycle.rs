//! One measurement period on one sense channel.
//!
//! Each clock tick sets every drive line to its rotated copy of the reference
//! sequence, then takes a single sample. The drive-then-sample order within a
//! tick, and the order of ticks, is what keeps the sampled signal aligned with
//! the reference for correlation.

use heapless::Vec;

use crate::correlate::{cross_correlate, CorrelationVector};
use crate::error::{Error, SenseError};
use crate::prbs::BitSequence;
use crate::{AnalogSampler, DriveLineOutput, SenseConfig};

/// Voltage samples for one channel, one per clock tick
pub type ChannelSample<const N: usize> = Vec<f32, N>;

/// Evenly spaced rotations of the reference sequence, one per drive line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriveSchedule<const LINES: usize> {
    offsets: [usize; LINES],
    period: usize,
}

impl<const LINES: usize> DriveSchedule<LINES> {
    /// Spread `LINES` rotations over a sequence of `period` chips.
    ///
    /// Spacing is `period / LINES`, rounded down, and must be at least one chip.
    pub fn new(period: usize) -> Result<Self, Error> {
        if LINES == 0 {
            return Err(Error::NoDriveLines);
        }
        if LINES > period {
            return Err(Error::TooManyLines {
                lines: LINES,
                period,
            });
        }

        let spacing = period / LINES;
        let mut offsets = [0; LINES];
        for (line, offset) in offsets.iter_mut().enumerate() {
            *offset = line * spacing;
        }

        Ok(Self { offsets, period })
    }

    pub fn spacing(&self) -> usize {
        self.period / LINES
    }

    /// How far ahead in the sequence `line` runs
    pub fn offset(&self, line: usize) -> usize {
        self.offsets[line]
    }

    /// Correlation index at which the response to `line` peaks.
    ///
    /// Line `l` emits `reference[t + offset]`, which lines up with
    /// `reference[t - shift]` when `shift = -offset mod N`.
    pub fn peak_index(&self, line: usize) -> usize {
        (self.period - self.offsets[line] % self.period) % self.period
    }

    pub fn peak_indices(&self) -> [usize; LINES] {
        let mut indices = [0; LINES];
        for (line, index) in indices.iter_mut().enumerate() {
            *index = self.peak_index(line);
        }
        indices
    }
}

/// Convert a raw converter code to volts
#[inline]
pub fn to_volts(raw: i32, vref: f32, full_scale_code: i32) -> f32 {
    raw as f32 * vref / full_scale_code as f32
}

/// Drive one full sequence period while sampling `channel`
pub fn run_cycle<D, S, const N: usize, const LINES: usize>(
    channel: usize,
    reference: &BitSequence<N>,
    schedule: &DriveSchedule<LINES>,
    config: &SenseConfig,
    drive: &mut D,
    sampler: &mut S,
) -> Result<ChannelSample<N>, SenseError<D::Error, S::Error>>
where
    D: DriveLineOutput,
    S: AnalogSampler,
{
    if config.full_scale_code == 0 {
        return Err(Error::InvalidFullScale.into());
    }

    let n = reference.len();
    let mut samples = ChannelSample::new();
    samples.resize(n, 0.0).map_err(|_| Error::Capacity {
        required: n,
        capacity: N,
    })?;

    sampler.select_channel(channel).map_err(SenseError::Sample)?;

    for (t, sample) in samples.iter_mut().enumerate() {
        for line in 0..LINES {
            let high = reference.chip(t + schedule.offset(line)) > 0;
            drive.set(line, high).map_err(SenseError::Drive)?;
        }
        if config.settle_ticks > 0 {
            drive.settle(config.settle_ticks);
        }

        let raw = sampler.read(channel).map_err(SenseError::Sample)?;
        *sample = to_volts(raw, config.vref, config.full_scale_code);
    }

    Ok(samples)
}

/// Correlate a channel sample against the reference and remove the baseline
pub fn demodulate<const N: usize>(
    sample: &[f32],
    reference: &BitSequence<N>,
    baseline: &[f32],
) -> Result<CorrelationVector<N>, Error> {
    let mut xcorr = cross_correlate(sample, reference)?;
    if baseline.len() != xcorr.len() {
        return Err(Error::LengthMismatch {
            expected: xcorr.len(),
            found: baseline.len(),
        });
    }

    for (x, b) in xcorr.iter_mut().zip(baseline) {
        *x -= b;
    }
    Ok(xcorr)
}
