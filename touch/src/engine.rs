//! Owned sensing state and the per-frame pipeline.
//!
//! The engine owns the drive lines, the sampler, the cached reference
//! sequence and the baseline. Nothing outside sees a frame until it is
//! complete: `cycle` builds a fresh [`Frame`] and hands it over by value.

use heapless::Vec;

use crate::calibrate::{calibrate, BaselineSet};
use crate::correlate::CorrelationVector;
use crate::cycle::{demodulate, run_cycle, DriveSchedule};
use crate::error::{Error, SenseError};
use crate::localize::{localize, ResponseGrid, TouchEstimate};
use crate::noise::{NoiseProfiler, NoiseReport};
use crate::prbs::{generate, BitSequence};
use crate::{AnalogSampler, DriveLineOutput, SenseConfig};

/// Emitted when a baseline has been stored
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationEvent {
    /// First baseline since the engine was created
    Captured,
    /// A previous baseline was replaced
    Recalibrated,
}

/// Result of one full sensing cycle over all channels
#[derive(Clone, Debug, PartialEq)]
pub struct Frame<const N: usize, const CH: usize, const LINES: usize> {
    /// Baseline-subtracted correlation per channel
    pub corrected: [CorrelationVector<N>; CH],
    pub grid: ResponseGrid<CH, LINES>,
    /// `None` when nothing is touching the panel
    pub touch: Option<TouchEstimate>,
    /// Set on the frame that completes a jitter series
    pub noise: Option<NoiseReport>,
}

/// [`SenseError`] as produced by an engine driving `D` and sampling `S`
pub type EngineError<D, S> =
    SenseError<<D as DriveLineOutput>::Error, <S as AnalogSampler>::Error>;

type Result<T, D, S> = core::result::Result<T, EngineError<D, S>>;

pub struct SensingEngine<D, S, const N: usize, const CH: usize, const LINES: usize> {
    config: SenseConfig,
    reference: BitSequence<N>,
    schedule: DriveSchedule<LINES>,
    taps: [usize; LINES],
    baseline: Option<BaselineSet<N, CH>>,
    profiler: Option<NoiseProfiler>,
    drive: D,
    sampler: S,
}

impl<D, S, const N: usize, const CH: usize, const LINES: usize> SensingEngine<D, S, N, CH, LINES>
where
    D: DriveLineOutput,
    S: AnalogSampler,
{
    /// Validate the configuration and take ownership of the hardware.
    ///
    /// The engine starts uncalibrated.
    pub fn new(config: SenseConfig, drive: D, sampler: S) -> core::result::Result<Self, Error> {
        if config.full_scale_code == 0 {
            return Err(Error::InvalidFullScale);
        }

        let reference = generate(&config.prbs_spec())?;
        let schedule = DriveSchedule::new(reference.len())?;
        let taps = schedule.peak_indices();
        let profiler = if config.jitter.enabled {
            Some(NoiseProfiler::new(config.jitter))
        } else {
            None
        };

        Ok(Self {
            config,
            reference,
            schedule,
            taps,
            baseline: None,
            profiler,
            drive,
            sampler,
        })
    }

    pub fn reference(&self) -> &BitSequence<N> {
        &self.reference
    }

    pub fn schedule(&self) -> &DriveSchedule<LINES> {
        &self.schedule
    }

    /// Correlation index sampled for each grid column
    pub fn taps(&self) -> &[usize; LINES] {
        &self.taps
    }

    pub fn is_calibrated(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn baseline(&self) -> Option<&BaselineSet<N, CH>> {
        self.baseline.as_ref()
    }

    /// Capture a new baseline. Must be called with nothing touching the panel.
    ///
    /// The stored baseline is replaced only if every channel was captured; on
    /// error the previous baseline, if any, stays in place.
    pub fn calibrate(&mut self) -> Result<CalibrationEvent, D, S> {
        let baseline = calibrate(
            &self.reference,
            &self.schedule,
            &self.config,
            &mut self.drive,
            &mut self.sampler,
        )?;

        let event = if self.baseline.is_some() {
            CalibrationEvent::Recalibrated
        } else {
            CalibrationEvent::Captured
        };
        self.baseline = Some(baseline);
        Ok(event)
    }

    /// Run one cycle on every channel and localize the result.
    ///
    /// `now_ms` is only used to time the jitter settle window.
    pub fn cycle(&mut self, now_ms: u32) -> Result<Frame<N, CH, LINES>, D, S> {
        let baseline = self.baseline.as_ref().ok_or(Error::NotCalibrated)?;

        let mut corrected: [CorrelationVector<N>; CH] = core::array::from_fn(|_| Vec::new());
        for (channel, xcorr) in corrected.iter_mut().enumerate() {
            let sample = run_cycle(
                channel,
                &self.reference,
                &self.schedule,
                &self.config,
                &mut self.drive,
                &mut self.sampler,
            )?;
            *xcorr = demodulate(&sample, &self.reference, baseline.get(channel)?)?;
        }

        let grid = ResponseGrid::from_correlations(&corrected, &self.taps, self.config.noise_threshold);
        let touch = localize(&grid);
        let noise = match (self.profiler.as_mut(), touch) {
            (Some(profiler), Some(t)) => profiler.sample(now_ms, (t.x, t.y)),
            _ => None,
        };

        Ok(Frame {
            corrected,
            grid,
            touch,
            noise,
        })
    }

    /// Restart the jitter measurement, if enabled
    pub fn reset_jitter(&mut self) {
        if let Some(profiler) = self.profiler.as_mut() {
            profiler.reset();
        }
    }

    /// Drive every line low and hand the hardware back.
    ///
    /// A line that fails to go low doesn't stop the others from being parked.
    /// On failure the first error comes back together with the engine, still
    /// owning the hardware, so the release can be retried.
    pub fn release(mut self) -> core::result::Result<(D, S), (EngineError<D, S>, Self)> {
        let mut first_err = None;
        for line in 0..LINES {
            if let Err(e) = self.drive.set(line, false) {
                first_err.get_or_insert(SenseError::Drive(e));
            }
        }
        match first_err {
            Some(err) => Err((err, self)),
            None => Ok((self.drive, self.sampler)),
        }
    }
}
