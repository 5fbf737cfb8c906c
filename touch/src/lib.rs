#![cfg_attr(not(test), no_std)]

//! Capacitive touch sensing with phase-shifted PRBS drive.
//!
//! Every drive line emits the same maximal-length sequence at a different
//! rotation. A sense channel picks up the sum of all lines it couples to, and
//! circular cross-correlation against the reference sequence separates the
//! contribution of each line into its own peak. After subtracting a no-touch
//! baseline, the peaks form a channel x line grid from which a touch centroid
//! and spread are computed.

#[cfg(feature = "stm32f0x1")]
pub mod adc;
pub mod calibrate;
pub mod correlate;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod localize;
pub mod noise;
pub mod prbs;

#[cfg(test)]
pub mod sim;

pub use engine::{CalibrationEvent, EngineError, Frame, SensingEngine};
pub use error::{Error, SenseError};
pub use localize::{ResponseGrid, TouchEstimate};
pub use noise::{JitterConfig, NoiseReport, OnComplete};
pub use prbs::{BitSequence, PrbsSpec};

/// A bank of physical output lines connected to the drive electrodes
pub trait DriveLineOutput {
    type Error;

    /// Set the state of a single drive line
    fn set(&mut self, line: usize, high: bool) -> Result<(), Self::Error>;

    /// Block until the electrodes have settled after a line update.
    ///
    /// Called once per tick, after all lines are set and before the sample is
    /// taken, when `SenseConfig::settle_ticks` is non-zero.
    fn settle(&mut self, _ticks: u32) {}
}

/// An analog converter that can be pointed at one sense channel at a time
pub trait AnalogSampler {
    type Error;

    /// Route the converter input to `channel`
    fn select_channel(&mut self, channel: usize) -> Result<(), Self::Error>;

    /// Take one conversion on `channel` and return the raw code
    fn read(&mut self, channel: usize) -> Result<i32, Self::Error>;
}

/// Configuration for the sensing pipeline
#[derive(Clone, Copy, Debug)]
pub struct SenseConfig {
    /// Number of bits in the PRBS shift register. The sequence period is
    /// `2^prbs_length - 1`.
    pub prbs_length: u8,
    /// Initial register state. Must be non-zero once masked to `prbs_length` bits.
    pub seed: u32,
    /// Rotation applied to the reference sequence, in clock ticks
    pub phase: u32,
    /// Converter reference voltage, i.e. the voltage of `full_scale_code`
    pub vref: f32,
    /// Raw code corresponding to `vref`
    pub full_scale_code: i32,
    /// Corrected correlation values at or below this level are treated as noise
    pub noise_threshold: f32,
    /// Delay passed to `DriveLineOutput::settle` between driving and sampling
    pub settle_ticks: u32,
    /// Number of no-touch cycles averaged into each baseline vector
    pub calibration_passes: u16,
    pub jitter: JitterConfig,
}

impl SenseConfig {
    const fn default() -> Self {
        Self {
            prbs_length: 5,
            seed: 1,
            phase: 0,
            vref: 5.0,
            full_scale_code: 0x7f_ffff,
            noise_threshold: 2.0,
            settle_ticks: 0,
            calibration_passes: 1,
            jitter: JitterConfig::default(),
        }
    }

    /// The PRBS used as both drive pattern and correlation reference
    pub const fn prbs_spec(&self) -> PrbsSpec {
        PrbsSpec::new(self.prbs_length)
            .with_seed(self.seed)
            .with_phase(self.phase)
    }
}

pub const DEFAULT_SENSE_CONFIG: SenseConfig = SenseConfig::default();
