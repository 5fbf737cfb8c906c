use core::fmt;

/// Configuration and pipeline errors raised by the sensing core
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No tap polynomial is registered for this register length
    UnsupportedLength(u8),
    /// The seed is zero once masked to the register length
    InvalidSeed,
    /// A corrected measurement was requested before a baseline was captured
    NotCalibrated,
    /// A sequence period does not fit in the buffer capacity
    Capacity { required: usize, capacity: usize },
    /// A signal does not have the same length as the reference sequence
    LengthMismatch { expected: usize, found: usize },
    ChannelOutOfRange(usize),
    /// The engine was instantiated with zero drive lines
    NoDriveLines,
    /// More drive lines than sequence chips, so lines would share a rotation
    TooManyLines { lines: usize, period: usize },
    /// The converter full-scale code is zero
    InvalidFullScale,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedLength(length) => write!(f, "no PRBS taps for length {}", length),
            Self::InvalidSeed => f.write_str("PRBS seed must be non-zero"),
            Self::NotCalibrated => f.write_str("no baseline captured"),
            Self::Capacity { required, capacity } => {
                write!(f, "sequence of {} does not fit capacity {}", required, capacity)
            }
            Self::LengthMismatch { expected, found } => {
                write!(f, "expected {} samples, found {}", expected, found)
            }
            Self::ChannelOutOfRange(channel) => write!(f, "channel {} out of range", channel),
            Self::NoDriveLines => f.write_str("at least one drive line is required"),
            Self::TooManyLines { lines, period } => {
                write!(f, "{} drive lines cannot share a period of {}", lines, period)
            }
            Self::InvalidFullScale => f.write_str("full scale code must be non-zero"),
        }
    }
}

/// Failure of a sensing operation.
///
/// Hardware faults from the drive lines or the sampler are passed through
/// untouched; the core never retries them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SenseError<D, S> {
    Config(Error),
    Drive(D),
    Sample(S),
}

impl<D, S> From<Error> for SenseError<D, S> {
    fn from(err: Error) -> Self {
        Self::Config(err)
    }
}

impl<D: fmt::Debug, S: fmt::Debug> fmt::Display for SenseError<D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{}", err),
            Self::Drive(err) => write!(f, "drive line fault: {:?}", err),
            Self::Sample(err) => write!(f, "sampler fault: {:?}", err),
        }
    }
}
