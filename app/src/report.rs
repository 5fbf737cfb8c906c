use core::fmt::{self, Debug, Write};

use prbs_touch::{CalibrationEvent, Frame, SenseError};

/// Single byte commands accepted on the serial port
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Capture a new no-touch baseline
    Calibrate,
    /// Start a new jitter series
    ResetJitter,
    /// Park the drive lines and stop sensing
    Shutdown,
}

impl Command {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'c' => Some(Self::Calibrate),
            b'j' => Some(Self::ResetJitter),
            b'q' => Some(Self::Shutdown),
            _ => None,
        }
    }
}

/// One line per frame: centroid, spread and the per-channel grid totals
pub fn frame<W: Write, const N: usize, const CH: usize, const LINES: usize>(
    w: &mut W,
    frame: &Frame<N, CH, LINES>,
) -> fmt::Result {
    match frame.touch {
        Some(touch) => {
            let (sd_x, sd_y) = touch.std_dev();
            write!(w, "POS: {:.2} {:.2} SD: {:.2} {:.2}", touch.x, touch.y, sd_x, sd_y)?;
        }
        None => w.write_str("POS: -")?,
    }

    w.write_str(" ROWS:")?;
    for sum in frame.grid.row_sums() {
        write!(w, " {:.1}", sum)?;
    }
    w.write_str("\r\n")?;

    if let Some(noise) = frame.noise {
        write!(w, "JITTER: rms={:.4} n={}\r\n", noise.rms, noise.samples)?;
    }
    Ok(())
}

pub fn calibration<W: Write, D: Debug, S: Debug>(
    w: &mut W,
    result: &Result<CalibrationEvent, SenseError<D, S>>,
) -> fmt::Result {
    match result {
        Ok(CalibrationEvent::Captured) => w.write_str("BASELINE: captured\r\n"),
        Ok(CalibrationEvent::Recalibrated) => w.write_str("BASELINE: recalibrated\r\n"),
        Err(err) => error(w, err),
    }
}

pub fn error<W: Write, D: Debug, S: Debug>(w: &mut W, err: &SenseError<D, S>) -> fmt::Result {
    write!(w, "ERROR: {}\r\n", err)
}
