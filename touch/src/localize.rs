//! Touch position from baseline-corrected correlations.
//!
//! The correlation peaks form a grid with one row per sense channel and one
//! column per drive line. A touch is the weighted centroid of that grid, with
//! the weighted covariance describing its spread.

use crate::correlate::CorrelationVector;

/// Touch evidence per sense channel (rows) and drive line (columns)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResponseGrid<const ROWS: usize, const COLS: usize> {
    pub cells: [[f32; COLS]; ROWS],
}

impl<const ROWS: usize, const COLS: usize> ResponseGrid<ROWS, COLS> {
    pub const fn zeroed() -> Self {
        Self {
            cells: [[0.0; COLS]; ROWS],
        }
    }

    /// Build a grid from baseline-corrected correlations.
    ///
    /// Row `r` takes channel `r`'s correlation at `taps[c]` for each column.
    /// Anything at or below `threshold` is noise and becomes zero. Only
    /// positive values are kept, even with a negative `threshold`.
    pub fn from_correlations<const N: usize>(
        corrected: &[CorrelationVector<N>],
        taps: &[usize; COLS],
        threshold: f32,
    ) -> Self {
        let threshold = threshold.max(0.0);
        let mut grid = Self::zeroed();
        for (row, xcorr) in grid.cells.iter_mut().zip(corrected) {
            for (cell, &tap) in row.iter_mut().zip(taps) {
                let value = xcorr.get(tap).copied().unwrap_or(0.0);
                // NaN fails the comparison and is dropped too
                *cell = if value > threshold { value } else { 0.0 };
            }
        }
        grid
    }

    pub fn total(&self) -> f32 {
        self.cells.iter().flatten().sum()
    }

    pub fn row_sums(&self) -> [f32; ROWS] {
        let mut sums = [0.0; ROWS];
        for (sum, row) in sums.iter_mut().zip(&self.cells) {
            *sum = row.iter().sum();
        }
        sums
    }
}

/// Weighted centroid and spread of a touch, in grid coordinates.
///
/// `x` runs along the columns (drive lines) and `y` along the rows (sense
/// channels).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchEstimate {
    pub x: f32,
    pub y: f32,
    pub xx: f32,
    pub xy: f32,
    pub yy: f32,
}

impl TouchEstimate {
    /// Standard deviation along each axis
    pub fn std_dev(&self) -> (f32, f32) {
        (libm::sqrtf(self.xx), libm::sqrtf(self.yy))
    }

    /// Variances along the major and minor axes of the spread ellipse, and
    /// the angle of the major axis from the x axis in radians
    pub fn principal_axes(&self) -> (f32, f32, f32) {
        let mean = 0.5 * (self.xx + self.yy);
        let half_diff = 0.5 * (self.xx - self.yy);
        let radius = libm::sqrtf(half_diff * half_diff + self.xy * self.xy);
        let angle = 0.5 * libm::atan2f(2.0 * self.xy, self.xx - self.yy);
        (mean + radius, (mean - radius).max(0.0), angle)
    }
}

/// Compute the weighted centroid and covariance of the grid.
///
/// Returns `None` when no cell carries weight, i.e. nothing is touching.
pub fn localize<const ROWS: usize, const COLS: usize>(
    grid: &ResponseGrid<ROWS, COLS>,
) -> Option<TouchEstimate> {
    let weights = || {
        grid.cells.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &w)| w > 0.0 && w.is_finite())
                .map(move |(x, &w)| (x as f32, y as f32, w))
        })
    };

    let mut total = 0.0f32;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for (x, y, w) in weights() {
        total += w;
        sum_x += x * w;
        sum_y += y * w;
    }

    if !(total > 0.0) || !total.is_finite() {
        return None;
    }

    let cx = sum_x / total;
    let cy = sum_y / total;

    let mut xx = 0.0f32;
    let mut xy = 0.0;
    let mut yy = 0.0;
    for (x, y, w) in weights() {
        let dx = x - cx;
        let dy = y - cy;
        xx += dx * dx * w;
        xy += dx * dy * w;
        yy += dy * dy * w;
    }

    Some(TouchEstimate {
        x: cx,
        y: cy,
        xx: xx / total,
        xy: xy / total,
        yy: yy / total,
    })
}
