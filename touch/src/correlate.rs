//! Circular correlation against a reference PRBS.

use heapless::Vec;

use crate::error::Error;
use crate::prbs::BitSequence;

/// Correlation result indexed by circular shift
pub type CorrelationVector<const N: usize> = Vec<f32, N>;

/// Index of `j - shift` on a circle of `n` without a modulo
#[inline]
fn wrap_back(j: usize, shift: usize, n: usize) -> usize {
    if j >= shift {
        j - shift
    } else {
        j + n - shift
    }
}

/// Circular cross-correlation of `signal` against `reference`.
///
/// `result[shift] = sum_j signal[j] * reference[(j - shift) mod N]`
///
/// A signal that is the reference delayed by `s` clocks peaks at index `s`.
pub fn cross_correlate<const N: usize>(
    signal: &[f32],
    reference: &BitSequence<N>,
) -> Result<CorrelationVector<N>, Error> {
    let chips = reference.as_slice();
    let n = chips.len();
    if signal.len() != n {
        return Err(Error::LengthMismatch {
            expected: n,
            found: signal.len(),
        });
    }

    let mut result = Vec::new();
    result.extend((0..n).map(|shift| {
        signal
            .iter()
            .enumerate()
            .map(|(j, &s)| s * chips[wrap_back(j, shift, n)] as f32)
            .sum::<f32>()
    }));
    Ok(result)
}

/// Circular autocorrelation of the reference at a single shift.
///
/// For a maximal-length sequence this is `N` at shift 0 and -1 everywhere
/// else. Only used to check sequence quality.
pub fn autocorrelate<const N: usize>(reference: &BitSequence<N>, shift: usize) -> i32 {
    let chips = reference.as_slice();
    let n = chips.len();
    if n == 0 {
        return 0;
    }
    let shift = shift % n;

    chips
        .iter()
        .enumerate()
        .map(|(j, &c)| c as i32 * chips[wrap_back(j, shift, n)] as i32)
        .sum()
}

/// Index and value of the largest element. The first index wins a tie.
pub fn peak(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => (),
            _ => best = Some((i, v)),
        }
    }
    best
}
