//! Maximal-length pseudo-random binary sequences.
//!
//! Sequences come from a Fibonacci LFSR: on each clock the tapped bits are
//! XORed together, the register shifts left by one, and the XOR result enters
//! at bit 0. The bit shifted out of the top position is the output. With the
//! taps listed in [`taps`], every non-zero register state is visited exactly
//! once per period of `2^length - 1` clocks.

use heapless::Vec;

use crate::error::Error;

pub const MIN_LENGTH: u8 = 2;
pub const MAX_LENGTH: u8 = 16;

/// Feedback tap positions for each supported register length
pub const fn taps(length: u8) -> Option<&'static [u8]> {
    match length {
        2 => Some(&[0, 1]),
        3 => Some(&[1, 2]),
        4 => Some(&[2, 3]),
        5 => Some(&[2, 4]),
        6 => Some(&[4, 5]),
        7 => Some(&[5, 6]),
        8 => Some(&[3, 4, 5, 7]),
        9 => Some(&[4, 8]),
        10 => Some(&[6, 9]),
        11 => Some(&[8, 10]),
        12 => Some(&[3, 9, 10, 11]),
        13 => Some(&[7, 10, 11, 12]),
        14 => Some(&[1, 11, 12, 13]),
        15 => Some(&[13, 14]),
        16 => Some(&[3, 12, 14, 15]),
        _ => None,
    }
}

/// Number of clocks before a register of `length` bits repeats
pub const fn period(length: u8) -> usize {
    (1usize << length) - 1
}

/// Parameters of a generated sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrbsSpec {
    pub length: u8,
    pub seed: u32,
    /// Number of clocks the register is advanced before output is recorded
    pub phase: u32,
}

impl PrbsSpec {
    /// A sequence of the given register length, seeded with 1, at phase 0
    pub const fn new(length: u8) -> Self {
        Self {
            length,
            seed: 1,
            phase: 0,
        }
    }

    pub const fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub const fn with_phase(mut self, phase: u32) -> Self {
        self.phase = phase;
        self
    }

    pub const fn period(&self) -> usize {
        period(self.length)
    }
}

/// The shift register itself.
///
/// Iterating yields the output bit of each clock, forever.
#[derive(Clone, Debug)]
pub struct Lfsr {
    state: u32,
    mask: u32,
    length: u8,
    taps: &'static [u8],
}

impl Lfsr {
    pub fn new(length: u8, seed: u32) -> Result<Self, Error> {
        let taps = taps(length).ok_or(Error::UnsupportedLength(length))?;
        let mask = period(length) as u32;
        let state = seed & mask;
        if state == 0 {
            return Err(Error::InvalidSeed);
        }

        Ok(Self {
            state,
            mask,
            length,
            taps,
        })
    }

    /// Current register contents
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Advance one clock and return the bit shifted out
    pub fn step(&mut self) -> bool {
        let feedback = self
            .taps
            .iter()
            .fold(0, |acc, &tap| acc ^ (self.state >> tap))
            & 1;
        let output = (self.state >> (self.length - 1)) & 1 == 1;
        self.state = ((self.state << 1) | feedback) & self.mask;
        output
    }
}

impl Iterator for Lfsr {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        Some(self.step())
    }
}

/// One full period of a PRBS, stored as +1/-1 chips.
///
/// The sign mapping happens once here so that correlation can multiply
/// directly. `N` is the buffer capacity and must be at least the period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitSequence<const N: usize> {
    chips: Vec<i8, N>,
}

impl<const N: usize> BitSequence<N> {
    pub fn len(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// The +1/-1 chips
    pub fn as_slice(&self) -> &[i8] {
        &self.chips
    }

    /// Chip at `index`, wrapping around the period
    pub fn chip(&self, index: usize) -> i8 {
        self.chips[index % self.chips.len()]
    }

    /// The sequence as raw 0/1 register output
    pub fn bits(&self) -> impl Iterator<Item = u8> + '_ {
        self.chips.iter().map(|&chip| (chip > 0) as u8)
    }
}

/// Generate one period of the sequence described by `spec`
pub fn generate<const N: usize>(spec: &PrbsSpec) -> Result<BitSequence<N>, Error> {
    let mut lfsr = Lfsr::new(spec.length, spec.seed)?;
    let period = spec.period();
    if period > N {
        return Err(Error::Capacity {
            required: period,
            capacity: N,
        });
    }

    // The register repeats every period, so only the remainder of the phase
    // changes where output starts.
    for _ in 0..(spec.phase as usize % period) {
        lfsr.step();
    }

    let mut chips = Vec::new();
    chips.extend(lfsr.take(period).map(|bit| if bit { 1 } else { -1 }));

    Ok(BitSequence { chips })
}

#[cfg(test)]
pub mod test {
    use super::*;

    fn rotated_left(bits: &[u8], by: usize) -> std::vec::Vec<u8> {
        let n = bits.len();
        (0..n).map(|i| bits[(i + by) % n]).collect()
    }

    #[test]
    fn test_known_sequences() {
        let seq: BitSequence<7> = generate(&PrbsSpec::new(3)).unwrap();
        assert_eq!(seq.bits().collect::<std::vec::Vec<_>>(), [0, 0, 1, 0, 1, 1, 1]);
        assert_eq!(seq.as_slice(), &[-1, -1, 1, -1, 1, 1, 1]);

        let seq: BitSequence<31> = generate(&PrbsSpec::new(5)).unwrap();
        let expected = [
            0, 0, 0, 0, 1, 0, 0, 1, 0, 1, 1, 0, 0, 1, 1, 1, 1, 1, 0, 0, 0, 1, 1, 0, 1, 1, 1, 0,
            1, 0, 1,
        ];
        assert_eq!(seq.len(), 31);
        assert_eq!(seq.bits().collect::<std::vec::Vec<_>>(), expected);
    }

    #[test]
    fn test_maximal_length() {
        for length in MIN_LENGTH..=MAX_LENGTH {
            let n = period(length);
            let mut visited = vec![false; n + 1];
            let mut lfsr = Lfsr::new(length, 1).unwrap();

            for _ in 0..n {
                let state = lfsr.state() as usize;
                assert!(state != 0 && state <= n, "length {}: state {} out of range", length, state);
                assert!(!visited[state], "length {}: state {} repeated early", length, state);
                visited[state] = true;
                lfsr.step();
            }

            assert_eq!(lfsr.state(), 1, "length {}: period is not {}", length, n);
            assert!(visited[1..].iter().all(|&v| v), "length {}: missed a state", length);
        }
    }

    #[test]
    fn test_phase_is_rotation() {
        let base: BitSequence<31> = generate(&PrbsSpec::new(5)).unwrap();
        let base_bits: std::vec::Vec<u8> = base.bits().collect();

        for phase in 0..31 {
            let shifted: BitSequence<31> = generate(&PrbsSpec::new(5).with_phase(phase)).unwrap();
            let bits: std::vec::Vec<u8> = shifted.bits().collect();
            assert_eq!(bits, rotated_left(&base_bits, phase as usize), "phase {}", phase);
        }

        // Phases past one period wrap
        let wrapped: BitSequence<127> = generate(&PrbsSpec::new(7).with_phase(127 + 9)).unwrap();
        let direct: BitSequence<127> = generate(&PrbsSpec::new(7).with_phase(9)).unwrap();
        assert_eq!(wrapped, direct);
    }

    #[test]
    fn test_seed_is_rotation() {
        // Every non-zero seed lies on the same cycle, so a different seed only
        // changes the starting point.
        let base: std::vec::Vec<u8> = generate::<63>(&PrbsSpec::new(6)).unwrap().bits().collect();
        let other: std::vec::Vec<u8> = generate::<63>(&PrbsSpec::new(6).with_seed(0b101101))
            .unwrap()
            .bits()
            .collect();
        assert_ne!(base, other);
        assert!((0..63).any(|r| rotated_left(&base, r) == other));
    }

    #[test]
    fn test_deterministic() {
        let spec = PrbsSpec::new(9).with_seed(0x1a5).with_phase(17);
        let a: BitSequence<511> = generate(&spec).unwrap();
        let b: BitSequence<511> = generate(&spec).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_specs() {
        for length in [0, 1, 17, 32] {
            assert_eq!(
                generate::<31>(&PrbsSpec::new(length)),
                Err(Error::UnsupportedLength(length))
            );
        }

        assert_eq!(
            generate::<31>(&PrbsSpec::new(5).with_seed(0)),
            Err(Error::InvalidSeed)
        );
        // Bits above the register width are dropped
        assert_eq!(
            generate::<31>(&PrbsSpec::new(5).with_seed(0b100000)),
            Err(Error::InvalidSeed)
        );

        assert_eq!(
            generate::<15>(&PrbsSpec::new(5)),
            Err(Error::Capacity {
                required: 31,
                capacity: 15
            })
        );
    }

    #[test]
    fn test_chip_wraps() {
        let seq: BitSequence<7> = generate(&PrbsSpec::new(3)).unwrap();
        for i in 0..7 {
            assert_eq!(seq.chip(i), seq.chip(i + 7));
            assert_eq!(seq.chip(i), seq.as_slice()[i]);
        }
    }
}
