//! Positional jitter measurement for a stationary touch.

/// What the profiler does after reporting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnComplete {
    /// Report once and ignore all further samples
    Stop,
    /// Report, then start a new series immediately
    Reset,
}

#[derive(Clone, Copy, Debug)]
pub struct JitterConfig {
    pub enabled: bool,
    /// Number of centroids in one series
    pub samples: u32,
    /// Time to wait after the first centroid before recording
    pub settle_ms: u32,
    pub on_complete: OnComplete,
}

impl JitterConfig {
    pub(crate) const fn default() -> Self {
        Self {
            enabled: false,
            samples: 1000,
            settle_ms: 5000,
            on_complete: OnComplete::Stop,
        }
    }
}

/// RMS frame-to-frame centroid displacement over one series
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NoiseReport {
    pub rms: f32,
    pub samples: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ProfilerState {
    Idle,
    Settling(u32),
    Collecting,
    Done,
}

/// Accumulates centroids and reports `sqrt(mean(|c[i+1] - c[i]|^2))`.
///
/// Only the previous centroid and a running sum are kept, so the series
/// length does not cost memory.
#[derive(Clone, Debug)]
pub struct NoiseProfiler {
    config: JitterConfig,
    state: ProfilerState,
    previous: Option<(f32, f32)>,
    count: u32,
    sum_sq: f32,
}

impl NoiseProfiler {
    pub fn new(config: JitterConfig) -> Self {
        Self {
            config,
            state: ProfilerState::Idle,
            previous: None,
            count: 0,
            sum_sq: 0.0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == ProfilerState::Done
    }

    /// Number of centroids recorded in the current series
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Discard the current series and wait for a fresh settle window
    pub fn reset(&mut self) {
        self.state = ProfilerState::Idle;
        self.clear();
    }

    /// Feed the centroid of one frame. Returns a report when a series completes.
    pub fn sample(&mut self, now_ms: u32, centroid: (f32, f32)) -> Option<NoiseReport> {
        match self.state {
            ProfilerState::Idle => {
                self.state = ProfilerState::Settling(now_ms);
                if self.config.settle_ms == 0 {
                    self.state = ProfilerState::Collecting;
                    return self.record(centroid);
                }
                None
            }
            ProfilerState::Settling(start) => {
                if now_ms.wrapping_sub(start) >= self.config.settle_ms {
                    self.state = ProfilerState::Collecting;
                    self.record(centroid)
                } else {
                    None
                }
            }
            ProfilerState::Collecting => self.record(centroid),
            ProfilerState::Done => None,
        }
    }

    fn clear(&mut self) {
        self.previous = None;
        self.count = 0;
        self.sum_sq = 0.0;
    }

    fn record(&mut self, centroid: (f32, f32)) -> Option<NoiseReport> {
        if let Some((px, py)) = self.previous {
            let dx = centroid.0 - px;
            let dy = centroid.1 - py;
            self.sum_sq += dx * dx + dy * dy;
        }
        self.previous = Some(centroid);
        self.count += 1;

        // At least two centroids are needed for one displacement
        let target = self.config.samples.max(2);
        if self.count < target {
            return None;
        }

        let report = NoiseReport {
            rms: libm::sqrtf(self.sum_sq / (self.count - 1) as f32),
            samples: self.count,
        };

        self.clear();
        if self.config.on_complete == OnComplete::Stop {
            self.state = ProfilerState::Done;
        }
        Some(report)
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    fn config(samples: u32, settle_ms: u32, on_complete: OnComplete) -> JitterConfig {
        JitterConfig {
            enabled: true,
            samples,
            settle_ms,
            on_complete,
        }
    }

    #[test]
    fn test_settle_window() {
        let mut profiler = NoiseProfiler::new(config(3, 5000, OnComplete::Stop));

        assert_eq!(profiler.sample(100, (1.0, 1.0)), None);
        assert_eq!(profiler.sample(4000, (9.0, 9.0)), None);
        assert_eq!(profiler.count(), 0);

        assert_eq!(profiler.sample(5100, (1.0, 1.0)), None);
        assert_eq!(profiler.count(), 1);
    }

    #[test]
    fn test_rms() {
        let mut profiler = NoiseProfiler::new(config(4, 0, OnComplete::Stop));

        // Displacements of 3-4-5, 0 and 5 along x
        assert_eq!(profiler.sample(0, (0.0, 0.0)), None);
        assert_eq!(profiler.sample(1, (3.0, 4.0)), None);
        assert_eq!(profiler.sample(2, (3.0, 4.0)), None);
        let report = profiler.sample(3, (8.0, 4.0)).unwrap();

        assert_eq!(report.samples, 4);
        let expected = ((25.0 + 0.0 + 25.0) / 3.0f32).sqrt();
        assert!((report.rms - expected).abs() < 1e-5);
    }

    #[test]
    fn test_stationary_is_zero() {
        let mut profiler = NoiseProfiler::new(config(10, 0, OnComplete::Stop));
        let mut report = None;
        for t in 0..10 {
            report = profiler.sample(t, (2.0, 3.0));
        }
        assert_eq!(report, Some(NoiseReport { rms: 0.0, samples: 10 }));
    }

    #[test]
    fn test_stop() {
        let mut profiler = NoiseProfiler::new(config(2, 0, OnComplete::Stop));
        assert!(profiler.sample(0, (0.0, 0.0)).is_none());
        assert!(profiler.sample(1, (1.0, 0.0)).is_some());
        assert!(profiler.is_done());
        for t in 2..10 {
            assert!(profiler.sample(t, (5.0, 5.0)).is_none());
        }

        profiler.reset();
        assert!(!profiler.is_done());
        assert!(profiler.sample(10, (0.0, 0.0)).is_none());
        assert!(profiler.sample(11, (0.0, 2.0)).is_some());
    }

    #[test]
    fn test_reset_starts_new_series() {
        let mut profiler = NoiseProfiler::new(config(2, 0, OnComplete::Reset));
        profiler.sample(0, (0.0, 0.0));
        let first = profiler.sample(1, (1.0, 0.0)).unwrap();
        assert_eq!(first.rms, 1.0);
        assert!(!profiler.is_done());

        // The jump from the last point of the previous series is not counted
        assert!(profiler.sample(2, (10.0, 0.0)).is_none());
        let second = profiler.sample(3, (10.0, 2.0)).unwrap();
        assert_eq!(second.rms, 2.0);
    }
}
