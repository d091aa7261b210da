use std::time::{Duration, Instant};

/// Wall-clock stopwatch for per-frame write latency.
#[derive(Debug, Default)]
pub struct Stopwatch {
    started: Option<Instant>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Elapsed time since `start`, clearing the stopwatch. Zero if never started.
    pub fn stop(&mut self) -> Duration {
        self.started
            .take()
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }
}

/// Running latency totals. Samples taken in no-op mode add nothing to the total.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LatencyStats {
    total_ms: f64,
    samples: u64,
    noop_samples: u64,
}

impl LatencyStats {
    pub fn record(&mut self, elapsed: Duration) -> f64 {
        let ms = elapsed.as_secs_f64() * 1000.0;
        self.total_ms += ms;
        self.samples += 1;
        ms
    }

    pub fn record_noop(&mut self) {
        self.noop_samples += 1;
    }

    pub fn total_ms(&self) -> f64 {
        self.total_ms
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn noop_samples(&self) -> u64 {
        self.noop_samples
    }

    /// `total / (frames_encoded - 1)`; None when fewer than two frames were encoded.
    pub fn average_ms(&self, frames_encoded: u64) -> Option<f64> {
        if frames_encoded < 2 {
            return None;
        }
        Some(self.total_ms / (frames_encoded - 1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_without_start_is_zero() {
        let mut watch = Stopwatch::new();
        assert!(!watch.is_running());
        assert_eq!(watch.stop(), Duration::ZERO);
    }

    #[test]
    fn test_start_stop() {
        let mut watch = Stopwatch::new();
        watch.start();
        assert!(watch.is_running());
        std::thread::sleep(Duration::from_millis(2));
        let elapsed = watch.stop();
        assert!(elapsed >= Duration::from_millis(2));
        assert!(!watch.is_running());
    }

    #[test]
    fn test_noop_contributes_nothing() {
        let mut stats = LatencyStats::default();
        stats.record(Duration::from_millis(4));
        stats.record_noop();
        stats.record_noop();
        assert_eq!(stats.samples(), 1);
        assert_eq!(stats.noop_samples(), 2);
        assert!((stats.total_ms() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_guards_small_counts() {
        let mut stats = LatencyStats::default();
        assert_eq!(stats.average_ms(0), None);
        stats.record(Duration::from_millis(10));
        assert_eq!(stats.average_ms(1), None);
        stats.record(Duration::from_millis(20));
        let avg = stats.average_ms(3).unwrap();
        assert!((avg - 15.0).abs() < 1e-9);
    }
}
