use tokio_util::sync::CancellationToken;

use crate::{
    timer::{LatencyStats, Stopwatch},
    timestamp::PtsCorrector,
};

/// Mutable state of one run, owned by the thread driving the loop.
///
/// Only `stop` is shared: clone it with [`RunState::stop_handle`] and cancel it
/// from a signal handler. It is observed once per loop iteration.
#[derive(Debug)]
pub struct RunState {
    stop: CancellationToken,
    pub(crate) pts: PtsCorrector,
    pub(crate) stopwatch: Stopwatch,
    pub(crate) latency: LatencyStats,
    pub(crate) frames_decoded: u64,
    pub(crate) frames_encoded: u64,
    pub(crate) packets_written: u64,
    pub(crate) write_failures: u64,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl RunState {
    pub fn new(stop: CancellationToken) -> Self {
        Self {
            stop,
            pts: PtsCorrector::new(),
            stopwatch: Stopwatch::new(),
            latency: LatencyStats::default(),
            frames_decoded: 0,
            frames_encoded: 0,
            packets_written: 0,
            write_failures: 0,
        }
    }

    pub fn stop_handle(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn last_output_pts(&self) -> Option<i64> {
        self.pts.last()
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    pub fn latency(&self) -> &LatencyStats {
        &self.latency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_handle_is_shared() {
        let state = RunState::default();
        let handle = state.stop_handle();
        assert!(!state.stop_requested());
        handle.cancel();
        assert!(state.stop_requested());
    }

    #[test]
    fn test_stop_from_another_thread() {
        let state = RunState::default();
        let handle = state.stop_handle();
        std::thread::spawn(move || handle.cancel()).join().unwrap();
        assert!(state.stop_requested());
    }

    #[test]
    fn test_fresh_counters() {
        let state = RunState::default();
        assert_eq!(state.frames_encoded(), 0);
        assert_eq!(state.packets_written(), 0);
        assert_eq!(state.last_output_pts(), None);
        assert_eq!(state.latency().average_ms(state.frames_encoded()), None);
    }
}
