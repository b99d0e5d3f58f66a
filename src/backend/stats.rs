//! Per-backend reliability and latency counters.

use std::collections::VecDeque;
use std::time::Duration;

use crate::domain::BackendId;

/// Rolling reliability statistics for one backend.
///
/// Mutated only by the registry after each probe; snapshots are cloned out
/// for diagnostics. Cumulative counters reset only on explicit registry
/// reset; the bounded windows evict their oldest sample at capacity.
#[derive(Debug, Clone)]
pub struct BackendStats {
    backend: BackendId,
    attempts: u64,
    successes: u64,
    outcome_window: VecDeque<bool>,
    latency_window: VecDeque<Duration>,
    window: usize,
}

impl BackendStats {
    /// Create empty stats with the given rolling-window capacity.
    pub fn new(backend: BackendId, window: usize) -> Self {
        Self {
            backend,
            attempts: 0,
            successes: 0,
            outcome_window: VecDeque::with_capacity(window),
            latency_window: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Record one probe outcome.
    pub fn record(&mut self, success: bool, latency: Duration) {
        self.attempts += 1;
        if success {
            self.successes += 1;
        }
        if self.outcome_window.len() == self.window {
            self.outcome_window.pop_front();
        }
        self.outcome_window.push_back(success);
        if self.latency_window.len() == self.window {
            self.latency_window.pop_front();
        }
        self.latency_window.push_back(latency);
    }

    /// Backend this record belongs to
    pub fn backend(&self) -> &BackendId {
        &self.backend
    }

    /// Total probe attempts since creation or reset
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Total successful probes since creation or reset
    pub fn successes(&self) -> u64 {
        self.successes
    }

    /// Lifetime success rate; 0.0 when no attempts were made.
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }

    /// Success rate over the most recent window of attempts;
    /// 0.0 when the window is empty.
    pub fn windowed_success_rate(&self) -> f64 {
        if self.outcome_window.is_empty() {
            return 0.0;
        }
        let ok = self.outcome_window.iter().filter(|&&s| s).count();
        ok as f64 / self.outcome_window.len() as f64
    }

    /// Number of outcomes currently in the rolling window.
    pub fn window_len(&self) -> usize {
        self.outcome_window.len()
    }

    /// Whether the rolling window is at capacity.
    pub fn window_full(&self) -> bool {
        self.outcome_window.len() == self.window
    }

    /// Average latency over the rolling window, if any samples exist.
    pub fn average_latency(&self) -> Option<Duration> {
        if self.latency_window.is_empty() {
            return None;
        }
        let total: Duration = self.latency_window.iter().sum();
        Some(total / self.latency_window.len() as u32)
    }

    /// Reset all counters and windows.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.successes = 0;
        self.outcome_window.clear();
        self.latency_window.clear();
    }

    /// Drop windowed history but keep cumulative counters.
    ///
    /// Used on manual re-enable so a freshly enabled backend is not judged
    /// on the window that disabled it.
    pub fn clear_window(&mut self) {
        self.outcome_window.clear();
        self.latency_window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let stats = BackendStats::new(BackendId::new("a"), 50);
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.windowed_success_rate(), 0.0);
        assert!(stats.average_latency().is_none());
    }

    #[test]
    fn test_success_rate() {
        let mut stats = BackendStats::new(BackendId::new("a"), 50);
        for i in 0..10 {
            stats.record(i % 2 == 0, Duration::from_millis(5));
        }
        assert_eq!(stats.attempts(), 10);
        assert_eq!(stats.successes(), 5);
        assert!((stats.success_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut stats = BackendStats::new(BackendId::new("a"), 4);
        for _ in 0..4 {
            stats.record(false, Duration::from_millis(5));
        }
        assert_eq!(stats.windowed_success_rate(), 0.0);

        // Four fresh successes push the failures out
        for _ in 0..4 {
            stats.record(true, Duration::from_millis(5));
        }
        assert_eq!(stats.windowed_success_rate(), 1.0);
        assert_eq!(stats.window_len(), 4);
        // Cumulative counters keep the full story
        assert_eq!(stats.attempts(), 8);
        assert_eq!(stats.successes(), 4);
    }

    #[test]
    fn test_average_latency() {
        let mut stats = BackendStats::new(BackendId::new("a"), 50);
        stats.record(true, Duration::from_millis(10));
        stats.record(true, Duration::from_millis(20));
        assert_eq!(stats.average_latency(), Some(Duration::from_millis(15)));
    }

    #[test]
    fn test_reset() {
        let mut stats = BackendStats::new(BackendId::new("a"), 50);
        stats.record(true, Duration::from_millis(10));
        stats.reset();
        assert_eq!(stats.attempts(), 0);
        assert_eq!(stats.windowed_success_rate(), 0.0);
    }
}
