//! Frame timing statistics

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Frame timing statistics
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    /// Average frame time in milliseconds
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Median frame time
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    /// Number of samples in the statistics
    pub sample_count: usize,
}

/// Rolling frame profiler
///
/// Keeps the last few seconds of frame intervals for the overlay.
pub struct FrameProfiler {
    frame_times: VecDeque<Duration>,
    frame_starts: VecDeque<Instant>,
    max_samples: usize,
}

impl Default for FrameProfiler {
    fn default() -> Self {
        Self::new(300)
    }
}

impl FrameProfiler {
    /// Profiler keeping at most `max_samples` frames (at least 2)
    pub fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(2);
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            frame_starts: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Mark the beginning of a frame
    pub fn begin_frame(&mut self) {
        self.begin_frame_at(Instant::now());
    }

    /// Mark the beginning of a frame at a given instant
    pub fn begin_frame_at(&mut self, now: Instant) {
        if let Some(&last) = self.frame_starts.back() {
            self.frame_times.push_back(now.saturating_duration_since(last));
            if self.frame_times.len() > self.max_samples {
                self.frame_times.pop_front();
            }
        }

        self.frame_starts.push_back(now);
        if self.frame_starts.len() > self.max_samples {
            self.frame_starts.pop_front();
        }
    }

    /// Statistics over the retained frame intervals
    pub fn stats(&self) -> FrameStats {
        if self.frame_times.is_empty() {
            return FrameStats::default();
        }

        let mut times: Vec<f64> = self
            .frame_times
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        times.sort_by(|a, b| a.total_cmp(b));

        let sum: f64 = times.iter().sum();

        FrameStats {
            avg_ms: sum / times.len() as f64,
            min_ms: times[0],
            max_ms: times[times.len() - 1],
            p50_ms: percentile(&times, 0.50),
            p95_ms: percentile(&times, 0.95),
            p99_ms: percentile(&times, 0.99),
            sample_count: times.len(),
        }
    }

    /// Frames per second over the retained window
    pub fn fps(&self) -> f64 {
        let (Some(first), Some(last)) = (self.frame_starts.front(), self.frame_starts.back()) else {
            return 0.0;
        };
        let duration = last.saturating_duration_since(*first).as_secs_f64();
        if duration > 0.0 {
            (self.frame_starts.len() - 1) as f64 / duration
        } else {
            0.0
        }
    }

    /// Most recent frame interval in milliseconds
    pub fn last_frame_time_ms(&self) -> f64 {
        self.frame_times
            .back()
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// Percentile from a sorted slice
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p) as usize;
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_profiler() {
        let profiler = FrameProfiler::default();
        assert_eq!(profiler.fps(), 0.0);
        assert_eq!(profiler.stats().sample_count, 0);
        assert_eq!(profiler.last_frame_time_ms(), 0.0);
    }

    #[test]
    fn test_steady_frames() {
        let mut profiler = FrameProfiler::default();
        let start = Instant::now();
        for i in 0..11 {
            profiler.begin_frame_at(start + Duration::from_millis(20 * i));
        }

        let stats = profiler.stats();
        assert_eq!(stats.sample_count, 10);
        assert!((stats.avg_ms - 20.0).abs() < 1e-6);
        assert!((stats.p99_ms - 20.0).abs() < 1e-6);
        assert!((profiler.fps() - 50.0).abs() < 1e-6);
        assert!((profiler.last_frame_time_ms() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut profiler = FrameProfiler::new(4);
        let start = Instant::now();
        // One slow frame followed by fast ones falls out of the window
        profiler.begin_frame_at(start);
        profiler.begin_frame_at(start + Duration::from_millis(500));
        for i in 1..=5 {
            profiler.begin_frame_at(start + Duration::from_millis(500 + 10 * i));
        }

        let stats = profiler.stats();
        assert_eq!(stats.sample_count, 4);
        assert!((stats.max_ms - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_percentile() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 0.5), 3.0);
        assert_eq!(percentile(&sorted, 1.0), 5.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }
}
