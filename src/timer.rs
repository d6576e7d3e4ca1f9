use std::{
    fmt,
    time::{Duration, Instant},
};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Frame rate over the last reporting interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub fps: u32,
    /// Average time per frame in milliseconds
    pub frame_ms: f64,
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fps ({:.2} ms)", self.fps, self.frame_ms)
    }
}

/// Counts frames and reports once per second.
#[derive(Debug)]
pub struct FrameTimer {
    interval_start: Instant,
    frames: u32,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            interval_start: start,
            frames: 0,
        }
    }

    pub fn tick(&mut self) -> Option<FrameStats> {
        self.tick_at(Instant::now())
    }

    /// Counts a frame finished at `now`. Returns the stats when a full interval has passed.
    pub fn tick_at(&mut self, now: Instant) -> Option<FrameStats> {
        self.frames += 1;
        let elapsed = now.duration_since(self.interval_start);
        if elapsed < REPORT_INTERVAL {
            return None;
        }
        let stats = FrameStats {
            fps: self.frames,
            frame_ms: elapsed.as_secs_f64() * 1000.0 / f64::from(self.frames),
        };
        self.frames = 0;
        // moving forward by exactly one interval keeps the reports from drifting
        self.interval_start += REPORT_INTERVAL;
        if now.duration_since(self.interval_start) >= REPORT_INTERVAL {
            // fell behind by more than an interval, e.g. while suspended
            self.interval_start = now;
        }
        Some(stats)
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_report_within_first_second() {
        let start = Instant::now();
        let mut timer = FrameTimer::starting_at(start);
        for frame in 1..60 {
            assert!(timer
                .tick_at(start + Duration::from_millis(frame * 16))
                .is_none());
        }
    }

    #[test]
    fn test_reports_sixty_frames() {
        let start = Instant::now();
        let mut timer = FrameTimer::starting_at(start);
        let mut report = None;
        for frame in 1..=60u64 {
            report = timer.tick_at(start + Duration::from_micros(frame * 16_667));
        }
        let stats = report.unwrap();
        assert_eq!(stats.fps, 60);
        assert!((stats.frame_ms - 16.666).abs() < 0.01);
        assert_eq!(stats.to_string(), "60 fps (16.67 ms)");
    }

    #[test]
    fn test_counter_restarts_after_report() {
        let start = Instant::now();
        let mut timer = FrameTimer::starting_at(start);
        assert!(timer.tick_at(start + Duration::from_millis(500)).is_none());
        let first = timer.tick_at(start + Duration::from_millis(1000)).unwrap();
        assert_eq!(first.fps, 2);
        assert!((first.frame_ms - 500.0).abs() < 0.01);

        assert!(timer.tick_at(start + Duration::from_millis(1500)).is_none());
        let second = timer.tick_at(start + Duration::from_millis(2000)).unwrap();
        assert_eq!(second.fps, 2);
    }

    #[test]
    fn test_long_stall_reports_once() {
        let start = Instant::now();
        let mut timer = FrameTimer::starting_at(start);
        let stalled = start + Duration::from_secs(5);
        let stats = timer.tick_at(stalled).unwrap();
        assert_eq!(stats.fps, 1);
        // the frame took the whole stall, not one interval
        assert!((stats.frame_ms - 5000.0).abs() < 0.01);
        assert_eq!(stats.to_string(), "1 fps (5000.00 ms)");
        assert!(timer
            .tick_at(stalled + Duration::from_millis(10))
            .is_none());
    }
}
