use std::time::{Duration, Instant};

/// Loop rates averaged over one reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    pub draw_items_per_frame: f32,
    pub dropped_ticks: u32,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    window_start: Instant,
    window: Duration,
    frames: u32,
    ticks: u32,
    dropped_ticks: u32,
    draw_items: u64,
    frame_time_sum: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(start: Instant, window: Duration) -> Self {
        Self {
            window_start: start,
            window,
            frames: 0,
            ticks: 0,
            dropped_ticks: 0,
            draw_items: 0,
            frame_time_sum: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration, draw_items: usize) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
        self.draw_items = self.draw_items.saturating_add(draw_items as u64);
    }

    pub(crate) fn record_ticks(&mut self, ran: u32, dropped: u32) {
        self.ticks = self.ticks.saturating_add(ran);
        self.dropped_ticks = self.dropped_ticks.saturating_add(dropped);
    }

    /// Closes the window once it has elapsed and starts a new one at `now`.
    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }

        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let (frame_time_ms, draw_items_per_frame) = if self.frames == 0 {
            (0.0, 0.0)
        } else {
            (
                self.frame_time_sum.as_secs_f32() * 1000.0 / self.frames as f32,
                self.draw_items as f32 / self.frames as f32,
            )
        };
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            frame_time_ms,
            draw_items_per_frame,
            dropped_ticks: self.dropped_ticks,
        };

        *self = Self::new(now, self.window);
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_averages_over_window() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(base, Duration::from_secs(1));
        accumulator.record_frame(Duration::from_millis(16), 100);
        accumulator.record_frame(Duration::from_millis(16), 300);
        accumulator.record_ticks(4, 1);

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("window elapsed");

        assert!((snapshot.fps - 2.0).abs() < 0.01);
        assert!((snapshot.tps - 4.0).abs() < 0.01);
        assert!((snapshot.frame_time_ms - 16.0).abs() < 0.01);
        assert!((snapshot.draw_items_per_frame - 200.0).abs() < 0.01);
        assert_eq!(snapshot.dropped_ticks, 1);
    }

    #[test]
    fn no_snapshot_before_window_elapses() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(base, Duration::from_secs(1));
        accumulator.record_frame(Duration::from_millis(16), 1);
        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn snapshot_resets_counters() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(base, Duration::from_secs(1));
        accumulator.record_frame(Duration::from_millis(10), 5);
        accumulator.record_ticks(1, 0);
        let _ = accumulator.maybe_snapshot(base + Duration::from_secs(1));

        let empty = accumulator
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("second window");
        assert_eq!(empty, LoopMetricsSnapshot::default());
    }
}
