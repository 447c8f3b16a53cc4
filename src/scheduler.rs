//! Owned time sources
//!
//! The frame loop and the periodic timers are plain values with explicit
//! start/stop. A host polls them with the current time and runs however many
//! steps are due; a stopped handle never reports work.

use serde::{Deserialize, Serialize};

use crate::consts::{FRAME_HZ, MAX_SUBSTEPS};

/// Largest wall-clock gap fed into the accumulator (ms)
const MAX_FRAME_GAP_MS: f64 = 100.0;
/// Most periods an interval timer will catch up on in one poll
const MAX_CATCH_UP: u32 = 10;

/// Fixed-timestep frame accumulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameLoop {
    step_ms: f64,
    max_substeps: u32,
    accumulator_ms: f64,
    last_ms: Option<u64>,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new(FRAME_HZ, MAX_SUBSTEPS)
    }
}

impl FrameLoop {
    pub fn new(hz: u32, max_substeps: u32) -> Self {
        Self {
            step_ms: 1_000.0 / hz.max(1) as f64,
            max_substeps: max_substeps.max(1),
            accumulator_ms: 0.0,
            last_ms: None,
        }
    }

    pub fn step_ms(&self) -> f64 {
        self.step_ms
    }

    pub fn start(&mut self, now_ms: u64) {
        self.last_ms = Some(now_ms);
        self.accumulator_ms = 0.0;
    }

    /// Release the loop; later polls report nothing until restarted
    pub fn stop(&mut self) {
        self.last_ms = None;
        self.accumulator_ms = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.last_ms.is_some()
    }

    /// Number of frames due at `now_ms`
    pub fn poll(&mut self, now_ms: u64) -> u32 {
        let Some(last) = self.last_ms else {
            return 0;
        };
        let elapsed = now_ms.saturating_sub(last) as f64;
        self.last_ms = Some(now_ms);
        self.accumulator_ms += elapsed.min(MAX_FRAME_GAP_MS);

        let mut frames = 0;
        while self.accumulator_ms >= self.step_ms && frames < self.max_substeps {
            self.accumulator_ms -= self.step_ms;
            frames += 1;
        }
        frames
    }
}

/// Fixed-period timer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalTimer {
    period_ms: u64,
    next_due_ms: Option<u64>,
}

impl IntervalTimer {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms: period_ms.max(1),
            next_due_ms: None,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Arm the timer; the first tick is due one period from now
    pub fn start(&mut self, now_ms: u64) {
        self.next_due_ms = Some(now_ms + self.period_ms);
    }

    pub fn stop(&mut self) {
        self.next_due_ms = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due_ms.is_some()
    }

    /// Number of periods elapsed at `now_ms`, capped after a long stall
    pub fn poll(&mut self, now_ms: u64) -> u32 {
        let Some(due) = self.next_due_ms else {
            return 0;
        };
        if now_ms < due {
            return 0;
        }
        let elapsed_periods = (now_ms - due) / self.period_ms + 1;
        if elapsed_periods > MAX_CATCH_UP as u64 {
            log::warn!("Timer stalled for {elapsed_periods} periods, skipping ahead");
            self.next_due_ms = Some(now_ms + self.period_ms);
            return MAX_CATCH_UP;
        }
        self.next_due_ms = Some(due + elapsed_periods * self.period_ms);
        elapsed_periods as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_loop_reports_nothing() {
        let mut frames = FrameLoop::default();
        assert_eq!(frames.poll(1_000), 0);
        frames.start(0);
        frames.stop();
        assert_eq!(frames.poll(1_000), 0);
        assert!(!frames.is_running());
    }

    #[test]
    fn test_frame_accumulator() {
        let mut frames = FrameLoop::new(100, 8);
        frames.start(0);
        assert_eq!(frames.poll(5), 0);
        assert_eq!(frames.poll(10), 1);
        assert_eq!(frames.poll(35), 2);
        // Leftover 5ms carries into the next poll
        assert_eq!(frames.poll(40), 1);
    }

    #[test]
    fn test_frame_gap_clamped() {
        let mut frames = FrameLoop::new(50, 8);
        frames.start(0);
        // A ten second stall yields only the clamped gap's worth of frames
        assert_eq!(frames.poll(10_000), 5);
    }

    #[test]
    fn test_interval_timer() {
        let mut timer = IntervalTimer::new(3_000);
        assert_eq!(timer.poll(10_000), 0);
        timer.start(0);
        assert_eq!(timer.poll(2_999), 0);
        assert_eq!(timer.poll(3_000), 1);
        assert_eq!(timer.poll(5_999), 0);
        assert_eq!(timer.poll(12_000), 3);
        timer.stop();
        assert_eq!(timer.poll(100_000), 0);
    }

    #[test]
    fn test_interval_timer_stall() {
        let mut timer = IntervalTimer::new(1_000);
        timer.start(0);
        assert_eq!(timer.poll(60_000), MAX_CATCH_UP);
        assert_eq!(timer.poll(60_500), 0);
        assert_eq!(timer.poll(61_000), 1);
    }
}
