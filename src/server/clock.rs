//! First-order delay-locked loop used to smooth record-side device
//! timestamps into a steady monotonic timeline.
//!
//! Grounded on the clock model described in the design (§4.F "Clock model
//! (record side)"): a DLL with bandwidth ≈ 0.05 and nominal rate 1024/48000,
//! the same structure PipeWire's own `dll.h` uses for graph-clock smoothing,
//! with a hard resync whenever the model drifts too far from reality.
//!
//! ```text
//! error  = observed - predicted
//! resync if |error| outside [-50ms, +200ms], or |correction| > 20ms per step
//! ```

use std::time::Duration;

/// DLL bandwidth, dimensionless (fraction of the nominal rate corrected per
/// update).
const BANDWIDTH: f64 = 0.05;

/// Nominal rate the loop is tuned for: 1024 frames per 48000 Hz period.
const NOMINAL_PERIOD_FRAMES: f64 = 1024.0;
const NOMINAL_RATE_HZ: f64 = 48000.0;

const RESYNC_WINDOW_NEG: Duration = Duration::from_millis(50);
const RESYNC_WINDOW_POS: Duration = Duration::from_millis(200);
const MAX_STEP_CORRECTION: Duration = Duration::from_millis(20);

/// A first-order DLL tracking the relationship between device time and a
/// smoothed local timeline.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    /// Smoothed estimate of "now" on the local timeline, in nanoseconds.
    smoothed_now_ns: i64,
    /// Smoothed rate correction (local-seconds per device-second - 1).
    rate_error: f64,
    initialised: bool,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            smoothed_now_ns: 0,
            rate_error: 0.0,
            initialised: false,
        }
    }
}

/// Outcome of feeding one device timestamp sample into the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// The loop adjusted smoothly; `emit_ns` is the timestamp to report.
    Smoothed { emit_ns: i64 },
    /// The error was large enough that the loop snapped straight to the
    /// observed value instead of correcting gradually.
    Resynced { emit_ns: i64 },
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one `(device_now_ns, ticks, rate)` sample, as reported by the
    /// engine, returning the local timestamp to attach to the record packet
    /// whose send instant this sample marks.
    pub fn update(&mut self, device_now_ns: u64, period_frames: f64, rate_hz: f64) -> Update {
        let observed = device_now_ns as i64;

        if !self.initialised {
            self.smoothed_now_ns = observed;
            self.initialised = true;
            return Update::Resynced { emit_ns: observed };
        }

        let error_ns = observed - self.smoothed_now_ns;

        let outside_window = if error_ns < 0 {
            Duration::from_nanos((-error_ns) as u64) > RESYNC_WINDOW_NEG
        } else {
            Duration::from_nanos(error_ns as u64) > RESYNC_WINDOW_POS
        };

        if outside_window {
            self.smoothed_now_ns = observed;
            self.rate_error = 0.0;
            return Update::Resynced { emit_ns: observed };
        }

        // Scale bandwidth to the nominal rate/period this loop was tuned for.
        let rate_scale = (period_frames / NOMINAL_PERIOD_FRAMES) * (NOMINAL_RATE_HZ / rate_hz);
        let correction = (error_ns as f64) * BANDWIDTH * rate_scale;

        let clamp_ns = MAX_STEP_CORRECTION.as_nanos() as f64;
        let correction = correction.clamp(-clamp_ns, clamp_ns);

        self.smoothed_now_ns += correction as i64;
        self.rate_error += correction / NOMINAL_RATE_HZ;

        Update::Smoothed {
            emit_ns: self.smoothed_now_ns,
        }
    }

    /// The most recent smoothed "now", in nanoseconds.
    pub fn now_ns(&self) -> i64 {
        self.smoothed_now_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_initialises_without_smoothing() {
        let mut clock = Clock::new();
        let update = clock.update(1_000_000, NOMINAL_PERIOD_FRAMES, NOMINAL_RATE_HZ);
        assert_eq!(update, Update::Resynced { emit_ns: 1_000_000 });
    }

    #[test]
    fn small_jitter_is_smoothed_not_snapped() {
        let mut clock = Clock::new();
        clock.update(0, NOMINAL_PERIOD_FRAMES, NOMINAL_RATE_HZ);

        // Perfectly on schedule: no error at all.
        let on_time_ns = (NOMINAL_PERIOD_FRAMES / NOMINAL_RATE_HZ * 1e9) as u64;
        let update = clock.update(on_time_ns, NOMINAL_PERIOD_FRAMES, NOMINAL_RATE_HZ);
        assert!(matches!(update, Update::Smoothed { .. }));
    }

    #[test]
    fn large_positive_error_forces_resync() {
        let mut clock = Clock::new();
        clock.update(0, NOMINAL_PERIOD_FRAMES, NOMINAL_RATE_HZ);

        let huge_jump_ns = 300_000_000u64; // 300ms, outside [+0, +200ms]
        let update = clock.update(huge_jump_ns, NOMINAL_PERIOD_FRAMES, NOMINAL_RATE_HZ);
        assert_eq!(update, Update::Resynced { emit_ns: huge_jump_ns as i64 });
    }

    #[test]
    fn large_negative_error_forces_resync() {
        let mut clock = Clock::new();
        clock.update(100_000_000, NOMINAL_PERIOD_FRAMES, NOMINAL_RATE_HZ);

        let update = clock.update(0, NOMINAL_PERIOD_FRAMES, NOMINAL_RATE_HZ);
        assert_eq!(update, Update::Resynced { emit_ns: 0 });
    }

    #[test]
    fn per_step_correction_never_exceeds_clamp() {
        let mut clock = Clock::new();
        clock.update(0, NOMINAL_PERIOD_FRAMES, NOMINAL_RATE_HZ);

        // 60ms error: inside the resync window but large relative to bandwidth.
        let update = clock.update(60_000_000, NOMINAL_PERIOD_FRAMES, NOMINAL_RATE_HZ);
        if let Update::Smoothed { emit_ns } = update {
            assert!(emit_ns <= MAX_STEP_CORRECTION.as_nanos() as i64);
        } else {
            panic!("expected smoothed update within the resync window");
        }
    }
}
