//! # Position Smoothing Filter
//!
//! Physics publishes at its own rate; render draws at another. Drawing the
//! latest raw position stutters whenever the two beat against each other.
//! This filter runs a 3-tap autoregressive model per axis over the last
//! three filtered positions and the new raw sample.
//!
//! ## Per update, per axis:
//! ```text
//! dp_i  = p - p_i                  (i = 0 oldest .. 2 newest)
//! dd_i  = |dp_i - mean(dp)|        S = dd_0 + dd_1 + dd_2
//!
//! S == 0  → k1 = k2 = 0, k3 = 1    (no motion: pass the sample through)
//! else    → weights favour the deviations closest to the mean, sum to 1
//!
//! a1 = -k1 - k1 dt    a2 = k1 dt - k2 - k2 dt    a3 = k2 dt    b0 = k3
//! out = -a1 p2 - a2 p1 - a3 p0 + b0 p
//! history ← (p1, p2, out)
//! ```
//!
//! The coefficients always sum to one, so a stationary signal passes through
//! unchanged and a linear one is followed with a bounded lag.
//!
//! `dt` is clamped to [`MAX_FILTER_DT`]; the recursion diverges on
//! multi-second frames.

/// Longest frame time the filter will use, about three frames at 30 Hz.
pub const MAX_FILTER_DT: f64 = 0.1;

/// Filter state for one axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisFilter {
    /// `[p0, p1, p2]`, oldest first.
    history: [f64; 3],
}

impl AxisFilter {
    /// Filter whose history is `value` three times.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self { history: [value; 3] }
    }

    /// Current history, oldest first.
    #[inline]
    #[must_use]
    pub fn history(&self) -> [f64; 3] {
        self.history
    }

    /// Filters one raw sample taken `dt` seconds after the previous one.
    ///
    /// `dt` above [`MAX_FILTER_DT`] is clamped to it; a negative or NaN `dt`
    /// counts as zero.
    pub fn update(&mut self, p: f64, dt: f64) -> f64 {
        let dt = if dt > 0.0 { dt.min(MAX_FILTER_DT) } else { 0.0 };
        let [p0, p1, p2] = self.history;
        let dp = [p - p0, p - p1, p - p2];
        let mean = (dp[0] + dp[1] + dp[2]) / 3.0;
        let dd = dp.map(|d| (d - mean).abs());
        let sum = dd[0] + dd[1] + dd[2];

        let (k1, k2, k3) = if sum == 0.0 || !sum.is_finite() {
            (0.0, 0.0, 1.0)
        } else {
            let half_inv = 0.5 / sum;
            (
                (sum - dd[1]) * half_inv,
                (sum - dd[0]) * half_inv,
                (sum - dd[2]) * half_inv,
            )
        };

        let a1 = -k1 - k1 * dt;
        let a2 = k1 * dt - k2 - k2 * dt;
        let a3 = k2 * dt;
        let b0 = k3;

        let filtered = -a1 * p2 - a2 * p1 - a3 * p0 + b0 * p;
        self.history = [p1, p2, filtered];
        filtered
    }
}

/// Three-axis position smoother used by the render loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothingFilter {
    axes: [AxisFilter; 3],
}

impl SmoothingFilter {
    /// Filter seeded with `position` as its entire history.
    #[must_use]
    pub fn new(position: [f64; 3]) -> Self {
        Self {
            axes: position.map(AxisFilter::new),
        }
    }

    /// Discards the history and reseeds it with `position`.
    pub fn reset(&mut self, position: [f64; 3]) {
        *self = Self::new(position);
    }

    /// Most recent filtered position.
    #[must_use]
    pub fn position(&self) -> [f64; 3] {
        self.axes.map(|axis| axis.history[2])
    }

    /// Filters one raw position sample; `dt` is the render frame time.
    pub fn update(&mut self, raw: [f64; 3], dt: f64) -> [f64; 3] {
        let mut out = [0.0; 3];
        for ((axis, p), o) in self.axes.iter_mut().zip(raw).zip(&mut out) {
            *o = axis.update(p, dt);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stationary_signal_is_exact() {
        let mut filter = SmoothingFilter::new([1.0, -2.0, -1000.0]);
        for _ in 0..10 {
            assert_eq!(filter.update([1.0, -2.0, -1000.0], 1.0 / 30.0), [1.0, -2.0, -1000.0]);
        }
    }

    #[test]
    fn test_step_input_stays_bounded() {
        let mut axis = AxisFilter::new(0.0);
        for _ in 0..200 {
            let out = axis.update(1.0, 1.0 / 30.0);
            assert!(out.is_finite());
            assert!(out.abs() < 10.0, "filter ran away: {out}");
        }
    }

    #[test]
    fn test_linear_signal_converges() {
        let mut axis = AxisFilter::new(0.0);
        let mut errors = Vec::new();
        for i in 1..=300 {
            let truth = 0.1 * f64::from(i);
            errors.push(truth - axis.update(truth, 1.0 / 30.0));
        }
        // Lag grows monotonically from the first sample towards 0.39.
        for (i, lag) in errors.iter().enumerate().skip(3) {
            assert!(*lag > 0.2 && *lag < 0.4, "sample {i}: lag {lag}");
        }
        let last = errors[errors.len() - 1];
        let previous = errors[errors.len() - 2];
        assert!((last - 0.39).abs() < 1e-3, "lag {last}");
        assert!((last - previous).abs() < 1e-6, "lag still changing");
    }

    #[test]
    fn test_long_frame_time_is_clamped() {
        let mut stalled = AxisFilter::new(0.0);
        let mut capped = AxisFilter::new(0.0);
        for i in 1..=200 {
            let truth = 0.1 * f64::from(i) + 0.05 * (1.7 * f64::from(i)).sin();
            let out = stalled.update(truth, 2.0);
            assert_eq!(out, capped.update(truth, MAX_FILTER_DT));
            assert!((truth - out).abs() < 1.0, "sample {i}: {out} vs {truth}");
        }
    }

    #[test]
    fn test_nan_frame_time_counts_as_zero() {
        let mut nan = AxisFilter::new(0.0);
        let mut zero = AxisFilter::new(0.0);
        for i in 1..=20 {
            let p = f64::from(i);
            assert_eq!(nan.update(p, f64::NAN), zero.update(p, 0.0));
        }
        assert!(nan.history().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_history_shifts() {
        let mut axis = AxisFilter::new(0.0);
        let out = axis.update(0.0, 0.1);
        assert_eq!(axis.history(), [0.0, 0.0, out]);
    }

    #[test]
    fn test_reset() {
        let mut filter = SmoothingFilter::new([0.0; 3]);
        filter.update([5.0, 5.0, 5.0], 0.1);
        filter.reset([2.0, 3.0, 4.0]);
        assert_eq!(filter.position(), [2.0, 3.0, 4.0]);
    }
}
