use astrolabe_core::errors::{AstrolabeError, Result};
use serde::{Deserialize, Serialize};

use crate::keyframe::Keyframe;

/// Simulation-time state scheduled by a time keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeKeyframeData {
    /// Simulation time in seconds.
    pub time: f64,
    /// Simulation seconds per application second.
    pub rate: f64,
    /// While paused the rate is kept but the effective derivative is zero.
    #[serde(default)]
    pub pause: bool,
    /// A deliberate discontinuity: applied, never interpolated through.
    #[serde(default)]
    pub jump: bool,
}

impl TimeKeyframeData {
    #[must_use]
    pub fn new(time: f64, rate: f64, pause: bool, jump: bool) -> Self {
        Self {
            time,
            rate,
            pause,
            jump,
        }
    }

    /// The time derivative this keyframe asks for.
    #[inline]
    #[must_use]
    pub fn effective_rate(&self) -> f64 {
        if self.pause { 0.0 } else { self.rate }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.time.is_finite() && self.rate.is_finite()
    }
}

/// Result of sampling the transition between two keyframes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolatedTime {
    pub time: f64,
    /// d(simulation time) / d(application time) at the sample.
    pub rate: f64,
}

/// Samples the cubic Hermite blend between `past` and `future` at `now`.
///
/// ```text
/// τ = (now - t0) / (t1 - t0)
/// a = y0' * (t1 - t0) - (y1 - y0)
/// b = -y1' * (t1 - t0) + (y1 - y0)
/// q = (1-τ)*y0 + τ*y1 + τ*(1-τ)*(a*(1-τ) + b*τ)
/// ```
///
/// The curve matches both endpoint values and both endpoint rates (a paused
/// endpoint has rate zero), so rate changes never show a derivative jump.
///
/// A zero-length or reversed interval is a scheduling error and is reported,
/// as is any non-finite result.
pub fn interpolate(
    past: &Keyframe<TimeKeyframeData>,
    future: &Keyframe<TimeKeyframeData>,
    now: f64,
) -> Result<InterpolatedTime> {
    let delta_app = future.timestamp - past.timestamp;
    if delta_app.is_nan() || delta_app <= 0.0 {
        return Err(AstrolabeError::DegenerateInterpolation {
            past: past.timestamp,
            future: future.timestamp,
        });
    }

    let y0 = past.data.time;
    let y1 = future.data.time;
    let k0 = past.data.effective_rate();
    let k1 = future.data.effective_rate();
    let delta_sim = y1 - y0;

    let t = (now - past.timestamp) / delta_app;
    let a = k0 * delta_app - delta_sim;
    let b = -k1 * delta_app + delta_sim;
    let u = 1.0 - t;

    let time = u * y0 + t * y1 + t * u * (a * u + b * t);

    // dq/dτ, then chain rule to application time
    let dq_dt = delta_sim + (1.0 - 2.0 * t) * (a * u + b * t) + t * u * (b - a);
    let rate = dq_dt / delta_app;

    if !time.is_finite() {
        return Err(AstrolabeError::NonFiniteTime("interpolated simulation time"));
    }
    if !rate.is_finite() {
        return Err(AstrolabeError::NonFiniteTime("interpolated rate"));
    }

    Ok(InterpolatedTime { time, rate })
}
