use serde::{Deserialize, Serialize};

/// Start-up configuration of the time manager.
///
/// ```rust,ignore
/// let settings = TimeSettings {
///     initial_rate: 3600.0,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSettings {
    /// Simulation time at start-up, in seconds since the epoch of choice.
    pub initial_time: f64,
    /// Simulation seconds per application second.
    pub initial_rate: f64,
    pub start_paused: bool,
    /// Transition length used by pause/rate changes when the caller does not
    /// pass one explicitly. Zero makes those changes instantaneous.
    pub default_interpolation_duration: f64,
}

impl Default for TimeSettings {
    fn default() -> Self {
        Self {
            initial_time: 0.0,
            initial_rate: 1.0,
            start_paused: false,
            default_interpolation_duration: 1.0,
        }
    }
}
