//! Simulation time for Astrolabe.
//!
//! - [`keyframe`]: the generic sorted [`Timeline`] of [`Keyframe`]s
//! - [`interpolation`]: time keyframe payload and the Hermite transition
//! - [`manager`]: [`TimeManager`], which consumes the timeline every tick
//! - [`callbacks`]: change notification registries
//! - [`settings`]: [`TimeSettings`]

pub mod callbacks;
pub mod interpolation;
pub mod keyframe;
pub mod manager;
pub mod settings;

pub use callbacks::CallbackHandle;
pub use interpolation::{InterpolatedTime, TimeKeyframeData, interpolate};
pub use keyframe::{Keyframe, Timeline};
pub use manager::TimeManager;
pub use settings::TimeSettings;
