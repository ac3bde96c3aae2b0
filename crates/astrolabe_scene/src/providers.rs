//! Transform providers.
//!
//! A node owns one provider per axis. Each provider is a closed set of
//! strategies chosen from the `type` tag of its description; [`update`]
//! recomputes the cached value for the current simulation time and the
//! accessor hands it out for the rest of the frame.
//!
//! [`update`]: TranslationProvider::update

use std::f64::consts::TAU;

use glam::{DMat3, DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};

use crate::node::UpdateData;

// ============================================================================
// Sampled tracks
// ============================================================================

pub trait Interpolatable: Copy {
    fn interpolate_linear(start: Self, end: Self, t: f64) -> Self;
}

impl Interpolatable for f64 {
    fn interpolate_linear(start: Self, end: Self, t: f64) -> Self {
        start + (end - start) * t
    }
}

impl Interpolatable for DVec3 {
    fn interpolate_linear(start: Self, end: Self, t: f64) -> Self {
        start.lerp(end, t)
    }
}

const MAX_SCAN_OFFSET: usize = 3;

/// Piecewise linear samples over simulation time, clamped at both ends.
#[derive(Debug, Clone)]
pub struct SampledTrack<T: Interpolatable> {
    times: Vec<f64>,
    values: Vec<T>,
    last_index: usize,
}

impl<T: Interpolatable> SampledTrack<T> {
    /// Fails unless there is at least one sample and times are finite and
    /// strictly increasing.
    pub fn new(times: Vec<f64>, values: Vec<T>) -> Result<Self, String> {
        if times.is_empty() {
            return Err("sampled track needs at least one sample".to_string());
        }
        if times.len() != values.len() {
            return Err(format!(
                "sampled track has {} times but {} values",
                times.len(),
                values.len()
            ));
        }
        if times.iter().any(|t| !t.is_finite()) {
            return Err("sample times must be finite".to_string());
        }
        if times.windows(2).any(|w| w[0] >= w[1]) {
            return Err("sample times must be strictly increasing".to_string());
        }
        Ok(Self {
            times,
            values,
            last_index: 0,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Samples at `time`, remembering the segment for the next call.
    ///
    /// Playback normally moves forward by a few samples per frame, so a short
    /// linear scan from the last segment is tried before a binary search.
    pub fn sample(&mut self, time: f64) -> T {
        let len = self.times.len();
        if len == 1 || time <= self.times[0] {
            self.last_index = 0;
            return self.values[0];
        }
        if time >= self.times[len - 1] {
            self.last_index = len - 1;
            return self.values[len - 1];
        }

        let start = self.last_index.min(len - 2);
        let scanned = (start..=(start + MAX_SCAN_OFFSET).min(len - 2))
            .find(|&i| self.times[i] <= time && time < self.times[i + 1]);
        let index = scanned.unwrap_or_else(|| self.times.partition_point(|&t| t <= time) - 1);
        self.last_index = index;

        let t0 = self.times[index];
        let t1 = self.times[index + 1];
        let t = ((time - t0) / (t1 - t0)).clamp(0.0, 1.0);
        T::interpolate_linear(self.values[index], self.values[index + 1], t)
    }
}

// ============================================================================
// Descriptions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub time: f64,
    pub position: [f64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleSample {
    pub time: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TranslationDescription {
    Static {
        position: [f64; 3],
    },
    /// Circle in the XY plane, tilted about X by `inclination` radians.
    CircularOrbit {
        radius: f64,
        period: f64,
        #[serde(default)]
        epoch: f64,
        #[serde(default)]
        inclination: f64,
    },
    Sampled {
        samples: Vec<PositionSample>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RotationDescription {
    /// XYZ Euler angles in radians.
    StaticEuler { angles: [f64; 3] },
    /// `[x, y, z, w]`, normalized on construction.
    StaticQuaternion { quaternion: [f64; 4] },
    /// Column-major rotation matrix.
    StaticMatrix { matrix: [[f64; 3]; 3] },
    Spin {
        axis: [f64; 3],
        period: f64,
        #[serde(default)]
        epoch: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScaleDescription {
    Static { scale: f64 },
    Sampled { samples: Vec<ScaleSample> },
}

fn require_finite(name: &str, value: f64) -> Result<f64, String> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{name} must be finite, got {value}"))
    }
}

fn require_positive(name: &str, value: f64) -> Result<f64, String> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{name} must be positive, got {value}"))
    }
}

fn require_finite_vec(name: &str, v: DVec3) -> Result<DVec3, String> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("{name} must be finite, got {v}"))
    }
}

// ============================================================================
// Translation
// ============================================================================

#[derive(Debug, Clone)]
enum TranslationKind {
    Static,
    CircularOrbit {
        radius: f64,
        period: f64,
        epoch: f64,
        inclination: f64,
    },
    Sampled(SampledTrack<DVec3>),
}

/// Supplies a node's position in its parent's frame.
#[derive(Debug, Clone)]
pub struct TranslationProvider {
    kind: TranslationKind,
    position: DVec3,
    initialized: bool,
}

impl Default for TranslationProvider {
    fn default() -> Self {
        Self::fixed(DVec3::ZERO)
    }
}

impl TranslationProvider {
    #[must_use]
    pub fn fixed(position: DVec3) -> Self {
        Self {
            kind: TranslationKind::Static,
            position,
            initialized: false,
        }
    }

    pub fn from_description(desc: &TranslationDescription) -> Result<Self, String> {
        match desc {
            TranslationDescription::Static { position } => Ok(Self::fixed(require_finite_vec(
                "position",
                DVec3::from_array(*position),
            )?)),
            TranslationDescription::CircularOrbit {
                radius,
                period,
                epoch,
                inclination,
            } => {
                let kind = TranslationKind::CircularOrbit {
                    radius: require_finite("radius", *radius)?,
                    period: require_positive("period", *period)?,
                    epoch: require_finite("epoch", *epoch)?,
                    inclination: require_finite("inclination", *inclination)?,
                };
                let mut provider = Self {
                    kind,
                    position: DVec3::ZERO,
                    initialized: false,
                };
                provider.position = provider.evaluate(*epoch);
                Ok(provider)
            }
            TranslationDescription::Sampled { samples } => {
                let times = samples.iter().map(|s| s.time).collect();
                let values: Vec<DVec3> =
                    samples.iter().map(|s| DVec3::from_array(s.position)).collect();
                if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
                    return Err(format!("sampled position must be finite, got {bad}"));
                }
                let first = values.first().copied().unwrap_or(DVec3::ZERO);
                Ok(Self {
                    kind: TranslationKind::Sampled(SampledTrack::new(times, values)?),
                    position: first,
                    initialized: false,
                })
            }
        }
    }

    fn evaluate(&mut self, time: f64) -> DVec3 {
        match &mut self.kind {
            TranslationKind::Static => self.position,
            TranslationKind::CircularOrbit {
                radius,
                period,
                epoch,
                inclination,
            } => {
                let angle = TAU * (time - *epoch) / *period;
                let in_plane = DVec3::new(angle.cos(), angle.sin(), 0.0) * *radius;
                DQuat::from_rotation_x(*inclination) * in_plane
            }
            TranslationKind::Sampled(track) => track.sample(time),
        }
    }

    pub fn initialize(&mut self) {
        self.initialized = true;
    }

    pub fn deinitialize(&mut self) {
        self.initialized = false;
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn update(&mut self, data: &UpdateData) {
        self.position = self.evaluate(data.time);
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> DVec3 {
        self.position
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self.kind, TranslationKind::Static)
    }
}

// ============================================================================
// Rotation
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum RotationKind {
    Static,
    Spin { axis: DVec3, period: f64, epoch: f64 },
}

/// Supplies a node's orientation relative to its parent.
#[derive(Debug, Clone)]
pub struct RotationProvider {
    kind: RotationKind,
    matrix: DMat3,
    initialized: bool,
}

impl Default for RotationProvider {
    fn default() -> Self {
        Self::fixed(DMat3::IDENTITY)
    }
}

/// Tolerance for accepting a user supplied matrix as a rotation.
const ORTHONORMAL_EPSILON: f64 = 1e-6;

impl RotationProvider {
    #[must_use]
    pub fn fixed(matrix: DMat3) -> Self {
        Self {
            kind: RotationKind::Static,
            matrix,
            initialized: false,
        }
    }

    pub fn from_description(desc: &RotationDescription) -> Result<Self, String> {
        match desc {
            RotationDescription::StaticEuler { angles } => {
                let [x, y, z] = *angles;
                require_finite_vec("euler angles", DVec3::new(x, y, z))?;
                Ok(Self::fixed(DMat3::from_euler(EulerRot::XYZ, x, y, z)))
            }
            RotationDescription::StaticQuaternion { quaternion } => {
                let q = DQuat::from_array(*quaternion);
                if !q.is_finite() || q.length_squared() == 0.0 {
                    return Err(format!("quaternion must be finite and non-zero, got {q}"));
                }
                Ok(Self::fixed(DMat3::from_quat(q.normalize())))
            }
            RotationDescription::StaticMatrix { matrix } => {
                let m = DMat3::from_cols_array_2d(matrix);
                let orthonormal =
                    (m.transpose() * m).abs_diff_eq(DMat3::IDENTITY, ORTHONORMAL_EPSILON);
                if !m.is_finite() || !orthonormal || m.determinant() <= 0.0 {
                    return Err("matrix must be a proper rotation".to_string());
                }
                Ok(Self::fixed(m))
            }
            RotationDescription::Spin {
                axis,
                period,
                epoch,
            } => {
                let axis = require_finite_vec("axis", DVec3::from_array(*axis))?;
                let axis = axis
                    .try_normalize()
                    .ok_or_else(|| "spin axis must be non-zero".to_string())?;
                let mut provider = Self {
                    kind: RotationKind::Spin {
                        axis,
                        period: require_positive("period", *period)?,
                        epoch: require_finite("epoch", *epoch)?,
                    },
                    matrix: DMat3::IDENTITY,
                    initialized: false,
                };
                provider.matrix = provider.evaluate(*epoch);
                Ok(provider)
            }
        }
    }

    fn evaluate(&self, time: f64) -> DMat3 {
        match self.kind {
            RotationKind::Static => self.matrix,
            RotationKind::Spin {
                axis,
                period,
                epoch,
            } => DMat3::from_axis_angle(axis, TAU * (time - epoch) / period),
        }
    }

    pub fn initialize(&mut self) {
        self.initialized = true;
    }

    pub fn deinitialize(&mut self) {
        self.initialized = false;
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn update(&mut self, data: &UpdateData) {
        self.matrix = self.evaluate(data.time);
    }

    #[inline]
    #[must_use]
    pub fn matrix(&self) -> DMat3 {
        self.matrix
    }
}

// ============================================================================
// Scale
// ============================================================================

#[derive(Debug, Clone)]
enum ScaleKind {
    Static,
    Sampled(SampledTrack<f64>),
}

/// Supplies a node's uniform scale relative to its parent.
#[derive(Debug, Clone)]
pub struct ScaleProvider {
    kind: ScaleKind,
    scale: f64,
    initialized: bool,
}

impl Default for ScaleProvider {
    fn default() -> Self {
        Self {
            kind: ScaleKind::Static,
            scale: 1.0,
            initialized: false,
        }
    }
}

impl ScaleProvider {
    /// Static scale; fails for zero, negative or non-finite values since
    /// relative transforms divide by it.
    pub fn fixed(scale: f64) -> Result<Self, String> {
        Ok(Self {
            kind: ScaleKind::Static,
            scale: require_positive("scale", scale)?,
            initialized: false,
        })
    }

    pub fn from_description(desc: &ScaleDescription) -> Result<Self, String> {
        match desc {
            ScaleDescription::Static { scale } => Self::fixed(*scale),
            ScaleDescription::Sampled { samples } => {
                let values = samples
                    .iter()
                    .map(|s| require_positive("sampled scale", s.scale))
                    .collect::<Result<Vec<_>, _>>()?;
                let times = samples.iter().map(|s| s.time).collect();
                let first = values.first().copied().unwrap_or(1.0);
                Ok(Self {
                    kind: ScaleKind::Sampled(SampledTrack::new(times, values)?),
                    scale: first,
                    initialized: false,
                })
            }
        }
    }

    pub fn initialize(&mut self) {
        self.initialized = true;
    }

    pub fn deinitialize(&mut self) {
        self.initialized = false;
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn update(&mut self, data: &UpdateData) {
        if let ScaleKind::Sampled(track) = &mut self.kind {
            self.scale = track.sample(data.time);
        }
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }
}
