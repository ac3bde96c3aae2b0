use glam::{DMat3, DMat4, DQuat, DVec3};

/// A similarity transform: uniform scale, then rotation, then translation.
///
/// Maps a point `p` to `rotation * (scale * p) + translation`. Rotation and
/// uniform scale commute, so the order between them is irrelevant; the
/// translation is always applied last.
///
/// This is the value a scene graph node contributes to its parent's frame and
/// the value returned by relative-transform queries between two nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformData {
    pub translation: DVec3,
    pub rotation: DMat3,
    pub scale: f64,
}

impl TransformData {
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: DMat3::IDENTITY,
        scale: 1.0,
    };

    #[must_use]
    pub fn new(translation: DVec3, rotation: DMat3, scale: f64) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[must_use]
    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Returns `outer ∘ self`: first apply `self`, then `outer`.
    ///
    /// With `self` a child's local transform and `outer` its parent's, this is
    /// the child-to-grandparent composition
    /// `t' = R_p * t * s_p + T_p`, `R' = R_p * R`, `s' = s_p * s`.
    #[inline]
    #[must_use]
    pub fn then(&self, outer: &TransformData) -> TransformData {
        TransformData {
            translation: outer.rotation * (self.translation * outer.scale) + outer.translation,
            rotation: outer.rotation * self.rotation,
            scale: outer.scale * self.scale,
        }
    }

    /// The inverse transform. Assumes `rotation` is orthonormal and
    /// `scale` is non-zero.
    #[inline]
    #[must_use]
    pub fn inverse(&self) -> TransformData {
        let inv_rotation = self.rotation.transpose();
        let inv_scale = 1.0 / self.scale;
        TransformData {
            translation: -(inv_rotation * self.translation) * inv_scale,
            rotation: inv_rotation,
            scale: inv_scale,
        }
    }

    #[inline]
    #[must_use]
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * (point * self.scale) + self.translation
    }

    #[inline]
    #[must_use]
    pub fn transform_vector(&self, vector: DVec3) -> DVec3 {
        self.rotation * (vector * self.scale)
    }

    /// Homogeneous matrix `T * R * S`.
    #[must_use]
    pub fn to_mat4(&self) -> DMat4 {
        DMat4::from_translation(self.translation)
            * DMat4::from_mat3(self.rotation)
            * DMat4::from_scale(DVec3::splat(self.scale))
    }

    #[must_use]
    pub fn rotation_quat(&self) -> DQuat {
        DQuat::from_mat3(&self.rotation)
    }

    /// True when every component is within `epsilon` of `other`.
    #[must_use]
    pub fn abs_diff_eq(&self, other: &TransformData, epsilon: f64) -> bool {
        self.translation.abs_diff_eq(other.translation, epsilon)
            && self.rotation.abs_diff_eq(other.rotation, epsilon)
            && (self.scale - other.scale).abs() <= epsilon
    }
}

impl Default for TransformData {
    fn default() -> Self {
        Self::IDENTITY
    }
}
