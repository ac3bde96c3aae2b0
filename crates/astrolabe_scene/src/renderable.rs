use std::f64::consts::FRAC_1_SQRT_2;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::node::UpdateData;

bitflags! {
    /// Render passes a renderable takes part in.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct RenderBin: u32 {
        const BACKGROUND  = 1 << 0;
        const OPAQUE      = 1 << 1;
        const TRANSPARENT = 1 << 2;
        const OVERLAY     = 1 << 3;
    }
}

/// Serialized name of a single [`RenderBin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderBinName {
    Background,
    #[default]
    Opaque,
    Transparent,
    Overlay,
}

impl From<RenderBinName> for RenderBin {
    fn from(name: RenderBinName) -> Self {
        match name {
            RenderBinName::Background => RenderBin::BACKGROUND,
            RenderBinName::Opaque => RenderBin::OPAQUE,
            RenderBinName::Transparent => RenderBin::TRANSPARENT,
            RenderBinName::Overlay => RenderBin::OVERLAY,
        }
    }
}

/// Closed set of payloads a node can draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RenderableKind {
    Sphere {
        radius: f64,
    },
    /// A camera-facing square with edge length `size`.
    Billboard {
        size: f64,
    },
    /// Drawn by an external module; only its footprint is known here.
    External {
        type_name: String,
        #[serde(default)]
        bounding_radius: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderableDescription {
    #[serde(flatten)]
    pub kind: RenderableKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub bin: RenderBinName,
}

fn default_enabled() -> bool {
    true
}

impl RenderableDescription {
    #[must_use]
    pub fn new(kind: RenderableKind) -> Self {
        Self {
            kind,
            enabled: true,
            bin: RenderBinName::default(),
        }
    }
}

/// Drawable payload owned by a scene graph node.
#[derive(Debug, Clone)]
pub struct Renderable {
    kind: RenderableKind,
    pub enabled: bool,
    pub visible: bool,
    bin: RenderBin,
    ready: bool,
    last_update_time: Option<f64>,
}

impl Renderable {
    #[must_use]
    pub fn new(kind: RenderableKind) -> Self {
        Self {
            kind,
            enabled: true,
            visible: true,
            bin: RenderBin::OPAQUE,
            ready: false,
            last_update_time: None,
        }
    }

    /// Builds a renderable; the error string names the offending field.
    pub fn from_description(desc: &RenderableDescription) -> Result<Self, String> {
        let footprint = match &desc.kind {
            RenderableKind::Sphere { radius } => ("radius", *radius),
            RenderableKind::Billboard { size } => ("size", *size),
            RenderableKind::External { type_name, bounding_radius } => {
                if type_name.is_empty() {
                    return Err("external renderable needs a type name".to_string());
                }
                ("bounding_radius", *bounding_radius)
            }
        };
        let (field, value) = footprint;
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{field} must be finite and non-negative, got {value}"));
        }

        let mut renderable = Self::new(desc.kind.clone());
        renderable.enabled = desc.enabled;
        renderable.bin = desc.bin.into();
        Ok(renderable)
    }

    #[must_use]
    pub fn kind(&self) -> &RenderableKind {
        &self.kind
    }

    #[must_use]
    pub fn bin(&self) -> RenderBin {
        self.bin
    }

    pub fn set_bin(&mut self, bin: RenderBin) {
        self.bin = bin;
    }

    #[must_use]
    pub fn matches_bin_mask(&self, mask: RenderBin) -> bool {
        self.bin.intersects(mask)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn initialize(&mut self) {
        self.ready = true;
    }

    pub fn deinitialize(&mut self) {
        self.ready = false;
        self.last_update_time = None;
    }

    pub fn update(&mut self, data: &UpdateData) {
        self.last_update_time = Some(data.time);
    }

    /// Simulation time of the last update since initialization.
    #[must_use]
    pub fn last_update_time(&self) -> Option<f64> {
        self.last_update_time
    }

    /// Radius of a sphere around the node origin enclosing the payload.
    #[must_use]
    pub fn bounding_sphere(&self) -> f64 {
        match &self.kind {
            RenderableKind::Sphere { radius } => *radius,
            RenderableKind::Billboard { size } => size * FRAC_1_SQRT_2,
            RenderableKind::External { bounding_radius, .. } => *bounding_radius,
        }
    }
}
