//! Error Types
//!
//! This module defines the error type shared by every Astrolabe crate.
//!
//! # Overview
//!
//! [`AstrolabeError`] covers the recoverable failure modes:
//! - Scene graph structure errors (duplicate names, missing parents, cycles)
//! - Scene description and provider construction errors
//! - Timeline and time-arithmetic errors
//! - Sync payload decoding errors
//! - I/O and JSON errors while loading descriptions or settings
//!
//! Invariant violations (walking a detached node, using a stale handle in a
//! relative-transform query) are bugs in tree maintenance and panic instead.
//!
//! # Usage
//!
//! ```rust,ignore
//! use astrolabe_core::errors::{AstrolabeError, Result};
//!
//! fn find(name: &str) -> Result<()> {
//!     Err(AstrolabeError::NodeNotFound(name.to_string()))
//! }
//! ```

use thiserror::Error;

/// The main error type for the Astrolabe engine.
#[derive(Error, Debug)]
pub enum AstrolabeError {
    // ========================================================================
    // Scene Graph Errors
    // ========================================================================
    /// No node with the given name exists in the graph.
    #[error("Scene graph node not found: {0}")]
    NodeNotFound(String),

    /// A node with the given name is already registered.
    #[error("Duplicate scene graph node name: {0}")]
    DuplicateNodeName(String),

    /// The parent referenced by a node description does not exist.
    #[error("Node '{node}' references missing parent '{parent}'")]
    MissingParent {
        /// Name of the node being constructed
        node: String,
        /// Name of the parent that could not be resolved
        parent: String,
    },

    /// Parent references of a scene description loop back on themselves.
    #[error("Parent references form a cycle: {}", .0.join(" -> "))]
    ParentCycle(Vec<String>),

    /// The root node can never be removed.
    #[error("The root node cannot be removed")]
    CannotRemoveRoot,

    /// The root node can never be attached below another node.
    #[error("The root node cannot be re-parented")]
    CannotReparentRoot,

    /// Attaching `child` below `parent` would create a cycle.
    #[error("Attaching '{child}' to '{parent}' would create a cycle")]
    CyclicAttachment {
        /// Node being moved
        child: String,
        /// Requested new parent
        parent: String,
    },

    // ========================================================================
    // Description Errors
    // ========================================================================
    /// A node or scene description is malformed.
    #[error("Invalid scene description: {0}")]
    InvalidDescription(String),

    /// A translation, rotation, scale or renderable could not be built.
    #[error("Failed to construct provider for node '{node}': {reason}")]
    ProviderConstruction {
        /// Name of the node being constructed
        node: String,
        /// Why construction failed
        reason: String,
    },

    /// Loading a scene description failed; the scene was reset to its root.
    #[error("Failed to load scene '{name}': {reason}")]
    SceneLoad {
        /// Name or path of the scene description
        name: String,
        /// Why loading failed
        reason: String,
    },

    // ========================================================================
    // Timeline & Time Errors
    // ========================================================================
    /// A keyframe already exists at this timestamp.
    #[error("A keyframe already exists at timestamp {0}")]
    DuplicateKeyframe(f64),

    /// A keyframe timestamp or payload is NaN or infinite.
    #[error("Keyframe at timestamp {0} contains a non-finite value")]
    NonFiniteKeyframe(f64),

    /// Two interpolation anchors share a timestamp or are out of order.
    #[error("Degenerate interpolation interval [{past}, {future}]")]
    DegenerateInterpolation {
        /// Timestamp of the past keyframe
        past: f64,
        /// Timestamp of the future keyframe
        future: f64,
    },

    /// A time computation produced NaN or infinity.
    #[error("Non-finite value produced while computing {0}")]
    NonFiniteTime(&'static str),

    /// A transition duration is negative or not finite.
    #[error("Invalid interpolation duration: {0}")]
    InvalidDuration(f64),

    /// A callback handle was never issued or was already removed.
    #[error("Unknown callback handle: {0}")]
    UnknownCallbackHandle(u64),

    // ========================================================================
    // Sync Payload Errors
    // ========================================================================
    /// A sync frame buffer does not have the expected layout.
    #[error("Malformed sync frame: expected {expected} bytes, got {actual}")]
    SnapshotSize {
        /// Expected byte length
        expected: usize,
        /// Actual byte length
        actual: usize,
    },

    // ========================================================================
    // I/O & Parsing Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Alias for `Result<T, AstrolabeError>`.
pub type Result<T> = std::result::Result<T, AstrolabeError>;
