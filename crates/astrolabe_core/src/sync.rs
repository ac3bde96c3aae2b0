//! Cluster synchronization payload.
//!
//! After its update tick the authoritative process captures the state every
//! follower needs to render an identical frame: simulation time, rate and
//! pause flag, plus the position/rotation of each synced entity (cameras).
//! Followers decode the frame and apply it verbatim before their render phase.
//!
//! # Wire layout
//!
//! All values are native-endian and tightly packed:
//!
//! | bytes        | content                                   |
//! |--------------|-------------------------------------------|
//! | 0..8         | [`SyncFrameHeader`] (entity count)        |
//! | 8..32        | [`TimeSnapshot`]                          |
//! | 32..         | `entity_count` × [`EntitySnapshot`]       |
//!
//! Transport is not part of this crate.

use bytemuck::{Pod, Zeroable};
use glam::{DQuat, DVec3};

use crate::errors::{AstrolabeError, Result};

/// A value that can be captured after the update tick and restored by
/// follower processes before they render.
pub trait Syncable {
    type Snapshot: Pod;

    fn snapshot(&self) -> Self::Snapshot;

    fn apply_snapshot(&mut self, snapshot: &Self::Snapshot);
}

/// Simulation time state shared across the cluster.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TimeSnapshot {
    pub simulation_time: f64,
    pub rate: f64,
    pub paused: u32,
    _padding: u32,
}

impl TimeSnapshot {
    #[must_use]
    pub fn new(simulation_time: f64, rate: f64, paused: bool) -> Self {
        Self {
            simulation_time,
            rate,
            paused: u32::from(paused),
            _padding: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused != 0
    }
}

/// Position and orientation of one synced entity.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct EntitySnapshot {
    pub position: [f64; 3],
    /// Quaternion as `[x, y, z, w]`.
    pub rotation: [f64; 4],
}

impl EntitySnapshot {
    #[must_use]
    pub fn new(position: DVec3, rotation: DQuat) -> Self {
        Self {
            position: position.to_array(),
            rotation: rotation.to_array(),
        }
    }

    #[must_use]
    pub fn position(&self) -> DVec3 {
        DVec3::from_array(self.position)
    }

    #[must_use]
    pub fn rotation(&self) -> DQuat {
        DQuat::from_array(self.rotation)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SyncFrameHeader {
    pub entity_count: u32,
    _padding: u32,
}

const HEADER_SIZE: usize = size_of::<SyncFrameHeader>();
const TIME_SIZE: usize = size_of::<TimeSnapshot>();
const ENTITY_SIZE: usize = size_of::<EntitySnapshot>();

/// One frame worth of synced state.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncFrame {
    pub time: TimeSnapshot,
    pub entities: Vec<EntitySnapshot>,
}

impl SyncFrame {
    #[must_use]
    pub fn new(time: TimeSnapshot, entities: Vec<EntitySnapshot>) -> Self {
        Self { time, entities }
    }

    /// Byte length of an encoded frame carrying `entity_count` entities.
    #[must_use]
    pub const fn encoded_len(entity_count: usize) -> usize {
        HEADER_SIZE + TIME_SIZE + entity_count * ENTITY_SIZE
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let header = SyncFrameHeader {
            entity_count: self.entities.len() as u32,
            _padding: 0,
        };

        let mut bytes = Vec::with_capacity(Self::encoded_len(self.entities.len()));
        bytes.extend_from_slice(bytemuck::bytes_of(&header));
        bytes.extend_from_slice(bytemuck::bytes_of(&self.time));
        bytes.extend_from_slice(bytemuck::cast_slice(&self.entities));
        bytes
    }

    /// Decodes a frame produced by [`encode`](Self::encode). The buffer does
    /// not need to be aligned.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE + TIME_SIZE {
            return Err(AstrolabeError::SnapshotSize {
                expected: HEADER_SIZE + TIME_SIZE,
                actual: bytes.len(),
            });
        }

        let header: SyncFrameHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_SIZE]);
        let expected = Self::encoded_len(header.entity_count as usize);
        if bytes.len() != expected {
            return Err(AstrolabeError::SnapshotSize {
                expected,
                actual: bytes.len(),
            });
        }

        let time: TimeSnapshot =
            bytemuck::pod_read_unaligned(&bytes[HEADER_SIZE..HEADER_SIZE + TIME_SIZE]);
        let entities = bytes[HEADER_SIZE + TIME_SIZE..]
            .chunks_exact(ENTITY_SIZE)
            .map(bytemuck::pod_read_unaligned::<EntitySnapshot>)
            .collect();

        Ok(Self { time, entities })
    }
}
