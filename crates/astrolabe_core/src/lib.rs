//! Foundational types shared by the Astrolabe crates.
//!
//! - [`errors`]: the [`AstrolabeError`] type and [`Result`] alias
//! - [`transform`]: [`TransformData`], the similarity transform composed by
//!   relative-transform queries
//! - [`clock`]: the externally driven [`ApplicationClock`]
//! - [`sync`]: [`Syncable`] snapshots and the [`SyncFrame`] cluster payload

pub mod clock;
pub mod errors;
pub mod sync;
pub mod transform;

pub use clock::{ApplicationClock, ManualClock};
pub use errors::{AstrolabeError, Result};
pub use sync::{EntitySnapshot, SyncFrame, Syncable, TimeSnapshot};
pub use transform::TransformData;
