//! Cutline Playback
//!
//! Drives preview playback from a single logical clock:
//!
//! ```text
//! PlaybackClock ──advance──▶ resolve_at ──PlaybackView──▶ Synchronizer ──▶ MediaResource
//!                            (phases, volume)             (play/pause/seek/volume)
//! ```
//!
//! The timeline is never mutated here. Callers pass the current clip set
//! on every tick; media elements are acquired from a caller-supplied
//! [`ResourcePool`] and released again when their clip leaves the view.

pub mod error;
pub mod resources;
pub mod session;
pub mod sync;

pub use error::PlaybackError;
pub use resources::{MediaResource, ResourcePool, SyncReport, Synchronizer};
pub use session::PlaybackSession;
pub use sync::*;
