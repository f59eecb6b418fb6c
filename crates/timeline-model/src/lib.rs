//! Cutline Timeline Model
//!
//! Defines the core data contracts for Cutline projects:
//! - **Clips:** placed media segments with trim, volume, and mute
//! - **Tracks:** fixed lanes with the media kinds they accept
//! - **Timeline:** the owned clip store and its no-overlap invariant
//! - **Project:** top-level metadata, timeline, and export options
//!
//! All times are seconds on the timeline as `f64`.

pub mod clip;
pub mod project;
pub mod timeline;
pub mod track;

pub use clip::*;
pub use project::*;
pub use timeline::*;
pub use track::*;
