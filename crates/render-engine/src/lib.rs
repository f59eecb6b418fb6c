//! Cutline Render Engine
//!
//! Turns a timeline into a sequence of transcoder invocations and runs
//! them to produce a single exported file.
//!
//! # Pipeline Architecture
//!
//! ```text
//! video lane ──▶ concat manifest ──▶ Concatenate (-c copy)
//!                                          │
//! audio lanes ──▶ atrim/adelay/volume ─────┤
//!                                          ▼
//!                                      MixAudio (amix, only with audio clips)
//!                                          │
//! ExportOptions ──▶ size + preset ─────────┤
//!                                          ▼
//!                                      Encode (mp4 / webm / gif)
//!                                          │
//!                                          ▼
//!                                      output file
//! ```
//!
//! Planning ([`plan`]) is pure apart from resolving source paths. Running
//! ([`export`]) happens in a scratch directory that is always removed; the
//! output path only ever sees a finished file.

pub mod error;
pub mod export;
pub mod plan;

pub use error::RenderError;
pub use export::*;
pub use plan::*;
