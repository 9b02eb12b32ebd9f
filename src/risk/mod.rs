//! Risk classification for hydrological telemetry.
//!
//! Submodules:
//! - `classify`: threshold bands and per-site assessment.
//! - `color`: display colors for each band.
//! - `aggregate`: worst-case reduction into one overall level.
//! - `staleness`: age checks for upstream snapshots.

pub mod aggregate;
pub mod classify;
pub mod color;
pub mod staleness;

pub use aggregate::aggregate;
pub use classify::{assess, classify};
pub use color::{color_for, color_for_label, Color};
