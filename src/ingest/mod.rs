//! Telemetry ingestion from external services.
//!
//! Submodules:
//! - `flood_api`: the aggregated flood-data endpoint (single request).
//! - `per_site`: concurrent per-site fetches with independent fallback.

pub mod flood_api;
pub mod per_site;
