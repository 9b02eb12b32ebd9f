//! Flood-risk telemetry service for the Indus basin.
//!
//! Acquires river and dam readings from a flood-data endpoint, falls back to
//! a simulated snapshot when the endpoint is unavailable, and classifies each
//! site into NORMAL / WARNING / DANGER / EXTREME bands.

pub mod acquire;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod report;
pub mod risk;
pub mod simulate;
pub mod sites;
pub mod store;
pub mod verify;
