/// Core data types for the flood-risk telemetry service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O: only types and the error enums every layer returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

/// Class of a monitored location.
///
/// `RimGroup` is not a physical site: it is the aggregate inflow measured
/// across the RIM stations, carried as a pseudo-site so it can be classified
/// and reported alongside the dams and barrages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SiteClass {
    Reservoir,
    Barrage,
    RiverStation,
    RimGroup,
}

impl fmt::Display for SiteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteClass::Reservoir => write!(f, "Reservoir"),
            SiteClass::Barrage => write!(f, "Barrage"),
            SiteClass::RiverStation => write!(f, "River Station"),
            SiteClass::RimGroup => write!(f, "RIM Stations"),
        }
    }
}

/// Which reading field a site's thresholds are compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Reservoir water level, in feet.
    Level,
    /// Inflow rate, in cusecs.
    Inflow,
}

/// Static storage bounds for a reservoir, in feet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReservoirBounds {
    pub dead_level_ft: f64,
    pub max_conservation_level_ft: f64,
}

/// Known-good values used to synthesize a reading when live data is
/// unavailable. `level_ft` is `None` for everything except reservoirs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteBaseline {
    pub level_ft: Option<f64>,
    pub inflow_cusecs: f64,
    pub outflow_cusecs: f64,
}

/// Risk band boundaries for a site, strictly increasing:
///   normal < warning < danger
///
/// The extreme boundary is derived, see [`Thresholds::extreme`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub normal: f64,
    pub warning: f64,
    pub danger: f64,
}

/// Fraction of the danger boundary added on top of it to form the extreme
/// boundary. Applied uniformly to every thresholded site.
pub const EXTREME_MARGIN: f64 = 0.10;

impl Thresholds {
    pub fn extreme(&self) -> f64 {
        self.danger + self.danger * EXTREME_MARGIN
    }
}

/// A monitored physical location (or the RIM aggregate).
#[derive(Debug)]
pub struct Site {
    /// Stable identifier, unique across the registry. Matches the key used
    /// by the flood-data endpoint.
    pub id: &'static str,
    pub name: &'static str,
    pub class: SiteClass,
    pub river: Option<&'static str>,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Reservoirs only.
    pub bounds: Option<ReservoirBounds>,
    /// Sites without thresholds always assess to NORMAL.
    pub thresholds: Option<Thresholds>,
    pub metric: Metric,
    pub baseline: SiteBaseline,
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// A single telemetry sample for one site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub site_id: String,
    /// Reservoirs only, in feet.
    pub level_ft: Option<f64>,
    pub inflow_cusecs: f64,
    pub outflow_cusecs: f64,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// The value a site's thresholds apply to.
    pub fn metric_value(&self, metric: Metric) -> f64 {
        match metric {
            // a reservoir reading without a level cannot be placed in a band
            Metric::Level => self.level_ft.unwrap_or(f64::NAN),
            Metric::Inflow => self.inflow_cusecs,
        }
    }

    /// Storage used between dead level and maximum conservation level, as a
    /// percentage. `None` unless both the level and the bounds are known.
    pub fn capacity_percent(&self, bounds: Option<&ReservoirBounds>) -> Option<f64> {
        let level = self.level_ft?;
        let b = bounds?;
        let span = b.max_conservation_level_ft - b.dead_level_ft;
        if span <= 0.0 {
            return None;
        }
        Some((level - b.dead_level_ft) / span * 100.0)
    }
}

// ---------------------------------------------------------------------------
// Risk levels
// ---------------------------------------------------------------------------

/// Risk bands in ascending order of severity. The derived `Ord` is the
/// total order the aggregator relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Normal,
    Warning,
    Danger,
    Extreme,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Normal,
        RiskLevel::Warning,
        RiskLevel::Danger,
        RiskLevel::Extreme,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Normal => "NORMAL",
            RiskLevel::Warning => "WARNING",
            RiskLevel::Danger => "DANGER",
            RiskLevel::Extreme => "EXTREME",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(RiskLevel::Normal),
            "WARNING" => Ok(RiskLevel::Warning),
            "DANGER" => Ok(RiskLevel::Danger),
            "EXTREME" => Ok(RiskLevel::Extreme),
            other => Err(format!("unknown risk level '{}'", other)),
        }
    }
}

/// Where a snapshot's values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Provenance {
    /// Fresh data from the flood-data endpoint.
    Live,
    /// Endpoint data whose upstream timestamp is older than the freshness
    /// window.
    Cached,
    /// Synthesized locally from site baselines.
    Simulated,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Live => write!(f, "live"),
            Provenance::Cached => write!(f, "cached"),
            Provenance::Simulated => write!(f, "simulated"),
        }
    }
}

/// Source tag attached to locally synthesized snapshots.
pub const SIMULATED_SOURCE: &str = "SIMULATED (fallback)";

// ---------------------------------------------------------------------------
// Assessments and snapshots
// ---------------------------------------------------------------------------

/// Classification of one reading. Recomputed every refresh, never stored
/// beyond the snapshot that owns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub site_id: String,
    pub risk_level: RiskLevel,
    pub reading: Reading,
    pub thresholds: Option<Thresholds>,
    pub provenance: Provenance,
}

/// One complete refresh result: every registry site plus the overall risk.
///
/// A snapshot is replaced wholesale by the next refresh; it is never merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    /// Report date as given by the source.
    pub date: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub provenance: Provenance,
    pub overall_risk: RiskLevel,
    pub by_site: BTreeMap<String, RiskAssessment>,
}

impl TelemetrySnapshot {
    pub fn assessment(&self, site_id: &str) -> Option<&RiskAssessment> {
        self.by_site.get(site_id)
    }

    pub fn assessments(&self) -> impl Iterator<Item = &RiskAssessment> {
        self.by_site.values()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from the flood-data endpoint. Every variant is a transient
/// upstream failure and is recovered by the simulation fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Non-2xx HTTP response.
    Http(u16),
    /// Connection, timeout or body read failure.
    Transport(String),
    /// The response body could not be deserialized.
    Parse(String),
    /// A registry site is absent from the payload.
    MissingSite(String),
    /// A numeric field is present but not finite.
    InvalidValue { site: String, field: &'static str },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(code) => write!(f, "HTTP error: {}", code),
            FetchError::Transport(msg) => write!(f, "Transport error: {}", msg),
            FetchError::Parse(msg) => write!(f, "Parse error: {}", msg),
            FetchError::MissingSite(site) => write!(f, "Site missing from payload: {}", site),
            FetchError::InvalidValue { site, field } => {
                write!(f, "Invalid value for {}.{}", site, field)
            }
        }
    }
}

impl std::error::Error for FetchError {}

/// Errors while synthesizing fallback readings.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// A perturbed value came out NaN or infinite.
    NonFiniteValue { site: String, field: &'static str },
    /// A reservoir is registered without a baseline level.
    MissingBaseline(String),
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisError::NonFiniteValue { site, field } => {
                write!(f, "Synthesized non-finite {} for {}", field, site)
            }
            SynthesisError::MissingBaseline(site) => {
                write!(f, "No baseline level registered for {}", site)
            }
        }
    }
}

impl std::error::Error for SynthesisError {}

/// Both the endpoint and the local simulation failed for one refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquireError {
    Unavailable {
        upstream: FetchError,
        synthesis: SynthesisError,
    },
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireError::Unavailable { upstream, synthesis } => write!(
                f,
                "Telemetry unavailable: upstream failed ({}) and fallback failed ({})",
                upstream, synthesis
            ),
        }
    }
}

impl std::error::Error for AcquireError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
