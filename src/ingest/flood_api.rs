/// Flood-data endpoint client
///
/// Retrieves the aggregated river/dam risk payload from the local flood-data
/// backend (which scrapes the IRSA daily report and caches it for an hour).
/// The payload arrives already classified; this module validates its shape
/// against the site registry and passes the upstream risk labels through
/// without reclassifying.
///
/// Default endpoint: http://localhost:8000/api/flood-data

use crate::logging::{self, DataSource};
use crate::model::{
    FetchError, Provenance, Reading, RiskAssessment, RiskLevel, Site, SiteClass, TelemetrySnapshot,
};
use crate::risk::{classify, staleness};
use crate::sites::SITE_REGISTRY;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_FLOOD_DATA_URL: &str = "http://localhost:8000/api/flood-data";

// ============================================================================
// Wire Structures
// ============================================================================

/// Top-level response of the flood-data endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FloodDataResponse {
    /// Report date, e.g. "05-12-2025".
    pub date: String,
    /// ISO 8601, with or without offset.
    pub timestamp: String,
    /// Provenance label, e.g. "Official IRSA Report (05-12-2025)".
    pub source: String,
    pub overall_risk: RiskLevel,
    pub risks: RiskGroups,
}

/// The `risks` object. Reservoirs are keyed directly by site id next to the
/// grouped collections, so they are captured by the flattened map.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RiskGroups {
    pub rim_stations: RimRecord,
    #[serde(default)]
    pub barrages: BTreeMap<String, SiteRecord>,
    #[serde(default)]
    pub stations: BTreeMap<String, SiteRecord>,
    #[serde(flatten)]
    pub reservoirs: BTreeMap<String, SiteRecord>,
}

/// One dam, barrage or river station.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteRecord {
    /// Reservoirs only, in feet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    pub inflow: f64,
    pub outflow: f64,
    pub risk: RiskLevel,
}

/// Aggregate RIM station inflow.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RimRecord {
    #[serde(alias = "inflow")]
    pub total_inflow: f64,
    pub risk: RiskLevel,
}

/// A registry site's record, viewed uniformly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordView {
    pub level: Option<f64>,
    pub inflow: f64,
    pub outflow: f64,
    pub risk: RiskLevel,
}

impl RiskGroups {
    /// Finds the record for a registry site in the group its class lives in.
    pub fn record_for(&self, site: &Site) -> Option<RecordView> {
        let from_site = |r: &SiteRecord| RecordView {
            level: r.level,
            inflow: r.inflow,
            outflow: r.outflow,
            risk: r.risk,
        };
        match site.class {
            SiteClass::Reservoir => self.reservoirs.get(site.id).map(from_site),
            SiteClass::Barrage => self.barrages.get(site.id).map(from_site),
            SiteClass::RiverStation => self.stations.get(site.id).map(from_site),
            SiteClass::RimGroup => Some(RecordView {
                level: None,
                inflow: self.rim_stations.total_inflow,
                outflow: 0.0,
                risk: self.rim_stations.risk,
            }),
        }
    }
}

// ============================================================================
// Source Abstraction
// ============================================================================

/// Anything that can produce a flood-data payload. The HTTP client is the
/// production implementation; tests substitute canned responses.
pub trait FloodDataSource {
    fn fetch(&self) -> Result<FloodDataResponse, FetchError>;
}

/// Fetches the payload over HTTP with a blocking client.
pub struct HttpFloodSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpFloodSource {
    pub fn new(client: reqwest::blocking::Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FloodDataSource for HttpFloodSource {
    fn fetch(&self) -> Result<FloodDataResponse, FetchError> {
        fetch_flood_data(&self.client, &self.url)
    }
}

// ============================================================================
// API Client Functions
// ============================================================================

/// Fetch and parse the flood-data payload.
pub fn fetch_flood_data(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<FloodDataResponse, FetchError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http(status.as_u16()));
    }

    let body = response
        .text()
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    parse_flood_response(&body)
}

/// Parse a flood-data JSON body. Unknown risk labels and missing fields are
/// parse errors.
pub fn parse_flood_response(body: &str) -> Result<FloodDataResponse, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))
}

// ============================================================================
// Validation
// ============================================================================

/// Rejects non-finite values. Negative values are kept as reported but
/// logged, since the upstream label already classifies them.
fn finite(site: &Site, field: &'static str, value: f64) -> Result<f64, FetchError> {
    if !value.is_finite() {
        return Err(FetchError::InvalidValue { site: site.id.to_string(), field });
    }
    if classify::is_anomalous(value) {
        logging::warn(
            DataSource::Upstream,
            Some(site.id),
            &format!("anomalous {} from upstream: {}", field, value),
        );
    }
    Ok(value)
}

/// Validates a payload against the registry and converts it into a
/// snapshot, keeping the upstream risk labels and overall risk as given.
///
/// Every registry site must be present with finite values, and reservoirs
/// must report a level. Provenance is `Live` unless the upstream timestamp
/// is older than `max_age_minutes` or unparseable, in which case it is
/// `Cached`.
pub fn into_snapshot(
    response: FloodDataResponse,
    max_age_minutes: u64,
    now: DateTime<Utc>,
) -> Result<TelemetrySnapshot, FetchError> {
    let provenance = match staleness::is_stale_at(&response.timestamp, max_age_minutes, now) {
        Ok(false) => Provenance::Live,
        Ok(true) | Err(_) => Provenance::Cached,
    };
    let timestamp = staleness::parse_upstream_timestamp(&response.timestamp).unwrap_or(now);

    let mut by_site = BTreeMap::new();
    for site in SITE_REGISTRY {
        let record = response
            .risks
            .record_for(site)
            .ok_or_else(|| FetchError::MissingSite(site.id.to_string()))?;

        let level_ft = match (site.class, record.level) {
            (SiteClass::Reservoir, None) => {
                return Err(FetchError::InvalidValue { site: site.id.to_string(), field: "level" });
            }
            (_, Some(level)) => Some(finite(site, "level", level)?),
            (_, None) => None,
        };

        let reading = Reading {
            site_id: site.id.to_string(),
            level_ft,
            inflow_cusecs: finite(site, "inflow", record.inflow)?,
            outflow_cusecs: finite(site, "outflow", record.outflow)?,
            timestamp,
        };

        by_site.insert(
            site.id.to_string(),
            RiskAssessment {
                site_id: site.id.to_string(),
                risk_level: record.risk,
                reading,
                thresholds: site.thresholds,
                provenance,
            },
        );
    }

    Ok(TelemetrySnapshot {
        date: response.date,
        timestamp,
        source: response.source,
        provenance,
        overall_risk: response.overall_risk,
        by_site,
    })
}

// ============================================================================
// Tests
// ============================================================================
