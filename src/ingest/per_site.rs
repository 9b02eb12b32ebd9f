/// Per-site telemetry fetching
///
/// Some deployments have no aggregated flood-data endpoint and instead query
/// one upstream per site. Those requests are issued concurrently on scoped
/// threads and joined before the batch is assembled. A failed site degrades
/// on its own to a simulated reading; it never fails the rest of the batch.
///
/// The HTTP fetcher expects `GET {base_url}/{site_id}` to return a single
/// site record: `{ "level"?: f64, "inflow": f64, "outflow": f64 }`.

use crate::logging::{self, DataSource};
use crate::model::{AcquireError, FetchError, Provenance, Reading, RiskAssessment, Site, SiteClass};
use crate::risk::assess;
use crate::simulate::{synthesize_assessment, JitterSource};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::thread;

/// Fetches the current raw reading for one site.
pub trait SiteFetcher: Sync {
    fn fetch_site(&self, site: &Site, now: DateTime<Utc>) -> Result<Reading, FetchError>;
}

// ============================================================================
// HTTP Fetcher
// ============================================================================

#[derive(Debug, Deserialize)]
struct SiteFlowRecord {
    #[serde(default)]
    level: Option<f64>,
    inflow: f64,
    outflow: f64,
}

/// Fetches each site from `{base_url}/{site_id}`.
pub struct HttpSiteFetcher {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpSiteFetcher {
    pub fn new(client: reqwest::blocking::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn site_url(&self, site_id: &str) -> String {
        format!("{}/{}", self.base_url, site_id)
    }
}

impl SiteFetcher for HttpSiteFetcher {
    fn fetch_site(&self, site: &Site, now: DateTime<Utc>) -> Result<Reading, FetchError> {
        let response = self
            .client
            .get(self.site_url(site.id))
            .header("Accept", "application/json")
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let record: SiteFlowRecord =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;

        let invalid = |field| FetchError::InvalidValue { site: site.id.to_string(), field };
        if !record.inflow.is_finite() {
            return Err(invalid("inflow"));
        }
        if !record.outflow.is_finite() {
            return Err(invalid("outflow"));
        }
        match record.level {
            Some(level) if !level.is_finite() => return Err(invalid("level")),
            None if site.class == SiteClass::Reservoir => return Err(invalid("level")),
            _ => {}
        }

        Ok(Reading {
            site_id: site.id.to_string(),
            level_ft: record.level,
            inflow_cusecs: record.inflow,
            outflow_cusecs: record.outflow,
            timestamp: now,
        })
    }
}

// ============================================================================
// Concurrent Batch
// ============================================================================

/// Fetches every site concurrently and assesses the results.
///
/// Live readings are classified locally against registry thresholds. Sites
/// whose fetch failed get a synthesized reading marked `Simulated`. Returns
/// one assessment per input site, in input order. The only error is a site
/// whose fetch failed and whose synthesis also failed.
pub fn fetch_sites_concurrently<F, J>(
    fetcher: &F,
    sites: &[&'static Site],
    jitter: &mut J,
    now: DateTime<Utc>,
) -> Result<Vec<RiskAssessment>, AcquireError>
where
    F: SiteFetcher,
    J: JitterSource + ?Sized,
{
    let results: Vec<Result<Reading, FetchError>> = thread::scope(|scope| {
        let handles: Vec<_> = sites
            .iter()
            .map(|site| scope.spawn(move || fetcher.fetch_site(site, now)))
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(FetchError::Transport("fetch worker panicked".to_string())))
            })
            .collect()
    });

    let mut assessments = Vec::with_capacity(sites.len());
    let mut fallback = 0;
    for (site, result) in sites.iter().zip(results) {
        match result {
            Ok(reading) => assessments.push(assess(site, reading, Provenance::Live)),
            Err(upstream) => {
                logging::log_fetch_failure(Some(site.id), "site fetch", &upstream);
                fallback += 1;
                let assessment = synthesize_assessment(*site, jitter, now)
                    .map_err(|synthesis| AcquireError::Unavailable { upstream, synthesis })?;
                assessments.push(assessment);
            }
        }
    }

    logging::log_refresh_summary(DataSource::Upstream, sites.len(), sites.len() - fallback, fallback);
    Ok(assessments)
}

// ============================================================================
// Tests
// ============================================================================
