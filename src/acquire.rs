/// Two-tier telemetry acquisition.
///
/// Every refresh produces one complete snapshot. The flood-data endpoint is
/// tried first and, when it answers with a payload that validates, is
/// trusted as-is. Anything else (network error, non-2xx, malformed or
/// incomplete payload) is logged as a diagnostic and answered with a locally
/// simulated snapshot. Only when the simulation also fails does the caller
/// see an error.

use crate::ingest::flood_api::{self, FloodDataSource};
use crate::ingest::per_site::{self, SiteFetcher};
use crate::logging::{self, DataSource};
use crate::model::{AcquireError, Provenance, TelemetrySnapshot, SIMULATED_SOURCE};
use crate::risk::aggregate;
use crate::simulate::{self, JitterSource};
use crate::sites::SITE_REGISTRY;
use chrono::{DateTime, Utc};

/// Default freshness window for upstream data, in minutes. Matches the
/// backend's one-hour report cache.
pub const DEFAULT_MAX_AGE_MINUTES: u64 = 60;

pub struct Acquirer<S, J> {
    source: S,
    jitter: J,
    max_age_minutes: u64,
}

impl<S: FloodDataSource, J: JitterSource> Acquirer<S, J> {
    pub fn new(source: S, jitter: J) -> Self {
        Self { source, jitter, max_age_minutes: DEFAULT_MAX_AGE_MINUTES }
    }

    pub fn with_max_age_minutes(mut self, minutes: u64) -> Self {
        self.max_age_minutes = minutes;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Acquires a snapshot using the real current time.
    pub fn acquire(&mut self) -> Result<TelemetrySnapshot, AcquireError> {
        self.acquire_at(Utc::now())
    }

    /// Acquires a snapshot as of `now`: endpoint first, simulation second.
    pub fn acquire_at(&mut self, now: DateTime<Utc>) -> Result<TelemetrySnapshot, AcquireError> {
        let upstream = self
            .source
            .fetch()
            .and_then(|response| flood_api::into_snapshot(response, self.max_age_minutes, now));

        match upstream {
            Ok(snapshot) => {
                logging::info(
                    DataSource::Upstream,
                    None,
                    &format!(
                        "using {} data from '{}' (overall {})",
                        snapshot.provenance, snapshot.source, snapshot.overall_risk
                    ),
                );
                Ok(snapshot)
            }
            Err(upstream) => {
                logging::log_fetch_failure(None, "flood data fetch", &upstream);
                match simulate::synthesize_snapshot(&mut self.jitter, now) {
                    Ok(snapshot) => {
                        logging::warn(
                            DataSource::Simulation,
                            None,
                            &format!("upstream unavailable, serving {}", SIMULATED_SOURCE),
                        );
                        Ok(snapshot)
                    }
                    Err(synthesis) => {
                        let err = AcquireError::Unavailable { upstream, synthesis };
                        logging::error(DataSource::Simulation, None, &err.to_string());
                        Err(err)
                    }
                }
            }
        }
    }

    /// Acquires a snapshot by querying every registry site separately and
    /// concurrently. Failed sites fall back one by one; the overall risk is
    /// aggregated locally since there is no upstream verdict to trust.
    pub fn acquire_per_site_at<F: SiteFetcher>(
        &mut self,
        fetcher: &F,
        now: DateTime<Utc>,
    ) -> Result<TelemetrySnapshot, AcquireError> {
        let sites: Vec<_> = SITE_REGISTRY.iter().collect();
        let assessments = per_site::fetch_sites_concurrently(fetcher, &sites, &mut self.jitter, now)?;

        let live = assessments.iter().filter(|a| a.provenance == Provenance::Live).count();
        let (provenance, source) = if live == assessments.len() {
            (Provenance::Live, format!("Per-site upstream ({} sites)", live))
        } else if live == 0 {
            (Provenance::Simulated, SIMULATED_SOURCE.to_string())
        } else {
            (
                Provenance::Simulated,
                format!("Per-site upstream ({}/{} live, rest {})", live, assessments.len(), SIMULATED_SOURCE),
            )
        };

        let overall_risk = aggregate(&assessments);
        Ok(TelemetrySnapshot {
            date: now.format("%d-%m-%Y").to_string(),
            timestamp: now,
            source,
            provenance,
            overall_risk,
            by_site: assessments.into_iter().map(|a| (a.site_id.clone(), a)).collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
