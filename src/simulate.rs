/// Fallback telemetry synthesis
///
/// When the flood-data endpoint is unavailable, the service still has to show
/// something plausible. This module builds a full reading set from the
/// registry baselines (the last known IRSA report figures) plus a small
/// uniform perturbation, then classifies it locally.
///
/// Randomness comes through `JitterSource` so tests can pin it: `NoJitter`
/// returns exactly the baselines, and `RandomJitter::seeded` is a
/// reproducible ChaCha stream.

use crate::logging::{self, DataSource};
use crate::model::{
    Provenance, Reading, RiskAssessment, Site, SiteClass, SynthesisError, TelemetrySnapshot,
    SIMULATED_SOURCE,
};
use crate::risk::{aggregate, assess};
use crate::sites::SITE_REGISTRY;
use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Half-width of the uniform perturbation applied to reservoir levels, in feet.
pub const LEVEL_JITTER_FT: f64 = 0.05;

/// Half-width of the uniform perturbation applied to flow rates, in cusecs.
pub const FLOW_JITTER_CUSECS: f64 = 10.0;

// ---------------------------------------------------------------------------
// Jitter sources
// ---------------------------------------------------------------------------

/// Produces the perturbation added to a baseline value.
pub trait JitterSource {
    /// A value in `[-magnitude, magnitude)`.
    fn jitter(&mut self, magnitude: f64) -> f64;
}

/// Uniform jitter drawn from any `rand` generator.
pub struct RandomJitter<R>(pub R);

impl RandomJitter<ChaCha8Rng> {
    /// Reproducible jitter: the same seed yields the same readings.
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(ChaCha8Rng::from_entropy())
    }
}

impl<R: Rng> JitterSource for RandomJitter<R> {
    fn jitter(&mut self, magnitude: f64) -> f64 {
        if magnitude <= 0.0 {
            return 0.0;
        }
        self.0.gen_range(-magnitude..magnitude)
    }
}

/// Always zero: synthesized readings equal their baselines.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn jitter(&mut self, _magnitude: f64) -> f64 {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

fn checked(site: &Site, field: &'static str, value: f64) -> Result<f64, SynthesisError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SynthesisError::NonFiniteValue { site: site.id.to_string(), field })
    }
}

/// Synthesizes one reading from a site's baseline.
///
/// Reservoirs get a perturbed level; every site gets perturbed inflow and
/// outflow, except the RIM group, which only reports inflow. Values are not
/// clamped, so a flow baseline below the jitter width can come out negative.
pub fn synthesize_reading<J: JitterSource + ?Sized>(
    site: &Site,
    jitter: &mut J,
    now: DateTime<Utc>,
) -> Result<Reading, SynthesisError> {
    let baseline = &site.baseline;

    let level_ft = match (site.class, baseline.level_ft) {
        (SiteClass::Reservoir, None) => {
            return Err(SynthesisError::MissingBaseline(site.id.to_string()));
        }
        (_, Some(level)) => Some(checked(site, "level", level + jitter.jitter(LEVEL_JITTER_FT))?),
        (_, None) => None,
    };

    let inflow = checked(site, "inflow", baseline.inflow_cusecs + jitter.jitter(FLOW_JITTER_CUSECS))?;
    let outflow = match site.class {
        SiteClass::RimGroup => baseline.outflow_cusecs,
        _ => checked(site, "outflow", baseline.outflow_cusecs + jitter.jitter(FLOW_JITTER_CUSECS))?,
    };

    Ok(Reading {
        site_id: site.id.to_string(),
        level_ft,
        inflow_cusecs: inflow,
        outflow_cusecs: outflow,
        timestamp: now,
    })
}

/// Synthesizes and classifies a reading for one site.
pub fn synthesize_assessment<J: JitterSource + ?Sized>(
    site: &Site,
    jitter: &mut J,
    now: DateTime<Utc>,
) -> Result<RiskAssessment, SynthesisError> {
    let reading = synthesize_reading(site, jitter, now)?;
    Ok(assess(site, reading, Provenance::Simulated))
}

/// Builds a complete simulated snapshot for every registry site, classified
/// locally and tagged `SIMULATED (fallback)`.
pub fn synthesize_snapshot<J: JitterSource + ?Sized>(
    jitter: &mut J,
    now: DateTime<Utc>,
) -> Result<TelemetrySnapshot, SynthesisError> {
    let mut by_site = BTreeMap::new();
    for site in SITE_REGISTRY {
        let assessment = synthesize_assessment(site, jitter, now)?;
        by_site.insert(site.id.to_string(), assessment);
    }

    let overall_risk = aggregate(by_site.values());
    logging::debug(
        DataSource::Simulation,
        None,
        &format!("synthesized {} sites, overall {}", by_site.len(), overall_risk),
    );

    Ok(TelemetrySnapshot {
        date: now.format("%d-%m-%Y").to_string(),
        timestamp: now,
        source: SIMULATED_SOURCE.to_string(),
        provenance: Provenance::Simulated,
        overall_risk,
        by_site,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RiskLevel;
    use crate::risk::classify;
    use crate::sites::{find_site, TARBELA_THRESHOLDS};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 5, 13, 0, 0).unwrap()
    }

    /// Returns a fixed value regardless of magnitude.
    struct ConstJitter(f64);

    impl JitterSource for ConstJitter {
        fn jitter(&mut self, _magnitude: f64) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_zero_jitter_tarbela_matches_direct_classification() {
        let tarbela = find_site("tarbela").unwrap();
        let assessment = synthesize_assessment(tarbela, &mut NoJitter, fixed_now()).unwrap();
        assert_eq!(assessment.reading.level_ft, Some(1491.26));
        assert_eq!(assessment.risk_level, classify(1491.26, &TARBELA_THRESHOLDS));
        assert_eq!(assessment.provenance, Provenance::Simulated);
    }

    #[test]
    fn test_zero_jitter_snapshot_equals_baselines() {
        let snapshot = synthesize_snapshot(&mut NoJitter, fixed_now()).unwrap();
        assert_eq!(snapshot.by_site.len(), SITE_REGISTRY.len());
        assert_eq!(snapshot.source, SIMULATED_SOURCE);
        assert_eq!(snapshot.provenance, Provenance::Simulated);
        assert_eq!(snapshot.date, "05-12-2025");
        for site in SITE_REGISTRY {
            let a = snapshot.assessment(site.id).unwrap();
            assert_eq!(a.reading.inflow_cusecs, site.baseline.inflow_cusecs, "{}", site.id);
            assert_eq!(a.reading.outflow_cusecs, site.baseline.outflow_cusecs, "{}", site.id);
            assert_eq!(a.reading.level_ft, site.baseline.level_ft, "{}", site.id);
        }
        // The 05.12.2025 report is a quiet day everywhere.
        assert_eq!(snapshot.overall_risk, RiskLevel::Normal);
    }

    #[test]
    fn test_seeded_jitter_is_reproducible() {
        let a = synthesize_snapshot(&mut RandomJitter::seeded(7), fixed_now()).unwrap();
        let b = synthesize_snapshot(&mut RandomJitter::seeded(7), fixed_now()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_seeded_jitter_stays_within_bounds() {
        let snapshot = synthesize_snapshot(&mut RandomJitter::seeded(42), fixed_now()).unwrap();
        for site in SITE_REGISTRY {
            let r = &snapshot.assessment(site.id).unwrap().reading;
            assert!((r.inflow_cusecs - site.baseline.inflow_cusecs).abs() <= FLOW_JITTER_CUSECS);
            assert!((r.outflow_cusecs - site.baseline.outflow_cusecs).abs() <= FLOW_JITTER_CUSECS);
            if let (Some(level), Some(base)) = (r.level_ft, site.baseline.level_ft) {
                assert!((level - base).abs() <= LEVEL_JITTER_FT);
            }
        }
    }

    #[test]
    fn test_rim_group_outflow_is_not_perturbed() {
        let rim = find_site("rim_stations").unwrap();
        let reading = synthesize_reading(rim, &mut ConstJitter(5.0), fixed_now()).unwrap();
        assert_eq!(reading.inflow_cusecs, 39_870.0);
        assert_eq!(reading.outflow_cusecs, 0.0);
    }

    #[test]
    fn test_non_finite_jitter_is_a_synthesis_error() {
        let err = synthesize_snapshot(&mut ConstJitter(f64::NAN), fixed_now()).unwrap_err();
        assert_eq!(
            err,
            SynthesisError::NonFiniteValue { site: "tarbela".to_string(), field: "level" }
        );
    }

    #[test]
    fn test_large_jitter_is_classified_not_clamped() {
        // +60 ft pushes Tarbela from 1491 into the WARNING band.
        let tarbela = find_site("tarbela").unwrap();
        let a = synthesize_assessment(tarbela, &mut ConstJitter(60.0), fixed_now()).unwrap();
        assert_eq!(a.risk_level, RiskLevel::Warning);
    }

    #[test]
    fn test_random_jitter_with_zero_magnitude_is_zero() {
        let mut jitter = RandomJitter::seeded(1);
        assert_eq!(jitter.jitter(0.0), 0.0);
    }
}
