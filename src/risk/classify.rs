//! Threshold band classification.
//!
//! `classify` is the pure band lookup. `assess` wraps it for a registry site
//! and a reading, picking the right metric and logging numeric anomalies.

use crate::logging::{self, DataSource};
use crate::model::{Provenance, Reading, RiskAssessment, RiskLevel, Site, Thresholds};

/// Places a value in a risk band. Each band is inclusive at its lower edge:
///
/// ```text
/// value >= danger * 1.10  -> Extreme
/// value >= danger         -> Danger
/// value >= warning        -> Warning
/// otherwise               -> Normal
/// ```
///
/// NaN fails every comparison and so lands in `Normal`. This is kept as is;
/// callers that care should go through [`assess`], which logs it.
pub fn classify(value: f64, thresholds: &Thresholds) -> RiskLevel {
    if value >= thresholds.extreme() {
        RiskLevel::Extreme
    } else if value >= thresholds.danger {
        RiskLevel::Danger
    } else if value >= thresholds.warning {
        RiskLevel::Warning
    } else {
        RiskLevel::Normal
    }
}

/// True for values no real gauge produces: NaN, infinities, negatives.
pub fn is_anomalous(value: f64) -> bool {
    !value.is_finite() || value < 0.0
}

/// Classifies a reading against its site's thresholds.
///
/// Sites without thresholds are always `Normal`. Anomalous metric values are
/// still classified (NaN ends up `Normal`) but logged with the site id.
pub fn assess(site: &Site, reading: Reading, provenance: Provenance) -> RiskAssessment {
    let risk_level = match &site.thresholds {
        Some(thresholds) => {
            let value = reading.metric_value(site.metric);
            if is_anomalous(value) {
                logging::warn(
                    DataSource::Registry,
                    Some(site.id),
                    &format!("anomalous {:?} value {}; classified as NORMAL", site.metric, value),
                );
                RiskLevel::Normal
            } else {
                classify(value, thresholds)
            }
        }
        None => RiskLevel::Normal,
    };

    RiskAssessment {
        site_id: site.id.to_string(),
        risk_level,
        reading,
        thresholds: site.thresholds,
        provenance,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
