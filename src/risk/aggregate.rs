/// Overall risk reduction and per-class grouping of assessments.

use crate::model::{RiskAssessment, RiskLevel, SiteClass};
use crate::sites::find_site;
use std::collections::BTreeMap;

/// Worst risk level among the assessments, or `Normal` for none.
pub fn aggregate<'a, I>(assessments: I) -> RiskLevel
where
    I: IntoIterator<Item = &'a RiskAssessment>,
{
    worst(assessments.into_iter().map(|a| a.risk_level))
}

/// Worst of a set of levels, or `Normal` for none.
pub fn worst<I: IntoIterator<Item = RiskLevel>>(levels: I) -> RiskLevel {
    levels.into_iter().max().unwrap_or(RiskLevel::Normal)
}

/// Groups assessments by the class of their registry site. Assessments for
/// ids that are not in the registry are dropped.
pub fn group_by_class<'a, I>(assessments: I) -> BTreeMap<SiteClass, Vec<&'a RiskAssessment>>
where
    I: IntoIterator<Item = &'a RiskAssessment>,
{
    let mut groups: BTreeMap<SiteClass, Vec<&'a RiskAssessment>> = BTreeMap::new();
    for assessment in assessments {
        if let Some(site) = find_site(&assessment.site_id) {
            groups.entry(site.class).or_default().push(assessment);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Provenance, Reading};
    use chrono::Utc;

    fn assessment(site_id: &str, level: RiskLevel) -> RiskAssessment {
        RiskAssessment {
            site_id: site_id.to_string(),
            risk_level: level,
            reading: Reading {
                site_id: site_id.to_string(),
                level_ft: None,
                inflow_cusecs: 0.0,
                outflow_cusecs: 0.0,
                timestamp: Utc::now(),
            },
            thresholds: None,
            provenance: Provenance::Live,
        }
    }

    /// Heap's algorithm, enough for four elements.
    fn permutations(items: Vec<RiskLevel>) -> Vec<Vec<RiskLevel>> {
        fn heap(k: usize, items: &mut Vec<RiskLevel>, out: &mut Vec<Vec<RiskLevel>>) {
            if k == 1 {
                out.push(items.clone());
                return;
            }
            for i in 0..k {
                heap(k - 1, items, out);
                if k % 2 == 0 {
                    items.swap(i, k - 1);
                } else {
                    items.swap(0, k - 1);
                }
            }
        }
        let mut items = items;
        let mut out = Vec::new();
        let n = items.len();
        heap(n, &mut items, &mut out);
        out
    }

    #[test]
    fn test_empty_aggregation_is_normal() {
        let none: Vec<RiskAssessment> = Vec::new();
        assert_eq!(aggregate(&none), RiskLevel::Normal);
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let levels = vec![RiskLevel::Normal, RiskLevel::Warning, RiskLevel::Extreme, RiskLevel::Danger];
        let perms = permutations(levels);
        assert_eq!(perms.len(), 24);
        for perm in perms {
            let assessments: Vec<_> = perm.iter().map(|l| assessment("tarbela", *l)).collect();
            assert_eq!(aggregate(&assessments), RiskLevel::Extreme, "failed for {:?}", perm);
        }
    }

    #[test]
    fn test_aggregation_picks_worst_present() {
        let assessments = vec![
            assessment("tarbela", RiskLevel::Normal),
            assessment("mangla", RiskLevel::Warning),
            assessment("kotri", RiskLevel::Normal),
        ];
        assert_eq!(aggregate(&assessments), RiskLevel::Warning);
    }

    #[test]
    fn test_group_by_class_drops_unknown_sites() {
        let assessments = vec![
            assessment("tarbela", RiskLevel::Normal),
            assessment("mangla", RiskLevel::Normal),
            assessment("kotri", RiskLevel::Danger),
            assessment("atlantis", RiskLevel::Extreme),
        ];
        let groups = group_by_class(&assessments);
        assert_eq!(groups[&SiteClass::Reservoir].len(), 2);
        assert_eq!(groups[&SiteClass::Barrage].len(), 1);
        assert_eq!(groups.values().map(Vec::len).sum::<usize>(), 3);
    }
}
