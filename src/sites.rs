/// Site registry for the Indus basin flood-risk service.
///
/// Defines the canonical list of reservoirs, barrages and river stations
/// monitored by this service, with coordinates, risk thresholds and the
/// baseline values the simulation fallback perturbs. This is the single
/// source of truth for site ids; all other modules should reference sites
/// from here rather than hardcoding ids or numbers.

use crate::model::{Metric, ReservoirBounds, Site, SiteBaseline, SiteClass, Thresholds};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Tarbela reservoir level bands, in feet (IRSA historical data).
pub const TARBELA_THRESHOLDS: Thresholds = Thresholds {
    normal: 1520.0,
    warning: 1550.0,
    danger: 1570.0,
};

/// Mangla reservoir level bands, in feet.
pub const MANGLA_THRESHOLDS: Thresholds = Thresholds {
    normal: 1220.0,
    warning: 1242.0,
    danger: 1250.0,
};

/// Aggregate RIM station inflow bands, in cusecs.
pub const RIM_THRESHOLDS: Thresholds = Thresholds {
    normal: 100_000.0,
    warning: 200_000.0,
    danger: 400_000.0,
};

/// Site id of the RIM aggregate pseudo-site.
pub const RIM_GROUP_ID: &str = "rim_stations";

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

const fn flows(inflow_cusecs: f64, outflow_cusecs: f64) -> SiteBaseline {
    SiteBaseline { level_ft: None, inflow_cusecs, outflow_cusecs }
}

const fn barrage(
    id: &'static str,
    name: &'static str,
    latitude: f64,
    longitude: f64,
    baseline: SiteBaseline,
) -> Site {
    Site {
        id,
        name,
        class: SiteClass::Barrage,
        river: Some("Indus River"),
        latitude,
        longitude,
        bounds: None,
        thresholds: None,
        metric: Metric::Inflow,
        baseline,
    }
}

/// All monitored sites in declaration order: reservoirs, the RIM group,
/// barrages from upstream to downstream, then river stations.
///
/// Baselines are the figures of the IRSA daily report of 05.12.2025.
pub static SITE_REGISTRY: &[Site] = &[
    Site {
        id: "tarbela",
        name: "Tarbela Dam",
        class: SiteClass::Reservoir,
        river: Some("Indus River"),
        latitude: 34.0869,
        longitude: 72.6989,
        bounds: Some(ReservoirBounds { dead_level_ft: 1402.0, max_conservation_level_ft: 1550.0 }),
        thresholds: Some(TARBELA_THRESHOLDS),
        metric: Metric::Level,
        baseline: SiteBaseline { level_ft: Some(1491.26), inflow_cusecs: 21_600.0, outflow_cusecs: 33_000.0 },
    },
    Site {
        id: "mangla",
        name: "Mangla Dam",
        class: SiteClass::Reservoir,
        river: Some("Jhelum River"),
        latitude: 33.1450,
        longitude: 73.6521,
        bounds: Some(ReservoirBounds { dead_level_ft: 1050.0, max_conservation_level_ft: 1242.0 }),
        thresholds: Some(MANGLA_THRESHOLDS),
        metric: Metric::Level,
        baseline: SiteBaseline { level_ft: Some(1214.70), inflow_cusecs: 3_144.0, outflow_cusecs: 33_000.0 },
    },
    Site {
        id: RIM_GROUP_ID,
        name: "RIM Station Inflows",
        class: SiteClass::RimGroup,
        river: None,
        // No physical location; placed on Tarbela so map consumers have a pin.
        latitude: 34.0869,
        longitude: 72.6989,
        bounds: None,
        thresholds: Some(RIM_THRESHOLDS),
        metric: Metric::Inflow,
        baseline: flows(39_865.0, 0.0),
    },
    barrage("kalabagh", "Kalabagh Barrage", 32.9556, 71.5542, flows(38_249.0, 31_749.0)),
    barrage("chashma", "Chashma Barrage", 32.4339, 71.3936, flows(45_000.0, 42_000.0)),
    barrage("taunsa", "Taunsa Barrage", 30.7042, 70.8394, flows(51_159.0, 44_659.0)),
    barrage("guddu", "Guddu Barrage", 28.4187, 69.7044, flows(55_145.0, 47_625.0)),
    barrage("sukkur", "Sukkur Barrage", 27.7019, 68.8507, flows(43_220.0, 14_550.0)),
    barrage("kotri", "Kotri Barrage", 25.4325, 68.3090, flows(10_400.0, 1_245.0)),
    Site {
        id: "nowshera",
        name: "Kabul @ Nowshera",
        class: SiteClass::RiverStation,
        river: Some("Kabul River"),
        latitude: 34.0167,
        longitude: 71.9725,
        bounds: None,
        thresholds: None,
        metric: Metric::Inflow,
        baseline: flows(7_400.0, 7_400.0),
    },
    Site {
        id: "marala",
        name: "Chenab @ Marala",
        class: SiteClass::RiverStation,
        river: Some("Chenab River"),
        latitude: 32.6667,
        longitude: 74.4500,
        bounds: None,
        thresholds: None,
        metric: Metric::Inflow,
        baseline: flows(7_721.0, 1_813.0),
    },
];

/// Returns the ids of all registered sites in declaration order.
pub fn all_site_ids() -> Vec<&'static str> {
    SITE_REGISTRY.iter().map(|s| s.id).collect()
}

/// Returns the sites of one class, in declaration order.
pub fn sites_of(class: SiteClass) -> Vec<&'static Site> {
    SITE_REGISTRY.iter().filter(|s| s.class == class).collect()
}

/// Looks up a site by id. Returns `None` if not found.
pub fn find_site(site_id: &str) -> Option<&'static Site> {
    SITE_REGISTRY.iter().find(|s| s.id == site_id)
}

/// Thresholds for a site, or `None` for unknown sites and sites that are
/// not classified (barrages, river stations).
pub fn thresholds_for(site_id: &str) -> Option<Thresholds> {
    find_site(site_id).and_then(|s| s.thresholds)
}

// ---------------------------------------------------------------------------
// Nearest site
// ---------------------------------------------------------------------------

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates, in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Returns the physical site closest to a coordinate, with its distance in
/// kilometres. The RIM group is skipped since it has no real location.
pub fn nearest_site(latitude: f64, longitude: f64) -> Option<(&'static Site, f64)> {
    SITE_REGISTRY
        .iter()
        .filter(|s| s.class != SiteClass::RimGroup)
        .map(|s| (s, haversine_km(latitude, longitude, s.latitude, s.longitude)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_duplicate_site_ids() {
        let mut seen = std::collections::HashSet::new();
        for site in SITE_REGISTRY {
            assert!(seen.insert(site.id), "duplicate site id '{}' in SITE_REGISTRY", site.id);
        }
    }

    #[test]
    fn test_registry_contains_all_expected_sites() {
        let expected = [
            "tarbela", "mangla", "rim_stations", "kalabagh", "chashma", "taunsa", "guddu",
            "sukkur", "kotri", "nowshera", "marala",
        ];
        assert_eq!(all_site_ids(), expected.to_vec());
    }

    #[test]
    fn test_sites_of_preserves_declaration_order() {
        let barrages: Vec<_> = sites_of(SiteClass::Barrage).iter().map(|s| s.id).collect();
        assert_eq!(barrages, ["kalabagh", "chashma", "taunsa", "guddu", "sukkur", "kotri"]);
        let reservoirs: Vec<_> = sites_of(SiteClass::Reservoir).iter().map(|s| s.id).collect();
        assert_eq!(reservoirs, ["tarbela", "mangla"]);
        assert_eq!(sites_of(SiteClass::RiverStation).len(), 2);
        assert_eq!(sites_of(SiteClass::RimGroup).len(), 1);
    }

    #[test]
    fn test_thresholds_are_strictly_increasing_where_defined() {
        for site in SITE_REGISTRY {
            if let Some(t) = &site.thresholds {
                assert!(t.normal < t.warning, "normal must be below warning for '{}'", site.id);
                assert!(t.warning < t.danger, "warning must be below danger for '{}'", site.id);
                assert!(t.danger < t.extreme(), "danger must be below extreme for '{}'", site.id);
            }
        }
    }

    #[test]
    fn test_reservoirs_have_bounds_and_baseline_level() {
        for site in sites_of(SiteClass::Reservoir) {
            let bounds = site.bounds.expect("reservoir must have storage bounds");
            assert!(bounds.dead_level_ft < bounds.max_conservation_level_ft);
            assert!(site.baseline.level_ft.is_some(), "'{}' needs a baseline level", site.id);
            assert_eq!(site.metric, Metric::Level);
        }
    }

    #[test]
    fn test_non_reservoirs_have_no_level_baseline() {
        for site in SITE_REGISTRY.iter().filter(|s| s.class != SiteClass::Reservoir) {
            assert!(site.baseline.level_ft.is_none(), "'{}' should not carry a level", site.id);
            assert!(site.bounds.is_none());
        }
    }

    #[test]
    fn test_thresholds_for_lookup() {
        assert_eq!(thresholds_for("tarbela"), Some(TARBELA_THRESHOLDS));
        assert_eq!(thresholds_for(RIM_GROUP_ID), Some(RIM_THRESHOLDS));
        assert_eq!(thresholds_for("kotri"), None);
        assert_eq!(thresholds_for("no_such_site"), None);
    }

    #[test]
    fn test_coordinates_fall_within_pakistan() {
        for site in SITE_REGISTRY {
            assert!((23.0..38.0).contains(&site.latitude), "bad latitude for '{}'", site.id);
            assert!((60.0..78.0).contains(&site.longitude), "bad longitude for '{}'", site.id);
        }
    }

    #[test]
    fn test_haversine_zero_and_known_distance() {
        assert!(haversine_km(34.0, 72.0, 34.0, 72.0).abs() < 1e-9);
        // One degree of latitude is roughly 111 km.
        let d = haversine_km(30.0, 70.0, 31.0, 70.0);
        assert!((d - 111.2).abs() < 0.5, "got {}", d);
    }

    #[test]
    fn test_nearest_site_picks_closest_physical_site() {
        let (site, distance) = nearest_site(27.70, 68.85).expect("registry is not empty");
        assert_eq!(site.id, "sukkur");
        assert!(distance < 1.0);

        // Standing on Tarbela must resolve to the dam, never the RIM pin.
        let (site, _) = nearest_site(34.0869, 72.6989).unwrap();
        assert_eq!(site.id, "tarbela");
    }
}
