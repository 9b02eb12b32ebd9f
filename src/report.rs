//! Plain-text flood situation report.
//!
//! Renders a snapshot the way the downloadable report presents it: overall
//! risk, summary counts, key findings, then one table per site class. The
//! report only reads the snapshot; every number in it is already there.

use crate::model::{RiskAssessment, SiteClass, TelemetrySnapshot};
use crate::risk::aggregate::group_by_class;
use crate::risk::color_for;
use crate::sites::{find_site, sites_of, RIM_GROUP_ID};
use std::fmt::Write;

const RULE: &str = "═══════════════════════════════════════════════════════════════";

/// Formats a flow rate as whole cusecs with thousands separators.
pub fn format_cusecs(value: f64) -> String {
    if !value.is_finite() {
        return "--".to_string();
    }
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    out
}

fn site_name(assessment: &RiskAssessment) -> &str {
    find_site(&assessment.site_id)
        .map(|s| s.name)
        .unwrap_or(assessment.site_id.as_str())
}

/// One-line findings derived from the snapshot's readings.
pub fn key_findings(snapshot: &TelemetrySnapshot) -> Vec<String> {
    let mut findings = Vec::new();

    let mut combined_outflow = 0.0;
    for site in sites_of(SiteClass::Reservoir) {
        let Some(a) = snapshot.assessment(site.id) else { continue };
        combined_outflow += a.reading.outflow_cusecs;
        if let (Some(level), Some(bounds)) = (a.reading.level_ft, site.bounds) {
            findings.push(format!(
                "{} operating at {:.1}% of maximum conservation level ({:.2} ft)",
                site.name,
                level / bounds.max_conservation_level_ft * 100.0,
                level
            ));
        }
        if let Some(pct) = a.reading.capacity_percent(site.bounds.as_ref()) {
            findings.push(format!("{} live storage at {:.1}% of usable range", site.name, pct));
        }
    }
    findings.push(format!(
        "Combined outflow from major dams: {} cusecs",
        format_cusecs(combined_outflow)
    ));

    let highest_barrage = sites_of(SiteClass::Barrage)
        .into_iter()
        .filter_map(|site| snapshot.assessment(site.id).map(|a| (site, a.reading.inflow_cusecs)))
        .max_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((site, inflow)) = highest_barrage {
        findings.push(format!(
            "Highest barrage discharge: {} cusecs at {}",
            format_cusecs(inflow),
            site.name
        ));
    }

    findings
}

/// Renders the full report.
pub fn render_text(snapshot: &TelemetrySnapshot) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, snapshot);
    out
}

fn write_report(out: &mut String, snapshot: &TelemetrySnapshot) -> std::fmt::Result {
    let groups = group_by_class(snapshot.assessments());
    let count = |class: SiteClass| groups.get(&class).map(Vec::len).unwrap_or(0);

    writeln!(out, "{}", RULE)?;
    writeln!(out, "FLOOD MONITORING SITUATION REPORT")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "Report date:   {}", snapshot.date)?;
    writeln!(out, "Generated:     {}", snapshot.timestamp.format("%Y-%m-%d %H:%M UTC"))?;
    writeln!(out, "Data source:   {} [{}]", snapshot.source, snapshot.provenance)?;
    writeln!(
        out,
        "OVERALL RISK LEVEL: {} ({})",
        snapshot.overall_risk,
        color_for(snapshot.overall_risk)
    )?;
    writeln!(out)?;

    writeln!(out, "Summary")?;
    writeln!(out, "  Dams monitored:    {}", count(SiteClass::Reservoir))?;
    writeln!(out, "  Barrages:          {}", count(SiteClass::Barrage))?;
    writeln!(out, "  River stations:    {}", count(SiteClass::RiverStation))?;
    if let Some(rim) = snapshot.assessment(RIM_GROUP_ID) {
        writeln!(
            out,
            "  Total RIM inflow:  {} cusecs ({})",
            format_cusecs(rim.reading.inflow_cusecs),
            rim.risk_level
        )?;
    }
    writeln!(out)?;

    writeln!(out, "Key findings")?;
    for finding in key_findings(snapshot) {
        writeln!(out, "  - {}", finding)?;
    }

    for class in [SiteClass::Reservoir, SiteClass::Barrage, SiteClass::RiverStation] {
        let Some(members) = groups.get(&class) else { continue };
        writeln!(out)?;
        writeln!(out, "{}", class)?;
        writeln!(out, "  {:<24} {:>10} {:>12} {:>12}  {}", "Site", "Level ft", "Inflow", "Outflow", "Risk")?;
        for a in members {
            let level = a
                .reading
                .level_ft
                .map(|l| format!("{:.2}", l))
                .unwrap_or_else(|| "--".to_string());
            writeln!(
                out,
                "  {:<24} {:>10} {:>12} {:>12}  {}",
                site_name(a),
                level,
                format_cusecs(a.reading.inflow_cusecs),
                format_cusecs(a.reading.outflow_cusecs),
                a.risk_level
            )?;
        }
    }
    writeln!(out, "{}", RULE)?;
    Ok(())
}
