//! Endpoint Verification Module
//!
//! Checks a flood-data endpoint against the site registry before it is put
//! into service: is it reachable, does the payload parse, and which
//! registered sites does it actually cover.
//!
//! Use this when pointing the service at a new backend.

use crate::ingest::flood_api::{parse_flood_response, FloodDataResponse};
use crate::model::SiteClass;
use crate::sites::SITE_REGISTRY;
use chrono::Utc;
use serde::{Deserialize, Serialize};

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointVerification {
    pub url: String,
    pub timestamp: String,
    pub status: VerificationStatus,
    pub http_status: Option<u16>,
    pub payload_valid: bool,
    pub sites_present: Vec<String>,
    pub sites_missing: Vec<String>,
    /// The payload's own `source` label, when it parsed.
    pub source: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    /// Payload parsed and covers every registry site.
    Success,
    /// Payload parsed but some sites are missing. The service would fall
    /// back to simulation on every refresh.
    PartialSuccess,
    Failed,
}

// ============================================================================
// Coverage
// ============================================================================

/// Splits the registry into sites the payload covers and sites it lacks,
/// both in registry order.
pub fn coverage(response: &FloodDataResponse) -> (Vec<String>, Vec<String>) {
    let mut present = Vec::new();
    let mut missing = Vec::new();
    for site in SITE_REGISTRY {
        let covered = match response.risks.record_for(site) {
            Some(record) => site.class != SiteClass::Reservoir || record.level.is_some(),
            None => false,
        };
        if covered {
            present.push(site.id.to_string());
        } else {
            missing.push(site.id.to_string());
        }
    }
    (present, missing)
}

// ============================================================================
// Endpoint Check
// ============================================================================

/// Checks `url` once. Timeouts come from `client`.
pub fn verify_endpoint(client: &reqwest::blocking::Client, url: &str) -> EndpointVerification {
    let mut result = EndpointVerification {
        url: url.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        status: VerificationStatus::Failed,
        http_status: None,
        payload_valid: false,
        sites_present: Vec::new(),
        sites_missing: Vec::new(),
        source: None,
        error_message: None,
    };

    let response = match client.get(url).send() {
        Ok(response) => response,
        Err(e) => {
            result.error_message = Some(format!("Request failed: {}", e));
            return result;
        }
    };

    result.http_status = Some(response.status().as_u16());
    if !response.status().is_success() {
        result.error_message = Some(format!("HTTP {}", response.status()));
        return result;
    }

    let body = match response.text() {
        Ok(body) => body,
        Err(e) => {
            result.error_message = Some(format!("Body read failed: {}", e));
            return result;
        }
    };

    match parse_flood_response(&body) {
        Ok(payload) => {
            result.payload_valid = true;
            result.source = Some(payload.source.clone());
            let (present, missing) = coverage(&payload);
            result.sites_present = present;
            result.sites_missing = missing;
            result.status = if result.sites_missing.is_empty() {
                VerificationStatus::Success
            } else {
                VerificationStatus::PartialSuccess
            };
        }
        Err(e) => {
            result.error_message = Some(e.to_string());
        }
    }

    result
}

pub fn print_summary(result: &EndpointVerification) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 ENDPOINT VERIFICATION");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("Endpoint:   {}", result.url);
    println!("Checked:    {}", result.timestamp);
    match result.http_status {
        Some(code) => println!("HTTP:       {}", code),
        None => println!("HTTP:       no response"),
    }
    println!("Payload:    {}", if result.payload_valid { "valid" } else { "invalid" });
    if let Some(source) = &result.source {
        println!("Source:     {}", source);
    }
    println!(
        "Coverage:   {}/{} sites",
        result.sites_present.len(),
        SITE_REGISTRY.len()
    );
    if !result.sites_missing.is_empty() {
        println!("Missing:    {}", result.sites_missing.join(", "));
    }
    match result.status {
        VerificationStatus::Success => println!("\n✓ OK"),
        VerificationStatus::PartialSuccess => println!("\n⚠ Partial: fallback will be used"),
        VerificationStatus::Failed => {
            println!("\n✗ FAILED: {}", result.error_message.as_deref().unwrap_or("Unknown"))
        }
    }
    println!("═══════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    const TWO_SITES: &str = r#"{
        "date": "05-12-2025", "timestamp": "2025-12-05T12:45:00",
        "source": "Official IRSA Report (05-12-2025)", "overall_risk": "NORMAL",
        "risks": {
            "tarbela": {"level": 1491.26, "inflow": 21600, "outflow": 33000, "risk": "NORMAL"},
            "mangla": {"inflow": 3144, "outflow": 33000, "risk": "NORMAL"},
            "rim_stations": {"total_inflow": 39865, "risk": "NORMAL"},
            "barrages": {
                "kotri": {"inflow": 10400, "outflow": 1245, "risk": "NORMAL"}
            }
        }
    }"#;

    #[test]
    fn test_coverage_reports_missing_sites_in_registry_order() {
        let payload = parse_flood_response(TWO_SITES).unwrap();
        let (present, missing) = coverage(&payload);
        assert_eq!(present, ["tarbela", "rim_stations", "kotri"]);
        // Mangla has no level, so it does not count as covered.
        assert_eq!(
            missing,
            ["mangla", "kalabagh", "chashma", "taunsa", "guddu", "sukkur", "nowshera", "marala"]
        );
        assert_eq!(present.len() + missing.len(), SITE_REGISTRY.len());
    }

    #[test]
    fn test_unreachable_endpoint_fails_without_http_status() {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{}/api/flood-data", port);
        let result = verify_endpoint(&client, &url);
        assert_eq!(result.status, VerificationStatus::Failed);
        assert!(result.http_status.is_none());
        assert!(!result.payload_valid);
        assert!(result.error_message.unwrap().starts_with("Request failed"));
    }

    #[test]
    fn test_silent_endpoint_gives_up_at_client_timeout() {
        // Accepted by the kernel backlog but never answered.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api/flood-data", listener.local_addr().unwrap());
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();

        let started = Instant::now();
        let result = verify_endpoint(&client, &url);
        assert_eq!(result.status, VerificationStatus::Failed);
        assert!(started.elapsed() < Duration::from_secs(5), "took {:?}", started.elapsed());
        drop(listener);
    }
}
