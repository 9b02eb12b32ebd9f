/// Upstream snapshot staleness detection.
///
/// The flood-data backend serves a file cache that may be hours old, and the
/// IRSA report behind it is published once a day. A snapshot older than the
/// freshness window is still shown, but labelled as cached rather than live.
///
/// # Clock injection
/// All functions accept a `now: DateTime<Utc>` parameter rather than calling
/// `Utc::now()` internally, so staleness is deterministic in tests.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parses an upstream timestamp. Accepts RFC 3339 (with offset) and naive
/// ISO 8601 as emitted by Python's `datetime.isoformat()`, which is taken
/// to be UTC.
pub fn parse_upstream_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("unparseable timestamp '{}': {}", raw, e))
}

/// Returns `true` if `timestamp` is older than `max_age_minutes` relative to
/// `now`.
///
/// Staleness is strictly greater than the threshold:
///   age > max_age_minutes  →  stale
///   age == max_age_minutes →  not stale
///
/// Timestamps in the future are never stale. Returns an error if the
/// timestamp cannot be parsed; callers should treat that as stale.
pub fn is_stale_at(timestamp: &str, max_age_minutes: u64, now: DateTime<Utc>) -> Result<bool, String> {
    let reading_time = parse_upstream_timestamp(timestamp)?;
    let age_minutes = (now - reading_time).num_minutes().max(0) as u64;
    Ok(age_minutes > max_age_minutes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
