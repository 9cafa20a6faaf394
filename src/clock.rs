//! Resolves the reference "now" for a run. Builds are reproducible when
//! `STATIC_GEN_TIME` pins the clock; otherwise the machine clock is used.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::{info, warn};

/// The environment variable that freezes "now" for deterministic builds.
pub const OVERRIDE_VAR: &str = "STATIC_GEN_TIME";

/// The only accepted shape for the override, e.g. `2025-12-12T08:00:00Z`.
const OVERRIDE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Returns the frozen instant if `override_value` parses, else the current
/// UTC time. Never fails.
pub fn resolve_now(override_value: Option<&str>) -> DateTime<Utc> {
    resolve_now_or(override_value, Utc::now)
}

/// Like [`resolve_now`], but takes the fallback clock as an argument.
pub fn resolve_now_or<F>(override_value: Option<&str>, fallback: F) -> DateTime<Utc>
where
    F: FnOnce() -> DateTime<Utc>,
{
    if let Some(raw) = override_value {
        match NaiveDateTime::parse_from_str(raw.trim(), OVERRIDE_FORMAT) {
            Ok(naive) => {
                let now = Utc.from_utc_datetime(&naive);
                info!(now = %now.to_rfc3339(), "using frozen time from {}", OVERRIDE_VAR);
                return now;
            }
            Err(err) => {
                warn!(
                    value = raw,
                    error = %err,
                    "could not parse {}; falling back to the system clock",
                    OVERRIDE_VAR
                );
            }
        }
    }

    let now = fallback();
    info!(now = %now.to_rfc3339(), "using system clock");
    now
}

#[cfg(test)]
mod test {
    use super::*;

    fn fixed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_override_is_used() {
        let now = resolve_now_or(Some("2025-12-12T08:00:00Z"), fixed);
        assert_eq!(Utc.with_ymd_and_hms(2025, 12, 12, 8, 0, 0).unwrap(), now);
    }

    #[test]
    fn test_missing_override_uses_fallback() {
        assert_eq!(fixed(), resolve_now_or(None, fixed));
    }

    #[test]
    fn test_malformed_override_uses_fallback() {
        for raw in ["2025-12-12", "2025-12-12T08:00:00+08:00", "tomorrow", ""] {
            assert_eq!(fixed(), resolve_now_or(Some(raw), fixed), "{}", raw);
        }
    }
}
