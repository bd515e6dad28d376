//! Cache-freshness checker.
//!
//! Fetches a public URL and decides from response headers alone whether
//! the CDN's cached copy has gone stale: either the CDN reports
//! `cf-cache-status: EXPIRED`, or `last-modified` is older than the
//! staleness threshold.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use tracing::debug;

use crate::fetch::{FetchError, Prober};

/// A `last-modified` older than this many minutes marks the response
/// expired. Kept at the literal 90 minutes the alerting was tuned to.
pub const STALE_AFTER_MINUTES: i64 = 90;

/// Delay between the first and second cache-warming probe.
pub const DEFAULT_WARM_DELAY: Duration = Duration::from_secs(2);
/// Delay between the second probe and the decisive third fetch.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(13);

/// The cache-relevant response headers, each empty when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheHeaders {
    pub cache_control: String,
    pub expires: String,
    pub cf_cache_status: String,
    pub age: String,
    pub last_modified: String,
}

impl CacheHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        Self {
            cache_control: get("cache-control"),
            expires: get("expires"),
            cf_cache_status: get("cf-cache-status"),
            age: get("age"),
            last_modified: get("last-modified"),
        }
    }
}

/// Verdict for a single URL. `diagnostic` carries the header dump used
/// in alerts when expired, and is just the URL otherwise.
#[derive(Debug, Clone)]
pub struct FreshnessVerdict {
    pub url: String,
    pub is_expired: bool,
    pub diagnostic: String,
}

/// Decide expiry and build the diagnostic from the headers.
pub fn evaluate(url: &str, headers: &CacheHeaders, now: DateTime<Utc>) -> FreshnessVerdict {
    let threshold = now - chrono::Duration::minutes(STALE_AFTER_MINUTES);

    let modified_too_old = !headers.last_modified.is_empty()
        && DateTime::parse_from_rfc2822(&headers.last_modified)
            .map(|t| t.with_timezone(&Utc) < threshold)
            .unwrap_or(false);

    let is_expired = headers.cf_cache_status == "EXPIRED" || modified_too_old;

    let mut diagnostic = url.to_string();
    if is_expired {
        for (label, value) in [
            ("cache-control", &headers.cache_control),
            ("expires", &headers.expires),
            ("age", &headers.age),
            ("last-modified", &headers.last_modified),
        ] {
            if !value.is_empty() {
                diagnostic.push_str(&format!("\n[{}] {}", label, value));
            }
        }
        // cf-cache-status is always reported when expired, even if empty.
        diagnostic.push_str(&format!("\n[cf-cache-status] {}", headers.cf_cache_status));
    }

    FreshnessVerdict {
        url: url.to_string(),
        is_expired,
        diagnostic,
    }
}

/// Runs the three-fetch probe sequence against a URL.
///
/// The first two fetches are cache-warming probes: their results are
/// discarded on purpose, because issuing them changes the state of the
/// intermediate cache before the decisive third fetch. Do not collapse
/// this into a single request.
pub struct FreshnessChecker {
    prober: Arc<dyn Prober>,
    warm_delay: Duration,
    settle_delay: Duration,
}

impl FreshnessChecker {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self {
            prober,
            warm_delay: DEFAULT_WARM_DELAY,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Override the inter-probe delays. Tests compress these.
    pub fn with_delays(mut self, warm: Duration, settle: Duration) -> Self {
        self.warm_delay = warm;
        self.settle_delay = settle;
        self
    }

    /// Probe a URL: warm, warm, then judge the third response.
    pub async fn probe(&self, url: &str) -> Result<FreshnessVerdict, FetchError> {
        self.prober.get(url, None).await?;
        tokio::time::sleep(self.warm_delay).await;
        self.prober.get(url, None).await?;
        tokio::time::sleep(self.settle_delay).await;
        let response = self.prober.get(url, None).await?;

        let headers = CacheHeaders::from_headers(&response.headers);
        debug!(url, cf_cache_status = %headers.cf_cache_status, "decisive probe complete");
        Ok(evaluate(url, &headers, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-08-29T12:00:00Z".parse().unwrap()
    }

    fn http_date(t: DateTime<Utc>) -> String {
        t.to_rfc2822().replace("+0000", "GMT")
    }

    #[test]
    fn default_probe_spacing_is_two_then_thirteen_seconds() {
        assert_eq!(DEFAULT_WARM_DELAY, Duration::from_secs(2));
        assert_eq!(DEFAULT_SETTLE_DELAY, Duration::from_secs(13));
    }

    #[test]
    fn expired_when_cf_cache_status_is_expired() {
        let headers = CacheHeaders {
            cf_cache_status: "EXPIRED".into(),
            ..Default::default()
        };
        let verdict = evaluate("https://a.example.com/", &headers, now());
        assert!(verdict.is_expired);
    }

    #[test]
    fn cf_cache_status_comparison_is_exact() {
        let headers = CacheHeaders {
            cf_cache_status: "expired".into(),
            ..Default::default()
        };
        assert!(!evaluate("https://a.example.com/", &headers, now()).is_expired);
    }

    #[test]
    fn expired_when_last_modified_older_than_threshold() {
        let headers = CacheHeaders {
            cf_cache_status: "HIT".into(),
            last_modified: http_date(now() - chrono::Duration::minutes(91)),
            ..Default::default()
        };
        assert!(evaluate("https://a.example.com/", &headers, now()).is_expired);
    }

    #[test]
    fn fresh_when_last_modified_within_threshold() {
        let headers = CacheHeaders {
            cf_cache_status: "HIT".into(),
            last_modified: http_date(now() - chrono::Duration::minutes(89)),
            ..Default::default()
        };
        assert!(!evaluate("https://a.example.com/", &headers, now()).is_expired);
    }

    #[test]
    fn hit_without_last_modified_is_never_expired() {
        let headers = CacheHeaders {
            cf_cache_status: "HIT".into(),
            ..Default::default()
        };
        let verdict = evaluate("https://a.example.com/", &headers, now());
        assert!(!verdict.is_expired);
        assert_eq!(verdict.diagnostic, "https://a.example.com/");
    }

    #[test]
    fn unparsable_last_modified_does_not_expire() {
        let headers = CacheHeaders {
            last_modified: "yesterday-ish".into(),
            ..Default::default()
        };
        assert!(!evaluate("https://a.example.com/", &headers, now()).is_expired);
    }

    #[test]
    fn diagnostic_lists_present_headers_in_order() {
        let last_modified = http_date(now() - chrono::Duration::minutes(120));
        let headers = CacheHeaders {
            cache_control: "max-age=600".into(),
            expires: String::new(),
            cf_cache_status: "EXPIRED".into(),
            age: "1200".into(),
            last_modified: last_modified.clone(),
        };
        let verdict = evaluate("https://a.example.com/", &headers, now());
        assert!(verdict.is_expired);
        assert_eq!(
            verdict.diagnostic,
            format!(
                "https://a.example.com/\n[cache-control] max-age=600\n[age] 1200\n[last-modified] {}\n[cf-cache-status] EXPIRED",
                last_modified
            )
        );
    }

    #[test]
    fn diagnostic_with_no_optional_headers_has_url_and_cf_line_only() {
        let headers = CacheHeaders {
            cf_cache_status: "EXPIRED".into(),
            ..Default::default()
        };
        let verdict = evaluate("https://a.example.com/", &headers, now());
        assert_eq!(
            verdict.diagnostic,
            "https://a.example.com/\n[cf-cache-status] EXPIRED"
        );
    }

    #[test]
    fn cf_line_included_even_when_empty() {
        let headers = CacheHeaders {
            last_modified: http_date(now() - chrono::Duration::minutes(120)),
            ..Default::default()
        };
        let verdict = evaluate("https://a.example.com/", &headers, now());
        assert!(verdict.is_expired);
        assert!(verdict.diagnostic.ends_with("\n[cf-cache-status] "));
    }

    #[test]
    fn from_headers_defaults_missing_to_empty() {
        let mut map = HeaderMap::new();
        map.insert("cache-control", "no-store".parse().unwrap());
        let headers = CacheHeaders::from_headers(&map);
        assert_eq!(headers.cache_control, "no-store");
        assert_eq!(headers.cf_cache_status, "");
        assert_eq!(headers.last_modified, "");
    }
}
