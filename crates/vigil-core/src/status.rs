//! Service-status checker.
//!
//! Polls an authenticated status endpoint that answers with a JSON list
//! of worker descriptors and maps the first entry's boolean flags to a
//! single [`ServiceState`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::{FetchError, Prober};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Running,
    Restarting,
    Exited,
    Unknown,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Restarting => write!(f, "restarting"),
            Self::Exited => write!(f, "exited"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StatusError {
    /// Non-success HTTP status from the target, carrying the exact code.
    #[error("error {status} checking url: {url}")]
    CheckFailed { url: String, status: u16 },

    #[error("unexpected status response from {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// One element of the status endpoint's JSON list. Unknown fields are
/// ignored; only the boolean flags matter.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceEnvelope {
    pub status: ServiceFlags,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFlags {
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub is_exited: bool,
    #[serde(default)]
    pub is_restarting: bool,
}

impl ServiceFlags {
    /// Flag precedence: exited > restarting > running > unknown.
    pub fn classify(&self) -> ServiceState {
        if self.is_exited {
            ServiceState::Exited
        } else if self.is_restarting {
            ServiceState::Restarting
        } else if self.is_running {
            ServiceState::Running
        } else {
            ServiceState::Unknown
        }
    }
}

pub struct StatusChecker {
    prober: Arc<dyn Prober>,
    bearer_token: String,
}

impl StatusChecker {
    pub fn new(prober: Arc<dyn Prober>, bearer_token: impl Into<String>) -> Self {
        Self {
            prober,
            bearer_token: bearer_token.into(),
        }
    }

    /// One stateless check: GET the endpoint, require a success status,
    /// and classify the first list element's flags.
    pub async fn check(&self, url: &str) -> Result<ServiceState, StatusError> {
        let response = self.prober.get(url, Some(&self.bearer_token)).await?;

        if !response.is_success() {
            return Err(StatusError::CheckFailed {
                url: url.to_string(),
                status: response.status,
            });
        }

        let envelopes: Vec<ServiceEnvelope> =
            serde_json::from_slice(&response.body).map_err(|e| StatusError::Parse {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let first = envelopes.first().ok_or_else(|| StatusError::Parse {
            url: url.to_string(),
            reason: "empty status list".to_string(),
        })?;

        Ok(first.status.classify())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(running: bool, exited: bool, restarting: bool) -> ServiceFlags {
        ServiceFlags {
            is_running: running,
            is_exited: exited,
            is_restarting: restarting,
        }
    }

    #[test]
    fn exited_takes_precedence_over_everything() {
        assert_eq!(flags(true, true, true).classify(), ServiceState::Exited);
        assert_eq!(flags(false, true, true).classify(), ServiceState::Exited);
        assert_eq!(flags(true, true, false).classify(), ServiceState::Exited);
        assert_eq!(flags(false, true, false).classify(), ServiceState::Exited);
    }

    #[test]
    fn restarting_takes_precedence_over_running() {
        assert_eq!(flags(true, false, true).classify(), ServiceState::Restarting);
        assert_eq!(flags(false, false, true).classify(), ServiceState::Restarting);
    }

    #[test]
    fn running_when_only_running_set() {
        assert_eq!(flags(true, false, false).classify(), ServiceState::Running);
    }

    #[test]
    fn unknown_when_no_flag_set() {
        assert_eq!(flags(false, false, false).classify(), ServiceState::Unknown);
    }

    #[test]
    fn envelope_parses_camel_case_flags() {
        let body = r#"[{"name":"worker","status":{"isRunning":true,"isExited":false,"isRestarting":false}}]"#;
        let envelopes: Vec<ServiceEnvelope> = serde_json::from_str(body).unwrap();
        assert_eq!(envelopes[0].status.classify(), ServiceState::Running);
    }

    #[test]
    fn envelope_missing_flags_default_to_false() {
        let body = r#"[{"status":{}}]"#;
        let envelopes: Vec<ServiceEnvelope> = serde_json::from_str(body).unwrap();
        assert_eq!(envelopes[0].status.classify(), ServiceState::Unknown);
    }

    #[test]
    fn state_display_matches_alert_wording() {
        assert_eq!(ServiceState::Running.to_string(), "running");
        assert_eq!(ServiceState::Exited.to_string(), "exited");
        assert_eq!(ServiceState::Restarting.to_string(), "restarting");
        assert_eq!(ServiceState::Unknown.to_string(), "unknown");
    }
}
