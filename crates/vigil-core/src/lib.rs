#![forbid(unsafe_code)]

pub mod config;
pub mod fetch;
pub mod freshness;
pub mod monitor;
pub mod notify;
pub mod status;

pub use config::{ConfigError, FreshnessConfig, StatusConfig, Target};
pub use fetch::{FetchError, HttpProber, ProbeResponse, Prober, USER_AGENT};
pub use freshness::{CacheHeaders, FreshnessChecker, FreshnessVerdict};
pub use monitor::{FreshnessMonitor, PassError, StatusMonitor};
pub use notify::{first_line, Notifier, NotifyError};
pub use status::{ServiceState, StatusChecker, StatusError};
