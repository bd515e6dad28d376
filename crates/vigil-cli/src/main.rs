use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::{fmt, EnvFilter};

use vigil_core::{
    FreshnessChecker, FreshnessConfig, FreshnessMonitor, HttpProber, Notifier, Prober,
    StatusChecker, StatusConfig, StatusMonitor,
};

fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");

    if GIT_HASH.is_empty() {
        // Leak is fine — called once, lives for the program's lifetime.
        Box::leak(VERSION.to_string().into_boxed_str())
    } else {
        Box::leak(format!("{VERSION} ({GIT_HASH})").into_boxed_str())
    }
}

const ENV_HELP: &str = "Environment variables:
  status:
    VIGIL_STATUS_WEBHOOK         alert webhook URL (required)
    VIGIL_BEARER_TOKEN           bearer credential for status checks (required)
    VIGIL_STATUS_URL_<NAME>      one status endpoint per target (required, >=1)
    VIGIL_STATUS_INTERVAL_MS     per-target poll interval, default 300000
  cache:
    VIGIL_CACHE_WEBHOOK          alert webhook URL (required)
    VIGIL_CACHE_URLS             comma-separated monitored URLs (required)
    VIGIL_CACHE_INTERVAL_MINUTES shared batch interval, default 15";

/// Uptime and cache-freshness monitor: polls endpoints and posts
/// alerts to a chat webhook. All behavior is driven by environment
/// variables.
#[derive(Parser)]
#[command(name = "vigil", version = version_string(), about, after_help = ENV_HELP)]
struct Cli {
    /// Log format: pretty or json.
    #[arg(long, default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll authenticated status endpoints and alert on non-running workers.
    Status,
    /// Poll public URLs and alert on stale CDN caches.
    Cache,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_format);

    match cli.command {
        Commands::Status => run_status().await,
        Commands::Cache => run_cache().await,
    }
}

async fn run_status() {
    let config = match StatusConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    banner("status", &config.webhook_url, config.targets.len());

    let prober = Arc::new(HttpProber::new());
    let checker = StatusChecker::new(
        Arc::clone(&prober) as Arc<dyn Prober>,
        config.bearer_token.clone(),
    );
    let notifier = Notifier::new(prober.client(), config.webhook_url.clone());
    let monitor = Arc::new(StatusMonitor::new(config.targets, checker, notifier));

    tokio::select! {
        _ = monitor.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }
}

async fn run_cache() {
    let config = match FreshnessConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    banner("cache", &config.webhook_url, config.urls.len());

    let prober = Arc::new(HttpProber::new());
    let checker = FreshnessChecker::new(Arc::clone(&prober) as Arc<dyn Prober>);
    let notifier = Notifier::new(prober.client(), config.webhook_url.clone());
    let monitor = FreshnessMonitor::new(&config, checker, notifier);

    tokio::select! {
        _ = monitor.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }
}

fn banner(variant: &str, webhook_url: &str, target_count: usize) {
    println!(
        "{} {} {}",
        style("vigil").bold(),
        style(version_string()).dim(),
        style(variant).cyan()
    );
    println!("  {} {}", style("webhook:").dim(), webhook_url);
    println!("  {} {}", style("targets:").dim(), target_count);
    println!("{}", style("Press Ctrl+C to stop").dim());
}

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        "json" => {
            fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }
}
