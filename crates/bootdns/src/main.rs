// # bootdns
//
// Runs once at boot: works out this host's name and public address, then
// makes the hosted-zone A record say so.
//
// The binary is a THIN integration layer:
// 1. Parse flags (with `BOOTDNS_*` environment fallbacks)
// 2. Initialize logging and the runtime
// 3. Register providers and metadata sources
// 4. Run one reconciliation, bounded by signals and a deadline
//
// All DNS logic lives in bootdns-core.
//
// ## Credentials
//
// Route 53 keys are never taken from flags. They come from the standard
// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`
// variables, or from the instance profile.
//
// ## Exit Status
//
// - 0: record already correct, or created/updated
// - 1: configuration or input error
// - 2: provider error (the record may be stale)
// - 3: skipped, no hosted zone matches the hostname
// - 4: interrupted or deadline exceeded
//
// ## Example
//
// ```bash
// export BOOTDNS_HOSTNAME=web1.example.com
// bootdns --replace-strategy sequential --log-level debug
// ```

use anyhow::{Context, Result};
use bootdns_core::config::{
    BootDnsConfig, DEFAULT_RECORD_TTL, DEFAULT_REQUEST_TIMEOUT_SECS, MetadataConfig,
    ProviderConfig, ReconcileConfig, ReplaceStrategy,
};
use bootdns_core::{Outcome, ProviderRegistry, ReconcileError, Reconciler};
use clap::{Parser, ValueEnum};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for the ways a run can end
///
/// A skipped or failed run is not fatal to the boot; callers decide how
/// loudly to report each code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BootDnsExitCode {
    /// DNS already correct, or brought up to date
    Synced = 0,
    /// Configuration error or unusable input
    ConfigError = 1,
    /// The DNS provider could not be used
    ProviderError = 2,
    /// No hosted zone covers the hostname
    Skipped = 3,
    /// Signal or deadline ended the run early
    Interrupted = 4,
}

impl From<BootDnsExitCode> for ExitCode {
    fn from(code: BootDnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// DELETE and CREATE in one batch
    Atomic,
    /// DELETE, then CREATE, as two batches
    Sequential,
}

impl From<StrategyArg> for ReplaceStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Atomic => ReplaceStrategy::Atomic,
            StrategyArg::Sequential => ReplaceStrategy::Sequential,
        }
    }
}

/// Publish this host's public address in DNS
#[derive(Debug, Parser)]
#[command(name = "bootdns", version, about)]
struct Cli {
    /// Hostname to publish (default: from the metadata source)
    #[arg(long, env = "BOOTDNS_HOSTNAME")]
    hostname: Option<String>,

    /// Address to publish (default: from the metadata source)
    #[arg(long, env = "BOOTDNS_ADDRESS")]
    address: Option<String>,

    /// Where to discover the hostname and address
    #[arg(long, env = "BOOTDNS_METADATA_SOURCE", default_value = "imds")]
    metadata_source: String,

    /// Instance metadata endpoint override
    #[arg(long, env = "BOOTDNS_IMDS_ENDPOINT")]
    imds_endpoint: Option<String>,

    /// DNS provider
    #[arg(long, env = "BOOTDNS_PROVIDER_TYPE", default_value = "route53")]
    provider: String,

    /// Route 53 API endpoint override
    #[arg(long, env = "BOOTDNS_ROUTE53_ENDPOINT")]
    route53_endpoint: Option<String>,

    /// Route 53 signing region override
    #[arg(long, env = "BOOTDNS_ROUTE53_REGION")]
    route53_region: Option<String>,

    /// TTL for created records, in seconds
    #[arg(long, env = "BOOTDNS_TTL", default_value_t = DEFAULT_RECORD_TTL)]
    ttl: u32,

    /// Timeout for each provider call, in seconds
    #[arg(long, env = "BOOTDNS_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    /// How a stale record is replaced
    #[arg(long, env = "BOOTDNS_REPLACE_STRATEGY", value_enum, default_value_t = StrategyArg::Atomic)]
    replace_strategy: StrategyArg,

    /// Give up on the whole run after this many seconds
    #[arg(long, env = "BOOTDNS_DEADLINE_SECS", default_value_t = 120)]
    deadline_secs: u64,

    /// Read from the provider but only log changes
    #[arg(long, env = "BOOTDNS_DRY_RUN")]
    dry_run: bool,

    /// Log level
    #[arg(
        long,
        env = "BOOTDNS_LOG_LEVEL",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    log_level: String,
}

impl Cli {
    /// Build and validate the library configuration
    fn to_config(&self) -> Result<BootDnsConfig> {
        let provider = match self.provider.as_str() {
            "route53" => ProviderConfig::Route53 {
                access_key_id: None,
                secret_access_key: None,
                session_token: None,
                endpoint: self.route53_endpoint.clone(),
                region: self.route53_region.clone(),
                dry_run: self.dry_run,
            },
            other => ProviderConfig::Custom {
                factory: other.to_string(),
                config: serde_json::json!({}),
            },
        };

        let metadata = match self.metadata_source.as_str() {
            "imds" => MetadataConfig::Imds {
                endpoint: self.imds_endpoint.clone(),
            },
            "static" => MetadataConfig::Static {
                hostname: self.hostname.clone().unwrap_or_default(),
                address: self.address.clone().unwrap_or_default(),
            },
            other => MetadataConfig::Custom {
                factory: other.to_string(),
                config: serde_json::json!({}),
            },
        };

        let config = BootDnsConfig {
            provider,
            metadata,
            reconcile: ReconcileConfig {
                ttl: self.ttl,
                request_timeout_secs: self.request_timeout_secs,
                replace_strategy: self.replace_strategy.into(),
            },
        };
        config.validate().context("invalid configuration")?;

        if self.deadline_secs == 0 {
            anyhow::bail!("--deadline-secs must be > 0");
        }

        Ok(config)
    }

    fn log_level(&self) -> Level {
        match self.log_level.as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version land here too
            if e.use_stderr() {
                return BootDnsExitCode::ConfigError.into();
            }
            return ExitCode::SUCCESS;
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return BootDnsExitCode::ConfigError.into();
    }

    let config = match cli.to_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return BootDnsExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return BootDnsExitCode::ConfigError.into();
        }
    };

    let deadline = Duration::from_secs(cli.deadline_secs);
    let code = rt.block_on(async {
        tokio::select! {
            code = run(&cli, &config) => code,
            signal = wait_for_shutdown() => {
                warn!(
                    "Interrupted by {}; if a replace was in flight the record may be absent until the next run",
                    signal
                );
                BootDnsExitCode::Interrupted
            }
            _ = tokio::time::sleep(deadline) => {
                warn!(
                    "Deadline of {:?} exceeded; if a replace was in flight the record may be absent until the next run",
                    deadline
                );
                BootDnsExitCode::Interrupted
            }
        }
    });

    info!("bootdns finished with exit status {}", code as u8);
    code.into()
}

/// Build the registry with every compiled-in plugin
fn build_registry() -> ProviderRegistry {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "route53")]
    bootdns_provider_route53::register(&registry);

    #[cfg(feature = "imds")]
    bootdns_imds::register(&registry);

    registry
}

/// One reconciliation, start to finish
async fn run(cli: &Cli, config: &BootDnsConfig) -> BootDnsExitCode {
    let registry = build_registry();
    info!(
        "Starting bootdns (provider={}, metadata={})",
        config.provider.type_name(),
        config.metadata.type_name()
    );

    let provider = match registry.create_provider(&config.provider) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to create DNS provider: {}", e);
            return BootDnsExitCode::ConfigError;
        }
    };

    let (hostname, address) = match discover(cli, &registry, &config.metadata).await {
        Ok(pair) => pair,
        Err(e) => {
            error!("Failed to determine what to publish: {:#}", e);
            return BootDnsExitCode::ConfigError;
        }
    };

    let reconciler = match Reconciler::new(provider, &config.reconcile) {
        Ok(reconciler) => reconciler,
        Err(e) => {
            error!("Failed to create reconciler: {}", e);
            return BootDnsExitCode::ConfigError;
        }
    };

    exit_code_for(&reconciler.reconcile(&hostname, &address).await)
}

/// Hostname and address from flags, falling back to the metadata source
async fn discover(
    cli: &Cli,
    registry: &ProviderRegistry,
    metadata: &MetadataConfig,
) -> Result<(String, String)> {
    if let (Some(hostname), Some(address)) = (&cli.hostname, &cli.address) {
        return Ok((hostname.clone(), address.clone()));
    }

    let source = registry
        .create_metadata_source(metadata)
        .context("failed to create metadata source")?;

    let hostname = match &cli.hostname {
        Some(hostname) => hostname.clone(),
        None => source
            .hostname()
            .await
            .with_context(|| format!("{} metadata has no hostname", source.source_name()))?,
    };
    let address = match &cli.address {
        Some(address) => address.clone(),
        None => source
            .public_address()
            .await
            .with_context(|| format!("{} metadata has no public address", source.source_name()))?,
    };

    info!(
        "Discovered {} -> {} via {} metadata",
        hostname,
        address,
        source.source_name()
    );
    Ok((hostname, address))
}

fn exit_code_for(result: &std::result::Result<Outcome, ReconcileError>) -> BootDnsExitCode {
    match result {
        Ok(outcome) if outcome.is_skipped() => BootDnsExitCode::Skipped,
        Ok(_) => BootDnsExitCode::Synced,
        Err(ReconcileError::ZoneNotFound { .. }) => BootDnsExitCode::Skipped,
        Err(ReconcileError::InvalidInput(_)) => BootDnsExitCode::ConfigError,
        Err(ReconcileError::ProviderUnavailable { .. }) => BootDnsExitCode::ProviderError,
    }
}

/// Wait for SIGTERM or SIGINT
///
/// If the handlers cannot be installed this never resolves, leaving the
/// deadline as the only bound.
#[cfg(unix)]
async fn wait_for_shutdown() -> &'static str {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to set up signal handlers: {}", e);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        Err(e) => {
            warn!("Failed to wait for CTRL-C: {}", e);
            std::future::pending().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootdns_core::error::{Error, Stage};
    use bootdns_core::SkipReason;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["bootdns"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments parse")
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_build_route53_with_imds() {
        let cli = parse(&[]);
        let config = cli.to_config().unwrap();

        assert_eq!(config.provider.type_name(), "route53");
        assert_eq!(config.metadata.type_name(), "imds");
        assert_eq!(config.reconcile.ttl, 60);
        assert_eq!(config.reconcile.request_timeout_secs, 30);
        assert_eq!(config.reconcile.replace_strategy, ReplaceStrategy::Atomic);
    }

    #[test]
    fn test_flags_flow_into_config() {
        let cli = parse(&[
            "--replace-strategy",
            "sequential",
            "--ttl",
            "120",
            "--dry-run",
            "--route53-endpoint",
            "http://127.0.0.1:9000",
        ]);
        let config = cli.to_config().unwrap();

        assert_eq!(config.reconcile.replace_strategy, ReplaceStrategy::Sequential);
        assert_eq!(config.reconcile.ttl, 120);
        match config.provider {
            ProviderConfig::Route53 {
                dry_run, endpoint, ..
            } => {
                assert!(dry_run);
                assert_eq!(endpoint.as_deref(), Some("http://127.0.0.1:9000"));
            }
            other => panic!("unexpected provider config: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse(&["--ttl", "0"]).to_config().is_err());
        assert!(parse(&["--deadline-secs", "0"]).to_config().is_err());
        assert!(parse(&["--metadata-source", "static", "--hostname", "a.example.com"])
            .to_config()
            .is_err());
        assert!(Cli::try_parse_from(["bootdns", "--log-level", "loud"]).is_err());
        assert!(Cli::try_parse_from(["bootdns", "--replace-strategy", "both"]).is_err());
    }

    #[tokio::test]
    async fn test_flags_skip_metadata_discovery() {
        let cli = parse(&[
            "--hostname",
            "web1.example.com",
            "--address",
            "203.0.113.7",
            "--metadata-source",
            "nonexistent",
        ]);
        let registry = ProviderRegistry::new();
        let metadata = MetadataConfig::Imds { endpoint: None };

        let (hostname, address) = discover(&cli, &registry, &metadata).await.unwrap();
        assert_eq!(hostname, "web1.example.com");
        assert_eq!(address, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_static_metadata_discovery() {
        let cli = parse(&["--hostname", "web1.example.com"]);
        let registry = ProviderRegistry::new();
        let metadata = MetadataConfig::Static {
            hostname: "ignored.example.com".to_string(),
            address: "198.51.100.9".to_string(),
        };

        let (hostname, address) = discover(&cli, &registry, &metadata).await.unwrap();
        assert_eq!(hostname, "web1.example.com");
        assert_eq!(address, "198.51.100.9");
    }

    #[test]
    fn test_exit_codes() {
        let synced = Ok(Outcome::Unchanged {
            hostname: "a.example.com.".to_string(),
            address: "192.0.2.1".to_string(),
        });
        assert_eq!(exit_code_for(&synced), BootDnsExitCode::Synced);

        let skipped = Ok(Outcome::Skipped(SkipReason::NoMatchingZone {
            hostname: "a.example.org.".to_string(),
        }));
        assert_eq!(exit_code_for(&skipped), BootDnsExitCode::Skipped);

        let unavailable = Err(ReconcileError::ProviderUnavailable {
            stage: Stage::ListZones,
            source: Error::auth("denied"),
        });
        assert_eq!(exit_code_for(&unavailable), BootDnsExitCode::ProviderError);

        let invalid = Err(ReconcileError::InvalidInput("empty address".to_string()));
        assert_eq!(exit_code_for(&invalid), BootDnsExitCode::ConfigError);

        assert_eq!(BootDnsExitCode::Interrupted as u8, 4);
    }

    #[test]
    fn test_registry_has_compiled_in_plugins() {
        let registry = build_registry();
        assert!(registry.has_metadata_source("static"));
        #[cfg(feature = "route53")]
        assert!(registry.has_provider("route53"));
        #[cfg(feature = "imds")]
        assert!(registry.has_metadata_source("imds"));
    }
}
