use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::SecdeskConfig;

use secdesk_core::geo::GeoLocator;
use secdesk_core::{OpenAiProvider, SearchLog, SearchRecord, route_query};
use secdesk_monitor::{AlertConfig, EmailAlerter, HealthCheckConfig, HealthMonitor};

#[derive(Parser)]
#[command(name = "secdesk")]
#[command(version)]
#[command(about = "secdesk — a security and GRC Q&A assistant")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a security or GRC question
    Ask {
        /// The question to ask
        query: String,

        /// Route to a specific agent (cyber, grc, attack_surface,
        /// risk_management) instead of keyword classification
        #[arg(short, long)]
        agent: Option<String>,
    },

    /// Show recent community searches
    History {
        /// Number of entries to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Run the health-check monitor until interrupted
    Monitor,

    /// Initialize config directory and default config
    Init,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config),
        Commands::Ask { query, agent } => cmd_ask(&cli.config, &query, agent.as_deref()).await,
        Commands::History { limit } => cmd_history(&cli.config, limit),
        Commands::Monitor => cmd_monitor(&cli.config).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }

        info!("Created default config at {}", config_path.display());
    }

    println!("secdesk initialized at {}", config_dir.display());
    println!(
        "Edit {} to configure your API key (or set OPENAI_API_KEY).",
        config_path.display()
    );
    Ok(())
}

fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let config = SecdeskConfig::load(config_path)?;
    println!("{:#?}", config);
    Ok(())
}

async fn cmd_ask(config_path: &Option<PathBuf>, query: &str, agent: Option<&str>) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("Query must not be empty");
    }

    let config = SecdeskConfig::load(config_path)?;
    let provider = OpenAiProvider::new(
        config.provider.api_key.clone(),
        config.provider.model.clone(),
        config.provider.base_url.clone(),
        config.provider.max_tokens,
    );

    let result = route_query(&provider, query, agent).await?;

    println!("Response from {} agent:\n", result.agent);
    println!("{}", result.response);

    record_search(&config, query, result.agent).await;
    Ok(())
}

/// Best-effort history append; never fails the query that produced it
async fn record_search(config: &SecdeskConfig, query: &str, agent: secdesk_core::AgentKind) {
    let mut record = SearchRecord::new(query, agent)
        .with_user_agent(format!("secdesk-cli/{}", env!("CARGO_PKG_VERSION")));

    if config.geolocation.enabled {
        match GeoLocator::new(&config.geolocation.endpoint).lookup().await {
            Ok(location) => {
                record = record.with_location(location.ip.clone(), location.coarse());
            }
            Err(err) => debug!("Geolocation lookup failed: {:#}", err),
        }
    }

    let log = SearchLog::new(&config.history.file, config.history.max_entries);
    if let Err(err) = log.append(record) {
        warn!("Failed to record search: {:#}", err);
    }
}

fn cmd_history(config_path: &Option<PathBuf>, limit: usize) -> Result<()> {
    let config = SecdeskConfig::load(config_path)?;
    let log = SearchLog::new(&config.history.file, config.history.max_entries);
    let entries = log.recent(limit);

    if entries.is_empty() {
        println!("No community searches logged yet.");
        return Ok(());
    }

    for entry in entries {
        let local = entry.timestamp.with_timezone(&Local);
        println!("{}  [{}]", local.format("%Y-%m-%d %H:%M:%S"), entry.agent);
        println!("  {}", entry.query);
        if let Some(location) = &entry.location {
            println!("  from {}", location);
        }
        println!();
    }
    Ok(())
}

async fn cmd_monitor(config_path: &Option<PathBuf>) -> Result<()> {
    let config = SecdeskConfig::load(config_path)?;
    if !config.monitor.enabled {
        anyhow::bail!("Monitor is disabled; set [monitor] enabled = true in the config");
    }
    if config.monitor.url.is_empty() {
        anyhow::bail!("Monitor has no URL; set [monitor] url in the config");
    }

    let alerter = match &config.monitor.smtp {
        Some(smtp) => Some(EmailAlerter::new(&AlertConfig {
            smtp_host: smtp.host.clone(),
            smtp_port: smtp.port,
            username: smtp.username.clone(),
            password: smtp.password.clone(),
            from: smtp.from.clone(),
            to: smtp.to.clone(),
        })?),
        None => {
            warn!("No SMTP settings configured; failures will only be logged");
            None
        }
    };

    let monitor = HealthMonitor::new(
        HealthCheckConfig::new(
            config.monitor.url.clone(),
            Duration::from_secs(config.monitor.interval_secs),
        ),
        alerter,
    );

    let token = CancellationToken::new();
    let run_token = token.clone();
    let handle = tokio::spawn(async move { monitor.run(run_token).await });

    signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;
    info!("Shutting down");
    token.cancel();
    handle.await.context("Monitor task panicked")?;
    Ok(())
}
