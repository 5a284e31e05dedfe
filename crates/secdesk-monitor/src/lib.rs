//! secdesk-monitor - best-effort uptime probe with email alerting
//!
//! Polls a health-check URL on a fixed interval and emails the on-call
//! address when the endpoint goes down. Runs independently of query
//! handling; its failures are logged, never propagated.

pub mod alert;

pub use alert::{AlertConfig, EmailAlerter};

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Settings for the health-check loop
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// URL to probe
    pub url: String,
    /// Time between probes
    pub interval: Duration,
    /// Per-probe request timeout
    pub request_timeout: Duration,
}

impl HealthCheckConfig {
    pub fn new(url: impl Into<String>, interval: Duration) -> Self {
        Self {
            url: url.into(),
            interval,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// One probe outcome relative to the previous state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    StillUp,
    WentDown,
    StillDown,
    Recovered,
}

/// Edge detector over probe outcomes. Starts healthy, so a monitor
/// brought up during an outage alerts on its first failed probe.
#[derive(Debug)]
struct AlertGate {
    healthy: bool,
}

impl AlertGate {
    fn new() -> Self {
        Self { healthy: true }
    }

    fn observe(&mut self, ok: bool) -> Transition {
        let transition = match (self.healthy, ok) {
            (true, true) => Transition::StillUp,
            (true, false) => Transition::WentDown,
            (false, false) => Transition::StillDown,
            (false, true) => Transition::Recovered,
        };
        self.healthy = ok;
        transition
    }
}

/// Polls the configured URL until cancelled, alerting on the up-to-down
/// transition and re-arming after recovery.
pub struct HealthMonitor {
    config: HealthCheckConfig,
    client: Client,
    alerter: Option<EmailAlerter>,
}

impl HealthMonitor {
    pub fn new(config: HealthCheckConfig, alerter: Option<EmailAlerter>) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            config,
            client,
            alerter,
        }
    }

    /// Run the probe loop until the token is cancelled. The first probe
    /// fires immediately.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            "Starting health monitor for {} (every {:?})",
            self.config.url, self.config.interval
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut gate = AlertGate::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Health monitor stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = self.check_once().await;
                    if let Err(err) = &outcome {
                        warn!("Health check failed for {}: {:#}", self.config.url, err);
                    }
                    match gate.observe(outcome.is_ok()) {
                        Transition::WentDown => {
                            if let Err(err) = &outcome {
                                self.send_alert(err).await;
                            }
                        }
                        Transition::Recovered => info!("{} recovered", self.config.url),
                        Transition::StillUp | Transition::StillDown => {}
                    }
                }
            }
        }
    }

    /// One probe: any transport error or non-2xx status counts as down
    pub async fn check_once(&self) -> Result<()> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.config.url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{} returned status {}", self.config.url, status));
        }
        Ok(())
    }

    async fn send_alert(&self, err: &anyhow::Error) {
        let Some(alerter) = &self.alerter else {
            return;
        };
        let subject = format!("[secdesk] health check failed: {}", self.config.url);
        let body = alert_body(&self.config.url, &format!("{err:#}"));
        if let Err(send_err) = alerter.send(&subject, &body).await {
            warn!("Failed to send health alert: {:#}", send_err);
        }
    }
}

fn alert_body(url: &str, description: &str) -> String {
    format!(
        "The health check for {url} is failing.\n\nLast error:\n{description}\n\nAlerts re-arm once the endpoint recovers."
    )
}
