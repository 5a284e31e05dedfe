//! Query dispatch
//!
//! Resolves a query to an agent, makes exactly one upstream call with that
//! agent's persona, and converts every upstream failure into response text:
//! quota exhaustion degrades to the agent's canned fallback table, anything
//! else to a human-readable error string. The only error this surface
//! propagates is an invalid explicit override.

use anyhow::Result;
use tracing::{debug, warn};

use crate::agents::{self, AgentKind, AgentProfile};
use crate::provider::ChatProvider;
use crate::router;

/// Marker substring that identifies quota exhaustion in an upstream
/// failure description
pub const QUOTA_MARKER: &str = "insufficient_quota";

/// The outcome of one routed query
#[derive(Debug, Clone)]
pub struct RoutingResult {
    pub agent: AgentKind,
    pub response: String,
}

/// Route a query to an agent and produce its response.
///
/// Fails only when `agent_override` is supplied and does not name a known
/// agent; see [`router::resolve`]. Upstream failures never propagate.
pub async fn route_query(
    provider: &dyn ChatProvider,
    query: &str,
    agent_override: Option<&str>,
) -> Result<RoutingResult> {
    let agent = router::resolve(query, agent_override)?;
    let profile = agents::profile(agent);

    let response = match provider.complete(profile.system_prompt, query).await {
        Ok(text) => text.trim().to_string(),
        Err(err) => degraded_response(profile, query, &err),
    };

    Ok(RoutingResult { agent, response })
}

fn degraded_response(profile: &AgentProfile, query: &str, err: &anyhow::Error) -> String {
    let description = format!("{err:#}");
    if description.contains(QUOTA_MARKER) {
        debug!("Quota exhausted, serving canned fallback for {}", profile.kind);
        profile.fallback_response(query).to_string()
    } else {
        warn!("Upstream call failed for {}: {}", profile.kind, description);
        format!(
            "I apologize, but I encountered an error while processing your request: {description}"
        )
    }
}
