//! Keyword-based query routing
//!
//! Maps free text to one of the fixed agent categories by substring
//! membership against each category's keyword list, in precedence order
//! (attack surface, then risk management, then cyber, then GRC). Matching
//! is deliberately not word-bounded: a keyword inside a larger word still
//! counts. Queries that match nothing fall back to the GRC agent.

use tracing::debug;

use crate::agents::{self, AgentKind};
use crate::error::UnknownAgentError;

/// Category selected when no keyword matches
pub const DEFAULT_AGENT: AgentKind = AgentKind::Grc;

/// Classify a query into an agent category. Pure function of the query and
/// the static keyword tables.
pub fn classify(query: &str) -> AgentKind {
    let lower = query.to_lowercase();
    for profile in agents::profiles() {
        if let Some(keyword) = profile.keywords.iter().find(|k| lower.contains(*k)) {
            debug!("Query matched keyword '{}' for agent {}", keyword, profile.kind);
            return profile.kind;
        }
    }
    debug!("No keyword matched, defaulting to {}", DEFAULT_AGENT);
    DEFAULT_AGENT
}

/// Resolve the agent for a query, honoring an explicit override.
///
/// An override bypasses keyword inspection entirely; an override that does
/// not name a known agent is the one error this module propagates.
pub fn resolve(query: &str, agent_override: Option<&str>) -> Result<AgentKind, UnknownAgentError> {
    match agent_override {
        Some(value) => {
            let kind = value.parse::<AgentKind>()?;
            debug!("Override selected agent {}", kind);
            Ok(kind)
        }
        None => Ok(classify(query)),
    }
}
