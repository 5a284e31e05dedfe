//! Agent personas — one static configuration record per routing category
//!
//! Each category bundles its persona string, the keywords that route to it,
//! and the canned fallback responses served when the upstream model is
//! unavailable. The records are static configuration and never change at
//! runtime.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::UnknownAgentError;

/// The fixed set of routing destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    AttackSurface,
    RiskManagement,
    Cyber,
    Grc,
}

/// All agents, in classifier precedence order (most specific first)
pub const ALL_AGENTS: [AgentKind; 4] = [
    AgentKind::AttackSurface,
    AgentKind::RiskManagement,
    AgentKind::Cyber,
    AgentKind::Grc,
];

impl AgentKind {
    /// The snake_case identifier used for overrides, serde, and the log
    pub fn id(&self) -> &'static str {
        match self {
            Self::AttackSurface => "attack_surface",
            Self::RiskManagement => "risk_management",
            Self::Cyber => "cyber",
            Self::Grc => "grc",
        }
    }

    /// Valid identifiers, for error messages
    pub fn valid_ids() -> Vec<String> {
        ALL_AGENTS.iter().map(|a| a.id().to_string()).collect()
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AgentKind {
    type Err = UnknownAgentError;

    /// Case-insensitive; accepts `-` or `_` as the word separator
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "attack_surface" => Ok(Self::AttackSurface),
            "risk_management" => Ok(Self::RiskManagement),
            "cyber" => Ok(Self::Cyber),
            "grc" => Ok(Self::Grc),
            _ => Err(UnknownAgentError {
                value: s.to_string(),
                valid: AgentKind::valid_ids(),
            }),
        }
    }
}

/// Static configuration for one agent persona
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub kind: AgentKind,
    pub name: &'static str,
    /// System prompt sent with every query routed to this agent
    pub system_prompt: &'static str,
    /// Trigger keywords, matched as substrings of the lower-cased query
    pub keywords: &'static [&'static str],
    /// Ordered (keyword, response) pairs served on quota exhaustion;
    /// first keyword found in the query wins
    pub fallbacks: &'static [(&'static str, &'static str)],
    /// Served when no fallback keyword matches
    pub default_fallback: &'static str,
}

impl AgentProfile {
    /// Pick the canned response for a query when the upstream call cannot
    /// complete. Matching is substring-based on the lower-cased query, in
    /// table order.
    pub fn fallback_response(&self, query: &str) -> &'static str {
        let query = query.to_lowercase();
        self.fallbacks
            .iter()
            .find(|(keyword, _)| query.contains(keyword))
            .map(|(_, response)| *response)
            .unwrap_or(self.default_fallback)
    }
}

static ATTACK_SURFACE: AgentProfile = AgentProfile {
    kind: AgentKind::AttackSurface,
    name: "Attack Surface",
    system_prompt: "You are an expert in attack surface management.",
    keywords: &[
        "attack surface",
        "asset discovery",
        "asset inventory",
        "external exposure",
        "exposure management",
        "shadow it",
    ],
    fallbacks: &[
        (
            "asset discovery",
            "Asset discovery is the process of identifying and cataloging the systems, services, and applications an organization exposes, so they can be assessed and protected.",
        ),
        (
            "exposure",
            "External exposure refers to the internet-facing portion of an organization's infrastructure that an attacker can reach without credentials.",
        ),
    ],
    default_fallback: "This is the Attack Surface Management Agent. I can help with questions about asset discovery, external exposure, and attack surface reduction.",
};

static RISK_MANAGEMENT: AgentProfile = AgentProfile {
    kind: AgentKind::RiskManagement,
    name: "Risk Management",
    system_prompt: "You are a risk management expert.",
    keywords: &[
        "risk management",
        "risk assessment",
        "risk register",
        "risk appetite",
        "risk scoring",
        "mitigation plan",
    ],
    fallbacks: &[
        (
            "risk assessment",
            "A risk assessment identifies threats and vulnerabilities, estimates their likelihood and impact, and prioritizes them for treatment.",
        ),
        (
            "risk register",
            "A risk register is the living record of identified risks, their owners, scores, and treatment status.",
        ),
    ],
    default_fallback: "This is the Risk Management Agent. I can help with questions about risk assessment, mitigation, and risk frameworks.",
};

static CYBER: AgentProfile = AgentProfile {
    kind: AgentKind::Cyber,
    name: "Cyber",
    system_prompt: "You are a Cybersecurity expert assistant.",
    keywords: &[
        "cyber",
        "security",
        "threat",
        "vulnerability",
        "attack",
        "firewall",
        "siem",
        "incident",
        "penetration test",
        "zero-day",
    ],
    fallbacks: &[
        (
            "vulnerability",
            "A vulnerability is a weakness in a system that can be exploited by attackers to gain unauthorized access or cause harm.",
        ),
        (
            "firewall",
            "A firewall is a network security device that monitors and filters incoming and outgoing network traffic based on predetermined security rules.",
        ),
        (
            "siem",
            "SIEM (Security Information and Event Management) is a security solution that helps organizations detect, analyze, and respond to security threats.",
        ),
        (
            "incident",
            "A security incident is any event that could lead to the loss of, or damage to, an organization's assets, data, or reputation.",
        ),
    ],
    default_fallback: "Cybersecurity involves protecting systems, networks, and programs from digital attacks.",
};

static GRC: AgentProfile = AgentProfile {
    kind: AgentKind::Grc,
    name: "GRC",
    system_prompt: "You are a GRC (Governance, Risk, and Compliance) expert assistant.",
    keywords: &[
        "compliance",
        "policy",
        "risk",
        "governance",
        "audit",
        "hipaa",
        "nist",
        "hitrust",
        "soc 2",
        "framework",
    ],
    fallbacks: &[
        (
            "policy",
            "A policy is a formal statement of principles and rules that guide an organization's operations and decision-making processes.",
        ),
        (
            "compliance",
            "Compliance refers to adhering to laws, regulations, standards, and ethical practices that apply to an organization's operations.",
        ),
        (
            "risk",
            "Risk management involves identifying, assessing, and controlling threats to an organization's capital and earnings.",
        ),
        (
            "audit",
            "An audit is a systematic examination of records, statements, or other evidence to verify compliance with established standards.",
        ),
    ],
    default_fallback: "GRC (Governance, Risk, and Compliance) is a framework that helps organizations align their IT activities with business goals, manage risks effectively, and meet regulatory requirements.",
};

/// Look up the static profile for an agent
pub fn profile(kind: AgentKind) -> &'static AgentProfile {
    match kind {
        AgentKind::AttackSurface => &ATTACK_SURFACE,
        AgentKind::RiskManagement => &RISK_MANAGEMENT,
        AgentKind::Cyber => &CYBER,
        AgentKind::Grc => &GRC,
    }
}

/// All profiles, in classifier precedence order
pub fn profiles() -> impl Iterator<Item = &'static AgentProfile> {
    ALL_AGENTS.iter().map(|kind| profile(*kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_kind_display() {
        assert_eq!(AgentKind::Cyber.to_string(), "cyber");
        assert_eq!(AgentKind::Grc.to_string(), "grc");
        assert_eq!(AgentKind::AttackSurface.to_string(), "attack_surface");
        assert_eq!(AgentKind::RiskManagement.to_string(), "risk_management");
    }

    #[test]
    fn test_from_str_case_insensitive() {
        assert_eq!("CYBER".parse::<AgentKind>().unwrap(), AgentKind::Cyber);
        assert_eq!("Grc".parse::<AgentKind>().unwrap(), AgentKind::Grc);
        assert_eq!(
            "Attack-Surface".parse::<AgentKind>().unwrap(),
            AgentKind::AttackSurface
        );
        assert_eq!(
            "risk_management".parse::<AgentKind>().unwrap(),
            AgentKind::RiskManagement
        );
    }

    #[test]
    fn test_from_str_unknown() {
        let err = "not-a-real-category".parse::<AgentKind>().unwrap_err();
        assert_eq!(err.value, "not-a-real-category");
        assert_eq!(err.valid, AgentKind::valid_ids());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&AgentKind::AttackSurface).unwrap();
        assert_eq!(json, "\"attack_surface\"");
        let parsed: AgentKind = serde_json::from_str("\"risk_management\"").unwrap();
        assert_eq!(parsed, AgentKind::RiskManagement);
    }

    #[test]
    fn test_profiles_precedence_order() {
        let kinds: Vec<AgentKind> = profiles().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AgentKind::AttackSurface,
                AgentKind::RiskManagement,
                AgentKind::Cyber,
                AgentKind::Grc,
            ]
        );
    }

    #[test]
    fn test_fallback_first_match_wins() {
        let cyber = profile(AgentKind::Cyber);
        // "vulnerability" precedes "firewall" in the table
        let response = cyber.fallback_response("Is a firewall a vulnerability?");
        assert!(response.starts_with("A vulnerability is a weakness"));
    }

    #[test]
    fn test_fallback_default_when_no_keyword() {
        let cyber = profile(AgentKind::Cyber);
        assert_eq!(
            cyber.fallback_response("Tell me about zero-day exploits"),
            cyber.default_fallback
        );
    }

    #[test]
    fn test_fallback_substring_not_word_bounded() {
        let grc = profile(AgentKind::Grc);
        let response = grc.fallback_response("What do our policies say?");
        assert!(response.starts_with("A policy is a formal statement"));
    }

    #[test]
    fn test_every_profile_has_prompt_and_default() {
        for p in profiles() {
            assert!(!p.system_prompt.is_empty());
            assert!(!p.default_fallback.is_empty());
            assert!(!p.keywords.is_empty());
        }
    }
}
