//! Error types for the secdesk core

use thiserror::Error;

/// Returned when a caller-supplied agent override does not name a known
/// agent. This is the only error the routing surface propagates; upstream
/// failures are absorbed into response text by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown agent '{value}', expected one of: {}", .valid.join(", "))]
pub struct UnknownAgentError {
    /// The offending override value, as supplied
    pub value: String,
    /// The valid agent identifiers
    pub valid: Vec<String>,
}
