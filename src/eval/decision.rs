//! Decision types for command evaluation.

use serde::{Deserialize, Serialize};

/// The gating decision for a command.
///
/// Variants are ordered by severity: `Allow < Ask < Deny`. When combining
/// decisions across a compound command, the strictest wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Command runs without user confirmation.
    Allow,
    /// The user is prompted before the command runs.
    Ask,
    /// Command is blocked outright.
    Deny,
}

impl Decision {
    /// Lowercase string for JSON output (`"allow"`, `"ask"`, `"deny"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Ask => "ask",
            Decision::Deny => "deny",
        }
    }
}

/// The outcome of evaluating a command: a decision plus a human-readable
/// reason.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub decision: Decision,
    pub reason: String,
}

impl Verdict {
    pub fn allow(reason: impl Into<String>) -> Self {
        Verdict {
            decision: Decision::Allow,
            reason: reason.into(),
        }
    }

    pub fn ask(reason: impl Into<String>) -> Self {
        Verdict {
            decision: Decision::Ask,
            reason: reason.into(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Verdict {
            decision: Decision::Deny,
            reason: reason.into(),
        }
    }
}
