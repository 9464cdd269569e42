//! Evaluation engine: the layered decision cascade and the combiner that
//! reduces per-invocation decisions into one verdict for the whole input.
//!
//! Layer order per invocation: global deny patterns (checked once against
//! the original input, before parsing), then `alwaysDeny` membership,
//! `alwaysAllow` membership, trusted-target hooks, the first matching
//! per-command rule, and finally the configured default.
//!
//! Failure modes all land on `ask`, never `allow`: parse errors, nesting
//! overflow, and the evaluation deadline.

pub mod decision;
pub mod matcher;
pub mod policy;
pub mod trust;

pub use decision::{Decision, Verdict};
pub use policy::Policy;

use std::time::{Duration, Instant};

use crate::config::{Config, ConfigError};
use crate::parse::{self, Invocation, ParseResult};

/// Wall-clock budget for one evaluation, checked between invocations and
/// recursive descents. The regex engine itself is linear-time, so this
/// bounds aggregate work on adversarial inputs, not a single match.
const EVAL_DEADLINE: Duration = Duration::from_millis(200);

/// Depth limit for recursive evaluation of command substitutions.
const MAX_EVAL_DEPTH: usize = 8;

/// Evaluates command strings against a compiled [`Policy`].
pub struct Evaluator {
    policy: Policy,
}

impl Evaluator {
    pub fn new(policy: Policy) -> Self {
        Evaluator { policy }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Evaluator::new(Policy::compile(config)?))
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Evaluate a full command string and return the final verdict.
    pub fn evaluate(&self, input: &str) -> Verdict {
        let deadline = Instant::now() + EVAL_DEADLINE;
        self.evaluate_nested(input, 0, deadline)
    }

    fn evaluate_nested(&self, input: &str, depth: usize, deadline: Instant) -> Verdict {
        // Global deny patterns see the pre-parse, pre-preprocess text, so
        // a placeholder rewrite can never mask a dangerous substring.
        for pattern in &self.policy.global_deny {
            if pattern.regex.is_match(input) {
                return Verdict::deny(pattern.reason.clone());
            }
        }

        self.combine(&parse::parse(input), depth, deadline)
    }

    /// Reduce a parse result to one verdict: strongest decision wins
    /// (`deny > ask > allow`), subshell taint promotes a final allow to
    /// ask, and a parse error forces ask.
    fn combine(&self, parsed: &ParseResult, depth: usize, deadline: Instant) -> Verdict {
        if parsed.parse_error {
            return Verdict::ask("unparseable command");
        }
        if parsed.commands.is_empty() && parsed.subshell_commands.is_empty() && !parsed.has_subshell
        {
            return Verdict::allow("empty command");
        }

        let mut result: Option<Verdict> = None;
        let fold = |verdict: Verdict, result: &mut Option<Verdict>| {
            let stronger = match result {
                Some(current) => verdict.decision > current.decision,
                None => true,
            };
            if stronger {
                *result = Some(verdict);
            }
        };

        for invocation in &parsed.commands {
            if Instant::now() > deadline {
                return Verdict::ask("evaluation timeout");
            }
            fold(self.evaluate_invocation(invocation), &mut result);
        }

        // Substitution contents run with the caller's privileges; evaluate
        // them like any other command.
        for inner in &parsed.subshell_commands {
            if Instant::now() > deadline {
                return Verdict::ask("evaluation timeout");
            }
            let verdict = if depth >= MAX_EVAL_DEPTH {
                Verdict::ask("substitution nesting too deep")
            } else {
                self.evaluate_nested(inner, depth + 1, deadline)
            };
            fold(verdict, &mut result);
        }

        let mut result = result.unwrap_or_else(|| Verdict::allow("empty command"));
        if parsed.has_subshell
            && self.policy.ask_on_subshell
            && result.decision == Decision::Allow
        {
            result = Verdict::ask("command contains dynamic shell constructs");
        }
        result
    }

    /// The layered cascade for a single invocation.
    fn evaluate_invocation(&self, invocation: &Invocation) -> Verdict {
        let name = invocation.command.as_str();

        // Deny list also covers dotted variants (mkfs.ext4 -> mkfs).
        let dotted_prefix = name.split('.').next().unwrap_or(name);
        if self.policy.always_deny.contains(name)
            || self.policy.always_deny.contains(dotted_prefix)
        {
            return Verdict::deny(format!("blocked command: {name}"));
        }

        if self.policy.always_allow.contains(name) {
            return Verdict::allow(format!("allowed: {name}"));
        }

        if let Some(verdict) = trust::trusted_target(invocation, &self.policy.trust) {
            return verdict;
        }

        if let Some(rule) = self.policy.rules.iter().find(|r| r.command == name) {
            return rule.evaluate(invocation);
        }

        Verdict {
            decision: self.policy.default_decision,
            reason: format!("no rule for: {name}"),
        }
    }
}
