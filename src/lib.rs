//! warden: a PreToolUse hook for Claude Code that gates Bash commands.
//!
//! This crate evaluates shell commands against a layered, pattern-driven
//! policy and returns one of three decisions: [`eval::Decision::Allow`],
//! [`eval::Decision::Ask`], or [`eval::Decision::Deny`]. Commands are
//! decomposed into atomic invocations (pipes, chains, subshells,
//! substitutions, `sh -c` wrappers, heredocs), each invocation walks the
//! precedence cascade (global deny, always-deny, always-allow, trusted
//! targets, per-command rules, default), and the strictest decision wins.
//!
//! # Architecture
//!
//! - **[`parse`]** — Shell parsing: compound splitting, substitution
//!   extraction, heredoc handling, wrapper unwrapping.
//! - **[`eval`]** — Evaluation engine: compiled policy, rule matcher,
//!   trusted-target hooks, decision combiner.
//! - **[`config`]** — Configuration: embedded defaults merged with user
//!   and project YAML overlays, validated and compiled at load.
//! - **[`logging`]** — Decision logging to
//!   `~/.local/share/warden/decisions.log`.

/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Evaluation engine: policy, matcher, trust hooks, combiner.
pub mod eval;
/// File-based decision logging.
pub mod logging;
/// Shell command parsing into atomic invocations.
pub mod parse;

use std::sync::LazyLock;

use eval::{Evaluator, Verdict};

/// Evaluate a command string against the built-in default policy.
///
/// This is the main entry point for tests and simple usage. For CLI usage
/// with user or project configuration, build an [`eval::Evaluator`] from a
/// loaded [`config::Config`].
pub fn evaluate(command: &str) -> Verdict {
    static DEFAULT: LazyLock<Evaluator> = LazyLock::new(|| {
        let config = config::Config::default_config();
        Evaluator::from_config(&config).expect("embedded default config must compile")
    });
    DEFAULT.evaluate(command)
}
