//! Matching of configured arg patterns against a single invocation.
//!
//! Patterns are compiled once at config load ([`crate::eval::policy`]);
//! evaluation never compiles a regex.

use regex::Regex;

use crate::config::{ArgCount, ArgPattern, CommandRule, ConfigError, MatchSpec};
use crate::eval::decision::{Decision, Verdict};
use crate::parse::Invocation;

/// A [`MatchSpec`] with its regexes compiled.
///
/// `any_arg_matches` regexes are anchored (`^(?:pat)$`) so a pattern must
/// cover a whole arg; `args_match` regexes search anywhere in `raw`.
#[derive(Debug)]
pub struct CompiledMatchSpec {
    any_arg_matches: Vec<Regex>,
    args_match: Vec<Regex>,
    no_args: Option<bool>,
    arg_count: Option<ArgCount>,
    not: bool,
}

impl CompiledMatchSpec {
    pub fn compile(spec: &MatchSpec, context: &str) -> Result<Self, ConfigError> {
        let compile_one = |pattern: &str, anchored: bool| -> Result<Regex, ConfigError> {
            let source = if anchored {
                format!("^(?:{pattern})$")
            } else {
                pattern.to_string()
            };
            Regex::new(&source).map_err(|source| ConfigError::Pattern {
                pattern: pattern.to_string(),
                context: context.to_string(),
                source,
            })
        };

        Ok(CompiledMatchSpec {
            any_arg_matches: spec
                .any_arg_matches
                .iter()
                .map(|p| compile_one(p, true))
                .collect::<Result<_, _>>()?,
            args_match: spec
                .args_match
                .iter()
                .map(|p| compile_one(p, false))
                .collect::<Result<_, _>>()?,
            no_args: spec.no_args,
            arg_count: spec.arg_count,
            not: spec.not,
        })
    }

    /// AND of all present predicates, inverted when `not` is set.
    /// A spec with no predicates matches unconditionally.
    pub fn matches(&self, invocation: &Invocation) -> bool {
        let mut matched = true;

        if !self.any_arg_matches.is_empty() {
            matched &= invocation
                .args
                .iter()
                .any(|arg| self.any_arg_matches.iter().any(|r| r.is_match(arg)));
        }
        if matched && !self.args_match.is_empty() {
            matched &= self.args_match.iter().any(|r| r.is_match(&invocation.raw));
        }
        if let Some(expect_empty) = self.no_args {
            matched &= expect_empty == invocation.args.is_empty();
        }
        if let Some(bounds) = &self.arg_count {
            matched &= bounds.contains(invocation.args.len());
        }

        matched != self.not
    }
}

/// An [`ArgPattern`] with its match spec compiled.
#[derive(Debug)]
pub struct CompiledArgPattern {
    pub spec: CompiledMatchSpec,
    pub decision: Decision,
    pub reason: Option<String>,
    pub description: Option<String>,
}

impl CompiledArgPattern {
    pub fn compile(pattern: &ArgPattern, context: &str) -> Result<Self, ConfigError> {
        Ok(CompiledArgPattern {
            spec: CompiledMatchSpec::compile(&pattern.matcher, context)?,
            decision: pattern.decision,
            reason: pattern.reason.clone(),
            description: pattern.description.clone(),
        })
    }

    fn verdict(&self, invocation: &Invocation) -> Verdict {
        let label = if self.decision == Decision::Allow {
            self.description.as_ref().or(self.reason.as_ref())
        } else {
            self.reason.as_ref().or(self.description.as_ref())
        };
        let reason = match label {
            Some(text) => format!("{}: {text}", invocation.command),
            None => format!("{}: matched pattern", invocation.command),
        };
        Verdict {
            decision: self.decision,
            reason,
        }
    }
}

/// A [`CommandRule`] with all patterns compiled.
#[derive(Debug)]
pub struct CompiledRule {
    pub command: String,
    pub default: Decision,
    pub patterns: Vec<CompiledArgPattern>,
}

impl CompiledRule {
    pub fn compile(rule: &CommandRule) -> Result<Self, ConfigError> {
        let context = format!("rule for `{}`", rule.command);
        Ok(CompiledRule {
            command: rule.command.clone(),
            default: rule.default,
            patterns: rule
                .arg_patterns
                .iter()
                .map(|p| CompiledArgPattern::compile(p, &context))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Walk the patterns in order; the first match wins. No match falls
    /// back to the rule's default.
    pub fn evaluate(&self, invocation: &Invocation) -> Verdict {
        for pattern in &self.patterns {
            if pattern.spec.matches(invocation) {
                return pattern.verdict(invocation);
            }
        }
        Verdict {
            decision: self.default,
            reason: format!("{} rule default", self.command),
        }
    }
}
