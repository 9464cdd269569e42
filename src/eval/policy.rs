//! The compiled, immutable form of the configuration.
//!
//! All regexes are compiled here, once, at load time; a bad pattern is a
//! startup error. Evaluation reads this structure without further
//! allocation or compilation.

use std::collections::HashSet;

use regex::Regex;

use crate::config::{Config, ConfigError};
use crate::eval::decision::Decision;
use crate::eval::matcher::CompiledRule;
use crate::eval::trust::TrustLists;

/// A global deny pattern compiled against the original input string.
#[derive(Debug)]
pub struct DenyPattern {
    pub regex: Regex,
    pub reason: String,
}

/// Compiled policy: the evaluator's only view of configuration.
#[derive(Debug)]
pub struct Policy {
    pub default_decision: Decision,
    pub ask_on_subshell: bool,
    pub always_allow: HashSet<String>,
    pub always_deny: HashSet<String>,
    pub global_deny: Vec<DenyPattern>,
    pub rules: Vec<CompiledRule>,
    pub trust: TrustLists,
}

impl Policy {
    /// Compile a merged config. The first invalid regex aborts with a
    /// [`ConfigError::Pattern`] naming the pattern and its location.
    pub fn compile(config: &Config) -> Result<Self, ConfigError> {
        let global_deny = config
            .global_deny
            .iter()
            .map(|p| {
                Regex::new(&p.pattern)
                    .map(|regex| DenyPattern {
                        regex,
                        reason: p.reason.clone(),
                    })
                    .map_err(|source| ConfigError::Pattern {
                        pattern: p.pattern.clone(),
                        context: "globalDeny".to_string(),
                        source,
                    })
            })
            .collect::<Result<_, _>>()?;

        let rules = config
            .rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<_, _>>()?;

        Ok(Policy {
            default_decision: config.default_decision,
            ask_on_subshell: config.ask_on_subshell,
            always_allow: config.always_allow.iter().cloned().collect(),
            always_deny: config.always_deny.iter().cloned().collect(),
            global_deny,
            rules,
            trust: TrustLists {
                ssh_hosts: config.trusted_ssh_hosts.clone(),
                docker_containers: config.trusted_docker_containers.clone(),
                kubectl_contexts: config.trusted_kubectl_contexts.clone(),
                sprites: config.trusted_sprites.clone(),
            },
        })
    }
}
