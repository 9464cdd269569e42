//! Configuration types, loading, and overlay merge logic.
//!
//! Three sources merge into one [`Config`], highest priority first:
//! project `<cwd>/.claude/warden.yaml`, user `~/.claude/warden.yaml`,
//! then the embedded defaults. Scalars are replaced by higher-priority
//! sources, list fields are unioned, and rules are prepended so the
//! evaluator's first-match search sees project rules before user rules
//! before defaults.
//!
//! Invalid configuration is a startup error, never a silent fallback:
//! a present-but-malformed file aborts the load.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eval::Decision;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.yaml");

/// Config file location relative to the project working directory.
pub const PROJECT_CONFIG_PATH: &str = ".claude/warden.yaml";

/// Config file location relative to the user's home directory.
pub const USER_CONFIG_PATH: &str = ".claude/warden.yaml";

/// Error raised while loading or compiling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid regex `{pattern}` in {context}: {source}")]
    Pattern {
        pattern: String,
        context: String,
        source: regex::Error,
    },
}

// ── Rule schema ──

/// Predicates over one invocation. All present predicates must hold;
/// `not` inverts the combined outcome. A spec with no predicates matches
/// unconditionally.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct MatchSpec {
    /// At least one arg fully matches at least one of these regexes.
    pub any_arg_matches: Vec<String>,
    /// At least one of these regexes is found anywhere in `raw`.
    pub args_match: Vec<String>,
    /// The invocation has (or, if `false`, does not have) zero args.
    pub no_args: Option<bool>,
    /// Inclusive bounds on the arg count.
    pub arg_count: Option<ArgCount>,
    /// Invert the combined result of the other predicates.
    pub not: bool,
}

/// Inclusive arg-count bounds; each side optional.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ArgCount {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ArgCount {
    pub fn contains(&self, len: usize) -> bool {
        self.min.is_none_or(|m| len >= m) && self.max.is_none_or(|m| len <= m)
    }
}

/// One pattern within a command rule: a match spec and the decision it
/// prescribes. `reason` accompanies non-allow decisions; `description`
/// labels allow patterns.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ArgPattern {
    #[serde(rename = "match", default)]
    pub matcher: MatchSpec,
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Per-command rule: patterns are walked in order, first match wins,
/// otherwise `default` applies.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommandRule {
    /// Matched against the invocation's basename-normalized command.
    pub command: String,
    pub default: Decision,
    #[serde(default)]
    pub arg_patterns: Vec<ArgPattern>,
}

/// A regex tested against the full original input string before parsing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalDenyPattern {
    pub pattern: String,
    pub reason: String,
}

// ── Merged config ──

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    pub default_decision: Decision,
    pub ask_on_subshell: bool,
    #[serde(default)]
    pub always_allow: Vec<String>,
    #[serde(default)]
    pub always_deny: Vec<String>,
    #[serde(default)]
    pub global_deny: Vec<GlobalDenyPattern>,
    #[serde(rename = "trustedSSHHosts", default)]
    pub trusted_ssh_hosts: Vec<String>,
    #[serde(default)]
    pub trusted_docker_containers: Vec<String>,
    #[serde(default)]
    pub trusted_kubectl_contexts: Vec<String>,
    #[serde(default)]
    pub trusted_sprites: Vec<String>,
    #[serde(default)]
    pub rules: Vec<CommandRule>,
}

// ── Overlay (user/project file that merges into the defaults) ──

/// Presence-aware view of a config file: scalar fields are optional so
/// "not set" and "explicitly set" stay distinguishable across layers.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
struct ConfigOverlay {
    default_decision: Option<Decision>,
    ask_on_subshell: Option<bool>,
    always_allow: Vec<String>,
    always_deny: Vec<String>,
    global_deny: Vec<GlobalDenyPattern>,
    #[serde(rename = "trustedSSHHosts")]
    trusted_ssh_hosts: Vec<String>,
    trusted_docker_containers: Vec<String>,
    trusted_kubectl_contexts: Vec<String>,
    trusted_sprites: Vec<String>,
    rules: Vec<CommandRule>,
}

/// Union-merge an overlay list into a base list, preserving base order.
fn merge_list(base: &mut Vec<String>, add: Vec<String>) {
    for item in add {
        if !base.contains(&item) {
            base.push(item);
        }
    }
}

impl Config {
    /// The embedded default configuration.
    pub fn default_config() -> Self {
        serde_yaml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration for a request rooted at `cwd`:
    /// defaults, then `~/.claude/warden.yaml`, then
    /// `<cwd>/.claude/warden.yaml` (highest priority).
    ///
    /// Missing files are skipped; malformed files abort the load.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let user = std::env::var_os("HOME")
            .map(|home| Path::new(&home).join(USER_CONFIG_PATH));
        let project = cwd.join(PROJECT_CONFIG_PATH);
        Self::load_from(user.as_deref(), Some(&project))
    }

    /// Load with explicit file paths; missing paths are skipped.
    pub fn load_from(
        user: Option<&Path>,
        project: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default_config();
        for path in [user, project].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            config.apply_overlay(Self::read_overlay(path)?);
        }
        Ok(config)
    }

    fn read_overlay(path: &Path) -> Result<ConfigOverlay, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply an overlay on top of this config: scalars replace, lists
    /// union, rules prepend (so the overlay's rules shadow existing ones
    /// in the evaluator's first-match search).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(v) = overlay.default_decision {
            self.default_decision = v;
        }
        if let Some(v) = overlay.ask_on_subshell {
            self.ask_on_subshell = v;
        }

        merge_list(&mut self.always_allow, overlay.always_allow);
        merge_list(&mut self.always_deny, overlay.always_deny);
        merge_list(&mut self.trusted_ssh_hosts, overlay.trusted_ssh_hosts);
        merge_list(
            &mut self.trusted_docker_containers,
            overlay.trusted_docker_containers,
        );
        merge_list(
            &mut self.trusted_kubectl_contexts,
            overlay.trusted_kubectl_contexts,
        );
        merge_list(&mut self.trusted_sprites, overlay.trusted_sprites);

        for pattern in overlay.global_deny {
            if !self.global_deny.iter().any(|p| p.pattern == pattern.pattern) {
                self.global_deny.push(pattern);
            }
        }

        let mut rules = overlay.rules;
        rules.append(&mut self.rules);
        self.rules = rules;
    }

    /// Apply an overlay from a YAML string. Used for testing.
    #[cfg(test)]
    pub(crate) fn apply_overlay_str(&mut self, yaml: &str) {
        let overlay: ConfigOverlay = serde_yaml::from_str(yaml).unwrap();
        self.apply_overlay(overlay);
    }
}
