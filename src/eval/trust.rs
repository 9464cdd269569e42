//! Trusted-target hooks for connection-style commands.
//!
//! `ssh`, `docker exec`, `kubectl`, and `sprite` default to ask; when the
//! connection target matches a configured trust list, the connection step
//! is allowed instead. Matching is fnmatch-style globbing (`*`, `?`,
//! `[...]` classes). Any ambiguity about the target falls through to the
//! normal rules.

use crate::eval::decision::Verdict;
use crate::parse::Invocation;

/// Glob-style trust lists, one per command family.
#[derive(Debug, Default, Clone)]
pub struct TrustLists {
    pub ssh_hosts: Vec<String>,
    pub docker_containers: Vec<String>,
    pub kubectl_contexts: Vec<String>,
    pub sprites: Vec<String>,
}

/// ssh options that consume a following value, so the word after them is
/// not the host.
const SSH_VALUE_OPTS: &[&str] = &[
    "-p", "-i", "-o", "-l", "-F", "-J", "-L", "-R", "-D", "-W", "-E", "-B", "-b", "-c", "-e",
    "-m", "-O", "-Q", "-S", "-w",
];

/// docker-exec options that consume a following value.
const DOCKER_EXEC_VALUE_OPTS: &[&str] = &[
    "-u", "--user", "-w", "--workdir", "-e", "--env", "--env-file", "--detach-keys",
];

/// Check an invocation against the trust lists. `Some(allow)` when the
/// connection target is trusted; `None` falls through to the rules.
pub fn trusted_target(invocation: &Invocation, trust: &TrustLists) -> Option<Verdict> {
    match invocation.command.as_str() {
        "ssh" => {
            let host = first_operand(&invocation.args, SSH_VALUE_OPTS)?;
            let bare_host = host.split_once('@').map_or(host, |(_, h)| h);
            if matches_any(&trust.ssh_hosts, host) || matches_any(&trust.ssh_hosts, bare_host) {
                return Some(Verdict::allow(format!("trusted ssh host: {bare_host}")));
            }
            None
        }
        "docker" => {
            let rest = invocation.args.strip_prefix(&["exec".to_string()][..])?;
            let container = first_operand(rest, DOCKER_EXEC_VALUE_OPTS)?;
            if matches_any(&trust.docker_containers, container) {
                return Some(Verdict::allow(format!("trusted container: {container}")));
            }
            None
        }
        "kubectl" => {
            let context = kubectl_context(&invocation.args)?;
            if matches_any(&trust.kubectl_contexts, context) {
                return Some(Verdict::allow(format!("trusted kubectl context: {context}")));
            }
            None
        }
        "sprite" => {
            let rest = match invocation.args.split_first() {
                Some((sub, rest)) if matches!(sub.as_str(), "exec" | "console" | "ssh") => rest,
                _ => return None,
            };
            let name = first_operand(rest, &[])?;
            if matches_any(&trust.sprites, name) {
                return Some(Verdict::allow(format!("trusted sprite: {name}")));
            }
            None
        }
        _ => None,
    }
}

/// First word that is not a flag and not the value of a value-taking flag.
fn first_operand<'a>(args: &'a [String], value_opts: &[&str]) -> Option<&'a str> {
    let mut skip_value = false;
    for arg in args {
        if skip_value {
            skip_value = false;
            continue;
        }
        if value_opts.contains(&arg.as_str()) {
            skip_value = true;
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return Some(arg);
    }
    None
}

/// The value of `--context` (separate or `=`-joined), if present.
fn kubectl_context(args: &[String]) -> Option<&str> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--context" {
            return iter.next().map(String::as_str);
        }
        if let Some(value) = arg.strip_prefix("--context=") {
            return Some(value);
        }
    }
    None
}

fn matches_any(patterns: &[String], text: &str) -> bool {
    patterns.iter().any(|p| glob_match(p, text))
}

/// Match a glob pattern against text. Supports `*`, `?`, and `[...]`
/// character classes (negation with `!` or `^`). The entire text must
/// match.
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();
    glob_here(&pat, &txt)
}

fn glob_here(pat: &[char], txt: &[char]) -> bool {
    match pat.first() {
        None => txt.is_empty(),
        Some('*') => {
            // Try every split point, shortest first
            (0..=txt.len()).any(|skip| glob_here(&pat[1..], &txt[skip..]))
        }
        Some('?') => !txt.is_empty() && glob_here(&pat[1..], &txt[1..]),
        Some('[') => {
            let Some((matched, consumed)) = glob_class(pat, txt.first().copied()) else {
                // malformed class: literal [
                return !txt.is_empty() && txt[0] == '[' && glob_here(&pat[1..], &txt[1..]);
            };
            matched && glob_here(&pat[consumed..], &txt[1..])
        }
        Some(&c) => !txt.is_empty() && txt[0] == c && glob_here(&pat[1..], &txt[1..]),
    }
}

/// Match a `[...]` class at the start of `pat` against `ch`. Returns
/// `(matched, chars_consumed)` or `None` when the class never closes.
fn glob_class(pat: &[char], ch: Option<char>) -> Option<(bool, usize)> {
    let ch = match ch {
        Some(c) => c,
        None => {
            // still need the class to be well-formed to consume it
            pat.iter().position(|&c| c == ']')?;
            return Some((false, 0));
        }
    };

    let mut i = 1;
    let negate = matches!(pat.get(i), Some('!' | '^'));
    if negate {
        i += 1;
    }

    let mut matched = false;
    let mut first = true;
    while i < pat.len() {
        let c = pat[i];
        if c == ']' && !first {
            return Some((matched != negate, i + 1));
        }
        first = false;
        if pat.get(i + 1) == Some(&'-') && pat.get(i + 2).is_some_and(|&e| e != ']') {
            let end = pat[i + 2];
            if c <= ch && ch <= end {
                matched = true;
            }
            i += 3;
        } else {
            if c == ch {
                matched = true;
            }
            i += 1;
        }
    }
    None
}
