//! Decomposition of a raw command line into atomic invocations.
//!
//! The pipeline: collapse `$(cat <<EOF ... EOF)` idioms, extract command
//! substitutions, split at compound operators, then classify each segment
//! (control flow, subshell group, or plain command). Plain commands are
//! tokenized with shlex after redirection stripping, and inline shell
//! wrappers (`sh -c "..."`) are re-parsed recursively.
//!
//! Nothing here throws: failures surface as `ParseResult::parse_error`,
//! which the evaluator treats as "needs confirmation".

use std::sync::LazyLock;

use regex::Regex;

use super::heredoc;
use super::tokenize::{basename, split_env_prefixes, strip_redirections, tokenize};
use super::types::{Invocation, ParseResult, SUBST_PLACEHOLDER};

/// Depth limit for nested re-parses (`sh -c` unwrapping, subshell groups).
/// Past this the construct is kept opaque and tainted instead of descended.
const MAX_NEST_DEPTH: usize = 8;

/// Shell keywords that open or continue a control-flow construct. Their
/// bodies are not statically analyzable in scope, so segments led by one
/// of these only set the subshell taint.
const CONTROL_FLOW_WORDS: &[&str] = &[
    "if", "elif", "fi", "for", "while", "until", "done", "case", "esac", "function", "select",
    "coproc",
];

/// Keywords that introduce a body command list within the same segment
/// (`do ls`, `then rm x`). The command after the keyword is live at this
/// nesting level even though the construct itself taints the parse.
const BODY_KEYWORDS: &[&str] = &["do", "then", "else"];

static FN_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\s*\(\s*\)").expect("function def pattern must compile")
});

/// Parse a full command string into atomic invocations.
///
/// Never panics. Empty or whitespace-only input yields an empty result
/// with no error and no taint.
pub fn parse(input: &str) -> ParseResult {
    parse_with_depth(input, 0)
}

fn parse_with_depth(input: &str, depth: usize) -> ParseResult {
    match parse_inner(input, depth) {
        Ok(result) => result,
        Err(ParseFail) => heredoc_fallback(input, depth),
    }
}

/// Marker for an unrecoverable tokenization failure within a segment.
struct ParseFail;

fn parse_inner(input: &str, depth: usize) -> Result<ParseResult, ParseFail> {
    let mut result = ParseResult::default();
    if input.trim().is_empty() {
        return Ok(result);
    }

    let collapsed = heredoc::collapse_cat_substitutions(input);
    let (outer, substitutions) = extract_substitutions(&collapsed);
    result.has_subshell |= !substitutions.is_empty();
    result.subshell_commands.extend(substitutions);

    // A heredoc redirect that survived preprocessing marks the input as
    // non-trivial even though the body itself is dropped.
    if heredoc::find_heredoc(&outer).is_some() {
        result.has_subshell = true;
    }

    for segment in split_compound_command(&outer) {
        let mut seg = segment.trim();
        // Peel continuation keywords: the body command they introduce is
        // still evaluable, and the construct has already tainted the parse.
        loop {
            let first = seg.split_whitespace().next().unwrap_or("");
            if !BODY_KEYWORDS.contains(&first) {
                break;
            }
            result.has_subshell = true;
            seg = seg[first.len()..].trim_start();
        }
        if seg.is_empty() || seg == "{" || seg == "}" {
            continue;
        }
        if is_control_flow(seg) {
            result.has_subshell = true;
            continue;
        }
        if let Some(inner) = subshell_inner(seg) {
            result.has_subshell = true;
            if depth < MAX_NEST_DEPTH {
                result.absorb(parse_with_depth(&inner, depth + 1));
            }
            continue;
        }

        let cleaned = strip_redirections(seg);
        let tokens = tokenize(&cleaned).ok_or(ParseFail)?;
        let Some(invocation) = build_invocation(tokens) else {
            // Pure KEY=VALUE assignments and bare redirections produce
            // no invocation.
            continue;
        };
        push_or_unwrap(invocation, depth, &mut result);
    }

    Ok(result)
}

/// Recovery after a failed tokenization. When the input carries a heredoc,
/// the operative command is usually all on the first line; parse that line
/// with the heredoc operator stripped and taint the result. Anything else
/// is an unparseable input.
fn heredoc_fallback(input: &str, depth: usize) -> ParseResult {
    if heredoc::find_heredoc(input).is_some() {
        let first_line = input.lines().next().unwrap_or("");
        let stripped = heredoc::strip_heredoc_suffix(first_line);
        if !stripped.trim().is_empty()
            && stripped.trim() != input.trim()
            && let Ok(mut result) = parse_inner(&stripped, depth)
        {
            result.has_subshell = true;
            return result;
        }
        let mut failed = ParseResult::error();
        failed.has_subshell = true;
        return failed;
    }
    ParseResult::error()
}

/// Build an [`Invocation`] from shlex tokens. Returns `None` when no
/// command word remains after env prefixes.
fn build_invocation(tokens: Vec<String>) -> Option<Invocation> {
    let (env_prefixes, rest) = split_env_prefixes(tokens);
    let mut words = rest.into_iter();
    let word = words.next()?;
    let command = basename(&word).to_string();
    if command.is_empty() {
        return None;
    }
    let args: Vec<String> = words.collect();

    let mut raw_parts: Vec<&str> = env_prefixes.iter().map(String::as_str).collect();
    raw_parts.push(&word);
    raw_parts.extend(args.iter().map(String::as_str));
    let raw = raw_parts.join(" ");

    Some(Invocation {
        command,
        args,
        env_prefixes,
        raw,
    })
}

/// An inline shell wrapper whose script argument we can re-parse.
fn is_shell_wrapper(invocation: &Invocation) -> bool {
    matches!(invocation.command.as_str(), "sh" | "bash" | "zsh")
        && invocation.args.first().is_some_and(|a| a == "-c")
        && invocation.args.len() >= 2
}

/// Append the invocation, unwrapping `sh -c "script"` into the script's
/// own invocations. The wrapper is kept intact when the script fails to
/// parse (the evaluator can still reason about `bash -c`) or when the
/// nesting limit is hit.
fn push_or_unwrap(invocation: Invocation, depth: usize, result: &mut ParseResult) {
    if !is_shell_wrapper(&invocation) {
        result.commands.push(invocation);
        return;
    }
    if depth >= MAX_NEST_DEPTH {
        result.has_subshell = true;
        result.commands.push(invocation);
        return;
    }
    let child = parse_with_depth(&invocation.args[1], depth + 1);
    if child.parse_error {
        result.commands.push(invocation);
    } else {
        result.absorb(child);
    }
}

/// True for segments led by a control-flow keyword or a function
/// definition (`name() {`).
fn is_control_flow(segment: &str) -> bool {
    let first = segment.split_whitespace().next().unwrap_or("");
    CONTROL_FLOW_WORDS.contains(&first) || FN_DEF.is_match(segment)
}

/// Inner text of a `(...)` subshell group, if the segment is one.
fn subshell_inner(segment: &str) -> Option<String> {
    let chars: Vec<char> = segment.chars().collect();
    if chars.first() != Some(&'(') {
        return None;
    }
    let (inner, _) = scan_balanced(&chars, 1);
    Some(inner)
}

/// Collect text up to the parenthesis matching an already-consumed `(`.
/// `start` is the index just past the opening paren; returns the inner
/// text and the index just past the matching close (or end of input).
fn scan_balanced(chars: &[char], start: usize) -> (String, usize) {
    let len = chars.len();
    let mut inner = String::new();
    let mut depth: u32 = 1;
    let mut i = start;
    let (mut sq, mut dq, mut esc) = (false, false, false);

    while i < len {
        let c = chars[i];
        if esc {
            inner.push(c);
            esc = false;
            i += 1;
            continue;
        }
        if c == '\\' && !sq {
            esc = true;
            inner.push(c);
            i += 1;
            continue;
        }
        if c == '\'' && !dq {
            sq = !sq;
            inner.push(c);
            i += 1;
            continue;
        }
        if c == '"' && !sq {
            dq = !dq;
            inner.push(c);
            i += 1;
            continue;
        }
        if !sq && !dq {
            if c == '(' {
                depth += 1;
            }
            if c == ')' {
                depth -= 1;
                if depth == 0 {
                    return (inner, i + 1);
                }
            }
        }
        inner.push(c);
        i += 1;
    }

    (inner, len)
}

/// Extract command substitution contents from `$(...)`, backticks, and
/// process substitutions `<(...)` / `>(...)`.
///
/// Returns the outer command with each span replaced by the
/// [`SUBST_PLACEHOLDER`] token, plus the extracted inner command strings.
/// Nested substitutions stay inside their inner string and are found
/// again when that string is recursively evaluated.
///
/// `$()` is extracted even inside double quotes (the shell expands it
/// there); single quotes suppress extraction. Quoted heredoc bodies are
/// inert; unquoted bodies do expand, so they are scanned like live text.
fn extract_substitutions(command: &str) -> (String, Vec<String>) {
    let chars: Vec<char> = command.chars().collect();
    let len = chars.len();
    let mut outer = String::new();
    let mut inners = Vec::new();
    let mut i = 0;
    let (mut sq, mut dq, mut esc) = (false, false, false);
    let mut pending_body: Option<usize> = None;

    while i < len {
        let c = chars[i];

        if esc {
            outer.push(c);
            esc = false;
            i += 1;
            continue;
        }
        if c == '\\' && !sq {
            esc = true;
            outer.push(c);
            i += 1;
            continue;
        }
        if c == '\'' && !dq {
            sq = !sq;
            outer.push(c);
            i += 1;
            continue;
        }
        if c == '"' && !sq {
            dq = !dq;
            outer.push(c);
            i += 1;
            continue;
        }
        if sq {
            outer.push(c);
            i += 1;
            continue;
        }

        // Quoted-delimiter heredoc: the body cannot expand, so skip it.
        // The rest of the delimiter line is still live syntax.
        if c == '<'
            && !dq
            && chars.get(i + 1) == Some(&'<')
            && let Some(span) = heredoc::heredoc_span(&chars, i)
            && span.quoted
        {
            for ch in &chars[i..span.after_delim] {
                outer.push(*ch);
            }
            i = span.after_delim;
            pending_body = Some(span.body_end);
            continue;
        }
        if c == '\n'
            && let Some(body_end) = pending_body.take()
        {
            outer.push('\n');
            i = body_end;
            continue;
        }

        if c == '$' && chars.get(i + 1) == Some(&'(') {
            let (inner, next) = scan_balanced(&chars, i + 2);
            let trimmed = inner.trim();
            if !trimmed.is_empty() {
                inners.push(trimmed.to_string());
            }
            outer.push_str(SUBST_PLACEHOLDER);
            i = next;
            continue;
        }

        if c == '`' {
            let mut inner = String::new();
            i += 1;
            while i < len && chars[i] != '`' {
                if chars[i] == '\\' && i + 1 < len {
                    inner.push(chars[i]);
                    inner.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
                inner.push(chars[i]);
                i += 1;
            }
            if i < len {
                i += 1;
            }
            let trimmed = inner.trim();
            if !trimmed.is_empty() {
                inners.push(trimmed.to_string());
            }
            outer.push_str(SUBST_PLACEHOLDER);
            continue;
        }

        if (c == '<' || c == '>') && chars.get(i + 1) == Some(&'(') && !dq {
            let (inner, next) = scan_balanced(&chars, i + 2);
            let trimmed = inner.trim();
            if !trimmed.is_empty() {
                inners.push(trimmed.to_string());
            }
            // No < or > prefix on the placeholder: it would read as a
            // redirection downstream.
            outer.push_str(SUBST_PLACEHOLDER);
            i = next;
            continue;
        }

        outer.push(c);
        i += 1;
    }

    (outer, inners)
}

/// Split a command at shell separators (`&&`, `||`, `;`, `|`, `|&`,
/// newline), respecting quotes, backslash escapes, parenthesized groups,
/// and heredoc bodies.
fn split_compound_command(command: &str) -> Vec<String> {
    let chars: Vec<char> = command.chars().collect();
    let len = chars.len();
    let mut parts: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut i = 0;
    let (mut sq, mut dq, mut esc) = (false, false, false);
    let mut paren_depth: u32 = 0;
    let mut pending_body: Option<usize> = None;

    let flush = |buf: &mut String, parts: &mut Vec<String>| {
        let trimmed = buf.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed.to_string());
        }
        buf.clear();
    };

    while i < len {
        let c = chars[i];

        if esc {
            buf.push(c);
            esc = false;
            i += 1;
            continue;
        }
        if c == '\\' && !sq {
            esc = true;
            buf.push(c);
            i += 1;
            continue;
        }
        if c == '\'' && !dq {
            sq = !sq;
            buf.push(c);
            i += 1;
            continue;
        }
        if c == '"' && !sq {
            dq = !dq;
            buf.push(c);
            i += 1;
            continue;
        }
        if sq || dq {
            buf.push(c);
            i += 1;
            continue;
        }

        // Keep the heredoc operator, let the rest of the delimiter line be
        // scanned for separators, and drop the body when the line ends.
        if c == '<'
            && chars.get(i + 1) == Some(&'<')
            && let Some(span) = heredoc::heredoc_span(&chars, i)
        {
            for ch in &chars[i..span.after_delim] {
                buf.push(*ch);
            }
            i = span.after_delim;
            pending_body = Some(span.body_end);
            continue;
        }

        if c == '\n' {
            i = pending_body.take().unwrap_or(i + 1);
            if paren_depth == 0 {
                flush(&mut buf, &mut parts);
            } else {
                buf.push('\n');
            }
            continue;
        }

        if paren_depth > 0 {
            if c == '(' {
                paren_depth += 1;
            }
            if c == ')' {
                paren_depth -= 1;
            }
            buf.push(c);
            i += 1;
            continue;
        }
        if c == '(' {
            paren_depth = 1;
            buf.push(c);
            i += 1;
            continue;
        }

        if i + 1 < len {
            let two = (c, chars[i + 1]);
            if matches!(two, ('&', '&') | ('|', '|') | ('|', '&')) {
                flush(&mut buf, &mut parts);
                i += 2;
                continue;
            }
        }
        if c == '|' || c == ';' {
            flush(&mut buf, &mut parts);
            i += 1;
            continue;
        }

        buf.push(c);
        i += 1;
    }

    flush(&mut buf, &mut parts);
    parts
}
