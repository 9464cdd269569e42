//! Heredoc span tracking and the `$(cat <<MARKER ... MARKER)` preprocessor.
//!
//! Heredoc bodies are free text. Left in place they would be misread as
//! additional commands, substitutions, or redirections, so every scanning
//! pass in this crate uses [`heredoc_span`] to step over them. The text
//! after the delimiter word on the same line is NOT part of the body and
//! stays live shell syntax (e.g. `cat <<'EOF' | kubectl apply -f -`).

use std::sync::LazyLock;

use regex::Regex;

use super::types::HEREDOC_PLACEHOLDER;

/// Span of a heredoc starting at a `<<` operator.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HeredocSpan {
    /// Position right after the delimiter word; the rest of that line is
    /// still live shell syntax.
    pub after_delim: usize,
    /// Position after the closing delimiter line (end of input if the
    /// delimiter never closes).
    pub body_end: usize,
    /// True when the delimiter was quoted, which suppresses expansion
    /// inside the body.
    pub quoted: bool,
}

/// Read the delimiter word at `chars[i]`, handling single/double quoting.
/// Returns `(delimiter, position_after, was_quoted)`.
fn read_delimiter(chars: &[char], mut i: usize) -> (String, usize, bool) {
    let len = chars.len();
    let mut delim = String::new();

    let quote = match chars.get(i) {
        Some(&q) if q == '\'' || q == '"' => {
            i += 1;
            Some(q)
        }
        _ => None,
    };

    if let Some(q) = quote {
        while i < len && chars[i] != q && chars[i] != '\n' {
            delim.push(chars[i]);
            i += 1;
        }
        if i < len && chars[i] == q {
            i += 1;
        }
        (delim, i, true)
    } else {
        while i < len && !chars[i].is_whitespace() {
            delim.push(chars[i]);
            i += 1;
        }
        (delim, i, false)
    }
}

/// Parse a heredoc whose `<<` operator begins at `chars[start]`.
///
/// Returns `None` for `<<<` here-strings and for `<<` with no delimiter.
/// If the closing delimiter is never found, the body extends to the end
/// of input.
pub(crate) fn heredoc_span(chars: &[char], start: usize) -> Option<HeredocSpan> {
    let len = chars.len();
    let mut i = start;

    if i + 1 >= len || chars[i] != '<' || chars[i + 1] != '<' {
        return None;
    }
    i += 2;

    // <<< is a here-string, not a heredoc
    if i < len && chars[i] == '<' {
        return None;
    }
    // <<- strips leading tabs from the body; same span rules
    if i < len && chars[i] == '-' {
        i += 1;
    }
    while i < len && (chars[i] == ' ' || chars[i] == '\t') {
        i += 1;
    }
    if i >= len || chars[i] == '\n' {
        return None;
    }

    let (delim, after_delim, quoted) = read_delimiter(chars, i);
    if delim.is_empty() {
        return None;
    }

    // Body starts on the next line; scan line starts for the closing delimiter
    let mut i = after_delim;
    while i < len && chars[i] != '\n' {
        i += 1;
    }
    if i < len {
        i += 1;
    }

    let delim_chars: Vec<char> = delim.chars().collect();
    while i < len {
        let line_matches = chars[i..]
            .iter()
            .take(delim_chars.len())
            .eq(delim_chars.iter())
            && matches!(chars.get(i + delim_chars.len()), None | Some(&'\n'));
        if line_matches {
            let after = i + delim_chars.len();
            let body_end = if after < len { after + 1 } else { after };
            return Some(HeredocSpan { after_delim, body_end, quoted });
        }
        while i < len && chars[i] != '\n' {
            i += 1;
        }
        if i < len {
            i += 1;
        }
    }

    // Unterminated heredoc: treat the rest of the input as the body
    Some(HeredocSpan { after_delim, body_end: len, quoted })
}

/// Find the first heredoc operator outside quotes, if any.
///
/// Used to decide whether a heredoc redirect survives preprocessing
/// (which marks the input as non-trivial) and whether the first-line
/// recovery strategy applies after a tokenization failure.
pub(crate) fn find_heredoc(text: &str) -> Option<usize> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut i = 0;
    let (mut sq, mut dq, mut esc) = (false, false, false);

    while i < len {
        let c = chars[i];
        if esc {
            esc = false;
        } else if c == '\\' && !sq {
            esc = true;
        } else if c == '\'' && !dq {
            sq = !sq;
        } else if c == '"' && !sq {
            dq = !dq;
        } else if !sq && !dq && c == '<' && heredoc_span(&chars, i).is_some() {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Collapse every `$(cat <<MARKER ... MARKER)` occurrence into the
/// [`HEREDOC_PLACEHOLDER`] token.
///
/// This idiom passes a large literal string as an argument (PR bodies,
/// commit messages). Rewriting it before parsing keeps the outer command
/// clean and avoids spurious subshell taint. Single quotes suppress the
/// rewrite, matching shell expansion rules.
pub(crate) fn collapse_cat_substitutions(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut out = String::new();
    let mut i = 0;
    let (mut sq, mut esc) = (false, false);

    while i < len {
        let c = chars[i];

        if esc {
            out.push(c);
            esc = false;
            i += 1;
            continue;
        }
        if c == '\\' && !sq {
            esc = true;
            out.push(c);
            i += 1;
            continue;
        }
        if c == '\'' {
            sq = !sq;
            out.push(c);
            i += 1;
            continue;
        }

        if !sq
            && c == '$'
            && chars.get(i + 1) == Some(&'(')
            && let Some(end) = match_cat_heredoc(&chars, i + 2)
        {
            out.push_str(HEREDOC_PLACEHOLDER);
            i = end;
            continue;
        }

        out.push(c);
        i += 1;
    }

    out
}

/// Match `\s*cat\s+<<DELIM ... DELIM\s*)` starting just inside `$(`.
/// Returns the position after the closing parenthesis on success.
fn match_cat_heredoc(chars: &[char], mut i: usize) -> Option<usize> {
    let len = chars.len();
    while i < len && (chars[i] == ' ' || chars[i] == '\t') {
        i += 1;
    }

    let cat: &[char] = &['c', 'a', 't'];
    if chars[i..].len() < 4 || &chars[i..i + 3] != cat || !chars[i + 3].is_whitespace() {
        return None;
    }
    i += 3;
    while i < len && (chars[i] == ' ' || chars[i] == '\t') {
        i += 1;
    }

    let span = heredoc_span(chars, i)?;
    let mut i = span.body_end;
    while i < len && chars[i].is_whitespace() {
        i += 1;
    }
    if i < len && chars[i] == ')' {
        Some(i + 1)
    } else {
        None
    }
}

static HEREDOC_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<<-?\s*['"]?\w+['"]?.*$"#).expect("heredoc suffix pattern must compile")
});

/// Strip a trailing heredoc operator (and everything after it) from a
/// single line. First-line recovery after a failed parse.
pub(crate) fn strip_heredoc_suffix(line: &str) -> String {
    HEREDOC_SUFFIX.replace(line, "").trim_end().to_string()
}
