//! Types produced by the shell parser and consumed by the eval layer.

/// Placeholder substituted for `$(...)`, backtick, and process-substitution
/// spans in the outer command text. Rule patterns may match it.
pub const SUBST_PLACEHOLDER: &str = "__SUBST__";

/// Placeholder substituted for `$(cat <<MARKER ... MARKER)` idioms by the
/// heredoc preprocessor. Rule patterns may match it.
pub const HEREDOC_PLACEHOLDER: &str = "__HEREDOC_TEXT__";

/// A single atomic command extracted from a compound command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Basename of the executable word (path components stripped).
    pub command: String,
    /// Positional words after the command name, in original order,
    /// unexpanded, with redirection operators dropped.
    pub args: Vec<String>,
    /// Leading `KEY=VALUE` assignment words.
    pub env_prefixes: Vec<String>,
    /// Space-joined reconstruction of `env_prefixes`, the original command
    /// word (path intact), and `args`. Whole-string patterns match this.
    pub raw: String,
}

/// The parser's complete output for one input string.
///
/// `has_subshell` is sticky: once any construct sets it (command
/// substitution, explicit subshell, control flow, heredoc redirect),
/// nothing clears it for the rest of the parse.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Atomic invocations, in source order.
    pub commands: Vec<Invocation>,
    /// True if the input contains constructs whose effects cannot be
    /// statically enumerated.
    pub has_subshell: bool,
    /// Inner text of each command substitution, for recursive evaluation.
    pub subshell_commands: Vec<String>,
    /// True if the parser gave up; the evaluator must treat the input
    /// as requiring confirmation.
    pub parse_error: bool,
}

impl ParseResult {
    /// A failed parse: no commands, `parse_error` set.
    pub(crate) fn error() -> Self {
        ParseResult {
            parse_error: true,
            ..ParseResult::default()
        }
    }

    /// Fold a child parse (subshell body or unwrapped `sh -c` script)
    /// into this one.
    pub(crate) fn absorb(&mut self, child: ParseResult) {
        self.commands.extend(child.commands);
        self.has_subshell |= child.has_subshell;
        self.subshell_commands.extend(child.subshell_commands);
        self.parse_error |= child.parse_error;
    }
}
