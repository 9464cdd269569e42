//! warden: PreToolUse hook for Claude Code.
//!
//! Reads the hook payload as JSON from stdin, evaluates the Bash command
//! against the merged policy, and answers:
//!
//!   - allow -> stdout `{"decision":"approve"}`, exit 0
//!   - ask   -> stdout `{"decision":"ask","message":...}`, exit 0
//!   - deny  -> reason on stderr, exit 2
//!
//! Configuration problems also exit 2: in the hook protocol only exit
//! code 2 blocks the tool call, and a broken policy must fail closed.

use std::io::Read;
use std::path::PathBuf;

use serde::Deserialize;

use warden::config::Config;
use warden::eval::{Decision, Evaluator};
use warden::logging;

/// Input cap for the hook payload.
const MAX_INPUT_BYTES: u64 = 64 * 1024;

#[derive(Deserialize)]
struct HookInput {
    tool_name: Option<String>,
    tool_input: Option<ToolInput>,
    cwd: Option<String>,
}

#[derive(Deserialize)]
struct ToolInput {
    command: Option<String>,
}

fn fail_closed(message: &str) -> ! {
    eprintln!("warden: {message}");
    std::process::exit(2);
}

fn main() {
    let mut input = String::new();
    if std::io::stdin()
        .take(MAX_INPUT_BYTES)
        .read_to_string(&mut input)
        .is_err()
    {
        fail_closed("failed to read stdin");
    }

    let hook_input: HookInput = match serde_json::from_str(&input) {
        Ok(v) => v,
        Err(e) => fail_closed(&format!("invalid hook payload: {e}")),
    };

    // Only Bash tool calls are gated.
    if hook_input.tool_name.as_deref() != Some("Bash") {
        return;
    }
    let command = hook_input
        .tool_input
        .and_then(|t| t.command)
        .unwrap_or_default();
    if command.is_empty() {
        return;
    }

    let cwd = hook_input
        .cwd
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default();

    let config = match Config::load(&cwd) {
        Ok(c) => c,
        Err(e) => fail_closed(&e.to_string()),
    };
    let evaluator = match Evaluator::from_config(&config) {
        Ok(e) => e,
        Err(e) => fail_closed(&e.to_string()),
    };

    let verdict = evaluator.evaluate(&command);
    logging::log_decision(&command, &verdict);

    match verdict.decision {
        Decision::Allow => {
            println!("{}", serde_json::json!({ "decision": "approve" }));
        }
        Decision::Ask => {
            println!(
                "{}",
                serde_json::json!({ "decision": "ask", "message": verdict.reason })
            );
        }
        Decision::Deny => {
            eprintln!("{}", verdict.reason);
            std::process::exit(2);
        }
    }
}
