use std::io::Write;

use crate::eval::Verdict;

/// Append a decision record to ~/.local/share/warden/decisions.log as one
/// JSON line. Best-effort: failures are silently ignored (logging must
/// never block the hook).
pub fn log_decision(command: &str, verdict: &Verdict) {
    let Some(home) = std::env::var_os("HOME") else {
        return;
    };
    let log_dir = std::path::Path::new(&home).join(".local/share/warden");
    let _ = std::fs::create_dir_all(&log_dir);

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("decisions.log"))
    else {
        return;
    };

    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let command_truncated: String = command.chars().take(200).collect();

    let record = serde_json::json!({
        "ts": ts,
        "decision": verdict.decision.as_str(),
        "command": command_truncated,
        "reason": verdict.reason,
    });
    let _ = writeln!(file, "{record}");
}
