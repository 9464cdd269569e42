use warden::config::Config;
use warden::eval::{Decision, Evaluator};

fn decision_for(command: &str) -> Decision {
    warden::evaluate(command).decision
}

fn reason_for(command: &str) -> String {
    warden::evaluate(command).reason
}

macro_rules! decision_test {
    ($name:ident, $cmd:expr, $decision:ident) => {
        #[test]
        fn $name() {
            assert_eq!(decision_for($cmd), Decision::$decision, "command: {}", $cmd,);
        }
    };
}

// ── ALLOW: read-only utilities ──

decision_test!(allow_simple_ls, "ls -la /tmp", Allow);
decision_test!(allow_tree, "tree /tmp", Allow);
decision_test!(allow_which, "which cargo", Allow);
decision_test!(allow_cat, "cat README.md", Allow);
decision_test!(allow_head, "head -20 src/main.rs", Allow);
decision_test!(allow_tail, "tail -f /var/log/syslog", Allow);
decision_test!(allow_echo, "echo hello world", Allow);
decision_test!(allow_printf, "printf '%s\\n' hello", Allow);
decision_test!(allow_grep, "grep -r 'pattern' src/", Allow);
decision_test!(allow_rg, "rg 'pattern' src/", Allow);
decision_test!(allow_wc, "wc -l src/main.rs", Allow);
decision_test!(allow_sort, "sort /tmp/data.txt", Allow);
decision_test!(allow_diff, "diff a.txt b.txt", Allow);
decision_test!(allow_find, "find . -name '*.rs'", Allow);
decision_test!(allow_pwd, "pwd", Allow);
decision_test!(allow_uname, "uname -a", Allow);
decision_test!(allow_whoami, "whoami", Allow);
decision_test!(allow_stat, "stat /tmp", Allow);
decision_test!(allow_date, "date +%Y-%m-%d", Allow);
decision_test!(allow_df, "df -h", Allow);
decision_test!(allow_jq, "jq '.name' package.json", Allow);
decision_test!(allow_bat, "bat README.md", Allow);
decision_test!(allow_fd, "fd '*.rs' src/", Allow);
decision_test!(allow_cd, "cd /tmp", Allow);
decision_test!(allow_test_bracket, "test -f /tmp/foo", Allow);
decision_test!(allow_sha256sum, "sha256sum release.tar.gz", Allow);

// ── ALLOW: basename normalization ──

decision_test!(allow_absolute_path_ls, "/usr/bin/ls -la", Allow);
decision_test!(allow_relative_path_cat, "./bin/cat file", Allow);

// ── ALLOW: per-command rules ──

decision_test!(allow_git_status, "git status", Allow);
decision_test!(allow_git_log, "git log --oneline -10", Allow);
decision_test!(allow_git_diff, "git diff HEAD~1", Allow);
decision_test!(allow_git_push_plain, "git push origin main", Allow);
decision_test!(allow_git_commit, "git commit -m 'fix parser'", Allow);
decision_test!(allow_npm_install, "npm install lodash", Allow);
decision_test!(allow_npm_test, "npm test", Allow);
decision_test!(allow_pnpm_add, "pnpm add -D vitest", Allow);
decision_test!(allow_npx_known_tool, "npx prettier --check .", Allow);
decision_test!(allow_npx_eslint, "npx eslint src/", Allow);
decision_test!(allow_node_script, "node server.js", Allow);
decision_test!(allow_node_version, "node --version", Allow);
decision_test!(allow_cargo_build, "cargo build --release", Allow);
decision_test!(allow_cargo_test, "cargo test", Allow);
decision_test!(allow_cargo_clippy, "cargo clippy", Allow);
decision_test!(allow_go_test, "go test ./...", Allow);
decision_test!(allow_docker_ps, "docker ps", Allow);
decision_test!(allow_docker_logs, "docker logs web", Allow);
decision_test!(allow_kubectl_get, "kubectl get pods", Allow);
decision_test!(allow_kubectl_describe, "kubectl describe svc foo", Allow);
decision_test!(allow_kubectl_logs, "kubectl logs pod/foo", Allow);
decision_test!(allow_curl_plain, "curl https://example.com", Allow);
decision_test!(allow_terraform_plan, "terraform plan", Allow);
decision_test!(allow_gh_pr_list, "gh pr list", Allow);
decision_test!(allow_gh_pr_view, "gh pr view 123", Allow);
decision_test!(allow_gh_pr_create, "gh pr create --title 'Fix parser'", Allow);
decision_test!(allow_gh_status, "gh status", Allow);
decision_test!(allow_bash_version, "bash --version", Allow);
decision_test!(allow_env_bare, "env", Allow);
decision_test!(allow_pip_list, "pip list", Allow);
decision_test!(allow_brew_info, "brew info ripgrep", Allow);
decision_test!(allow_apt_search, "apt search ripgrep", Allow);

// ── ASK: mutating or unknown ──

decision_test!(ask_rm_plain, "rm /tmp/file", Ask);
decision_test!(ask_unknown_tool, "some-unknown-tool --flag", Ask);
decision_test!(ask_mkdir, "mkdir -p /tmp/new", Ask);
decision_test!(ask_mv, "mv old.txt new.txt", Ask);
decision_test!(ask_chmod_plain, "chmod 755 script.sh", Ask);
decision_test!(ask_chown, "chown user:group file", Ask);
decision_test!(ask_wget, "wget https://example.com/file", Ask);
decision_test!(ask_curl_output, "curl -o dump.bin https://example.com", Ask);
decision_test!(ask_docker_run, "docker run ubuntu bash", Ask);
decision_test!(ask_kubectl_apply, "kubectl apply -f deploy.yaml", Ask);
decision_test!(ask_kubectl_delete, "kubectl delete pod foo", Ask);
decision_test!(ask_terraform_apply, "terraform apply", Ask);
decision_test!(ask_git_force_push, "git push --force origin main", Ask);
decision_test!(ask_git_force_push_short, "git push -f origin main", Ask);
decision_test!(
    ask_git_force_with_lease,
    "git push --force-with-lease origin main",
    Ask
);
decision_test!(ask_git_reset_hard, "git reset --hard HEAD~3", Ask);
decision_test!(ask_git_clean, "git clean -fd", Ask);
decision_test!(ask_npm_publish, "npm publish", Ask);
decision_test!(ask_npm_login, "npm login", Ask);
decision_test!(ask_npm_unknown_sub, "npm exec evil", Ask);
decision_test!(ask_yarn_publish, "yarn publish", Ask);
decision_test!(ask_npx_unknown, "npx random-package", Ask);
decision_test!(ask_npx_tsx, "npx tsx app.ts", Ask);
decision_test!(ask_npx_ts_node, "npx ts-node app.ts", Ask);
decision_test!(ask_node_eval, "node -e 'process.exit(0)'", Ask);
decision_test!(ask_node_repl, "node", Ask);
decision_test!(ask_python_inline, "python3 -c 'print(1)'", Ask);
decision_test!(ask_python_script, "python3 script.py", Ask);
decision_test!(ask_bash_script, "bash deploy.sh", Ask);
decision_test!(ask_ssh_untrusted, "ssh prod.example.com", Ask);
decision_test!(ask_docker_exec_untrusted, "docker exec web sh", Ask);
decision_test!(ask_make, "make -j4", Ask);
decision_test!(ask_cargo_publish, "cargo publish", Ask);
decision_test!(ask_env_wrapping, "env FOO=1 unknown-tool", Ask);
decision_test!(ask_gh_repo_delete, "gh repo delete my-repo --yes", Ask);
decision_test!(ask_apt_install, "apt install vim", Ask);

// ── DENY: always-deny list ──

decision_test!(deny_sudo, "sudo apt install vim", Deny);
decision_test!(deny_su, "su - root", Deny);
decision_test!(deny_doas, "doas pacman -S vim", Deny);
decision_test!(deny_dd, "dd if=/dev/zero of=/dev/sda", Deny);
decision_test!(deny_mkfs, "mkfs /dev/sda1", Deny);
decision_test!(deny_mkfs_dotted, "mkfs.ext4 /dev/sda1", Deny);
decision_test!(deny_shutdown, "shutdown -h now", Deny);
decision_test!(deny_reboot, "reboot", Deny);
decision_test!(deny_systemctl, "systemctl restart nginx", Deny);
decision_test!(deny_crontab, "crontab -e", Deny);
decision_test!(deny_iptables, "iptables -F", Deny);
decision_test!(deny_useradd, "useradd mallory", Deny);

// ── DENY: global patterns ──

decision_test!(deny_rm_rf_root, "rm -rf /", Deny);
decision_test!(deny_rm_rf_anywhere, "rm -rf /tmp/junk", Deny);
decision_test!(deny_rm_fr_swapped, "rm -fr build/", Deny);
decision_test!(deny_rm_long_flags, "rm --recursive --force /srv/data", Deny);
decision_test!(deny_rm_rf_after_chain, "ls && rm -rf /tmp", Deny);
decision_test!(deny_sudo_rm_rf, "sudo rm -rf /", Deny);
decision_test!(deny_fork_bomb, ":(){ :|:& };:", Deny);
decision_test!(deny_block_device_write, "echo x > /dev/sda", Deny);
decision_test!(deny_chmod_recursive_777, "chmod -R 777 /", Deny);

// ── Compound commands ──

decision_test!(chain_allow_allow, "ls -la && pwd", Allow);
decision_test!(chain_allow_ask, "ls -la && rm /tmp/x", Ask);
decision_test!(chain_allow_deny, "ls -la && sudo id", Deny);
decision_test!(chain_semicolon, "git status ; git log", Allow);
decision_test!(chain_or_fallback, "cargo test || echo failed", Allow);
decision_test!(
    scenario_force_push_chain,
    "git status && git push --force origin main",
    Ask
);
decision_test!(pipe_three_allows, "cat file.txt | grep error | wc -l", Allow);
decision_test!(pipe_allow_ask, "cat creds.txt | unknown-uploader", Ask);
decision_test!(pipe_deny_dominates, "echo x | sudo tee /etc/hosts", Deny);
decision_test!(multiline_sequence, "ls\npwd\ngit status", Allow);

// ── Wrapper unwrap ──

decision_test!(wrapper_bash_allow, "bash -c 'ls -la'", Allow);
decision_test!(wrapper_sh_allow, "sh -c 'pwd'", Allow);
decision_test!(wrapper_zsh_allow, "zsh -c 'git status'", Allow);
decision_test!(
    scenario_wrapper_chain,
    "bash -c 'ls && curl https://example.com'",
    Allow
);
decision_test!(wrapper_inner_ask, "bash -c 'rm /tmp/x'", Ask);
decision_test!(wrapper_inner_deny, "sh -c 'sudo id'", Deny);
decision_test!(wrapper_nested_allow, "bash -c 'sh -c \"pwd\"'", Allow);
decision_test!(wrapper_unbalanced_inner, "bash -c \"echo 'oops\"", Ask);

// ── Subshell taint ──

decision_test!(scenario_subst_whoami, "echo $(whoami)", Ask);
decision_test!(subst_backtick, "echo `hostname`", Ask);
decision_test!(subst_inner_deny_dominates, "echo $(sudo id)", Deny);
decision_test!(subst_inner_shutdown, "echo $(shutdown -h now)", Deny);
decision_test!(subst_single_quoted_inert, "echo '$(shutdown -h now)'", Allow);
decision_test!(subshell_group, "(cd /tmp && ls)", Ask);
decision_test!(process_subst, "diff <(sort a) <(sort b)", Ask);
decision_test!(
    wrapper_with_inner_subst,
    "bash -c 'echo $(hostname)'",
    Ask
);

// ── Control flow ──

decision_test!(for_loop_asks, "for f in *; do ls \"$f\"; done", Ask);
decision_test!(while_loop_asks, "while true; do echo hi; done", Ask);
decision_test!(if_block_asks, "if true; then ls; fi", Ask);
decision_test!(case_block_asks, "case $x in a) echo hi;; esac", Ask);
decision_test!(function_def_asks, "greet() { echo hi; }", Ask);
decision_test!(
    for_loop_deny_dominates,
    "for f in *; do sudo rm \"$f\"; done",
    Deny
);

// ── Heredocs ──

decision_test!(heredoc_cat_asks, "cat <<EOF\nhello\nEOF\n", Ask);
decision_test!(
    heredoc_pipe_kubectl_asks,
    "cat <<'EOF' | kubectl apply -f -\napiVersion: v1\nkind: Pod\nEOF\n",
    Ask
);
decision_test!(
    heredoc_body_operators_inert,
    "cat <<'EOF'\nline && sudo id ; stuff\nEOF\n",
    Ask
);
decision_test!(
    heredoc_chain_deny_dominates,
    "cat <<'EOF' && sudo id\nbody\nEOF\n",
    Deny
);
decision_test!(
    scenario_gh_pr_body_heredoc,
    "gh pr create --body \"$(cat <<EOF\nhello\nEOF\n)\"",
    Allow
);
decision_test!(
    heredoc_commit_message_idiom,
    "git commit -m \"$(cat <<'EOF'\nFix the `parser` module\nEOF\n)\"",
    Allow
);

// ── Parse failures fail closed ──

decision_test!(unbalanced_quote_asks, "echo 'unterminated", Ask);
decision_test!(empty_input_allows, "", Allow);
decision_test!(whitespace_input_allows, "   ", Allow);

// ── Reason propagation ──

#[test]
fn deny_reason_names_blocked_command() {
    let r = reason_for("ls && sudo id");
    assert!(r.contains("sudo"), "reason should name sudo: {r}");
}

#[test]
fn global_deny_reason_surfaces() {
    let r = reason_for("rm -rf /tmp/junk");
    assert!(r.contains("recursive force remove"), "reason: {r}");
}

#[test]
fn parse_error_reason() {
    assert_eq!(reason_for("echo 'unterminated"), "unparseable command");
}

#[test]
fn taint_reason_mentions_dynamic_constructs() {
    let r = reason_for("echo $(whoami)");
    assert!(r.contains("dynamic"), "reason: {r}");
}

// ── Invariants ──

#[test]
fn wrapper_transparency() {
    for cmd in ["ls -la", "git status", "rm /tmp/x", "sudo id"] {
        let direct = decision_for(cmd);
        let wrapped = decision_for(&format!("sh -c {}", shlex::try_quote(cmd).unwrap()));
        assert_eq!(direct, wrapped, "wrapper changed decision for: {cmd}");
    }
}

#[test]
fn basename_equivalence() {
    assert_eq!(decision_for("/usr/bin/ls"), decision_for("ls"));
    assert_eq!(decision_for("/usr/sbin/reboot"), decision_for("reboot"));
}

#[test]
fn combination_commutes() {
    let pairs = [
        ("ls", "rm /tmp/x"),
        ("git status", "sudo id"),
        ("pwd", "unknown-tool"),
    ];
    for (a, b) in pairs {
        assert_eq!(
            decision_for(&format!("{a} && {b}")),
            decision_for(&format!("{b} && {a}")),
            "swap changed decision for: {a} / {b}"
        );
    }
}

#[test]
fn idempotent_evaluation() {
    for cmd in ["ls -la", "echo $(whoami)", "sudo id", "cat <<EOF\nx\nEOF"] {
        let first = warden::evaluate(cmd);
        let second = warden::evaluate(cmd);
        assert_eq!(first.decision, second.decision);
        assert_eq!(first.reason, second.reason);
    }
}

// ── Configuration-driven behavior ──

#[test]
fn trusted_ssh_host_allows_connection() {
    let mut config = Config::default_config();
    config.trusted_ssh_hosts.push("*.internal.example".into());
    let ev = Evaluator::from_config(&config).unwrap();
    assert_eq!(
        ev.evaluate("ssh db1.internal.example uptime").decision,
        Decision::Allow
    );
    assert_eq!(
        ev.evaluate("ssh prod.example.com uptime").decision,
        Decision::Ask
    );
}

#[test]
fn trusted_docker_container_allows_exec() {
    let mut config = Config::default_config();
    config.trusted_docker_containers.push("dev-*".into());
    let ev = Evaluator::from_config(&config).unwrap();
    assert_eq!(
        ev.evaluate("docker exec -it dev-shell bash").decision,
        Decision::Allow
    );
    assert_eq!(
        ev.evaluate("docker exec prod-db psql").decision,
        Decision::Ask
    );
}

#[test]
fn trusted_kubectl_context_allows() {
    let mut config = Config::default_config();
    config.trusted_kubectl_contexts.push("staging".into());
    let ev = Evaluator::from_config(&config).unwrap();
    assert_eq!(
        ev.evaluate("kubectl --context staging rollout restart deploy/web")
            .decision,
        Decision::Allow
    );
    assert_eq!(
        ev.evaluate("kubectl --context prod rollout restart deploy/web")
            .decision,
        Decision::Ask
    );
}

#[test]
fn ask_on_subshell_disabled() {
    let mut config = Config::default_config();
    config.ask_on_subshell = false;
    let ev = Evaluator::from_config(&config).unwrap();
    assert_eq!(ev.evaluate("echo $(whoami)").decision, Decision::Allow);
    // deny inside the substitution still dominates
    assert_eq!(ev.evaluate("echo $(sudo id)").decision, Decision::Deny);
}

#[test]
fn project_config_shadows_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("warden.yaml");
    std::fs::write(
        &project,
        "rules:\n  - command: git\n    default: deny\nalwaysDeny: [terraform]\n",
    )
    .unwrap();

    let config = Config::load_from(None, Some(&project)).unwrap();
    let ev = Evaluator::from_config(&config).unwrap();
    assert_eq!(ev.evaluate("git status").decision, Decision::Deny);
    assert_eq!(ev.evaluate("terraform plan").decision, Decision::Deny);
    // untouched defaults still apply
    assert_eq!(ev.evaluate("ls -la").decision, Decision::Allow);
}

#[test]
fn invalid_project_regex_fails_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("warden.yaml");
    std::fs::write(
        &project,
        "globalDeny:\n  - pattern: '(unclosed'\n    reason: oops\n",
    )
    .unwrap();

    let config = Config::load_from(None, Some(&project)).unwrap();
    assert!(Evaluator::from_config(&config).is_err());
}
