//! cc-forkguard: hook binary for Claude Code.
//!
//! PreToolUse (default): reads the Bash tool call as JSON on stdin and
//! blocks `git push` / `gh` writes aimed at repositories the user doesn't
//! own. Allowed commands exit 0 silently; blocked ones print the reason to
//! stderr and exit 2.
//!
//! `--advise` (PostToolUse on edits): prints non-blocking advisories as
//! `additionalContext` and always exits 0.
//!
//! `--dump-config` prints the effective configuration.

use cc_forkguard::advisory::{self, MarkerStore};
use cc_forkguard::config::Config;
use cc_forkguard::eval::{Decision, GuardRegistry};
use cc_forkguard::git::GitCli;
use cc_forkguard::logging;
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Exit status the host treats as "block this tool call".
const EXIT_BLOCK: i32 = 2;

#[derive(Deserialize)]
struct HookInput {
    tool_name: Option<String>,
    tool_input: Option<ToolInput>,
    cwd: Option<PathBuf>,
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct ToolInput {
    command: Option<String>,
}

enum Mode {
    Guard,
    Advise,
    DumpConfig,
}

fn parse_mode() -> Mode {
    let mut mode = Mode::Guard;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--advise" => mode = Mode::Advise,
            "--dump-config" => mode = Mode::DumpConfig,
            other => eprintln!("cc-forkguard: ignoring unknown argument {other}"),
        }
    }
    mode
}

fn read_hook_input() -> HookInput {
    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        eprintln!("failed to read stdin");
        std::process::exit(1);
    }
    match serde_json::from_str(&input) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("JSON parse error: {e}");
            std::process::exit(1);
        }
    }
}

fn input_cwd(input: &HookInput) -> PathBuf {
    input
        .cwd
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn guard(config: &Config, input: HookInput) {
    if input.tool_name.as_deref() != Some("Bash") {
        std::process::exit(0);
    }
    let cwd = input_cwd(&input);
    let command = input
        .tool_input
        .and_then(|t| t.command)
        .unwrap_or_default();
    if command.trim().is_empty() {
        std::process::exit(0);
    }

    let registry = GuardRegistry::from_config(config);
    let remotes = GitCli::new(config.git_timeout());
    let result = registry.evaluate(&command, &cwd, &remotes);
    logging::log_decision(&command, &result);

    if result.decision == Decision::Block {
        eprintln!("cc-forkguard: {}", result.reason);
        std::process::exit(EXIT_BLOCK);
    }
}

fn advise(config: &Config, input: HookInput) {
    let cwd = input_cwd(&input);
    let Some(store) = MarkerStore::default_location() else {
        return;
    };
    let session = input.session_id.unwrap_or_default();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let remotes = GitCli::new(config.git_timeout());

    let messages = advisory::run(&config.advisory, &cwd, &session, &remotes, &store, now);
    if messages.is_empty() {
        return;
    }
    let output = serde_json::json!({
        "hookSpecificOutput": {
            "hookEventName": "PostToolUse",
            "additionalContext": messages.join("\n"),
        }
    });
    println!("{output}");
}

fn main() {
    let mode = parse_mode();
    let config = Config::load();

    match mode {
        Mode::DumpConfig => match toml::to_string_pretty(&config) {
            Ok(s) => print!("{s}"),
            Err(e) => {
                eprintln!("cc-forkguard: cannot serialize config: {e}");
                std::process::exit(1);
            }
        },
        Mode::Guard => {
            logging::init(&config.logging);
            guard(&config, read_hook_input());
        }
        Mode::Advise => {
            logging::init(&config.logging);
            advise(&config, read_hook_input());
        }
    }
}
