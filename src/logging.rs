use crate::config::LoggingConfig;
use crate::eval::RuleMatch;
use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use std::path::PathBuf;

/// Directory holding the decision log.
fn log_dir() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".local/share/cc-forkguard"))
}

fn level_filter(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Route `log` records to ~/.local/share/cc-forkguard/decisions.log.
/// Best-effort: any failure leaves logging disabled.
pub fn init(config: &LoggingConfig) {
    let level = level_filter(&config.level);
    if level == LevelFilter::Off {
        return;
    }
    let Some(dir) = log_dir() else {
        return;
    };
    let _ = std::fs::create_dir_all(&dir);
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("decisions.log"))
    else {
        return;
    };

    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    let _ = WriteLogger::init(level, log_config, file);
}

/// Format a decision as one tab-separated line: decision, outcome,
/// command (truncated), reason (newlines folded).
pub fn decision_line(command: &str, result: &RuleMatch) -> String {
    let reason_oneline = result.reason.replace('\n', "; ");
    let cmd_truncated: String = command.chars().take(200).collect::<String>().replace('\n', " ");
    format!(
        "{decision}\t{outcome}\t{cmd}\t{reason}",
        decision = result.decision.as_str(),
        outcome = result.outcome.as_str(),
        cmd = cmd_truncated,
        reason = reason_oneline,
    )
}

/// Record a final decision.
pub fn log_decision(command: &str, result: &RuleMatch) {
    log::info!("{}", decision_line(command, result));
}
