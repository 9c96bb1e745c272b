//! cc-forkguard: a PreToolUse hook for Claude Code that stops an agent from
//! pushing to, or writing into, GitHub repositories the user doesn't own.
//!
//! Two guards run over every Bash command: one for `git push`, one for
//! `gh` write operations. Each resolves the repository the command would
//! actually touch (remotes, tracking config, `-R` flags, API paths) and
//! checks it against an ownership policy. Anything that can't be resolved
//! safely is blocked; hosts that aren't GitHub are let through.
//!
//! # Architecture
//!
//! - **[`parse`]** — Shell text heuristics: quote-aware splitting, substitution extraction, wrapper skipping, loop detection, `cd` tracking.
//! - **[`repo`]** — Remote URL normalization into `owner/repo`.
//! - **[`git`]** — Read-only git metadata queries behind the [`git::RemoteSource`] trait.
//! - **[`guards`]** — The push and write guards.
//! - **[`eval`]** — Decision types, ownership policy, and the evaluation state machine.
//! - **[`config`]** — Configuration loading: embedded defaults + user overlay + environment.
//! - **[`logging`]** — Decision logging to `~/.local/share/cc-forkguard/decisions.log`.
//! - **[`advisory`]** — Non-blocking post-edit advisories (protected branch, idle gap).

/// Post-edit advisories.
pub mod advisory;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Evaluation engine: registry, decision types, ownership policy.
pub mod eval;
/// Git metadata queries.
pub mod git;
/// Guard evaluators for `git push` and `gh` writes.
pub mod guards;
/// File-based decision logging.
pub mod logging;
/// Shell command text heuristics.
pub mod parse;
/// Repository references and URL normalization.
pub mod repo;

use std::path::Path;

use config::PolicyConfig;
use eval::RuleMatch;
use git::RemoteSource;

/// Evaluate a command with the default guard configuration and the given
/// policy.
///
/// This is the main entry point for tests and embedding. The CLI builds
/// the registry from the loaded configuration instead.
pub fn evaluate(
    command: &str,
    cwd: &Path,
    policy: &PolicyConfig,
    remotes: &dyn RemoteSource,
) -> RuleMatch {
    let config = config::Config::default_config();
    let registry = eval::GuardRegistry::from_config(&config).with_policy(policy.clone());
    registry.evaluate(command, cwd, remotes)
}
