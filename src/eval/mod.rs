pub mod context;
pub mod decision;
pub mod policy;

pub use context::CommandContext;
pub use decision::{Decision, Outcome, RuleMatch};

use std::path::Path;

use crate::config::{Config, ENV_ALLOWED_OWNERS, PolicyConfig};
use crate::git::RemoteSource;
use crate::guards::push::PushGuard;
use crate::guards::write::WriteGuard;
use crate::guards::{GuardEvaluator, InvocationKind, ResolveContext, Resolution};
use crate::parse::{self, ParsedPipeline, WorkDir};

/// How many levels of substitutions and shell bodies are followed.
const MAX_NESTING: usize = 8;

/// The guards to run and the policy they enforce.
pub struct GuardRegistry {
    guards: Vec<Box<dyn GuardEvaluator>>,
    policy: PolicyConfig,
}

/// Combine the allowing results of several checks.
fn summarise(mut allowed: Vec<RuleMatch>) -> RuleMatch {
    match allowed.len() {
        0 => RuleMatch::new(Outcome::NotRelevant, "no git push or gh invocation"),
        1 => allowed.remove(0),
        _ => {
            let outcome = allowed
                .iter()
                .map(|r| r.outcome)
                .find(|o| *o == Outcome::Allowed)
                .unwrap_or(allowed[0].outcome);
            let reasons: Vec<String> = allowed.into_iter().map(|r| r.reason).collect();
            RuleMatch::new(outcome, reasons.join("\n"))
        }
    }
}

/// Command lines nested inside a pipeline, each with the directory it
/// runs in: substitutions (matched to segments by placeholder) and the
/// bodies of `sh -c` or `eval`.
fn nested_commands(
    pipeline: &ParsedPipeline,
    substitutions: Vec<String>,
    cwd: &WorkDir,
) -> Vec<(String, WorkDir)> {
    let mut substitutions = substitutions.into_iter();
    let mut nested = Vec::new();
    for (index, seg) in pipeline.segments.iter().enumerate() {
        let dir = cwd
            .clone()
            .and_then(|cwd| parse::resolve_work_dir_at(pipeline, index, &cwd));
        let count = seg.command.matches(parse::SUBST_PLACEHOLDER).count();
        nested.extend(substitutions.by_ref().take(count).map(|s| (s, dir.clone())));
        if let Some(script) = CommandContext::from_command(&seg.command).inline_script() {
            nested.push((script, dir));
        }
    }
    nested.extend(substitutions.map(|s| (s, cwd.clone())));
    nested
}

impl GuardRegistry {
    /// Build the registry from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            guards: vec![
                Box::new(PushGuard),
                Box::new(WriteGuard::from_config(&config.gh)),
            ],
            policy: config.policy(),
        }
    }

    /// Replace the ownership policy.
    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    /// Evaluate a command run from `cwd` against every guard. The first
    /// block wins; otherwise the allows are summarised.
    pub fn evaluate(&self, command: &str, cwd: &Path, remotes: &dyn RemoteSource) -> RuleMatch {
        self.evaluate_at(command, &Ok(cwd.to_path_buf()), remotes, 0)
    }

    /// Evaluate the commands nested in a command line, then the line itself.
    fn evaluate_at(
        &self,
        command: &str,
        cwd: &WorkDir,
        remotes: &dyn RemoteSource,
        depth: usize,
    ) -> RuleMatch {
        if depth > MAX_NESTING {
            return match self.guards.iter().find(|g| g.looks_relevant(command)) {
                Some(guard) => RuleMatch::new(
                    Outcome::TooComplex,
                    format!(
                        "Blocked {}: the command nests substitutions or shells too deeply to \
                         inspect. Run it as a plain command.",
                        guard.verb()
                    ),
                ),
                None => RuleMatch::new(Outcome::NotRelevant, "no git push or gh invocation"),
            };
        }

        let (outer, substitutions) = parse::extract_substitutions(command);
        let pipeline = parse::split_compound_command(&outer);

        let mut allowed = Vec::new();
        // Recursively evaluate substitution contents and shell bodies
        for (nested, dir) in nested_commands(&pipeline, substitutions, cwd) {
            let result = self.evaluate_at(&nested, &dir, remotes, depth + 1);
            if result.decision == Decision::Block {
                return result;
            }
            if result.outcome != Outcome::NotRelevant {
                allowed.push(result);
            }
        }

        for guard in &self.guards {
            let result = self.evaluate_guard(guard.as_ref(), command, &pipeline, cwd, remotes);
            if result.decision == Decision::Block {
                return result;
            }
            if result.outcome != Outcome::NotRelevant {
                allowed.push(result);
            }
        }
        summarise(allowed)
    }

    /// Run one guard through the evaluation state machine. `command` is
    /// the full text (for the keyword and complexity checks); `pipeline`
    /// is its outer level with substitutions cut out.
    fn evaluate_guard(
        &self,
        guard: &dyn GuardEvaluator,
        command: &str,
        pipeline: &ParsedPipeline,
        cwd: &WorkDir,
        remotes: &dyn RemoteSource,
    ) -> RuleMatch {
        let verb = guard.verb();

        if !guard.looks_relevant(command) {
            return RuleMatch::new(Outcome::NotRelevant, format!("no {verb}"));
        }

        if guard.too_complex(command) {
            return RuleMatch::new(
                Outcome::TooComplex,
                format!(
                    "Blocked {verb}: the command contains a loop or more than one {verb}, so its \
                     target repository can't be determined safely. Run each {verb} as its own \
                     command with an explicit target."
                ),
            );
        }

        let invocations = guard.classify(pipeline);

        let mut notes = Vec::new();
        let mut guarded = Vec::new();
        for inv in &invocations {
            match &inv.kind {
                InvocationKind::ReadOnly(label) => notes.push((Outcome::ReadOnly, format!("read-only {label}"))),
                InvocationKind::Exempt(label) => notes.push((
                    Outcome::Exempt,
                    format!("{label}: gists are account-scoped, not repository-scoped"),
                )),
                InvocationKind::Guarded(_) | InvocationKind::Indirect { .. } => guarded.push(inv),
            }
        }

        if guarded.is_empty() {
            return match notes.into_iter().next() {
                Some((outcome, reason)) => RuleMatch::new(outcome, reason),
                None => RuleMatch::new(Outcome::NotRelevant, format!("no {verb}")),
            };
        }

        if self.policy.is_unconfigured() {
            return RuleMatch::new(
                Outcome::Unconfigured,
                format!(
                    "Blocked {verb}: no allowed owners are configured, so writes fail closed. \
                     Set {ENV_ALLOWED_OWNERS}=<your-github-user> or add allowed_owners under \
                     [policy] in ~/.config/cc-forkguard/config.toml."
                ),
            );
        }

        let mut allows = Vec::new();
        for inv in guarded {
            let result = match &inv.kind {
                InvocationKind::Indirect { label, via } => RuleMatch::new(
                    Outcome::Unresolvable,
                    format!(
                        "Blocked {label}: it runs through {via}, so its target repository can't \
                         be resolved. Run {label} as its own command with an explicit target."
                    ),
                ),
                kind => {
                    let label = match kind {
                        InvocationKind::Guarded(label) => label.as_str(),
                        _ => verb,
                    };
                    let ctx = ResolveContext {
                        work_dir: cwd
                            .clone()
                            .and_then(|cwd| parse::resolve_work_dir_at(pipeline, inv.index, &cwd)),
                        policy: &self.policy,
                        remotes,
                    };
                    self.judge(guard, label, guard.resolve(inv, &ctx))
                }
            };
            if result.decision == Decision::Block {
                return result;
            }
            allows.push(result);
        }

        let outcome = allows
            .iter()
            .map(|r| r.outcome)
            .find(|o| *o == Outcome::Allowed)
            .unwrap_or(Outcome::NotApplicable);
        let reasons: Vec<String> = allows.into_iter().map(|r| r.reason).collect();
        RuleMatch::new(outcome, reasons.join("\n"))
    }

    /// Turn a resolution into a decision with an operator-facing reason.
    fn judge(&self, guard: &dyn GuardEvaluator, label: &str, resolution: Resolution) -> RuleMatch {
        let policy = &self.policy;
        match resolution {
            Resolution::Target {
                repo,
                source,
                fork_parent,
            } => match policy::allow_rule(&repo, policy, fork_parent.as_ref()) {
                Some(rule) => RuleMatch::new(
                    Outcome::Allowed,
                    format!("{label} -> {repo} (from {source}): {}", rule.describe()),
                ),
                None => RuleMatch::new(
                    Outcome::Denied,
                    format!(
                        "Blocked {label}: target {repo} (from {source}) is not yours ({}). {}",
                        policy::describe_policy(policy),
                        guard.denied_hint()
                    ),
                ),
            },
            Resolution::ForkAmbiguous { origin, upstream } => {
                let show = |r: Option<crate::repo::RepoRef>| {
                    r.map_or_else(|| "<unknown>".to_string(), |r| r.to_string())
                };
                let (origin, upstream) = (show(origin), show(upstream));
                RuleMatch::new(
                    Outcome::ForkAmbiguous,
                    format!(
                        "Blocked {label}: this directory is a fork (origin: {origin}, upstream: \
                         {upstream}) and gh may target either one. Re-run with -R {origin} to \
                         target your fork, or -R {upstream} to target the parent deliberately."
                    ),
                )
            }
            Resolution::Unresolvable(detail) => RuleMatch::new(
                Outcome::Unresolvable,
                format!(
                    "Blocked {label}: could not determine the target repository ({detail}). {}",
                    guard.unresolvable_hint()
                ),
            ),
            Resolution::NotApplicable(detail) => {
                log::info!("{label}: allowing unverifiable target: {detail}");
                RuleMatch::new(
                    Outcome::NotApplicable,
                    format!("{label}: cannot verify ownership ({detail}); allowed"),
                )
            }
        }
    }
}
