//! Guard evaluators: per-verb classification and target resolution.
//!
//! Both guards share the same state machine (see [`crate::eval`]); they
//! differ only in which invocations they guard and how they find the
//! repository an invocation would write to.

/// `git push` classification and remote/tracking resolution.
pub mod push;
/// `gh` write classification and flag/argument/remote resolution.
pub mod write;

use std::path::Path;

use crate::config::PolicyConfig;
use crate::eval::CommandContext;
use crate::git::RemoteSource;
use crate::parse::{self, ParsedPipeline, SUBST_PLACEHOLDER, WorkDir};
use crate::repo::{self, RepoRef};

/// How a single invocation of a guarded tool was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationKind {
    /// Reads only; always allowed.
    ReadOnly(String),
    /// Writes, but outside repository ownership (gists).
    Exempt(String),
    /// Writes to a repository; must be resolved and checked.
    Guarded(String),
    /// A guarded write run through another command (`xargs git push`) or
    /// under a command name computed at run time. Never resolvable.
    Indirect { label: String, via: String },
}

/// One occurrence of a guarded tool within a command line.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Segment index in the pipeline.
    pub index: usize,
    pub ctx: CommandContext,
    pub kind: InvocationKind,
}

/// Where an invocation would write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Target {
        repo: RepoRef,
        /// Where the target came from (`-R flag`, `remote origin`, ...).
        source: String,
        /// The `upstream` remote's repository, for the fork-parent exception.
        fork_parent: Option<RepoRef>,
    },
    ForkAmbiguous {
        origin: Option<RepoRef>,
        upstream: Option<RepoRef>,
    },
    Unresolvable(String),
    NotApplicable(String),
}

/// Inputs available while resolving one invocation.
pub struct ResolveContext<'a> {
    /// Effective directory after any chained `cd`, or why it isn't known.
    pub work_dir: WorkDir,
    pub policy: &'a PolicyConfig,
    pub remotes: &'a dyn RemoteSource,
}

impl ResolveContext<'_> {
    /// The working directory, or the resolution to return when it isn't known.
    pub fn dir(&self) -> Result<&Path, Resolution> {
        self.work_dir
            .as_deref()
            .map_err(|why| Resolution::Unresolvable(format!("the working directory is unknown: {why}")))
    }
}

/// A guard over one family of write operations.
pub trait GuardEvaluator: Send + Sync {
    /// Short name of the guarded verb, used in messages ("git push").
    fn verb(&self) -> &'static str;

    /// Fast keyword pre-check. May over-match, must never under-match.
    fn looks_relevant(&self, command: &str) -> bool;

    /// Loops and batches that can't be resolved statically.
    fn too_complex(&self, command: &str) -> bool;

    /// Find and classify every invocation of the guarded tool.
    fn classify(&self, pipeline: &ParsedPipeline) -> Vec<Invocation>;

    /// Resolve the repository a guarded invocation writes to.
    fn resolve(&self, invocation: &Invocation, ctx: &ResolveContext<'_>) -> Resolution;

    /// What to tell the operator when the target can't be determined.
    fn unresolvable_hint(&self) -> &'static str;

    /// What to tell the operator when the target isn't theirs.
    fn denied_hint(&self) -> &'static str;
}

/// Commands that print or look up their arguments instead of running them.
const NON_EXECUTING: &[&str] = &["echo", "printf", "man", "which", "type", "whatis", "help"];

/// Find a guarded write that a segment runs without naming `tool` as its
/// command word: as an argument of another command (`xargs git push`,
/// `git submodule foreach git push`) or under a computed command name
/// (`$(which git) push`). `guarded` gets the words after the tool and
/// returns a label when they form a guarded write.
pub(crate) fn indirect_use(
    ctx: &CommandContext,
    tool: &str,
    guarded: impl Fn(&[String]) -> Option<String>,
) -> Option<InvocationKind> {
    if NON_EXECUTING.contains(&ctx.base_command.as_str()) {
        return None;
    }
    let words = ctx.command_words();
    let first = words.first()?;
    if first.contains(SUBST_PLACEHOLDER) || first.starts_with('$') {
        return guarded(&words[1..]).map(|label| InvocationKind::Indirect {
            label,
            via: "a command name computed at run time".into(),
        });
    }
    words.iter().enumerate().skip(1).find_map(|(i, word)| {
        if parse::base_name(word) != tool {
            return None;
        }
        guarded(&words[i + 1..]).map(|label| InvocationKind::Indirect {
            label,
            via: format!("`{}`", ctx.base_command),
        })
    })
}

/// Turn a remote URL into a resolution: hosts that aren't GitHub-shaped
/// (including local paths) can't be verified and pass through.
pub(crate) fn resolve_url(url: &str, source: String, policy: &PolicyConfig) -> Resolution {
    match repo::host_of(url) {
        None => {
            return Resolution::NotApplicable(format!("{source} ({url}) is a local path"));
        }
        Some(host) if !repo::is_github_host(&host, &policy.github_hosts) => {
            return Resolution::NotApplicable(format!(
                "{source} is on {host}, which is not a GitHub host"
            ));
        }
        Some(_) => {}
    }
    match repo::normalize(url) {
        Some(repo) => Resolution::Target {
            repo,
            source,
            fork_parent: None,
        },
        None => Resolution::Unresolvable(format!("cannot read owner/repo from {source} ({url})")),
    }
}
