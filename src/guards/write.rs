use super::{
    GuardEvaluator, Invocation, InvocationKind, ResolveContext, Resolution, indirect_use, resolve_url,
};
use crate::config::GhConfig;
use crate::eval::CommandContext;
use crate::parse::{self, ParsedPipeline};
use crate::repo::{self, RepoRef};

/// `gh repo create` flags that take a separate value.
const REPO_CREATE_VALUE_FLAGS: &[&str] = &[
    "-d",
    "--description",
    "-h",
    "--homepage",
    "-t",
    "--team",
    "-p",
    "--template",
    "-l",
    "--license",
    "-g",
    "--gitignore",
    "-s",
    "--source",
    "-r",
    "--remote",
];

/// `gh repo edit` flags that take a separate value.
const REPO_EDIT_VALUE_FLAGS: &[&str] = &[
    "-d",
    "--description",
    "-h",
    "--homepage",
    "--default-branch",
    "--add-topic",
    "--remove-topic",
    "--visibility",
];

/// `gh api` flags that supply request fields.
const API_FIELD_FLAGS: &[&str] = &["-f", "-F", "--field", "--raw-field"];

/// The words of a `gh` invocation after the command name.
struct GhArgs<'a> {
    args: &'a [String],
    /// `-R`/`--repo` value.
    repo_flag: Option<&'a str>,
    /// Non-flag words with their index in `args`.
    positional: Vec<(usize, &'a str)>,
}

impl<'a> GhArgs<'a> {
    fn parse(args: &'a [String]) -> Self {
        let mut repo_flag = None;
        let mut positional = Vec::new();
        let mut i = 0;
        while i < args.len() {
            let word = args[i].as_str();
            if word == "-R" || word == "--repo" {
                repo_flag = args.get(i + 1).map(String::as_str);
                i += 2;
                continue;
            }
            if let Some(v) = word.strip_prefix("--repo=") {
                repo_flag = Some(v);
            } else if let Some(v) = word.strip_prefix("-R")
                && !v.is_empty()
            {
                repo_flag = Some(v);
            } else if !word.starts_with('-') {
                positional.push((i, word));
            }
            i += 1;
        }
        Self {
            args,
            repo_flag,
            positional,
        }
    }

    fn resource(&self) -> Option<&'a str> {
        self.positional.first().map(|(_, w)| *w)
    }

    fn action(&self) -> Option<&'a str> {
        self.positional.get(1).map(|(_, w)| *w)
    }

    /// Index in `args` of the action word.
    fn action_index(&self) -> Option<usize> {
        self.positional.get(1).map(|(i, _)| *i)
    }
}

/// Value of `-X`/`--method`, uppercased.
fn api_method(args: &[String]) -> Option<String> {
    let mut iter = args.iter();
    while let Some(word) = iter.next() {
        if word == "-X" || word == "--method" {
            return iter.next().map(|m| m.to_ascii_uppercase());
        }
        if let Some(m) = word.strip_prefix("--method=") {
            return Some(m.to_ascii_uppercase());
        }
        if let Some(m) = word.strip_prefix("-X")
            && !m.is_empty()
        {
            return Some(m.to_ascii_uppercase());
        }
    }
    None
}

/// Whether a `gh api` call sends a request body or a write method.
/// An explicit GET/HEAD wins over field flags (gh sends them as query
/// parameters then).
fn api_is_write(args: &[String]) -> bool {
    if let Some(method) = api_method(args) {
        return !matches!(method.as_str(), "GET" | "HEAD");
    }
    args.iter().any(|w| {
        API_FIELD_FLAGS.contains(&w.as_str())
            || w.starts_with("--field=")
            || w.starts_with("--raw-field=")
            || w == "--input"
            || w.starts_with("--input=")
            || ((w.starts_with("-f") || w.starts_with("-F")) && w.len() > 2 && !w.starts_with("--"))
    })
}

/// Extract `owner/repo` from a `repos/<owner>/<repo>` API path anywhere in
/// the arguments. Placeholder paths (`{owner}`) don't count.
fn api_repo_path(args: &[String]) -> Option<RepoRef> {
    args.iter().find_map(|arg| {
        let path = arg.split(['?', '#']).next().unwrap_or("");
        let start = path
            .match_indices("repos/")
            .find(|(idx, _)| *idx == 0 || path[..*idx].ends_with('/'))
            .map(|(idx, m)| idx + m.len())?;
        let mut parts = path[start..].split('/');
        let owner = parts.next()?;
        let name = parts.next()?;
        let valid = |s: &str| !s.is_empty() && !s.contains(['{', '}', ':', '$']);
        (valid(owner) && valid(name)).then(|| RepoRef::new(owner, name))
    })
}

/// Parse a `-R` style reference: `OWNER/REPO`, `HOST/OWNER/REPO`, or a URL.
fn parse_repo_arg(value: &str) -> Option<RepoRef> {
    if value.contains("://") || repo::looks_like_url(value) {
        return repo::normalize(value);
    }
    let value = value.trim_end_matches('/');
    match value.split('/').collect::<Vec<_>>().as_slice() {
        [_, _] => RepoRef::parse(value),
        [_host, owner, name] => RepoRef::parse(&format!("{owner}/{name}")),
        _ => None,
    }
}

/// First non-flag argument after the action, skipping values of the
/// given flags.
fn positional_after(args: &[String], start: usize, value_flags: &[&str]) -> Option<String> {
    let mut iter = args.iter().skip(start);
    while let Some(word) = iter.next() {
        if value_flags.contains(&word.as_str()) {
            iter.next();
        } else if !word.starts_with('-') {
            return Some(word.clone());
        }
    }
    None
}

/// Guards `gh` write operations against repositories the user doesn't own.
pub struct WriteGuard {
    write_resources: Vec<String>,
    write_actions: Vec<String>,
}

impl WriteGuard {
    pub fn from_config(config: &GhConfig) -> Self {
        Self {
            write_resources: config.write_resources.clone(),
            write_actions: config.write_actions.clone(),
        }
    }

    fn kind(&self, gh: &GhArgs<'_>) -> InvocationKind {
        let resource = gh.resource().unwrap_or("?");
        let action = gh.action().unwrap_or("");
        let label = format!("gh {resource} {action}").trim_end().to_string();

        if resource == "gist" {
            return InvocationKind::Exempt(label);
        }
        if resource == "api" {
            return if api_is_write(gh.args) {
                let method = api_method(gh.args).unwrap_or_else(|| "POST".into());
                InvocationKind::Guarded(format!("gh api ({method})"))
            } else {
                InvocationKind::ReadOnly("gh api (GET)".into())
            };
        }
        let is_write = self.write_resources.iter().any(|r| r == resource)
            && self.write_actions.iter().any(|a| a == action);
        if is_write {
            InvocationKind::Guarded(label)
        } else {
            InvocationKind::ReadOnly(label)
        }
    }

    /// Explicit target from arguments alone, in priority order.
    fn explicit_target(
        gh: &GhArgs<'_>,
        inv_ctx: &CommandContext,
        ctx: &ResolveContext<'_>,
    ) -> Option<Result<(RepoRef, String), String>> {
        if let Some(value) = gh.repo_flag {
            return Some(
                parse_repo_arg(value)
                    .map(|r| (r, "-R flag".to_string()))
                    .ok_or_else(|| format!("-R {value} is not in OWNER/REPO form")),
            );
        }
        if let Some(value) = inv_ctx.env("GH_REPO") {
            return Some(
                parse_repo_arg(value)
                    .map(|r| (r, "GH_REPO".to_string()))
                    .ok_or_else(|| format!("GH_REPO={value} is not in OWNER/REPO form")),
            );
        }

        match (gh.resource(), gh.action()) {
            (Some("repo"), Some("create")) => {
                let start = gh.action_index()? + 1;
                let name = positional_after(gh.args, start, REPO_CREATE_VALUE_FLAGS)?;
                if name.contains('/') {
                    return Some(
                        parse_repo_arg(&name)
                            .map(|r| (r, "gh repo create argument".to_string()))
                            .ok_or_else(|| format!("cannot read owner/repo from '{name}'")),
                    );
                }
                // Bare name: created under the first allowed owner
                let owner = ctx.policy.default_owner()?;
                Some(Ok((
                    RepoRef::new(owner, name),
                    "gh repo create argument (default owner)".to_string(),
                )))
            }
            // The rename operand is the new name, not the target
            (Some("repo"), Some("fork" | "rename")) => None,
            (Some("repo"), Some(action)) => {
                let start = gh.action_index()? + 1;
                let value_flags: &[&str] = if action == "edit" { REPO_EDIT_VALUE_FLAGS } else { &[] };
                let name = positional_after(gh.args, start, value_flags)?;
                if !name.contains('/') {
                    return None;
                }
                parse_repo_arg(&name).map(|r| Ok((r, format!("gh repo {action} argument"))))
            }
            (Some("api"), _) => api_repo_path(gh.args).map(|r| Ok((r, "API path".to_string()))),
            _ => None,
        }
    }

    /// The `upstream` remote's repository, if this directory is a fork.
    fn fork_parent(ctx: &ResolveContext<'_>) -> Option<RepoRef> {
        let dir = ctx.dir().ok()?;
        ctx.remotes
            .remote_url(dir, "upstream", false)
            .ok()
            .flatten()
            .and_then(|url| repo::normalize(&url))
    }

    fn resolve_from_remotes(ctx: &ResolveContext<'_>) -> Resolution {
        let dir = match ctx.dir() {
            Ok(dir) => dir,
            Err(resolution) => return resolution,
        };
        let upstream = match ctx.remotes.remote_url(dir, "upstream", false) {
            Ok(u) => u,
            Err(e) => return Resolution::Unresolvable(e.to_string()),
        };
        let origin = match ctx.remotes.remote_url(dir, "origin", false) {
            Ok(o) => o,
            Err(e) => return Resolution::Unresolvable(e.to_string()),
        };

        if let Some(upstream) = upstream {
            return Resolution::ForkAmbiguous {
                origin: origin.as_deref().and_then(repo::normalize),
                upstream: repo::normalize(&upstream),
            };
        }
        match origin {
            Some(url) => resolve_url(&url, "remote 'origin'".into(), ctx.policy),
            None => Resolution::Unresolvable(format!("no 'origin' remote in {}", dir.display())),
        }
    }
}

impl GuardEvaluator for WriteGuard {
    fn verb(&self) -> &'static str {
        "gh write"
    }

    fn looks_relevant(&self, command: &str) -> bool {
        parse::contains_word(command, "gh")
    }

    fn too_complex(&self, command: &str) -> bool {
        parse::has_loop(command)
    }

    fn classify(&self, pipeline: &ParsedPipeline) -> Vec<Invocation> {
        pipeline
            .segments
            .iter()
            .enumerate()
            .filter_map(|(index, seg)| {
                let ctx = CommandContext::from_command(&seg.command);
                let kind = if ctx.base_command == "gh" {
                    self.kind(&GhArgs::parse(ctx.args()))
                } else {
                    indirect_use(&ctx, "gh", |rest| match self.kind(&GhArgs::parse(rest)) {
                        InvocationKind::Guarded(label) => Some(label),
                        _ => None,
                    })?
                };
                Some(Invocation { index, ctx, kind })
            })
            .collect()
    }

    fn resolve(&self, invocation: &Invocation, ctx: &ResolveContext<'_>) -> Resolution {
        let gh = GhArgs::parse(invocation.ctx.args());
        match Self::explicit_target(&gh, &invocation.ctx, ctx) {
            Some(Ok((repo, source))) => Resolution::Target {
                repo,
                source,
                fork_parent: Self::fork_parent(ctx),
            },
            Some(Err(detail)) => Resolution::Unresolvable(detail),
            None => Self::resolve_from_remotes(ctx),
        }
    }

    fn unresolvable_hint(&self) -> &'static str {
        "Pass the repository explicitly with -R OWNER/REPO."
    }

    fn denied_hint(&self) -> &'static str {
        "Target a repository you own with -R OWNER/REPO, or add it to allowed_repos if this is intended."
    }
}
