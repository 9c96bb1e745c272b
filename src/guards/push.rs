use std::path::{Path, PathBuf};

use super::{
    GuardEvaluator, Invocation, InvocationKind, ResolveContext, Resolution, indirect_use, resolve_url,
};
use crate::eval::CommandContext;
use crate::git::{GitResult, RemoteSource};
use crate::parse::{self, ParsedPipeline};
use crate::repo::looks_like_url;

const PUSH_VERB: &str = "git push";

/// git global options that take a value (separately or after `=`).
const GIT_VALUE_OPTIONS: &[&str] = &["-C", "-c", "--git-dir", "--work-tree", "--namespace", "--config-env"];

/// `git push` options that take a separate value.
const PUSH_VALUE_FLAGS: &[&str] = &["-o", "--push-option", "--receive-pack", "--exec", "--repo"];

/// Environment variables that inject configuration git would otherwise
/// read from the repository.
const CONFIG_ENV_VARS: &[&str] = &[
    "GIT_CONFIG_PARAMETERS",
    "GIT_CONFIG_COUNT",
    "GIT_CONFIG",
    "GIT_CONFIG_GLOBAL",
    "GIT_CONFIG_SYSTEM",
];

/// A `git ... push ...` invocation broken into the parts we care about.
#[derive(Debug, Default, PartialEq, Eq)]
struct PushArgs {
    /// `-C <dir>` options, in order.
    dirs: Vec<String>,
    /// `--git-dir` value.
    git_dir: Option<String>,
    /// `--work-tree` value.
    work_tree: Option<String>,
    /// Keys overridden with `-c key=value` or `--config-env key=VAR`.
    config_keys: Vec<String>,
    /// Value of `--repo`.
    repo: Option<String>,
    /// Non-flag arguments after `push`.
    positional: Vec<String>,
}

impl PushArgs {
    /// Parse the words after `git`. `None` if the subcommand isn't `push`.
    fn parse(args: &[String]) -> Option<Self> {
        let mut parsed = PushArgs::default();
        let mut iter = args.iter();

        // Global options up to the subcommand
        loop {
            let word = iter.next()?;
            let (flag, inline) = match word.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
                _ => (word.as_str(), None),
            };
            if GIT_VALUE_OPTIONS.contains(&flag) {
                let value = match inline {
                    Some(v) => v.to_string(),
                    None => iter.next()?.clone(),
                };
                match flag {
                    "-C" => parsed.dirs.push(value),
                    "--git-dir" => parsed.git_dir = Some(value),
                    "--work-tree" => parsed.work_tree = Some(value),
                    "-c" | "--config-env" => {
                        let key = value.split_once('=').map_or(value.as_str(), |(k, _)| k);
                        parsed.config_keys.push(key.to_string());
                    }
                    _ => {}
                }
            } else if let Some(dir) = word.strip_prefix("-C")
                && !dir.is_empty()
            {
                parsed.dirs.push(dir.to_string());
            } else if word.starts_with('-') {
                continue;
            } else if word == "push" {
                break;
            } else {
                return None;
            }
        }

        let mut end_of_options = false;
        while let Some(word) = iter.next() {
            if end_of_options || !word.starts_with('-') {
                parsed.positional.push(word.clone());
            } else if word == "--" {
                end_of_options = true;
            } else if let Some(repo) = word.strip_prefix("--repo=") {
                parsed.repo = Some(repo.to_string());
            } else if PUSH_VALUE_FLAGS.contains(&word.as_str()) {
                let value = iter.next();
                if word == "--repo" {
                    parsed.repo = value.cloned();
                }
            }
        }
        Some(parsed)
    }

    /// The explicit destination: `--repo`, else the first positional.
    fn candidate(&self) -> Option<&String> {
        self.repo.as_ref().or(self.positional.first())
    }
}

/// Whether overriding a config key can change where a push goes.
fn redirects_push(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("remote.")
        || key.starts_with("url.")
        || key.starts_with("include")
        || (key.starts_with("branch.") && (key.ends_with(".remote") || key.ends_with(".pushremote")))
}

/// Whether the global options define an alias that expands to a push
/// (`git -c alias.p=push p`).
fn push_alias(args: &[String]) -> bool {
    args.windows(2).any(|pair| {
        pair[0] == "-c"
            && pair[1]
                .split_once('=')
                .is_some_and(|(key, value)| {
                    key.to_ascii_lowercase().starts_with("alias.") && parse::contains_word(value, "push")
                })
    })
}

/// Guards `git push` against remotes the user doesn't own.
pub struct PushGuard;

impl PushGuard {
    /// Remote a bare `git push` would use, following git's precedence:
    /// `branch.<b>.pushRemote`, `remote.pushDefault`, `branch.<b>.remote`,
    /// then `origin`.
    fn default_remote(remotes: &dyn RemoteSource, dir: &Path) -> GitResult<String> {
        let branch = remotes.current_branch(dir)?;
        if let Some(b) = &branch
            && let Some(r) = remotes.config_value(dir, &format!("branch.{b}.pushRemote"))?
        {
            return Ok(r);
        }
        if let Some(r) = remotes.config_value(dir, "remote.pushDefault")? {
            return Ok(r);
        }
        if let Some(b) = &branch
            && let Some(r) = remotes.config_value(dir, &format!("branch.{b}.remote"))?
        {
            return Ok(r);
        }
        Ok("origin".to_string())
    }

    /// Directory whose remotes the push reads: the working directory with
    /// `-C` folded on, then `--git-dir` (or `GIT_DIR`) if given.
    fn repo_dir(
        args: &PushArgs,
        inv: &CommandContext,
        ctx: &ResolveContext<'_>,
    ) -> Result<PathBuf, Resolution> {
        let base = ctx.dir()?;
        let dir = args
            .dirs
            .iter()
            .fold(base.to_path_buf(), |dir, next| parse::resolve_path(&dir, next));
        let git_dir = args.git_dir.as_deref().or(inv.env("GIT_DIR"));
        let work_tree = args.work_tree.as_deref().or(inv.env("GIT_WORK_TREE"));
        match (git_dir, work_tree) {
            (Some(git_dir), _) => Ok(parse::resolve_path(&dir, git_dir)),
            (None, Some(tree)) => Err(Resolution::Unresolvable(format!(
                "work tree {tree} is set without a git directory"
            ))),
            (None, None) => Ok(dir),
        }
    }

    fn resolve_in(dir: &Path, args: &PushArgs, ctx: &ResolveContext<'_>) -> Resolution {
        if let Some(candidate) = args.candidate() {
            match ctx.remotes.remote_url(dir, candidate, true) {
                Ok(Some(url)) => {
                    return resolve_url(&url, format!("remote '{candidate}'"), ctx.policy);
                }
                Ok(None) if args.repo.is_some() => {
                    return Resolution::Unresolvable(format!(
                        "--repo {candidate} is neither a configured remote nor a URL"
                    ));
                }
                // Not a remote name: a refspec, so fall through to the default remote
                Ok(None) => {}
                Err(e) => return Resolution::Unresolvable(e.to_string()),
            }
        }

        let remote = match Self::default_remote(ctx.remotes, dir) {
            Ok(r) => r,
            Err(e) => return Resolution::Unresolvable(e.to_string()),
        };
        match ctx.remotes.remote_url(dir, &remote, true) {
            Ok(Some(url)) => resolve_url(&url, format!("tracking remote '{remote}'"), ctx.policy),
            Ok(None) => Resolution::Unresolvable(format!(
                "the branch pushes to remote '{remote}', which has no URL in {}",
                dir.display()
            )),
            Err(e) => Resolution::Unresolvable(e.to_string()),
        }
    }
}

impl GuardEvaluator for PushGuard {
    fn verb(&self) -> &'static str {
        PUSH_VERB
    }

    fn looks_relevant(&self, command: &str) -> bool {
        command.contains(PUSH_VERB)
            || (parse::contains_word(command, "git") && parse::contains_word(command, "push"))
    }

    fn too_complex(&self, command: &str) -> bool {
        parse::has_loop(command) || parse::count_literal(command, PUSH_VERB) > 1
    }

    fn classify(&self, pipeline: &ParsedPipeline) -> Vec<Invocation> {
        pipeline
            .segments
            .iter()
            .enumerate()
            .filter_map(|(index, seg)| {
                let ctx = CommandContext::from_command(&seg.command);
                let is_git = ctx.base_command == "git";
                let kind = if is_git && PushArgs::parse(ctx.args()).is_some() {
                    InvocationKind::Guarded(PUSH_VERB.into())
                } else if is_git && push_alias(ctx.args()) {
                    InvocationKind::Indirect {
                        label: PUSH_VERB.into(),
                        via: "an alias set on the command line".into(),
                    }
                } else {
                    indirect_use(&ctx, "git", |rest| {
                        PushArgs::parse(rest).map(|_| PUSH_VERB.to_string())
                    })?
                };
                Some(Invocation { index, ctx, kind })
            })
            .collect()
    }

    fn resolve(&self, invocation: &Invocation, ctx: &ResolveContext<'_>) -> Resolution {
        let inv = &invocation.ctx;
        let Some(args) = PushArgs::parse(inv.args()) else {
            return Resolution::Unresolvable("not a git push".into());
        };
        if let Some(key) = args.config_keys.iter().find(|k| redirects_push(k)) {
            return Resolution::Unresolvable(format!(
                "the command overrides {key}, which can redirect the push"
            ));
        }
        let injected = inv
            .env_vars
            .iter()
            .find(|(k, _)| CONFIG_ENV_VARS.contains(&k.as_str()));
        if let Some((var, _)) = injected {
            return Resolution::Unresolvable(format!("{var} injects git configuration"));
        }
        if let Some(url) = args.candidate().filter(|c| looks_like_url(c)) {
            return resolve_url(url, format!("URL {url}"), ctx.policy);
        }
        match Self::repo_dir(&args, inv, ctx) {
            Ok(dir) => Self::resolve_in(&dir, &args, ctx),
            Err(resolution) => resolution,
        }
    }

    fn unresolvable_hint(&self) -> &'static str {
        "Push with an explicit remote and branch instead, e.g. `git push origin <branch>`."
    }

    fn denied_hint(&self) -> &'static str {
        "Push to a remote you own (usually `origin` in a fork), or add the repository to allowed_repos if this is intended."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyConfig;
    use crate::git::{RemoteSet, StaticRemotes};
    use crate::repo::RepoRef;

    fn words(s: &str) -> Vec<String> {
        parse::tokenize(s)
    }

    fn fork() -> StaticRemotes {
        StaticRemotes::new().repo(
            "/work/fork",
            RemoteSet::new()
                .remote("origin", "git@github.com:me/fork.git")
                .remote("upstream", "https://github.com/them/parent.git")
                .remote("mirror", "https://gitlab.example.com/me/fork.git")
                .branch("feature")
                .tracking("feature", "upstream"),
        )
    }

    fn resolve(cmd: &str, remotes: &StaticRemotes) -> Resolution {
        let policy = PolicyConfig::new(&["me"]);
        let pipeline = parse::split_compound_command(cmd);
        let invocations = PushGuard.classify(&pipeline);
        assert_eq!(invocations.len(), 1, "expected one push in {cmd}");
        let ctx = ResolveContext {
            work_dir: parse::resolve_work_dir_at(&pipeline, invocations[0].index, Path::new("/work/fork")),
            policy: &policy,
            remotes,
        };
        PushGuard.resolve(&invocations[0], &ctx)
    }

    fn target(res: Resolution) -> RepoRef {
        match res {
            Resolution::Target { repo, .. } => repo,
            other => panic!("expected target, got {other:?}"),
        }
    }

    #[test]
    fn parse_plain_push() {
        assert_eq!(
            PushArgs::parse(&words("push origin main")),
            Some(PushArgs {
                positional: vec!["origin".into(), "main".into()],
                ..Default::default()
            })
        );
    }

    #[test]
    fn parse_skips_flags_and_values() {
        let args = PushArgs::parse(&words("push -u --force-with-lease -o ci.skip origin HEAD")).unwrap();
        assert_eq!(args.positional, vec!["origin", "HEAD"]);
    }

    #[test]
    fn parse_global_options() {
        let args = PushArgs::parse(&words("-C ../other -c push.default=current push")).unwrap();
        assert_eq!(args.dirs, vec!["../other"]);
        assert_eq!(args.config_keys, vec!["push.default"]);
        assert!(args.positional.is_empty());
    }

    #[test]
    fn parse_git_dir_forms() {
        assert_eq!(
            PushArgs::parse(&words("--git-dir /x/.git --work-tree=/x --config-env=remote.origin.url=U push")),
            Some(PushArgs {
                git_dir: Some("/x/.git".into()),
                work_tree: Some("/x".into()),
                config_keys: vec!["remote.origin.url".into()],
                ..Default::default()
            })
        );
    }

    #[test]
    fn redirecting_config_keys() {
        assert!(redirects_push("remote.pushDefault"));
        assert!(redirects_push("remote.origin.pushurl"));
        assert!(redirects_push("branch.feature.pushRemote"));
        assert!(redirects_push("branch.feature.remote"));
        assert!(redirects_push("url.git@github.com:them/.insteadOf"));
        assert!(redirects_push("includeIf.gitdir:/x/.path"));
        assert!(!redirects_push("push.default"));
        assert!(!redirects_push("branch.feature.merge"));
        assert!(!redirects_push("user.name"));
    }

    #[test]
    fn parse_repo_flag() {
        let args = PushArgs::parse(&words("push --repo=upstream main")).unwrap();
        assert_eq!(args.repo.as_deref(), Some("upstream"));
    }

    #[test]
    fn parse_other_subcommand() {
        assert_eq!(PushArgs::parse(&words("status")), None);
        assert_eq!(PushArgs::parse(&words("log --grep push")), None);
    }

    #[test]
    fn explicit_remote() {
        assert_eq!(target(resolve("git push origin feature", &fork())), RepoRef::new("me", "fork"));
        assert_eq!(
            target(resolve("git push upstream feature", &fork())),
            RepoRef::new("them", "parent")
        );
    }

    #[test]
    fn bare_push_uses_tracking_remote() {
        assert_eq!(target(resolve("git push", &fork())), RepoRef::new("them", "parent"));
    }

    #[test]
    fn refspec_first_falls_back_to_tracking() {
        assert_eq!(
            target(resolve("git push HEAD:refs/heads/x", &fork())),
            RepoRef::new("them", "parent")
        );
    }

    #[test]
    fn push_remote_overrides_tracking() {
        let remotes = StaticRemotes::new().repo(
            "/work/fork",
            RemoteSet::new()
                .remote("origin", "git@github.com:me/fork.git")
                .remote("upstream", "https://github.com/them/parent.git")
                .branch("feature")
                .tracking("feature", "upstream")
                .config("branch.feature.pushRemote", "origin"),
        );
        assert_eq!(target(resolve("git push", &remotes)), RepoRef::new("me", "fork"));
    }

    #[test]
    fn push_default_used_before_tracking() {
        let remotes = StaticRemotes::new().repo(
            "/work/fork",
            RemoteSet::new()
                .remote("origin", "git@github.com:me/fork.git")
                .remote("upstream", "https://github.com/them/parent.git")
                .branch("feature")
                .tracking("feature", "upstream")
                .config("remote.pushDefault", "origin"),
        );
        assert_eq!(target(resolve("git push", &remotes)), RepoRef::new("me", "fork"));
    }

    #[test]
    fn untracked_branch_defaults_to_origin() {
        let remotes = StaticRemotes::new().repo(
            "/work/fork",
            RemoteSet::new()
                .remote("origin", "git@github.com:me/fork.git")
                .branch("new-work"),
        );
        assert_eq!(target(resolve("git push", &remotes)), RepoRef::new("me", "fork"));
    }

    #[test]
    fn url_argument() {
        assert_eq!(
            target(resolve("git push https://github.com/them/other.git main", &fork())),
            RepoRef::new("them", "other")
        );
    }

    #[test]
    fn non_github_remote_not_applicable() {
        assert!(matches!(
            resolve("git push mirror feature", &fork()),
            Resolution::NotApplicable(_)
        ));
    }

    #[test]
    fn missing_origin_unresolvable() {
        let remotes = StaticRemotes::new().repo("/work/fork", RemoteSet::new().branch("main"));
        assert!(matches!(resolve("git push", &remotes), Resolution::Unresolvable(_)));
    }

    #[test]
    fn outside_repository_unresolvable() {
        assert!(matches!(
            resolve("cd /nowhere && git push", &fork()),
            Resolution::Unresolvable(_)
        ));
    }

    #[test]
    fn dash_c_changes_directory() {
        let remotes = fork().repo(
            "/work/mine",
            RemoteSet::new()
                .remote("origin", "git@github.com:me/mine.git")
                .branch("main"),
        );
        assert_eq!(
            target(resolve("git -C ../mine push", &remotes)),
            RepoRef::new("me", "mine")
        );
    }

    #[test]
    fn unknown_repo_flag_unresolvable() {
        assert!(matches!(
            resolve("git push --repo nosuch main", &fork()),
            Resolution::Unresolvable(_)
        ));
    }

    #[test]
    fn config_override_of_push_remote_unresolvable() {
        let res = resolve("git -c remote.pushDefault=upstream push", &fork());
        assert!(matches!(&res, Resolution::Unresolvable(why) if why.contains("remote.pushDefault")), "{res:?}");
        assert!(matches!(
            resolve("git -c url.https://github.com/them/.insteadOf=me: push", &fork()),
            Resolution::Unresolvable(_)
        ));
        assert!(matches!(
            resolve("git --config-env=branch.feature.pushRemote=R push", &fork()),
            Resolution::Unresolvable(_)
        ));
    }

    #[test]
    fn harmless_config_override_resolves() {
        assert_eq!(
            target(resolve("git -c push.default=current push", &fork())),
            RepoRef::new("them", "parent")
        );
    }

    #[test]
    fn config_env_vars_unresolvable() {
        assert!(matches!(
            resolve("GIT_CONFIG_COUNT=1 GIT_CONFIG_KEY_0=remote.pushDefault git push", &fork()),
            Resolution::Unresolvable(_)
        ));
    }

    fn with_theirs() -> StaticRemotes {
        fork().repo(
            "/work/theirs",
            RemoteSet::new()
                .remote("origin", "https://github.com/them/theirs.git")
                .branch("main"),
        )
    }

    #[test]
    fn git_dir_selects_repository() {
        assert_eq!(
            target(resolve("git --git-dir /work/theirs/.git push", &with_theirs())),
            RepoRef::new("them", "theirs")
        );
        assert_eq!(
            target(resolve("git --git-dir=../theirs/.git push origin main", &with_theirs())),
            RepoRef::new("them", "theirs")
        );
        assert_eq!(
            target(resolve("GIT_DIR=/work/theirs/.git git push", &with_theirs())),
            RepoRef::new("them", "theirs")
        );
    }

    #[test]
    fn git_dir_after_dash_c() {
        assert_eq!(
            target(resolve("git -C /work --git-dir theirs/.git push", &with_theirs())),
            RepoRef::new("them", "theirs")
        );
    }

    #[test]
    fn work_tree_alone_unresolvable() {
        assert!(matches!(
            resolve("git --work-tree /work/theirs push", &with_theirs()),
            Resolution::Unresolvable(_)
        ));
    }

    #[test]
    fn unknown_directory_unresolvable() {
        let res = resolve("cd - && git push", &fork());
        assert!(matches!(&res, Resolution::Unresolvable(why) if why.contains("previous directory")), "{res:?}");
    }

    #[test]
    fn url_needs_no_directory() {
        assert_eq!(
            target(resolve("cd $REPO && git push git@github.com:me/other.git", &fork())),
            RepoRef::new("me", "other")
        );
    }

    #[test]
    fn indirect_push_classified() {
        let pipeline = parse::split_compound_command("git status && xargs git push upstream");
        let kinds: Vec<_> = PushGuard.classify(&pipeline).into_iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![InvocationKind::Indirect {
                label: "git push".into(),
                via: "`xargs`".into()
            }]
        );
    }

    #[test]
    fn command_line_alias_classified() {
        let pipeline = parse::split_compound_command("git -c alias.p='push upstream' p");
        let kinds: Vec<_> = PushGuard.classify(&pipeline).into_iter().map(|i| i.kind).collect();
        assert!(matches!(kinds.as_slice(), [InvocationKind::Indirect { via, .. }] if via.contains("alias")));

        let pipeline = parse::split_compound_command("git -c alias.l=log l");
        assert!(PushGuard.classify(&pipeline).is_empty());
    }

    #[test]
    fn classify_ignores_other_git_commands() {
        let pipeline = parse::split_compound_command("git add . && git commit -m push && git status");
        assert!(PushGuard.classify(&pipeline).is_empty());
    }

    #[test]
    fn complexity() {
        assert!(PushGuard.too_complex("for b in a c; do git push origin $b; done"));
        assert!(PushGuard.too_complex("git push origin a && git push origin b"));
        assert!(!PushGuard.too_complex("git commit -m 'for clarity in tests' && git push"));
    }

    #[test]
    fn relevance() {
        assert!(PushGuard.looks_relevant("git push"));
        assert!(PushGuard.looks_relevant("git -C x push"));
        assert!(!PushGuard.looks_relevant("git status"));
        assert!(!PushGuard.looks_relevant("gh pr create"));
    }
}
