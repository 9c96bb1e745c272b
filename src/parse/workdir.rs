//! Effective working directory of a chained command.

use std::path::{Component, Path, PathBuf};

use super::tokenize::tokenize;
use super::types::ParsedPipeline;

/// Join `target` onto `base` and fold `.`/`..` lexically. `~` expands to
/// the home directory; `$VARS` are left as-is.
pub fn resolve_path(base: &Path, target: &str) -> PathBuf {
    let expanded = shellexpand::tilde(target);
    let joined = base.join(expanded.as_ref());
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Directory a command runs in, or why it can't be known statically.
pub type WorkDir = Result<PathBuf, String>;

/// What a directory-changing segment does.
enum DirChange {
    To(String),
    Unknown(String),
}

/// The effect of a `cd`/`pushd`/`popd` segment, or `None` for anything else.
fn dir_change(segment: &str) -> Option<DirChange> {
    let words = tokenize(segment);
    let verb = words.first()?.as_str();
    if verb == "popd" {
        return Some(DirChange::Unknown("`popd` returns to a directory-stack entry".into()));
    }
    if verb != "cd" && verb != "pushd" {
        return None;
    }
    let target = words[1..]
        .iter()
        .find(|w| w.as_str() == "-" || !w.starts_with('-'))
        .cloned()
        .unwrap_or_else(|| "~".to_string());
    if target == "-" {
        return Some(DirChange::Unknown(format!("`{verb} -` returns to the previous directory")));
    }
    if target.contains('$') || target.starts_with(['+', '=']) {
        return Some(DirChange::Unknown(format!("`{verb} {target}` depends on shell state")));
    }
    Some(DirChange::To(target))
}

/// Resolve the directory in effect for segment `index` of a pipeline by
/// folding every `cd` (or `pushd`) before it that runs in the current
/// shell onto `cwd`. A directory change that runs in a subshell (piped or
/// backgrounded) doesn't count.
pub fn resolve_work_dir_at(pipeline: &ParsedPipeline, index: usize, cwd: &Path) -> WorkDir {
    let segments = &pipeline.segments[..index.min(pipeline.segments.len())];
    let in_current_shell = |i: usize| {
        segments[i].starts_chain_step()
            && pipeline
                .segments
                .get(i + 1)
                .is_none_or(|next| next.starts_chain_step())
    };
    let mut dir = cwd.to_path_buf();
    for i in (0..segments.len()).filter(|&i| in_current_shell(i)) {
        match dir_change(&segments[i].command) {
            None => {}
            Some(DirChange::To(target)) => dir = resolve_path(&dir, &target),
            Some(DirChange::Unknown(why)) => return Err(why),
        }
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::split_compound_command;

    fn cwd() -> PathBuf {
        PathBuf::from("/work")
    }

    /// Directory in effect after the whole command.
    fn resolve_work_dir(command: &str, cwd: &Path) -> PathBuf {
        try_resolve(command, cwd).unwrap()
    }

    fn try_resolve(command: &str, cwd: &Path) -> WorkDir {
        let pipeline = split_compound_command(command);
        resolve_work_dir_at(&pipeline, pipeline.segments.len(), cwd)
    }

    #[test]
    fn no_cd_keeps_cwd() {
        assert_eq!(resolve_work_dir("git push", &cwd()), cwd());
    }

    #[test]
    fn absolute_cd() {
        assert_eq!(
            resolve_work_dir("cd /repos/fork && git push", &cwd()),
            PathBuf::from("/repos/fork")
        );
    }

    #[test]
    fn relative_cd() {
        assert_eq!(
            resolve_work_dir("cd ../other && git push", &cwd()),
            PathBuf::from("/other")
        );
        assert_eq!(
            resolve_work_dir("cd ./sub/dir; gh pr create", &cwd()),
            PathBuf::from("/work/sub/dir")
        );
    }

    #[test]
    fn quoted_cd_target() {
        assert_eq!(
            resolve_work_dir("cd \"/repos/my fork\" && git push", &cwd()),
            PathBuf::from("/repos/my fork")
        );
    }

    #[test]
    fn tilde_cd() {
        let expected = PathBuf::from(shellexpand::tilde("~/src/app").as_ref());
        assert_eq!(resolve_work_dir("cd ~/src/app && git push", &cwd()), expected);
    }

    #[test]
    fn last_cd_wins() {
        assert_eq!(
            resolve_work_dir("cd /a && make && cd /b && git push", &cwd()),
            PathBuf::from("/b")
        );
    }

    #[test]
    fn chained_relative_cds_fold() {
        assert_eq!(
            resolve_work_dir("cd /repos && cd fork && git push", &cwd()),
            PathBuf::from("/repos/fork")
        );
    }

    #[test]
    fn cd_after_pipe_ignored() {
        assert_eq!(resolve_work_dir("echo x | cd /elsewhere; git push", &cwd()), cwd());
    }

    #[test]
    fn subshell_cd() {
        assert_eq!(
            resolve_work_dir("(cd /repos/fork && git push)", &cwd()),
            PathBuf::from("/repos/fork")
        );
    }

    #[test]
    fn cd_with_flag() {
        assert_eq!(
            resolve_work_dir("cd -P /repos/fork && git push", &cwd()),
            PathBuf::from("/repos/fork")
        );
    }

    #[test]
    fn cd_only_before_index() {
        let p = split_compound_command("git push && cd /b");
        assert_eq!(resolve_work_dir_at(&p, 0, &cwd()), Ok(cwd()));
    }

    #[test]
    fn cd_dash_is_unknown() {
        let err = try_resolve("cd /a && cd - && git push", &cwd()).unwrap_err();
        assert!(err.contains("previous directory"), "{err}");
    }

    #[test]
    fn cd_variable_is_unknown() {
        assert!(try_resolve("cd $REPO && git push", &cwd()).is_err());
    }

    #[test]
    fn pushd_and_popd() {
        assert_eq!(
            resolve_work_dir("pushd /repos/fork && git push", &cwd()),
            PathBuf::from("/repos/fork")
        );
        assert!(try_resolve("pushd /a && popd && git push", &cwd()).is_err());
    }

    #[test]
    fn piped_or_backgrounded_cd_ignored() {
        assert_eq!(resolve_work_dir("cd /elsewhere | cat; git push", &cwd()), cwd());
        assert_eq!(resolve_work_dir("cd /elsewhere & git push", &cwd()), cwd());
    }

    #[test]
    fn piped_cd_in_group_ignored() {
        assert_eq!(
            resolve_work_dir("cd /a && (cd - | cat) ; git push", &cwd()),
            PathBuf::from("/a")
        );
    }
}
