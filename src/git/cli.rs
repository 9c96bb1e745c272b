use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use super::{GitError, GitResult, RemoteSource};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Output of a finished git invocation.
struct GitOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl GitOutput {
    fn first_line(&self) -> Option<String> {
        self.stdout
            .lines()
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }
}

/// Queries git metadata by running the `git` binary with a hard timeout.
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Duration,
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn run(&self, dir: &Path, args: &[&str]) -> GitResult<GitOutput> {
        let mut child = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                log::warn!("git {} in {} timed out", args.join(" "), dir.display());
                return Err(GitError::Timeout(args.join(" "), self.timeout.as_millis()));
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout)?;
        }
        if let Some(mut err) = child.stderr.take() {
            err.read_to_string(&mut stderr)?;
        }
        log::debug!("git {} in {} -> {status}", args.join(" "), dir.display());

        Ok(GitOutput {
            status,
            stdout,
            stderr,
        })
    }

    /// Map a non-zero exit into an error, recognising "not a repository".
    fn failure(dir: &Path, out: &GitOutput) -> GitError {
        let stderr = out.stderr.to_ascii_lowercase();
        if stderr.contains("not a git repository") || stderr.contains("cannot change to") {
            GitError::NotARepository(dir.to_path_buf())
        } else {
            GitError::CommandFailed(out.stderr.trim().to_string())
        }
    }

    /// Read a one-line answer, treating `missing_codes` as "not set" rather than failure.
    fn missing(dir: &Path, out: GitOutput, missing_codes: &[i32]) -> GitResult<Option<String>> {
        if out.status.success() {
            return Ok(out.first_line());
        }
        let lower = out.stderr.to_ascii_lowercase();
        let not_repo = lower.contains("not a git repository") || lower.contains("cannot change to");
        match out.status.code() {
            Some(code) if missing_codes.contains(&code) && !not_repo => Ok(None),
            _ => Err(Self::failure(dir, &out)),
        }
    }
}

impl RemoteSource for GitCli {
    fn remote_url(&self, dir: &Path, remote: &str, push: bool) -> GitResult<Option<String>> {
        let mut args = vec!["remote", "get-url"];
        if push {
            args.push("--push");
        }
        args.push(remote);
        let out = self.run(dir, &args)?;
        if !out.status.success() && out.stderr.to_ascii_lowercase().contains("no such remote") {
            return Ok(None);
        }
        Self::missing(dir, out, &[2])
    }

    fn current_branch(&self, dir: &Path) -> GitResult<Option<String>> {
        let out = self.run(dir, &["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        Self::missing(dir, out, &[1])
    }

    fn config_value(&self, dir: &Path, key: &str) -> GitResult<Option<String>> {
        let out = self.run(dir, &["config", "--get", key])?;
        Self::missing(dir, out, &[1])
    }

    fn toplevel(&self, dir: &Path) -> GitResult<PathBuf> {
        let out = self.run(dir, &["rev-parse", "--show-toplevel"])?;
        if !out.status.success() {
            return Err(Self::failure(dir, &out));
        }
        out.first_line()
            .map(PathBuf::from)
            .ok_or_else(|| GitError::CommandFailed("empty rev-parse output".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    fn create_test_repo() -> TempDir {
        let tmp = TempDir::new().unwrap();
        git(tmp.path(), &["init", "-q", "-b", "feature"]);
        git(tmp.path(), &["remote", "add", "origin", "git@github.com:me/fork.git"]);
        git(tmp.path(), &["remote", "add", "upstream", "https://github.com/them/parent.git"]);
        git(tmp.path(), &["config", "branch.feature.remote", "upstream"]);
        tmp
    }

    fn cli() -> GitCli {
        GitCli::new(Duration::from_secs(10))
    }

    #[test]
    fn reads_remote_urls() {
        let repo = create_test_repo();
        assert_eq!(
            cli().remote_url(repo.path(), "origin", true).unwrap().as_deref(),
            Some("git@github.com:me/fork.git")
        );
        assert_eq!(
            cli().remote_url(repo.path(), "upstream", false).unwrap().as_deref(),
            Some("https://github.com/them/parent.git")
        );
    }

    #[test]
    fn missing_remote_is_none() {
        let repo = create_test_repo();
        assert!(cli().remote_url(repo.path(), "nope", true).unwrap().is_none());
    }

    #[test]
    fn branch_and_tracking_config() {
        let repo = create_test_repo();
        assert_eq!(
            cli().current_branch(repo.path()).unwrap().as_deref(),
            Some("feature")
        );
        assert_eq!(
            cli()
                .config_value(repo.path(), "branch.feature.remote")
                .unwrap()
                .as_deref(),
            Some("upstream")
        );
        assert!(
            cli()
                .config_value(repo.path(), "branch.feature.pushRemote")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn not_a_repository() {
        let tmp = TempDir::new().unwrap();
        let err = cli().remote_url(tmp.path(), "origin", true).unwrap_err();
        assert!(matches!(err, GitError::NotARepository(_)), "{err}");
    }

    #[test]
    fn toplevel_of_subdirectory() {
        let repo = create_test_repo();
        let sub = repo.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let top = cli().toplevel(&sub).unwrap();
        assert_eq!(
            top.canonicalize().unwrap(),
            repo.path().canonicalize().unwrap()
        );
    }
}
