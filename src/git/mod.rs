//! Read-only git metadata queries against a working directory.
//!
//! Guards never shell out directly; they go through [`RemoteSource`] so
//! evaluation stays a function of its inputs. [`GitCli`] is the real
//! implementation, [`StaticRemotes`] an in-memory one for tests and
//! embedding.

mod cli;
mod fixture;

pub use cli::GitCli;
pub use fixture::{RemoteSet, StaticRemotes};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from git metadata queries.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("git {0} timed out after {1}ms")]
    Timeout(String, u128),

    #[error("git command failed: {0}")]
    CommandFailed(String),

    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),
}

pub type GitResult<T> = Result<T, GitError>;

/// The git facts the guards need. Missing remotes, detached HEADs and
/// unset keys are `Ok(None)`; only real failures are errors.
pub trait RemoteSource {
    /// URL of `remote` in `dir`; the push URL when `push` is set.
    fn remote_url(&self, dir: &Path, remote: &str, push: bool) -> GitResult<Option<String>>;

    /// Short name of the checked-out branch, `None` when HEAD is detached.
    fn current_branch(&self, dir: &Path) -> GitResult<Option<String>>;

    /// Value of a git config key as seen from `dir`.
    fn config_value(&self, dir: &Path, key: &str) -> GitResult<Option<String>>;

    /// Root of the work tree containing `dir`.
    fn toplevel(&self, dir: &Path) -> GitResult<PathBuf>;
}
