use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{GitError, GitResult, RemoteSource};

/// The remotes and branch state of one repository.
#[derive(Debug, Clone, Default)]
pub struct RemoteSet {
    remotes: BTreeMap<String, String>,
    push_urls: BTreeMap<String, String>,
    branch: Option<String>,
    config: BTreeMap<String, String>,
}

impl RemoteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remote(mut self, name: &str, url: &str) -> Self {
        self.remotes.insert(name.into(), url.into());
        self
    }

    /// Separate push URL (`remote.<name>.pushurl`).
    pub fn push_url(mut self, name: &str, url: &str) -> Self {
        self.push_urls.insert(name.into(), url.into());
        self
    }

    pub fn branch(mut self, name: &str) -> Self {
        self.branch = Some(name.into());
        self
    }

    /// Set `branch.<branch>.remote`.
    pub fn tracking(self, branch: &str, remote: &str) -> Self {
        self.config(&format!("branch.{branch}.remote"), remote)
    }

    pub fn config(mut self, key: &str, value: &str) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// In-memory [`RemoteSource`]: a fixed map from repository root to its
/// [`RemoteSet`]. Subdirectories of a registered root resolve to it;
/// anything else is not a repository.
#[derive(Debug, Clone, Default)]
pub struct StaticRemotes {
    repos: BTreeMap<PathBuf, RemoteSet>,
}

impl StaticRemotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repo(mut self, root: impl Into<PathBuf>, remotes: RemoteSet) -> Self {
        self.repos.insert(root.into(), remotes);
        self
    }

    fn lookup(&self, dir: &Path) -> GitResult<(&Path, &RemoteSet)> {
        dir.ancestors()
            .find_map(|a| self.repos.get_key_value(a))
            .map(|(root, set)| (root.as_path(), set))
            .ok_or_else(|| GitError::NotARepository(dir.to_path_buf()))
    }
}

impl RemoteSource for StaticRemotes {
    fn remote_url(&self, dir: &Path, remote: &str, push: bool) -> GitResult<Option<String>> {
        let (_, set) = self.lookup(dir)?;
        let pushed = push.then(|| set.push_urls.get(remote)).flatten();
        Ok(pushed.or_else(|| set.remotes.get(remote)).cloned())
    }

    fn current_branch(&self, dir: &Path) -> GitResult<Option<String>> {
        Ok(self.lookup(dir)?.1.branch.clone())
    }

    fn config_value(&self, dir: &Path, key: &str) -> GitResult<Option<String>> {
        Ok(self.lookup(dir)?.1.config.get(key).cloned())
    }

    fn toplevel(&self, dir: &Path) -> GitResult<PathBuf> {
        Ok(self.lookup(dir)?.0.to_path_buf())
    }
}
