use super::marker::MarkerStore;

const PREFIX: &str = "branch";

/// Warn once per session when edits land on a protected branch.
/// Returns the advisory text the first time; `None` afterwards or on any
/// other branch.
pub fn branch_warning(
    store: &MarkerStore,
    repo_root: &str,
    session_id: &str,
    branch: Option<&str>,
    protected: &[String],
) -> Option<String> {
    let branch = branch?;
    if !protected.iter().any(|p| p == branch) {
        return None;
    }

    let key = MarkerStore::key(&[repo_root, session_id]);
    if store.read(PREFIX, &key).is_some() {
        return None;
    }
    if let Err(e) = store.write(PREFIX, &key, branch) {
        log::warn!("could not record branch warning marker: {e}");
    }

    Some(format!(
        "You are editing files directly on '{branch}' in {repo_root}. Consider creating a \
         feature branch (git switch -c <name>) before committing."
    ))
}
