//! Post-edit advisories. These never block; they only return text for
//! the host to show alongside the edit.

pub mod branch;
pub mod idle;
pub mod marker;

pub use branch::branch_warning;
pub use idle::idle_nudge;
pub use marker::MarkerStore;

use std::path::Path;

use crate::config::AdvisoryConfig;
use crate::git::RemoteSource;

/// Run every advisory for an edit made from `cwd` at `now` (unix seconds).
/// Directories outside a git repository produce nothing.
pub fn run(
    config: &AdvisoryConfig,
    cwd: &Path,
    session_id: &str,
    remotes: &dyn RemoteSource,
    store: &MarkerStore,
    now: u64,
) -> Vec<String> {
    let root = match remotes.toplevel(cwd) {
        Ok(root) => root,
        Err(e) => {
            log::debug!("advisories skipped for {}: {e}", cwd.display());
            return Vec::new();
        }
    };
    let root = root.to_string_lossy();
    let branch = remotes.current_branch(cwd).ok().flatten();

    let mut out = Vec::new();
    out.extend(branch_warning(
        store,
        &root,
        session_id,
        branch.as_deref(),
        &config.protected_branches,
    ));
    out.extend(idle_nudge(
        store,
        &root,
        now,
        config.idle_min_secs,
        config.idle_max_secs,
    ));
    out
}
