use super::marker::MarkerStore;

const PREFIX: &str = "idle";

fn format_gap(secs: u64) -> String {
    let minutes = secs / 60;
    if minutes < 120 {
        format!("{minutes} minutes")
    } else {
        format!("{}h{:02}m", minutes / 60, minutes % 60)
    }
}

/// Record an edit at `now` (unix seconds) and nudge when the gap since the
/// previous edit in this repository is within `[min_secs, max_secs]`.
/// Longer gaps count as a fresh session and stay quiet.
pub fn idle_nudge(
    store: &MarkerStore,
    repo_root: &str,
    now: u64,
    min_secs: u64,
    max_secs: u64,
) -> Option<String> {
    let key = MarkerStore::key(&[repo_root]);
    let previous = store
        .read(PREFIX, &key)
        .and_then(|s| s.parse::<u64>().ok());
    if let Err(e) = store.write(PREFIX, &key, &now.to_string()) {
        log::warn!("could not record idle marker: {e}");
    }

    let gap = now.checked_sub(previous?)?;
    if gap < min_secs || gap > max_secs {
        return None;
    }
    Some(format!(
        "It has been {} since the last edit in {repo_root}. Check `git status` and \
         commit or stash earlier work before continuing.",
        format_gap(gap)
    ))
}
