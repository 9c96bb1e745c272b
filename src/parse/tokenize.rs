/// A launcher that runs its arguments as a command.
struct Wrapper {
    name: &'static str,
    /// Options that take a separate value.
    value_flags: &'static [&'static str],
    /// Options that change what the wrapped command sees (its directory,
    /// its argv). Skipping stops there, so the real command is not found
    /// in command position.
    stop_flags: &'static [&'static str],
    /// Operands before the command (`timeout DURATION cmd`).
    operands: usize,
}

const WRAPPERS: &[Wrapper] = &[
    Wrapper { name: "command", value_flags: &[], stop_flags: &[], operands: 0 },
    Wrapper { name: "builtin", value_flags: &[], stop_flags: &[], operands: 0 },
    Wrapper { name: "nohup", value_flags: &[], stop_flags: &[], operands: 0 },
    Wrapper { name: "exec", value_flags: &["-a"], stop_flags: &[], operands: 0 },
    Wrapper { name: "time", value_flags: &["-f", "-o", "--format", "--output"], stop_flags: &[], operands: 0 },
    Wrapper { name: "nice", value_flags: &["-n", "--adjustment"], stop_flags: &[], operands: 0 },
    Wrapper { name: "stdbuf", value_flags: &["-i", "-o", "-e"], stop_flags: &[], operands: 0 },
    Wrapper {
        name: "timeout",
        value_flags: &["-s", "-k", "--signal", "--kill-after"],
        stop_flags: &[],
        operands: 1,
    },
    Wrapper {
        name: "env",
        value_flags: &["-u", "--unset"],
        stop_flags: &["-C", "--chdir", "-S", "--split-string"],
        operands: 0,
    },
    Wrapper {
        name: "sudo",
        value_flags: &["-u", "-g", "-h", "-p", "-r", "-t", "-U", "-T", "-C", "--user", "--group"],
        stop_flags: &["-D", "--chdir", "-i", "-s", "--login", "--shell"],
        operands: 0,
    },
    Wrapper {
        name: "doas",
        value_flags: &["-u", "-C"],
        stop_flags: &["-s"],
        operands: 0,
    },
];

/// Shell reserved words that can precede a command in the same segment.
const SHELL_KEYWORDS: &[&str] = &["if", "then", "else", "elif", "do", "!"];

/// Tokenize a command segment into words using shlex (POSIX word splitting).
///
/// Grouping characters hugging the segment (`(cd repo`, `git push)`) are
/// trimmed first so subshell-wrapped commands tokenize normally.
pub fn tokenize(command: &str) -> Vec<String> {
    let trimmed = command
        .trim()
        .trim_start_matches(['(', '{', ' '])
        .trim_end_matches([')', '}', ' ']);
    shlex::split(trimmed).unwrap_or_else(|| {
        // Fallback: simple whitespace splitting if shlex can't parse
        trimmed.split_whitespace().map(String::from).collect()
    })
}

/// Whether a word is a `KEY=value` shell assignment.
pub fn is_env_assignment(word: &str) -> bool {
    let Some((key, _)) = word.split_once('=') else {
        return false;
    };
    !key.is_empty()
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && key
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

/// Skip a wrapper's options and operands starting at `idx` (just past
/// its name). Returns `None` when a stop flag is hit.
fn skip_wrapper(wrapper: &Wrapper, words: &[String], mut idx: usize) -> Option<usize> {
    while let Some(word) = words.get(idx) {
        let flag = word.split_once('=').map_or(word.as_str(), |(f, _)| f);
        if word == "--" {
            idx += 1;
            break;
        }
        if !word.starts_with('-') || word == "-" {
            break;
        }
        let stops = wrapper
            .stop_flags
            .iter()
            .any(|s| flag == *s || (s.len() == 2 && flag.starts_with(s)));
        if stops {
            return None;
        }
        idx += if wrapper.value_flags.contains(&flag) && !word.contains('=') { 2 } else { 1 };
    }
    Some(idx + wrapper.operands)
}

/// Split leading `KEY=value` assignments, shell keywords and launcher
/// wrappers (with their options) off a word list. Returns the assignments
/// and the index of the real command word.
///
/// When a wrapper option changes the wrapped command's context
/// (`env -C dir`, `sudo -D dir`), the returned index points at the
/// wrapper itself, so the wrapped command is not mistaken for a plain
/// invocation.
pub fn split_env_prefix(words: &[String]) -> (Vec<(String, String)>, usize) {
    let mut env = Vec::new();
    let mut idx = 0;
    while let Some(word) = words.get(idx) {
        if is_env_assignment(word) {
            if let Some((k, v)) = word.split_once('=') {
                env.push((k.to_string(), v.to_string()));
            }
            idx += 1;
        } else if SHELL_KEYWORDS.contains(&word.as_str()) {
            idx += 1;
        } else if let Some(wrapper) = WRAPPERS.iter().find(|w| w.name == word) {
            match skip_wrapper(wrapper, words, idx + 1) {
                Some(next) => idx = next,
                None => return (env, idx),
            }
        } else {
            break;
        }
    }
    (env, idx)
}

/// Basename of a command word: `/usr/bin/git` → `git`.
pub fn base_name(word: &str) -> &str {
    match word.rsplit_once('/') {
        Some((_, name)) if !name.is_empty() => name,
        _ => word,
    }
}

/// Whether `needle` appears in `haystack` as a standalone word
/// (bounded by start/end, whitespace, or shell punctuation).
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    let is_boundary = |c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    haystack.match_indices(needle).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        before.is_none_or(|c| is_boundary(c) || c == '/') && after.is_none_or(is_boundary)
    })
}
