//! Cheap structural checks on raw command text: keyword pre-filtering and
//! loop detection on the quote-stripped skeleton.

use super::shell::strip_quoted;

/// Break a quote-stripped skeleton into words, keeping `;`, `&`, `|`, `(`
/// and `)` as single-character tokens. Newlines become `;`.
fn skeleton_tokens(skeleton: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in skeleton.chars() {
        match c {
            ';' | '\n' | '&' | '|' | '(' | ')' => {
                if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
                tokens.push(if c == '\n' { ";".into() } else { c.to_string() });
            }
            c if c.is_whitespace() => {
                if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
            }
            c => word.push(c),
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

fn is_name(word: &str) -> bool {
    !word.is_empty()
        && word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !word.starts_with(|c: char| c.is_ascii_digit())
}

/// Detect shell loop syntax outside quoted strings: `for NAME in`,
/// C-style `for ((`, or `while`/`until` followed later by `; do`.
pub fn has_loop(command: &str) -> bool {
    let tokens = skeleton_tokens(&strip_quoted(command));

    for (i, tok) in tokens.iter().enumerate() {
        match tok.as_str() {
            "for" => {
                let next = tokens.get(i + 1).map(String::as_str);
                let after = tokens.get(i + 2).map(String::as_str);
                if next == Some("(") {
                    return true;
                }
                if next.is_some_and(is_name) && after == Some("in") {
                    return true;
                }
            }
            "while" | "until" => {
                let rest = &tokens[i + 1..];
                if rest.windows(2).any(|w| w[0] == ";" && w[1] == "do") {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Count literal occurrences of `needle` in the unstripped command.
pub fn count_literal(command: &str, needle: &str) -> usize {
    command.matches(needle).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_loop() {
        assert!(has_loop("for dir in a b; do cd /tmp/$dir && git push; done"));
    }

    #[test]
    fn c_style_for() {
        assert!(has_loop("for ((i=0; i<3; i++)); do gh issue create; done"));
    }

    #[test]
    fn while_loop() {
        assert!(has_loop("while read r; do gh repo delete $r; done < repos.txt"));
    }

    #[test]
    fn while_loop_multiline() {
        assert!(has_loop("while true\ndo\n  git push\ndone"));
    }

    #[test]
    fn until_loop() {
        assert!(has_loop("until git push; do sleep 1; done"));
    }

    #[test]
    fn quoted_prose_ignored() {
        assert!(!has_loop(
            "git commit -m \"Refactored for clarity in the test suite\" && git push"
        ));
        assert!(!has_loop("gh pr create --title 'while we wait; do this'"));
    }

    #[test]
    fn bare_words_are_not_loops() {
        assert!(!has_loop("git push origin for-in-branch"));
        assert!(!has_loop("echo while"));
        assert!(!has_loop("gh issue create --label formatting"));
    }

    #[test]
    fn literal_count_includes_quotes() {
        assert_eq!(count_literal("git push", "git push"), 1);
        assert_eq!(
            count_literal("git commit -m 'before git push' && git push", "git push"),
            2
        );
    }
}
