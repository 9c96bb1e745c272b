use super::types::{Operator, ParsedPipeline, ShellSegment};

/// Split a command at shell operators (&&, ||, ;, |, |&, &, newline),
/// respecting single/double quotes and backslash escapes. A `&` that is
/// part of a redirection (`2>&1`, `>&2`, `&>file`) is not an operator.
///
/// Empty segments (e.g. from a trailing `;`) are dropped; the operator
/// before a dropped segment carries over to the next real one.
pub fn split_compound_command(command: &str) -> ParsedPipeline {
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut pending: Option<Operator> = None;

    let chars: Vec<char> = command.chars().collect();
    let len = chars.len();
    let mut i = 0;
    let (mut sq, mut dq, mut esc) = (false, false, false);

    let mut flush = |buf: &mut String, pending: &mut Option<Operator>, next: Operator| {
        let trimmed = buf.trim();
        if !trimmed.is_empty() {
            segments.push(ShellSegment {
                command: trimmed.to_string(),
                preceded_by: pending.take(),
            });
            *pending = Some(next);
        } else if pending.is_some() {
            *pending = Some(next);
        }
        buf.clear();
    };

    while i < len {
        let c = chars[i];

        if esc {
            buf.push(c);
            esc = false;
            i += 1;
            continue;
        }
        if c == '\\' && !sq {
            esc = true;
            buf.push(c);
            i += 1;
            continue;
        }
        if c == '\'' && !dq {
            sq = !sq;
            buf.push(c);
            i += 1;
            continue;
        }
        if c == '"' && !sq {
            dq = !dq;
            buf.push(c);
            i += 1;
            continue;
        }
        if sq || dq {
            buf.push(c);
            i += 1;
            continue;
        }

        // Two-char operators
        if i + 1 < len {
            let op = match (c, chars[i + 1]) {
                ('&', '&') => Some(Operator::And),
                ('|', '|') => Some(Operator::Or),
                ('|', '&') => Some(Operator::PipeErr),
                _ => None,
            };
            if let Some(op) = op {
                flush(&mut buf, &mut pending, op);
                i += 2;
                continue;
            }
        }

        // Single-char operators
        let op = match c {
            '|' => Some(Operator::Pipe),
            ';' | '\n' => Some(Operator::Semi),
            '&' if !buf.ends_with(['>', '<']) && chars.get(i + 1) != Some(&'>') => {
                Some(Operator::Background)
            }
            _ => None,
        };
        if let Some(op) = op {
            flush(&mut buf, &mut pending, op);
            i += 1;
            continue;
        }

        buf.push(c);
        i += 1;
    }

    let tail = buf.trim();
    if !tail.is_empty() {
        segments.push(ShellSegment {
            command: tail.to_string(),
            preceded_by: pending,
        });
    }

    ParsedPipeline { segments }
}

/// Placeholder left in the outer command where a substitution was cut out.
pub const SUBST_PLACEHOLDER: &str = "__SUBST__";

/// Read a balanced `(...)` body starting just after the opening paren.
/// Returns the body and the index after the closing paren.
fn take_balanced(chars: &[char], mut i: usize) -> (String, usize) {
    let mut depth: u32 = 1;
    let mut inner = String::new();
    let (mut sq, mut dq, mut esc) = (false, false, false);
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if esc {
            esc = false;
        } else if c == '\\' && !sq {
            esc = true;
        } else if c == '\'' && !dq {
            sq = !sq;
        } else if c == '"' && !sq {
            dq = !dq;
        } else if !sq && !dq && c == '(' {
            depth += 1;
        } else if !sq && !dq && c == ')' {
            depth -= 1;
            if depth == 0 {
                break;
            }
        }
        inner.push(c);
    }
    (inner, i)
}

/// Cut command substitutions (`$(...)`, backticks) and process
/// substitutions (`<(...)`, `>(...)`) out of a command.
///
/// Returns the outer command with each one replaced by
/// [`SUBST_PLACEHOLDER`], plus the inner commands in placeholder order.
/// Nested substitutions stay inside their inner command and are found
/// when that command is evaluated in turn. Single quotes suppress
/// substitution; double quotes don't.
pub fn extract_substitutions(command: &str) -> (String, Vec<String>) {
    let chars: Vec<char> = command.chars().collect();
    let len = chars.len();
    let mut outer = String::new();
    let mut inners = Vec::new();
    let mut i = 0;
    let (mut sq, mut dq, mut esc) = (false, false, false);

    while i < len {
        let c = chars[i];

        if esc {
            outer.push(c);
            esc = false;
            i += 1;
            continue;
        }
        if c == '\\' && !sq {
            esc = true;
            outer.push(c);
            i += 1;
            continue;
        }
        if c == '\'' && !dq {
            sq = !sq;
        } else if c == '"' && !sq {
            dq = !dq;
        }
        if sq || c == '\'' || c == '"' {
            outer.push(c);
            i += 1;
            continue;
        }

        let next = chars.get(i + 1).copied();
        let inner = if c == '$' && next == Some('(') {
            let (inner, end) = take_balanced(&chars, i + 2);
            i = end;
            inner
        } else if (c == '<' || c == '>') && next == Some('(') && !dq {
            let (inner, end) = take_balanced(&chars, i + 2);
            i = end;
            inner
        } else if c == '`' {
            let mut inner = String::new();
            i += 1;
            while i < len && chars[i] != '`' {
                if chars[i] == '\\' && i + 1 < len {
                    inner.push(chars[i]);
                    i += 1;
                }
                inner.push(chars[i]);
                i += 1;
            }
            // closing backtick
            i += 1;
            inner
        } else {
            outer.push(c);
            i += 1;
            continue;
        };

        let trimmed = inner.trim();
        if !trimmed.is_empty() {
            inners.push(trimmed.to_string());
            outer.push_str(SUBST_PLACEHOLDER);
        }
    }

    (outer, inners)
}

/// Remove single- and double-quoted substrings, leaving the structural
/// skeleton of the command. Each quoted run becomes a single space so
/// surrounding words don't fuse together.
///
/// Unterminated quotes swallow the rest of the input.
pub fn strip_quoted(command: &str) -> String {
    let mut out = String::with_capacity(command.len());
    let mut chars = command.chars();
    let mut esc = false;

    while let Some(c) = chars.next() {
        if esc {
            out.push(c);
            esc = false;
            continue;
        }
        match c {
            '\\' => {
                esc = true;
                out.push(c);
            }
            '\'' => {
                for ic in chars.by_ref() {
                    if ic == '\'' {
                        break;
                    }
                }
                out.push(' ');
            }
            '"' => {
                let mut iesc = false;
                for ic in chars.by_ref() {
                    if iesc {
                        iesc = false;
                        continue;
                    }
                    if ic == '\\' {
                        iesc = true;
                        continue;
                    }
                    if ic == '"' {
                        break;
                    }
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}
