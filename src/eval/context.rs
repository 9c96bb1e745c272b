use crate::parse::{base_name, split_env_prefix, tokenize};

/// Shells whose `-c` operand is a command line of its own.
const SHELLS: &[&str] = &["sh", "bash", "zsh", "dash", "ksh"];

/// Shell options that take a separate value.
const SHELL_VALUE_OPTIONS: &[&str] = &["-o", "+o", "-O", "+O"];

/// A single command segment, tokenized.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// The base command name (e.g. "git", "gh").
    pub base_command: String,
    /// All words in the command (tokenized via shlex).
    pub words: Vec<String>,
    /// Leading KEY=VALUE environment variable assignments.
    pub env_vars: Vec<(String, String)>,
    /// Index of the command word in `words`.
    command_index: usize,
}

impl CommandContext {
    /// Build a CommandContext from a raw command string.
    pub fn from_command(raw: &str) -> Self {
        let words = tokenize(raw);
        let (env_vars, command_index) = split_env_prefix(&words);
        let base_command = words
            .get(command_index)
            .map(|w| base_name(w).to_string())
            .unwrap_or_default();

        Self {
            base_command,
            words,
            env_vars,
            command_index,
        }
    }

    /// Value of a leading env var assignment.
    pub fn env(&self, key: &str) -> Option<&str> {
        self.env_vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Words after the env prefix and the base command.
    pub fn args(&self) -> &[String] {
        self.words.get(self.command_index + 1..).unwrap_or(&[])
    }

    /// Words from the command word on.
    pub fn command_words(&self) -> &[String] {
        self.words.get(self.command_index..).unwrap_or(&[])
    }

    /// Command text this segment hands to a shell: the operand of
    /// `bash -c`/`sh -c` (anywhere in the segment, so `xargs sh -c` counts)
    /// or the arguments of `eval`.
    pub fn inline_script(&self) -> Option<String> {
        if self.base_command == "eval" {
            let args = self.args();
            return (!args.is_empty()).then(|| args.join(" "));
        }
        let words = self.command_words();
        let shell = words.iter().position(|w| SHELLS.contains(&base_name(w)))?;

        let mut has_c = false;
        let mut iter = words[shell + 1..].iter();
        while let Some(word) = iter.next() {
            if SHELL_VALUE_OPTIONS.contains(&word.as_str()) {
                iter.next();
            } else if let Some(flags) = word.strip_prefix('-').filter(|f| !f.starts_with('-')) {
                has_c |= flags.contains('c');
            } else if !word.starts_with("--") && !word.starts_with('+') {
                return has_c.then(|| word.clone());
            }
        }
        None
    }
}
