pub mod shell;
pub mod structure;
pub mod tokenize;
pub mod types;
pub mod workdir;

pub use shell::{SUBST_PLACEHOLDER, extract_substitutions, split_compound_command, strip_quoted};
pub use structure::{count_literal, has_loop};
pub use tokenize::{base_name, contains_word, split_env_prefix, tokenize};
pub use types::{Operator, ParsedPipeline, ShellSegment};
pub use workdir::{WorkDir, resolve_path, resolve_work_dir_at};
