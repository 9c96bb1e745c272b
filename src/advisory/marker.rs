use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

/// Small per-repository state files, named by a hash of their key parts.
#[derive(Debug, Clone)]
pub struct MarkerStore {
    dir: PathBuf,
}

impl MarkerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.local/state/cc-forkguard/markers`.
    pub fn default_location() -> Option<Self> {
        let home = std::env::var_os("HOME")?;
        Some(Self::new(
            Path::new(&home).join(".local/state/cc-forkguard/markers"),
        ))
    }

    /// Hex SHA-256 of the parts, NUL-separated.
    pub fn key(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                hasher.update([0u8]);
            }
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    fn path(&self, prefix: &str, key: &str) -> PathBuf {
        self.dir.join(format!("{prefix}-{key}"))
    }

    pub fn read(&self, prefix: &str, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path(prefix, key))
            .ok()
            .map(|s| s.trim().to_string())
    }

    pub fn write(&self, prefix: &str, key: &str, value: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(prefix, key), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn key_is_stable_and_separated() {
        assert_eq!(MarkerStore::key(&["a", "b"]), MarkerStore::key(&["a", "b"]));
        assert_ne!(MarkerStore::key(&["ab", ""]), MarkerStore::key(&["a", "b"]));
        assert_eq!(MarkerStore::key(&["x"]).len(), 64);
    }

    #[test]
    fn roundtrip_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let store = MarkerStore::new(tmp.path().join("nested/markers"));
        assert_eq!(store.read("idle", "k"), None);
        store.write("idle", "k", "123\n").unwrap();
        assert_eq!(store.read("idle", "k").as_deref(), Some("123"));
    }
}
