use super::KvStore;
use anyhow::Result;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File-backed [`KvStore`] for running the hook outside a host: one file
/// per key under a data directory. The trait surface is infallible, so I/O
/// errors are logged and reported as absence.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Keys become file names; anything outside `[A-Za-z0-9._-]` is
    /// replaced so keys cannot escape the data directory.
    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KvStore for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                log::warn!("failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write(&self, value: Option<&str>, key: &str) {
        let path = self.path_for(key);
        let result = match value {
            Some(v) => fs::write(&path, v),
            None => match fs::remove_file(&path) {
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };
        if let Err(e) = result {
            log::warn!("failed to write {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn read_write_clear_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();

        assert_eq!(store.read("missing"), None);

        store.write(Some("{\"a\":1}"), "some_key");
        assert_eq!(store.read("some_key").as_deref(), Some("{\"a\":1}"));

        store.write(None, "some_key");
        assert_eq!(store.read("some_key"), None);
        // Clearing an already-absent key is not an error.
        store.write(None, "some_key");
    }

    #[test]
    fn hostile_key_stays_inside_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();

        store.write(Some("x"), "../escape/attempt");
        let path = store.path_for("../escape/attempt");
        assert!(path.starts_with(temp_dir.path()));
        assert_eq!(store.read("../escape/attempt").as_deref(), Some("x"));
    }

    #[test]
    fn survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FileStore::new(temp_dir.path()).unwrap();
            store.write(Some("persisted"), "k");
        }
        let store = FileStore::new(temp_dir.path()).unwrap();
        assert_eq!(store.read("k").as_deref(), Some("persisted"));
    }
}
