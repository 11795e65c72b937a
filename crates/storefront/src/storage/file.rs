//! JSON file write-through for a storage area.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::StorageError;

/// Whole-area snapshot file. Every committed write rewrites the file via a
/// temporary sibling and a rename.
#[derive(Debug)]
pub(super) struct FileBacking {
    path: PathBuf,
}

impl FileBacking {
    pub(super) const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }

    pub(super) fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                let aside = self.path.with_extension("corrupt");
                warn!(
                    error = %e,
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    "Storage file unreadable, starting empty"
                );
                std::fs::rename(&self.path, &aside)?;
                Ok(BTreeMap::new())
            }
        }
    }

    pub(super) fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backing = FileBacking::new(dir.path().join("absent.json"));
        assert!(backing.load().unwrap().is_empty());
    }

    #[test]
    fn test_persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let backing = FileBacking::new(dir.path().join("nested").join("store.json"));
        let mut entries = BTreeMap::new();
        entries.insert("a".to_string(), "[1]".to_string());
        backing.persist(&entries).unwrap();
        assert_eq!(backing.load().unwrap(), entries);
    }

    #[test]
    fn test_corrupt_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let backing = FileBacking::new(path.clone());
        assert!(backing.load().unwrap().is_empty());
        assert!(!path.exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("store.corrupt")).unwrap(),
            "{not json"
        );
    }
}
