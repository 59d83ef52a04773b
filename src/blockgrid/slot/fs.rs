use super::SlotBackend;
use crate::error::{BlockError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct FsSlot {
    root: PathBuf,
}

impl FsSlot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(BlockError::Io)?;
        }
        Ok(())
    }
}

impl SlotBackend for FsSlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| {
            BlockError::PersistenceUnavailable(format!("{}: {}", path.display(), e))
        })?;
        Ok(Some(content))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_dir()
            .map_err(|e| BlockError::PersistenceUnavailable(e.to_string()))?;

        let target = self.slot_path(key);
        let tmp = self.root.join(format!(".{}-{}.tmp", key, Uuid::new_v4()));
        fs::write(&tmp, value)
            .and_then(|_| fs::rename(&tmp, &target))
            .map_err(|e| {
                let _ = fs::remove_file(&tmp);
                BlockError::PersistenceUnavailable(format!("{}: {}", target.display(), e))
            })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.slot_path(key);
        if path.exists() {
            fs::remove_file(path).map_err(BlockError::Io)?;
        }
        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        self.slot_path(key).display().to_string()
    }
}
