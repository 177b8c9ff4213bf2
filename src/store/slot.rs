//! Single-slot key-value storage for saved matches

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::save::LoadError;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Save slot I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Save data is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Save data is corrupt: {0}")]
    Corrupt(#[from] LoadError),
}

/// One storage slot, overwritten on every save
pub trait SaveSlot {
    fn write(&mut self, contents: &str) -> Result<(), StoreError>;

    /// `None` when nothing has been saved yet
    fn read(&self) -> Result<Option<String>, StoreError>;
}

/// Slot backed by a JSON file on disk
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveSlot for FileSlot {
    fn write(&mut self, contents: &str) -> Result<(), StoreError> {
        // replace atomically
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory slot
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    contents: Option<String>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveSlot for MemorySlot {
    fn write(&mut self, contents: &str) -> Result<(), StoreError> {
        self.contents = Some(contents.to_string());
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.contents.clone())
    }
}
