use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde_json::Value;
use unify_ox_common::ChatCompletion;

use crate::UnifyError;

/// File-backed map from request payload to the completion it produced.
///
/// Every operation reads the file, so several clients pointed at the same
/// path see each other's entries. There is no eviction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCache {
    path: PathBuf,
}

impl ResponseCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<ChatCompletion>, UnifyError> {
        let Some(entry) = self.load()?.remove(key) else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(entry)?))
    }

    pub fn put(&self, key: &str, completion: &ChatCompletion) -> Result<(), UnifyError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), serde_json::to_value(completion)?);
        fs::write(&self.path, serde_json::to_vec_pretty(&entries)?)?;
        Ok(())
    }

    /// Drop every entry by removing the backing file.
    pub fn clear(&self) -> Result<(), UnifyError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, Value>, UnifyError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                UnifyError::Value(format!("corrupt cache file {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}
