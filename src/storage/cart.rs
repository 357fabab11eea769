//! Shopper-local cart persistence.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use crate::domain::aggregates::CartState;
use super::StorageError;

/// Durable storage for one shopper profile's cart.
///
/// Reads and writes are synchronous and always move the whole state.
pub trait CartStorage: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet; `Err` when the stored
    /// data cannot be read or parsed.
    fn read_cart(&self) -> Result<Option<CartState>, StorageError>;
    fn write_cart(&self, state: &CartState) -> Result<(), StorageError>;
}

/// One JSON file per shopper profile.
#[derive(Clone, Debug)]
pub struct JsonFileCartStorage {
    path: PathBuf,
}

impl JsonFileCartStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    /// Storage for `profile` under `dir`. Profile ids are restricted to
    /// ASCII letters, digits, `-` and `_` so they map to a single file name.
    pub fn for_profile(dir: impl AsRef<Path>, profile: &str) -> Result<Self, StorageError> {
        let valid = !profile.is_empty()
            && profile.len() <= 128
            && profile.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidProfile(profile.to_string()));
        }
        Ok(Self::new(dir.as_ref().join(format!("{profile}.json"))))
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl CartStorage for JsonFileCartStorage {
    fn read_cart(&self) -> Result<Option<CartState>, StorageError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    fn write_cart(&self, state: &CartState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(state)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process storage holding the raw serialized cart, so tests can seed
/// arbitrary (including malformed) contents.
#[derive(Debug, Default)]
pub struct MemoryCartStorage {
    raw: Mutex<Option<String>>,
}

impl MemoryCartStorage {
    pub fn new() -> Self { Self::default() }
    pub fn with_raw(raw: impl Into<String>) -> Self { Self { raw: Mutex::new(Some(raw.into())) } }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().map(|g| g.clone()).unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl CartStorage for MemoryCartStorage {
    fn read_cart(&self) -> Result<Option<CartState>, StorageError> {
        match self.raw() {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn write_cart(&self, state: &CartState) -> Result<(), StorageError> {
        let raw = serde_json::to_string(state)?;
        match self.raw.lock() {
            Ok(mut guard) => *guard = Some(raw),
            Err(poisoned) => *poisoned.into_inner() = Some(raw),
        }
        Ok(())
    }
}
