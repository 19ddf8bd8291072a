//! Artifact storage backends and the JSON persistence capability.
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ModelError;

/// Where persisted artifacts live. Names are flat file names such as
/// `trainer.json`.
pub trait ArtifactStore {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), ModelError>;
    fn get(&self, name: &str) -> Result<Vec<u8>, ModelError>;
}

/// Stores artifacts as files under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open (and create if needed) a directory store.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self, ModelError> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    /// Open an existing directory without creating it.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, ModelError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ModelError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("artifact directory not found: {}", root.display()),
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ArtifactStore for DirectoryStore {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), ModelError> {
        let path = self.path_of(name);
        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(bytes)?;
        writer.flush()?;
        log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Vec<u8>, ModelError> {
        Ok(fs::read(self.path_of(name))?)
    }
}

/// In-process store, mostly useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .lock()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl ArtifactStore for MemoryStore {
    fn put(&self, name: &str, bytes: &[u8]) -> Result<(), ModelError> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Vec<u8>, ModelError> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.get(name).cloned().ok_or_else(|| {
            ModelError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("artifact not found: {}", name),
            ))
        })
    }
}

fn poisoned() -> ModelError {
    ModelError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "memory store lock poisoned",
    ))
}

/// Save/load as pretty-printed JSON.
///
/// Floats are written in shortest round-trip form and parsed with
/// `float_roundtrip`, so a reloaded model predicts bit-identically.
pub trait Persist: Serialize + DeserializeOwned + Sized {
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn to_json_bytes(&self) -> Result<Vec<u8>, ModelError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    fn from_json_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn save_to(&self, store: &dyn ArtifactStore, name: &str) -> Result<(), ModelError> {
        store.put(name, &self.to_json_bytes()?)
    }

    fn load_from(store: &dyn ArtifactStore, name: &str) -> Result<Self, ModelError> {
        Self::from_json_bytes(&store.get(name)?)
    }
}
