//! Persisted user preferences (volume and last soundscape).
//!
//! The engine reads the store once at construction and writes it after every
//! `play`, `stop` and `set_volume`. Store failures are logged and otherwise
//! ignored; playback never depends on persistence.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::PrefsError;

/// JSON shape: `{"volume":0.3,"lastSound":"rain"}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub volume: f32,
    #[serde(default)]
    pub last_sound: Option<String>,
}

pub trait PreferenceStore: Send {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&mut self) -> Result<Option<Preferences>, PrefsError>;
    fn save(&mut self, prefs: &Preferences) -> Result<(), PrefsError>;
}

/// Preferences in a JSON file; parent directories are created on save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
    pub fn path(&self) -> &Path { &self.path }
}

impl PreferenceStore for JsonFileStore {
    fn load(&mut self) -> Result<Option<Preferences>, PrefsError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, prefs: &Preferences) -> Result<(), PrefsError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_vec(prefs)?)?;
        Ok(())
    }
}

/// In-memory store. Clones share the same slot, so a test (or host) can keep
/// a handle and inspect what the engine wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<Preferences>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn with(prefs: Preferences) -> Self { Self { slot: Arc::new(Mutex::new(Some(prefs))) } }

    pub fn get(&self) -> Option<Preferences> { self.slot.lock().clone() }
}

impl PreferenceStore for MemoryStore {
    fn load(&mut self) -> Result<Option<Preferences>, PrefsError> { Ok(self.slot.lock().clone()) }

    fn save(&mut self, prefs: &Preferences) -> Result<(), PrefsError> {
        *self.slot.lock() = Some(prefs.clone());
        Ok(())
    }
}

/// Remembers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl PreferenceStore for NullStore {
    fn load(&mut self) -> Result<Option<Preferences>, PrefsError> { Ok(None) }
    fn save(&mut self, _prefs: &Preferences) -> Result<(), PrefsError> { Ok(()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn json_field_names() {
        let p = Preferences { volume: 0.5, last_sound: Some("fire".into()) };
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"volume":0.5,"lastSound":"fire"}"#);

        let back: Preferences = serde_json::from_str(r#"{"volume":0.25,"lastSound":null}"#).unwrap();
        assert_eq!(back, Preferences { volume: 0.25, last_sound: None });
        let bare: Preferences = serde_json::from_str(r#"{"volume":1}"#).unwrap();
        assert_eq!(bare.last_sound, None);
    }

    #[test]
    fn file_store_roundtrip_creates_dirs() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested/murmur/prefs.json"));
        assert_eq!(store.load().unwrap(), None);

        let p = Preferences { volume: 0.8, last_sound: Some("rain".into()) };
        store.save(&p).unwrap();
        assert_eq!(store.load().unwrap(), Some(p));
    }

    #[test]
    fn file_store_reports_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(JsonFileStore::new(path).load(), Err(PrefsError::Json(_))));
    }

    #[test]
    fn memory_store_clones_share_state() {
        let store = MemoryStore::new();
        let mut writer = store.clone();
        writer.save(&Preferences { volume: 0.1, last_sound: None }).unwrap();
        assert_eq!(store.get().map(|p| p.volume), Some(0.1));
    }
}
