use ini::{Ini, ParseOption};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

const SECTION: &str = "storage";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no configuration directory available for this user")]
    NoConfigDir,
    #[error("failed to read {}: {source}", .path.display())]
    Load { path: PathBuf, source: ini::Error },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Durable string key-value storage
pub trait Storage {
    fn get_item(&self, key: &str) -> Option<String>;
    /// Persist `value` under `key` before returning.
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Storage kept in an INI file.
///
/// Nothing is cached: every read loads the file and every write re-reads it
/// before rewriting, so changes made by other processes are neither missed
/// nor overwritten.
pub struct IniStorage {
    path: PathBuf,
}

impl IniStorage {
    /// Open the storage file in the user configuration directory
    pub fn open_default() -> Result<Self, StorageError> {
        let dirs = directories::ProjectDirs::from("", "", "lifebar").ok_or(StorageError::NoConfigDir)?;
        Self::open(dirs.config_dir().join("storage.ini"))
    }

    /// Open storage at `path`. A missing file is fine; an unreadable one is not.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let storage = Self { path: path.into() };
        storage.load()?;
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Ini, StorageError> {
        if !self.path.exists() {
            return Ok(Ini::new());
        }

        // Values hold raw JSON, so quotes must survive unparsed.
        let options = ParseOption {
            enabled_quote: false,
            ..ParseOption::default()
        };
        Ini::load_from_file_opt(&self.path, options).map_err(|source| StorageError::Load {
            path: self.path.clone(),
            source,
        })
    }
}

impl Storage for IniStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let ini = match self.load() {
            Ok(ini) => ini,
            Err(e) => {
                tracing::warn!("{}", e);
                return None;
            }
        };

        ini.section(Some(SECTION))
            .and_then(|section| section.get(key))
            .map(|value| value.to_string())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut ini = self.load()?;
        ini.with_section(Some(SECTION)).set(key, value);

        let write_err = |source| StorageError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        ini.write_to_file(&self.path).map_err(write_err)
    }
}

/// Process-local storage. Clones share the same items.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ini_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.ini");

        let mut storage = IniStorage::open(&path).unwrap();
        assert_eq!(storage.get_item("settings"), None);
        storage
            .set_item("settings", r#"{"fps":30.0,"ups":3.0}"#)
            .unwrap();

        let reopened = IniStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get_item("settings").as_deref(),
            Some(r#"{"fps":30.0,"ups":3.0}"#)
        );
    }

    #[test]
    fn instances_on_one_file_see_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.ini");

        let mut widget = IniStorage::open(&path).unwrap();
        let mut command_line = IniStorage::open(&path).unwrap();

        widget.set_item("theme", "dark").unwrap();
        command_line.set_item("settings", r#"{"ups":10.0}"#).unwrap();
        assert_eq!(widget.get_item("settings").as_deref(), Some(r#"{"ups":10.0}"#));

        // A later write from the first instance keeps the other's change.
        widget.set_item("theme", "light").unwrap();
        let reopened = IniStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item("settings").as_deref(), Some(r#"{"ups":10.0}"#));
        assert_eq!(reopened.get_item("theme").as_deref(), Some("light"));
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let mut storage = IniStorage::open(blocker.join("storage.ini")).unwrap();
        let err = storage.set_item("settings", r#"{"fps":30.0}"#).unwrap_err();

        assert!(matches!(err, StorageError::Write { .. }));
        assert_eq!(storage.get_item("settings"), None);
    }

    #[test]
    fn malformed_file_is_rejected_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.ini");
        fs::write(&path, "[storage\nsettings={}\n").unwrap();

        assert!(matches!(IniStorage::open(&path), Err(StorageError::Load { .. })));
    }

    #[test]
    fn memory_storage_clones_share_items() {
        let mut storage = MemoryStorage::new();
        let other = storage.clone();

        storage.set_item("settings", "{}").unwrap();

        assert_eq!(other.get_item("settings").as_deref(), Some("{}"));
    }
}
