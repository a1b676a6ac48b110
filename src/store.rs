//! Locale store: the one piece of state that survives page loads.
//!
//! The store holds a single string slot under a configurable key. The slot is
//! read raw so the resolver can tell "absent" apart from "present but not a
//! locale we know". Writes only ever store a valid [`Locale`] code.
//!
//! Backends:
//! - [`MemoryStore`]: shared in-process map (tests, single-process previews)
//! - [`FileStore`]: JSON object on disk keyed by slot name
//! - [`DisabledStore`]: storage blocked by the browser or privacy settings

use crate::i18n::Locale;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, warn};

/// Slot name used unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "markdownflow_language";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("locale storage is unavailable")]
    Unavailable,

    #[error("failed to access locale store {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("locale store {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Persistent key-value slot for the visitor's locale preference.
pub trait LocaleStore {
    /// Read the raw slot value. `Ok(None)` means nothing has been stored yet.
    fn get(&self) -> Result<Option<String>, StoreError>;

    /// Overwrite the slot.
    fn set(&self, locale: Locale) -> Result<(), StoreError>;
}

/// In-memory store. Clones share the same backing map, like two tabs of one
/// origin sharing `localStorage`.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    key: String,
    slots: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_key(DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(key: &str) -> Self {
        Self {
            key: key.to_string(),
            slots: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Write an arbitrary raw value, bypassing locale validation.
    pub fn set_raw(&self, value: &str) {
        self.slots
            .borrow_mut()
            .insert(self.key.clone(), value.to_string());
    }

    /// Current raw value of the slot.
    pub fn raw(&self) -> Option<String> {
        self.slots.borrow().get(&self.key).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocaleStore for MemoryStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        Ok(self.raw())
    }

    fn set(&self, locale: Locale) -> Result<(), StoreError> {
        self.set_raw(locale.code());
        Ok(())
    }
}

/// Store backed by a JSON file holding `{ "<key>": "<value>", ... }`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    key: String,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            key: key.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };
        serde_json::from_str(&json).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl LocaleStore for FileStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        Ok(self.read_slots()?.remove(&self.key))
    }

    fn set(&self, locale: Locale) -> Result<(), StoreError> {
        let mut slots = match self.read_slots() {
            Ok(slots) => slots,
            Err(StoreError::Corrupt { path, source }) => {
                warn!("Replacing corrupt locale store {}: {}", path, source);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        slots.insert(self.key.clone(), locale.code().to_string());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(&slots).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))?;
        debug!("Stored locale '{}' in {}", locale, self.path.display());
        Ok(())
    }
}

/// Storage that refuses every access.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStore;

impl LocaleStore for DisabledStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable)
    }

    fn set(&self, _locale: Locale) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }
}
