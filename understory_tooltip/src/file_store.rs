// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON-file-backed [`SeenStore`].
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "seen": {
//!     "compose.intro": true,
//!     "compose.send": true
//!   }
//! }
//! ```
//!
//! Keys are written sorted. Writes go to a temporary sibling file that is
//! then renamed over the original, so a crash never leaves a torn file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::string::String;

use core::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::SeenStore;

/// Current file format version.
const FORMAT_VERSION: u64 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SeenFile {
    version: u64,
    seen: BTreeMap<String, bool>,
}

/// A [`SeenStore`] persisted to a JSON file after every mutation.
///
/// The in-memory map is authoritative for reads. A failed write is logged
/// through `tracing` and retried implicitly by the next mutation; call
/// [`flush`](Self::flush) to observe write errors directly.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RefCell<BTreeMap<String, bool>>,
}

impl FileStore {
    /// Opens the store at `path`.
    ///
    /// - **Missing file** yields an empty store (not an error).
    /// - **Corrupted file** yields [`StoreError::Format`].
    /// - **Version mismatch** yields [`StoreError::UnsupportedVersion`].
    ///
    /// The parent directory must already exist before the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let file: SeenFile = serde_json::from_str(&contents)?;
                if file.version != FORMAT_VERSION {
                    return Err(StoreError::UnsupportedVersion {
                        found: file.version,
                        expected: FORMAT_VERSION,
                    });
                }
                file.seen
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "opened seen store");
        Ok(Self {
            path,
            entries: RefCell::new(entries),
        })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current state to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        let file = SeenFile {
            version: FORMAT_VERSION,
            seen: self.entries.borrow().clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, json)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn persist(&self) {
        if let Err(err) = self.flush() {
            tracing::warn!(path = %self.path.display(), %err, "failed to persist seen store");
        }
    }
}

impl SeenStore for FileStore {
    fn get(&self, name: &str) -> Option<bool> {
        self.entries.borrow().get(name).copied()
    }

    fn set(&self, name: &str, seen: bool) {
        let previous = self.entries.borrow_mut().insert(String::from(name), seen);
        if previous != Some(seen) {
            self.persist();
        }
    }

    fn clear(&self, name: &str) {
        let previous = self.entries.borrow_mut().remove(name);
        if previous.is_some() {
            self.persist();
        }
    }

    fn clear_all(&self) {
        self.entries.borrow_mut().clear();
        self.persist();
    }
}
