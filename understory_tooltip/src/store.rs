// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Boolean key-value storage for "already seen" flags.

use alloc::string::String;
use core::cell::RefCell;

use hashbrown::HashMap;

/// Synchronous boolean key-value store keyed by tooltip name.
///
/// The engine reads and writes through this trait on its single execution
/// context and assumes every write is immediately visible to the next read.
/// Implementations use interior mutability because the store is shared by
/// every tooltip created from one [`Engine`](crate::Engine).
///
/// Durable implementations (see `FileStore` behind the `persistence` feature)
/// make seen state survive process restarts.
pub trait SeenStore {
    /// Returns the stored flag, or `None` if `name` was never written or was cleared.
    fn get(&self, name: &str) -> Option<bool>;

    /// Stores `seen` under `name`.
    fn set(&self, name: &str, seen: bool);

    /// Forgets the flag stored under `name`.
    fn clear(&self, name: &str);

    /// Forgets every stored flag.
    fn clear_all(&self);
}

/// In-memory [`SeenStore`]; the default store of an [`Engine`](crate::Engine).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, bool>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored flags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self {
            entries: RefCell::new(
                iter.into_iter()
                    .map(|(name, seen)| (name.into(), seen))
                    .collect(),
            ),
        }
    }
}

impl SeenStore for MemoryStore {
    fn get(&self, name: &str) -> Option<bool> {
        self.entries.borrow().get(name).copied()
    }

    fn set(&self, name: &str, seen: bool) {
        self.entries.borrow_mut().insert(String::from(name), seen);
    }

    fn clear(&self, name: &str) {
        self.entries.borrow_mut().remove(name);
    }

    fn clear_all(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_until_written() {
        let store = MemoryStore::new();
        assert_eq!(store.get("intro"), None);

        store.set("intro", true);
        assert_eq!(store.get("intro"), Some(true));

        store.set("intro", false);
        assert_eq!(store.get("intro"), Some(false));
    }

    #[test]
    fn clear_and_clear_all() {
        let store: MemoryStore = [("a", true), ("b", true)].into_iter().collect();
        assert_eq!(store.len(), 2);

        store.clear("a");
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), Some(true));

        store.clear_all();
        assert!(store.is_empty());
    }
}
