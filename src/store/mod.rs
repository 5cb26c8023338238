//! Flag store contract.
//!
//! Persistence lives outside the evaluation core; anything that can look
//! flags up by name implements [`FlagStore`]. [`MemoryFlagStore`] is the
//! in-process implementation used for embedding, fixtures and tests.

use crate::flag::{Flag, FlagDocument};
use crate::Result;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Source of flag records.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// Fetch a single flag. `Ok(None)` means the flag does not exist.
    async fn get_by_name(&self, name: &str) -> Result<Option<Flag>>;

    /// Fetch several flags in one round trip. Names that do not exist are
    /// omitted and each flag appears at most once.
    async fn get_many_by_name(&self, names: &[String]) -> Result<Vec<Flag>>;

    /// Fetch every flag.
    async fn list(&self) -> Result<Vec<Flag>>;
}

/// Flag store held in memory, ordered by flag name.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    flags: RwLock<BTreeMap<String, Flag>>,
}

impl MemoryFlagStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given flags, validating each one.
    pub fn with_flags(flags: impl IntoIterator<Item = Flag>) -> Result<Self> {
        let store = Self::new();
        for flag in flags {
            store.upsert(flag)?;
        }
        Ok(store)
    }

    /// Create a store from a flag document.
    pub fn from_document(document: FlagDocument) -> Result<Self> {
        document.validate()?;
        Self::with_flags(document.flags)
    }

    /// Insert or replace a flag, returning the previous version.
    pub fn upsert(&self, flag: Flag) -> Result<Option<Flag>> {
        flag.validate()?;
        Ok(self.flags.write().insert(flag.name.clone(), flag))
    }

    /// Remove a flag, returning it if it existed.
    pub fn remove(&self, name: &str) -> Option<Flag> {
        self.flags.write().remove(name)
    }

    /// Number of stored flags.
    pub fn len(&self) -> usize {
        self.flags.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.flags.read().is_empty()
    }
}

#[async_trait]
impl FlagStore for MemoryFlagStore {
    async fn get_by_name(&self, name: &str) -> Result<Option<Flag>> {
        Ok(self.flags.read().get(name).cloned())
    }

    async fn get_many_by_name(&self, names: &[String]) -> Result<Vec<Flag>> {
        let flags = self.flags.read();
        let mut found: BTreeMap<&str, Flag> = BTreeMap::new();
        for name in names {
            if let Some(flag) = flags.get(name) {
                found.entry(name.as_str()).or_insert_with(|| flag.clone());
            }
        }
        Ok(found.into_values().collect())
    }

    async fn list(&self) -> Result<Vec<Flag>> {
        Ok(self.flags.read().values().cloned().collect())
    }
}
