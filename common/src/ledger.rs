//! Key-value access to the world state the contract runs against.
//!
//! The ledger platform owns durability and ordering. The contract only ever
//! needs `get` and `put`, so that is all the trait asks for.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::snapshot::LedgerSnapshot;

/// Errors from the ledger accessor itself.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backing store refused or could not serve the request.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// World-state accessor.
///
/// Each call is atomic on its own. There is no multi-key transaction and no
/// compare-and-swap: concurrent writers are serialized by whoever hosts the
/// contract, not by the accessor.
pub trait LedgerState: Send + Sync {
    /// Value stored under `key`, or `None`. An empty value is returned as-is.
    fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing what was there.
    fn put_state(&self, key: &str, value: Vec<u8>) -> LedgerResult<()>;
}

impl<T: LedgerState + ?Sized> LedgerState for &T {
    fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        (**self).get_state(key)
    }

    fn put_state(&self, key: &str, value: Vec<u8>) -> LedgerResult<()> {
        (**self).put_state(key, value)
    }
}

impl<T: LedgerState + ?Sized> LedgerState for Arc<T> {
    fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        (**self).get_state(key)
    }

    fn put_state(&self, key: &str, value: Vec<u8>) -> LedgerResult<()> {
        (**self).put_state(key, value)
    }
}

/// `BTreeMap`-backed ledger for tests, local peers and contract hosting.
pub struct InMemoryLedger {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Load every entry of a snapshot.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let entries = snapshot
            .entries
            .into_iter()
            .map(|(key, value)| (key, value.into_bytes()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Copy the current contents out as a snapshot.
    ///
    /// Fails if any stored value is not UTF-8, which never happens for values
    /// the product contract writes.
    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        let map = self.read()?;
        let mut entries = BTreeMap::new();
        for (key, value) in map.iter() {
            let text = String::from_utf8(value.clone()).map_err(|e| {
                LedgerError::Serialization(format!("value under {key} is not UTF-8: {e}"))
            })?;
            entries.insert(key.clone(), text);
        }
        Ok(LedgerSnapshot { entries })
    }

    fn read(&self) -> LedgerResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .read()
            .map_err(|_| LedgerError::Unavailable("ledger lock poisoned".into()))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerState for InMemoryLedger {
    fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn put_state(&self, key: &str, value: Vec<u8>) -> LedgerResult<()> {
        let mut map = self
            .entries
            .write()
            .map_err(|_| LedgerError::Unavailable("ledger lock poisoned".into()))?;
        map.insert(key.to_string(), value);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = f.debug_struct("InMemoryLedger");
        match self.read() {
            Ok(map) => out.field("entry_count", &map.len()),
            Err(_) => out.field("poisoned", &true),
        };
        out.finish()
    }
}
