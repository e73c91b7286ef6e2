//! File-backed world state for the local peer.
//!
//! The whole ledger is kept in memory and mirrored to a single pretty-printed
//! JSON snapshot. Every put rewrites the snapshot (temp file + rename) before
//! the in-memory map changes, so a failed write leaves both untouched.
//!
//! A put therefore costs a copy of the map and a full file write, and blocks
//! the calling thread. `LocalPeer` runs writes on tokio's blocking pool.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracechain_common::ledger::{LedgerError, LedgerResult, LedgerState};
use tracechain_common::snapshot::LedgerSnapshot;

pub fn default_ledger_path() -> PathBuf {
    let data = dirs::data_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
    data.join("tracechain").join("ledger.json")
}

pub struct FileLedger {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileLedger {
    /// Open the snapshot at `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let path = path.into();
        let snapshot = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str::<LedgerSnapshot>(&data)
                .map_err(|e| LedgerError::Serialization(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerSnapshot::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            path = %path.display(),
            entries = snapshot.entries.len(),
            "opened ledger file"
        );
        Ok(Self {
            path,
            entries: Mutex::new(snapshot.entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> LedgerResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let snapshot = SnapshotRef { entries };
        let data = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[derive(serde::Serialize)]
struct SnapshotRef<'a> {
    entries: &'a BTreeMap<String, String>,
}

impl LedgerState for FileLedger {
    fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger lock poisoned".into()))?;
        Ok(entries.get(key).map(|v| v.clone().into_bytes()))
    }

    fn put_state(&self, key: &str, value: Vec<u8>) -> LedgerResult<()> {
        let text = String::from_utf8(value)
            .map_err(|e| LedgerError::Serialization(format!("value under {key} is not UTF-8: {e}")))?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger lock poisoned".into()))?;

        let mut next = entries.clone();
        next.insert(key.to_string(), text);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}
